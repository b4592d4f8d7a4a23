/// Errors from the provider HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider could not be contacted (refused, DNS, timeout).
    #[error("Provider unreachable at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered with an unexpected non-2xx status.
    #[error("Provider error ({status}): {body}")]
    ServerError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// `POST /prescription/send` was refused because nothing is queued.
    #[error("No drugs are queued on the provider")]
    NoDrugs,

    /// A 2xx response whose body did not match the expected shape.
    #[error("Malformed provider response: {0}")]
    Decode(#[source] reqwest::Error),

    /// The HTTP client itself could not be built.
    #[error("HTTP client setup failed: {0}")]
    Client(#[source] reqwest::Error),
}

impl ProviderError {
    /// Only connection-level failures are worth retrying; a provider that
    /// answered has already made up its mind.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}
