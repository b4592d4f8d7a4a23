//! REST client for the provider's prescription endpoints.
//!
//! Each operation is one bounded-timeout HTTP round trip using
//! [`reqwest`]. Reads go through [`retry_idempotent`]; commands are sent
//! exactly once.

use async_trait::async_trait;
use reqwest::StatusCode;
use rxentry_core::config::NetworkConfig;
use rxentry_core::types::{CompletionSummary, DrugEntry, PrescriptionSession, SendAck, ServerStatus};

use crate::error::ProviderError;
use crate::messages::{DrugListResponse, StartSessionRequest, StartSessionResponse};
use crate::retry::{retry_idempotent, RetryPolicy};

/// Operations the orchestrator needs from the provider.
///
/// [`RemoteSessionClient`] is the HTTP implementation; tests substitute
/// in-memory fakes.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// `GET /status`: server liveness plus the active session, if any.
    async fn server_status(&self) -> Result<ServerStatus, ProviderError>;

    /// `GET /prescription/current`. `Ok(None)` when no session is active.
    async fn get_status(&self) -> Result<Option<PrescriptionSession>, ProviderError>;

    /// `GET /prescription/drugs`. An empty list is a valid answer.
    async fn get_pending_drugs(&self) -> Result<Vec<DrugEntry>, ProviderError>;

    /// `POST /prescription/start`. Returns the new session id.
    async fn start_session(&self, patient_info: &str) -> Result<String, ProviderError>;

    /// `POST /prescription/send`. [`ProviderError::NoDrugs`] when the
    /// provider has nothing queued.
    async fn request_send(&self) -> Result<SendAck, ProviderError>;

    /// `POST /prescription/complete`.
    async fn complete_session(&self) -> Result<CompletionSummary, ProviderError>;
}

/// HTTP client for a single provider instance.
pub struct RemoteSessionClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl RemoteSessionClient {
    /// Create a client for the provider at `base_url`
    /// (e.g. `http://192.168.1.100:8080`).
    ///
    /// The request timeout and retry policy come from `network`.
    pub fn new(base_url: String, network: &NetworkConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(network.connection_timeout)
            .build()
            .map_err(ProviderError::Client)?;

        Ok(Self::with_client(
            client,
            base_url,
            RetryPolicy::from_config(network),
        ))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: String, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a GET, retrying connection failures per the retry policy.
    async fn get(&self, path: &str) -> Result<reqwest::Response, ProviderError> {
        let url = self.url(path);
        retry_idempotent(&self.retry, path, ProviderError::is_retryable, || {
            self.dispatch(self.client.get(url.as_str()))
        })
        .await
    }

    async fn dispatch(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ProviderError> {
        request
            .send()
            .await
            .map_err(|source| ProviderError::Unreachable {
                url: self.base_url.clone(),
                source,
            })
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ProviderError::ServerError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderError::ServerError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let response = Self::ensure_success(response).await?;
        response.json::<T>().await.map_err(ProviderError::Decode)
    }
}

#[async_trait]
impl SessionProvider for RemoteSessionClient {
    async fn server_status(&self) -> Result<ServerStatus, ProviderError> {
        let response = self.get("/status").await?;
        let status: ServerStatus = Self::parse_response(response).await?;

        tracing::debug!(
            server = %status.server,
            port = status.port,
            has_session = status.session.is_some(),
            "Provider status",
        );
        Ok(status)
    }

    async fn get_status(&self) -> Result<Option<PrescriptionSession>, ProviderError> {
        let response = self.get("/prescription/current").await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("No active prescription session");
            return Ok(None);
        }

        let session: PrescriptionSession = Self::parse_response(response).await?;
        Ok(Some(session))
    }

    async fn get_pending_drugs(&self) -> Result<Vec<DrugEntry>, ProviderError> {
        let response = self.get("/prescription/drugs").await?;
        let list: DrugListResponse = Self::parse_response(response).await?;

        if let Some(count) = list.count {
            if count != list.drugs.len() {
                tracing::warn!(
                    reported = count,
                    received = list.drugs.len(),
                    "Provider drug count does not match list length",
                );
            }
        }

        Ok(list.drugs)
    }

    async fn start_session(&self, patient_info: &str) -> Result<String, ProviderError> {
        let body = StartSessionRequest { patient_info };
        let response = self
            .dispatch(self.client.post(self.url("/prescription/start")).json(&body))
            .await?;

        let started: StartSessionResponse = Self::parse_response(response).await?;
        tracing::info!(session_id = %started.session_id, "Prescription session started");
        Ok(started.session_id)
    }

    async fn request_send(&self) -> Result<SendAck, ProviderError> {
        let response = self
            .dispatch(self.client.post(self.url("/prescription/send")))
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            return Err(ProviderError::NoDrugs);
        }

        let response = Self::ensure_success(response).await?;
        // The ack body is informational; tolerate empty or non-JSON bodies.
        let text = response.text().await.unwrap_or_default();
        Ok(serde_json::from_str(&text).unwrap_or_default())
    }

    async fn complete_session(&self) -> Result<CompletionSummary, ProviderError> {
        let response = self
            .dispatch(self.client.post(self.url("/prescription/complete")))
            .await?;

        Self::parse_response(response).await
    }
}
