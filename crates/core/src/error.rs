/// Errors raised while building core values (keys, configuration).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid value for {key}: {message}")]
    Config { key: String, message: String },
}
