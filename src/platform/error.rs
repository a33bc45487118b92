#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PlatformError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to parse API response: {0}")]
    JsonParseFailed(#[from] serde_json::Error),

    #[error("Platform API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to authenticate with the platform: {message}")]
    AuthenticationFailed { message: String },

    #[error("Invalid value `{value}` for field `{field}`.")]
    InvalidField { field: String, value: String },
}

impl From<wreq::Error> for PlatformError {
    fn from(e: wreq::Error) -> Self {
        PlatformError::RequestFailed(Box::new(e))
    }
}
