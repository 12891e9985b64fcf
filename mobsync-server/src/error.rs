#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Telemetry initialization failed: {0}")]
    Telemetry(String),

    #[error("Session runtime is not running")]
    ChannelClosed,

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        ServerError::InvalidConfig(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
