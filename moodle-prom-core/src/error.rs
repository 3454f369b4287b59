use thiserror::Error;

/// Unified error type for the exporter.
#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("Auth failed")]
    AuthFailed,

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Invalid metric value: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal: {0}")]
    Internal(String),
}

impl ExporterError {
    /// Map to HTTP status code.
    pub fn status_code(&self) -> u16 {
        match self {
            ExporterError::AuthFailed => 403,
            _ => 500,
        }
    }

    /// Whether the error is the caller's fault rather than the exporter's.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}
