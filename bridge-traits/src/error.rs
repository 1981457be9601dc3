use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider API error (status {status_code}): {message}")]
    Api { status_code: u16, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimited { retry_after_seconds: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// HTTP status code carried by this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            BridgeError::Api { status_code, .. } => Some(*status_code),
            BridgeError::Unauthorized(_) => Some(401),
            BridgeError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Whether the session behind the request is invalid or expired
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BridgeError::Unauthorized(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
