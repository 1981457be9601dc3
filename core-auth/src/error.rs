use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Token expired ({seconds_remaining}s remaining); obtain a new token")]
    TokenExpired { seconds_remaining: i64 },

    #[error("Token provider failed: {0}")]
    ProviderFailed(String),

    #[error("Operation timed out: {operation}")]
    OperationTimeout { operation: String },

    #[error("Invalid user id: {0:?}")]
    InvalidUserId(String),
}

impl AuthError {
    /// Whether obtaining a new token can fix the error
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AuthError::InvalidUserId(_))
    }
}

impl From<AuthError> for BridgeError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::OperationTimeout { .. } => BridgeError::Network(error.to_string()),
            other => BridgeError::Unauthorized(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
