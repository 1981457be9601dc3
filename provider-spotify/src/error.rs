//! Error types for the Spotify provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Spotify provider errors
#[derive(Error, Debug)]
pub enum SpotifyError {
    /// The access token was rejected (HTTP 401)
    #[error("Spotify rejected the access token: {0}")]
    Unauthorized(String),

    /// API request returned a non-success status
    #[error("Spotify API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The session could not supply a token
    #[error(transparent)]
    Auth(#[from] core_auth::AuthError),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Spotify operations
pub type Result<T> = std::result::Result<T, SpotifyError>;

impl From<SpotifyError> for BridgeError {
    fn from(error: SpotifyError) -> Self {
        match error {
            SpotifyError::Unauthorized(message) => BridgeError::Unauthorized(message),
            SpotifyError::ApiError {
                status_code,
                message,
            } => BridgeError::Api {
                status_code,
                message,
            },
            SpotifyError::RateLimitExceeded {
                retry_after_seconds,
            } => BridgeError::RateLimited {
                retry_after_seconds,
            },
            SpotifyError::ParseError(msg) => {
                BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            SpotifyError::Auth(e) => e.into(),
            SpotifyError::BridgeError(e) => e,
        }
    }
}
