use crate::error::{AuthError, Result};
use bridge_traits::time::Clock;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scopes a token needs to read and rewrite the user's playlists.
pub const REQUIRED_SCOPES: &[&str] = &[
    "playlist-read-private",
    "playlist-read-collaborative",
    "playlist-modify-private",
    "playlist-modify-public",
];

/// Bearer credential for the playlist provider.
///
/// Refresh tokens are deliberately absent: refreshing is the token
/// provider's concern, not the session's.
///
/// # Security
///
/// The `Debug` implementation redacts the token value.
///
/// # Examples
///
/// ```
/// use bridge_traits::time::SystemClock;
/// use core_auth::AccessToken;
///
/// let clock = SystemClock;
/// let token = AccessToken::expiring_in(&clock, "BQDx0...", 3600, Vec::new());
///
/// assert!(!token.is_expired_with_buffer(&clock, 60));
/// assert!(format!("{:?}", token).contains("[REDACTED]"));
/// ```
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    /// When the provider stops accepting the token (UTC)
    pub expires_at: DateTime<Utc>,
    /// Scopes granted by the user
    pub scopes: Vec<String>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>, scopes: Vec<String>) -> Self {
        Self {
            token: token.into(),
            expires_at,
            scopes,
        }
    }

    /// Token that expires `expires_in` seconds after the clock's current time
    pub fn expiring_in(
        clock: &dyn Clock,
        token: impl Into<String>,
        expires_in: i64,
        scopes: Vec<String>,
    ) -> Self {
        Self::new(token, clock.now() + Duration::seconds(expires_in), scopes)
    }

    /// Raw bearer value for the `Authorization` header
    pub fn secret(&self) -> &str {
        &self.token
    }

    /// Seconds until expiry; negative once expired
    pub fn seconds_remaining(&self, clock: &dyn Clock) -> i64 {
        (self.expires_at - clock.now()).num_seconds()
    }

    /// True when the token expires within `buffer_seconds`
    pub fn is_expired_with_buffer(&self, clock: &dyn Clock, buffer_seconds: i64) -> bool {
        self.seconds_remaining(clock) <= buffer_seconds
    }

    /// Required scopes this token was not granted
    pub fn missing_scopes(&self) -> Vec<&'static str> {
        REQUIRED_SCOPES
            .iter()
            .copied()
            .filter(|required| !self.scopes.iter().any(|granted| granted == required))
            .collect()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Rejects empty or whitespace-only user ids.
pub fn validate_user_id(user_id: &str) -> Result<&str> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(AuthError::InvalidUserId(user_id.to_string()));
    }
    Ok(trimmed)
}
