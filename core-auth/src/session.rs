//! # Session Manager
//!
//! "Obtain a valid session" for the resync engine.
//!
//! ## Overview
//!
//! [`SessionManager`] caches one [`AccessToken`] and hands it out while it
//! has more than `expiry_buffer` left. Once the cached token drifts into the
//! buffer (or was never obtained) the manager asks its [`TokenProvider`] for
//! a new one, waiting at most `obtain_timeout`. A provider that hands back a
//! token already inside the buffer yields [`AuthError::TokenExpired`]; the
//! caller is expected to re-authenticate, never to retry blindly.
//!
//! The buffer only gates starting an operation. Requests issued while one
//! runs go through [`SessionManager::request_token`], which keeps using the
//! cached token until it has actually expired.
//!
//! ## Usage
//!
//! ```no_run
//! use bridge_traits::time::SystemClock;
//! use core_auth::{AccessToken, SessionConfig, SessionManager, StaticTokenProvider};
//! use core_runtime::events::EventBus;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> core_auth::Result<()> {
//! let clock = Arc::new(SystemClock);
//! let token = AccessToken::expiring_in(clock.as_ref(), "BQDx0...", 3600, Vec::new());
//!
//! let session = SessionManager::new(
//!     Arc::new(StaticTokenProvider::new(token)),
//!     clock,
//!     SessionConfig::default(),
//!     EventBus::default(),
//! );
//!
//! let token = session.valid_token().await?;
//! println!("{}s left", token.seconds_remaining(&SystemClock));
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::AccessToken;
use async_trait::async_trait;
use bridge_traits::time::Clock;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use core_runtime::logging::redact_if_sensitive;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

/// Source of access tokens.
///
/// Implementations may block (for example while a user approves access in a
/// browser); the session manager bounds the wait with `obtain_timeout`.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn obtain_token(&self) -> Result<AccessToken>;
}

/// Provider that always returns the same pre-issued token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: AccessToken,
}

impl StaticTokenProvider {
    pub fn new(token: AccessToken) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn obtain_token(&self) -> Result<AccessToken> {
        Ok(self.token.clone())
    }
}

/// Session tunables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Tokens with less lifetime than this are treated as expired
    pub expiry_buffer: Duration,
    /// Upper bound on a single `obtain_token` call
    pub obtain_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiry_buffer: Duration::from_secs(60),
            obtain_timeout: Duration::from_secs(120),
        }
    }
}

impl SessionConfig {
    pub fn with_expiry_buffer(mut self, buffer: Duration) -> Self {
        self.expiry_buffer = buffer;
        self
    }

    pub fn with_obtain_timeout(mut self, timeout: Duration) -> Self {
        self.obtain_timeout = timeout;
        self
    }

    fn buffer_seconds(&self) -> i64 {
        i64::try_from(self.expiry_buffer.as_secs()).unwrap_or(i64::MAX)
    }
}

/// Caches and validates the bearer credential for one user.
pub struct SessionManager {
    provider: Arc<dyn TokenProvider>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    event_bus: EventBus,
    cached: RwLock<Option<AccessToken>>,
    /// Serializes provider calls so concurrent callers share one new token
    obtain_lock: Mutex<()>,
}

impl SessionManager {
    pub fn new(
        provider: Arc<dyn TokenProvider>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
        event_bus: EventBus,
    ) -> Self {
        Self {
            provider,
            clock,
            config,
            event_bus,
            cached: RwLock::new(None),
            obtain_lock: Mutex::new(()),
        }
    }

    /// Returns a token with more than `expiry_buffer` left, obtaining a new
    /// one from the provider when the cached token is missing or too old.
    ///
    /// # Errors
    ///
    /// - `AuthError::OperationTimeout` - the provider did not answer in time
    /// - `AuthError::TokenExpired` - the provider's token is inside the buffer
    /// - any error the provider itself returns
    #[instrument(skip(self))]
    pub async fn valid_token(&self) -> Result<AccessToken> {
        self.token_outside(self.config.buffer_seconds()).await
    }

    /// Returns a token that has not expired yet, ignoring `expiry_buffer`.
    ///
    /// Meant for individual API requests issued after [`valid_token`]
    /// admitted an operation: the buffer gates starting work, not finishing
    /// it. A missing or expired token is obtained as in `valid_token`.
    ///
    /// [`valid_token`]: SessionManager::valid_token
    #[instrument(skip(self))]
    pub async fn request_token(&self) -> Result<AccessToken> {
        self.token_outside(0).await
    }

    async fn token_outside(&self, buffer_seconds: i64) -> Result<AccessToken> {
        if let Some(token) = self.usable_cached(buffer_seconds).await {
            return Ok(token);
        }

        let _guard = self.obtain_lock.lock().await;

        // Another caller may have refreshed while we waited
        if let Some(token) = self.usable_cached(buffer_seconds).await {
            return Ok(token);
        }

        let token = self.obtain().await?;
        let seconds_remaining = token.seconds_remaining(self.clock.as_ref());

        if token.is_expired_with_buffer(self.clock.as_ref(), buffer_seconds) {
            warn!(seconds_remaining, "Provider returned a token inside the expiry buffer");
            self.emit(AuthEvent::TokenExpiring { seconds_remaining });
            let err = AuthError::TokenExpired { seconds_remaining };
            self.emit_error(&err);
            return Err(err);
        }

        let missing = token.missing_scopes();
        if !missing.is_empty() {
            warn!(?missing, "Token lacks playlist scopes; mutations may be rejected");
        }

        debug!(
            access_token = %redact_if_sensitive("access_token", token.secret()),
            seconds_remaining,
            "Caching access token"
        );
        info!(seconds_remaining, "Access token acquired");

        self.emit(AuthEvent::TokenAcquired {
            expires_at: token.expires_at.timestamp(),
            scopes: token.scopes.clone(),
        });

        *self.cached.write().await = Some(token.clone());
        Ok(token)
    }

    /// Remaining lifetime of the cached token, `None` before the first
    /// successful `valid_token` call or after `invalidate`.
    pub async fn seconds_remaining(&self) -> Option<i64> {
        self.cached
            .read()
            .await
            .as_ref()
            .map(|token| token.seconds_remaining(self.clock.as_ref()))
    }

    /// Drops the cached token, e.g. after the provider answered 401.
    pub async fn invalidate(&self) {
        if self.cached.write().await.take().is_some() {
            info!("Cached access token invalidated");
        }
    }

    async fn usable_cached(&self, buffer_seconds: i64) -> Option<AccessToken> {
        let cached = self.cached.read().await;
        let token = cached.as_ref()?;
        if token.is_expired_with_buffer(self.clock.as_ref(), buffer_seconds) {
            debug!(
                seconds_remaining = token.seconds_remaining(self.clock.as_ref()),
                "Cached token inside expiry buffer"
            );
            return None;
        }
        Some(token.clone())
    }

    async fn obtain(&self) -> Result<AccessToken> {
        match timeout(self.config.obtain_timeout, self.provider.obtain_token()).await {
            Ok(Ok(token)) => Ok(token),
            Ok(Err(e)) => {
                error!(error = %e, "Token provider failed");
                self.emit_error(&e);
                Err(e)
            }
            Err(_) => {
                error!(timeout = ?self.config.obtain_timeout, "Token provider timed out");
                let err = AuthError::OperationTimeout {
                    operation: "obtain token".to_string(),
                };
                self.emit_error(&err);
                Err(err)
            }
        }
    }

    fn emit(&self, event: AuthEvent) {
        self.event_bus.emit(CoreEvent::Auth(event)).ok();
    }

    fn emit_error(&self, err: &AuthError) {
        self.emit(AuthEvent::AuthError {
            message: err.to_string(),
            recoverable: err.is_recoverable(),
        });
    }
}
