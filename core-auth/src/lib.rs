//! # Authentication Module
//!
//! Session collaborator for the resync engine.
//!
//! ## Overview
//!
//! The engine only needs one thing from authentication: a bearer credential
//! that stays valid for the whole resync. [`SessionManager`] provides it by
//! caching an [`AccessToken`] from a pluggable [`TokenProvider`] and refusing
//! tokens that are about to expire. How the token is obtained (browser
//! redirect, environment variable, test fixture) is the provider's business.
//!
//! ## Features
//!
//! - Blocking "obtain valid session" with a timeout
//! - Expiry buffer so a token cannot lapse mid-resync
//! - Remaining-lifetime reporting
//! - Auth event emission on the shared event bus

pub mod error;
pub mod session;
pub mod types;

pub use error::{AuthError, Result};
pub use session::{SessionConfig, SessionManager, StaticTokenProvider, TokenProvider};
pub use types::{validate_user_id, AccessToken, REQUIRED_SCOPES};
