//! # Host Bridge Traits
//!
//! Capability contracts between the resync core and the outside world.
//!
//! ## Overview
//!
//! The core never talks to a network or a clock directly. Each capability it
//! needs is a trait defined here and implemented elsewhere: `bridge-desktop`
//! ships the transport, `provider-spotify` ships the playlist capability, and
//! tests ship in-memory doubles.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Single-attempt async HTTP transport
//! - [`PlaylistProvider`](playlist::PlaylistProvider) - Paginated playlist reads,
//!   capped batch remove/add, single-item moves, user playlist listing
//! - [`Clock`](time::Clock) - Time source for deterministic token expiry tests
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Provider
//! implementations must keep HTTP status codes intact (`BridgeError::Api`) and
//! report expired sessions as `BridgeError::Unauthorized`, so callers can tell
//! a rejected mutation from an authentication problem.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! behind `Arc` across async tasks.

pub mod error;
pub mod http;
pub mod playlist;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use playlist::{
    PlaylistEntry, PlaylistPage, PlaylistProvider, PlaylistSummary, MAX_ITEMS_PER_REQUEST,
};
pub use time::{Clock, FixedClock, LogLevel, SystemClock};
