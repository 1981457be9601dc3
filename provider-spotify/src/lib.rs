//! Spotify Web API connector
//!
//! Implements `PlaylistProvider` over the Web API's playlist endpoints. Every
//! method is a single HTTP request (listing the user's playlists walks pages);
//! nothing is retried, and status codes reach the caller intact.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{SpotifyConfig, SpotifyConnector};
pub use error::{Result, SpotifyError};
