//! Remote Playlist Abstraction
//!
//! The capability a music provider must expose for a playlist to be
//! resynchronized: paginated reads, capped batch remove/add by URI, and
//! single-item moves.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Hard cap the provider enforces on items per read or mutation call
pub const MAX_ITEMS_PER_REQUEST: usize = 100;

/// One playlist entry exactly as the provider returned it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    /// Provider URI (`spotify:track:...`, `spotify:local:...`), if any
    pub uri: Option<String>,

    /// False when the catalog entry was deleted or is region-blocked
    pub is_available: bool,
}

impl PlaylistEntry {
    pub fn available(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            is_available: true,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            uri: None,
            is_available: false,
        }
    }
}

/// One page of playlist entries
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlaylistPage {
    /// Entries in playlist order, starting at the requested offset
    pub items: Vec<PlaylistEntry>,

    /// Total entry count the provider reports for the whole playlist
    pub declared_total: Option<u32>,
}

/// A playlist owned or followed by the current user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    /// Provider playlist ID
    pub id: String,

    /// Display name
    pub name: String,

    /// Reported track count; `None` when the provider omitted the summary
    pub declared_total: Option<u32>,
}

impl PlaylistSummary {
    /// Playlists without a track summary cannot be resynchronized
    pub fn is_valid(&self) -> bool {
        self.declared_total.is_some()
    }
}

/// Remote playlist capability
///
/// Implementations talk to one provider on behalf of one authenticated user.
/// Every method is a single remote call (except `list_user_playlists`, which
/// walks the provider's pages); none of them retry.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::playlist::PlaylistProvider;
///
/// async fn first_page(provider: &dyn PlaylistProvider, id: &str) -> Result<usize> {
///     let page = provider.list_playlist_page(id, 0, 100).await?;
///     Ok(page.items.len())
/// }
/// ```
#[async_trait]
pub trait PlaylistProvider: Send + Sync {
    /// Read up to `limit` entries starting at `offset`
    async fn list_playlist_page(
        &self,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<PlaylistPage>;

    /// Remove every occurrence of each URI (at most `MAX_ITEMS_PER_REQUEST`)
    async fn remove_items(&self, playlist_id: &str, uris: &[String]) -> Result<()>;

    /// Append URIs in the given order (at most `MAX_ITEMS_PER_REQUEST`)
    async fn add_items(&self, playlist_id: &str, uris: &[String]) -> Result<()>;

    /// Move the entry at `from` so that it lands before the entry currently
    /// at `insert_before`
    async fn move_item(&self, playlist_id: &str, from: usize, insert_before: usize)
        -> Result<()>;

    /// ID of the user the session belongs to
    async fn current_user_id(&self) -> Result<String>;

    /// All playlists of `user_id`, across every listing page
    async fn list_user_playlists(&self, user_id: &str) -> Result<Vec<PlaylistSummary>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_constructors() {
        let entry = PlaylistEntry::available("spotify:track:abc");
        assert_eq!(entry.uri.as_deref(), Some("spotify:track:abc"));
        assert!(entry.is_available);

        let missing = PlaylistEntry::unavailable();
        assert!(missing.uri.is_none());
        assert!(!missing.is_available);
    }

    #[test]
    fn test_summary_validity() {
        let valid = PlaylistSummary {
            id: "p1".to_string(),
            name: "Road trip".to_string(),
            declared_total: Some(0),
        };
        let invalid = PlaylistSummary {
            declared_total: None,
            ..valid.clone()
        };

        assert!(valid.is_valid());
        assert!(!invalid.is_valid());
    }
}
