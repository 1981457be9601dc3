//! Spotify Web API request and response types
//!
//! Only the fields the resync needs are modelled; everything else in the
//! payloads is ignored.

use bridge_traits::{PlaylistEntry, PlaylistSummary};
use serde::{Deserialize, Serialize};

/// `GET /me`
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUser {
    pub id: String,

    #[serde(default)]
    pub display_name: Option<String>,
}

/// `GET /playlists/{id}/tracks`
///
/// See: https://developer.spotify.com/documentation/web-api/reference/get-playlists-tracks
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistTracksPage {
    #[serde(default)]
    pub items: Vec<PlaylistTrackItem>,

    /// Total entries in the playlist
    pub total: Option<u32>,
}

/// One playlist entry
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistTrackItem {
    /// Track or episode; `null` once the catalog entry is gone
    #[serde(default)]
    pub track: Option<PlayableItem>,
}

/// Track or episode object
///
/// Only the URI is kept; local files carry a `spotify:local:` URI, which is
/// what classification keys on.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayableItem {
    #[serde(default)]
    pub uri: Option<String>,
}

impl From<PlaylistTrackItem> for PlaylistEntry {
    fn from(item: PlaylistTrackItem) -> Self {
        match item.track {
            Some(playable) => PlaylistEntry {
                uri: playable.uri,
                is_available: true,
            },
            None => PlaylistEntry::unavailable(),
        }
    }
}

/// `GET /users/{id}/playlists`
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistsPage {
    #[serde(default)]
    pub items: Vec<SimplifiedPlaylist>,

    /// URL of the next page, absent on the last one
    #[serde(default)]
    pub next: Option<String>,

    #[serde(default)]
    pub total: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimplifiedPlaylist {
    pub id: String,
    pub name: String,

    /// Track summary; missing for some followed playlists
    #[serde(default)]
    pub tracks: Option<TracksRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TracksRef {
    pub total: u32,
}

impl From<SimplifiedPlaylist> for PlaylistSummary {
    fn from(playlist: SimplifiedPlaylist) -> Self {
        PlaylistSummary {
            id: playlist.id,
            name: playlist.name,
            declared_total: playlist.tracks.map(|tracks| tracks.total),
        }
    }
}

/// `DELETE /playlists/{id}/tracks` body
#[derive(Debug, Clone, Serialize)]
pub struct RemoveTracksBody<'a> {
    pub tracks: Vec<UriRef<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UriRef<'a> {
    pub uri: &'a str,
}

/// `POST /playlists/{id}/tracks` body
#[derive(Debug, Clone, Serialize)]
pub struct AddTracksBody<'a> {
    pub uris: &'a [String],
}

/// `PUT /playlists/{id}/tracks` body
#[derive(Debug, Clone, Serialize)]
pub struct ReorderBody {
    pub range_start: usize,
    pub insert_before: usize,
}

/// Error payload: `{"error": {"status": 401, "message": "..."}}`
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorObject {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: String,
}
