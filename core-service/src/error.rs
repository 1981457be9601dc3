use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Service initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Invalid playlist selection {index}; {available} playlists listed")]
    InvalidSelection { index: usize, available: usize },

    #[error("Playlist {0} has no track summary and cannot be shuffled")]
    InvalidPlaylist(String),

    #[error("Authentication error: {0}")]
    Auth(#[from] core_auth::AuthError),

    #[error("Resync error: {0}")]
    Resync(#[from] core_resync::ResyncError),

    #[error("Provider error: {0}")]
    Provider(#[from] BridgeError),
}

impl ServiceError {
    /// Whether the playlist may have been left partially rewritten
    pub fn remote_modified(&self) -> bool {
        matches!(self, ServiceError::Resync(e) if e.remote_modified())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
