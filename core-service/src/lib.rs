//! Playlist shuffle service façade and bootstrap helpers.
//!
//! This crate wires a playlist provider, a session and the resync engine into
//! one handle a host program can drive: list the user's playlists, pick one,
//! shuffle it, and report how long the session has left. Desktop programs
//! enable the `desktop-shims` feature (which depends on `bridge-desktop`) and
//! call [`bootstrap_desktop`]; tests and other hosts build a
//! [`ShuffleService`] from their own [`PlaylistProvider`].

pub mod error;

pub use error::{Result, ServiceError};

pub use bridge_traits::PlaylistSummary;
pub use core_auth::{AccessToken, SessionConfig, SessionManager, StaticTokenProvider, TokenProvider};
pub use core_resync::{CollectionRef, ResyncError, ResyncPhase, ResyncSummary};
pub use core_runtime::config::ResyncConfig;
pub use core_runtime::events::{CoreEvent, EventBus, EventStream, ResyncEvent};
pub use provider_spotify::SpotifyConfig;

use bridge_traits::PlaylistProvider;
use core_resync::{ResyncJob, SyncOrchestrator};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Everything needed to stand up a desktop service.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub resync: ResyncConfig,
    pub session: SessionConfig,
    pub spotify: SpotifyConfig,
}

/// Primary façade exposed to host programs.
pub struct ShuffleService {
    provider: Arc<dyn PlaylistProvider>,
    session: Arc<SessionManager>,
    orchestrator: SyncOrchestrator,
    event_bus: EventBus,
    /// Result of the most recent `list_playlists`, indexed by `playlist_at`
    listing: RwLock<Vec<PlaylistSummary>>,
}

impl ShuffleService {
    /// Create a service from explicit parts.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Resync` if `config` fails validation.
    pub fn new(
        provider: Arc<dyn PlaylistProvider>,
        session: Arc<SessionManager>,
        config: ResyncConfig,
        event_bus: EventBus,
    ) -> Result<Self> {
        let orchestrator = SyncOrchestrator::new(Arc::clone(&provider), config, event_bus.clone())?;
        Ok(Self {
            provider,
            session,
            orchestrator,
            event_bus,
            listing: RwLock::new(Vec::new()),
        })
    }

    /// Stream of auth and resync events.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    /// Every playlist of the current user, across all listing pages.
    ///
    /// Playlists without a track summary are included and flagged by
    /// [`PlaylistSummary::is_valid`].
    #[instrument(skip(self))]
    pub async fn list_playlists(&self) -> Result<Vec<PlaylistSummary>> {
        self.session.valid_token().await?;
        let user_id = self.provider.current_user_id().await?;
        let playlists = self.provider.list_user_playlists(&user_id).await?;

        let invalid = playlists.iter().filter(|p| !p.is_valid()).count();
        if invalid > 0 {
            warn!(invalid, "Some playlists have no track summary");
        }
        info!(count = playlists.len(), "Listed playlists");

        *self.listing.write().await = playlists.clone();
        Ok(playlists)
    }

    /// Entry `index` (zero-based) of the last listing.
    pub async fn playlist_at(&self, index: usize) -> Result<PlaylistSummary> {
        let listing = self.listing.read().await;
        listing
            .get(index)
            .cloned()
            .ok_or(ServiceError::InvalidSelection {
                index,
                available: listing.len(),
            })
    }

    /// Shuffle entry `index` of the last listing.
    pub async fn shuffle_selection(&self, index: usize) -> Result<ResyncSummary> {
        let playlist = self.playlist_at(index).await?;
        if !playlist.is_valid() {
            return Err(ServiceError::InvalidPlaylist(playlist.id));
        }
        info!(name = %playlist.name, "Shuffling selected playlist");
        self.shuffle_playlist(&playlist.id).await
    }

    /// Shuffle a playlist named by ID or `spotify:playlist:` URI.
    pub async fn shuffle_playlist(&self, playlist: &str) -> Result<ResyncSummary> {
        self.shuffle_playlist_with_cancellation(playlist, CancellationToken::new())
            .await
    }

    /// Shuffle a playlist, stopping at a safe phase boundary if `cancel`
    /// fires.
    #[instrument(skip(self, cancel))]
    pub async fn shuffle_playlist_with_cancellation(
        &self,
        playlist: &str,
        cancel: CancellationToken,
    ) -> Result<ResyncSummary> {
        let collection = CollectionRef::parse(playlist)?;
        self.session.valid_token().await?;
        Ok(self
            .orchestrator
            .resync_with_cancellation(&collection, cancel)
            .await?)
    }

    /// Seconds left on the session's token, obtaining one first if needed.
    pub async fn token_seconds_remaining(&self) -> Result<i64> {
        let token = self.session.valid_token().await?;
        Ok(self
            .session
            .seconds_remaining()
            .await
            .unwrap_or_else(|| token.seconds_remaining(&bridge_traits::SystemClock)))
    }

    /// Record of the most recent shuffle.
    pub async fn last_job(&self) -> Option<ResyncJob> {
        self.orchestrator.last_job().await
    }
}

/// Build a service backed by `reqwest` and the Spotify Web API.
///
/// ```no_run
/// # async fn example() -> core_service::Result<()> {
/// use bridge_traits::SystemClock;
/// use core_service::{bootstrap_desktop, AccessToken, ServiceConfig, StaticTokenProvider};
/// use std::sync::Arc;
///
/// let token = AccessToken::expiring_in(&SystemClock, "BQDx0...", 3600, Vec::new());
/// let service = bootstrap_desktop(
///     Arc::new(StaticTokenProvider::new(token)),
///     ServiceConfig::default(),
/// )?;
/// let playlists = service.list_playlists().await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop(
    token_provider: Arc<dyn TokenProvider>,
    config: ServiceConfig,
) -> Result<ShuffleService> {
    let http_client = bridge_desktop::ReqwestHttpClient::with_timeout(
        config.spotify.request_timeout,
    )
    .map_err(|err| ServiceError::InitializationFailed(err.to_string()))?;

    let event_bus = EventBus::default();
    let session = Arc::new(SessionManager::new(
        token_provider,
        Arc::new(bridge_traits::SystemClock),
        config.session,
        event_bus.clone(),
    ));
    let provider = Arc::new(provider_spotify::SpotifyConnector::with_config(
        Arc::new(http_client),
        Arc::clone(&session),
        config.spotify,
    ));

    ShuffleService::new(provider, session, config.resync, event_bus)
}
