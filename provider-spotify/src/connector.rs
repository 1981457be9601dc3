//! Spotify Web API connector implementation
//!
//! Implements the `PlaylistProvider` trait for the Spotify Web API v1.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::playlist::{PlaylistEntry, PlaylistPage, PlaylistProvider, PlaylistSummary};
use core_auth::{validate_user_id, SessionManager};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SpotifyError};
use crate::types::{
    AddTracksBody, CurrentUser, ErrorEnvelope, PlaylistTracksPage, PlaylistsPage, RemoveTracksBody,
    ReorderBody, UriRef,
};

/// Spotify Web API base URL
const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";

/// Maximum playlists per listing page (Spotify API limit)
const MAX_PLAYLISTS_PAGE_LIMIT: u32 = 50;

/// Fallback when a 429 response carries no usable `Retry-After`
const DEFAULT_RETRY_AFTER_SECONDS: u64 = 1;

/// Connector configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyConfig {
    pub api_base: String,
    pub request_timeout: Duration,
    /// Playlists requested per listing page (1..=50)
    pub playlists_page_limit: u32,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            api_base: SPOTIFY_API_BASE.to_string(),
            request_timeout: Duration::from_secs(30),
            playlists_page_limit: MAX_PLAYLISTS_PAGE_LIMIT,
        }
    }
}

impl SpotifyConfig {
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_playlists_page_limit(mut self, limit: u32) -> Self {
        self.playlists_page_limit = limit.clamp(1, MAX_PLAYLISTS_PAGE_LIMIT);
        self
    }
}

/// Spotify Web API connector
///
/// # Features
///
/// - Paginated playlist reads that keep unavailable entries in place
/// - Batch remove by URI, batch append, single-item moves
/// - Listing of every playlist the user owns or follows
/// - Bearer token from `SessionManager`, dropped on 401
///
/// Requests are never retried: a 429 surfaces as `BridgeError::RateLimited`
/// and any other non-success status as `BridgeError::Api` with the status
/// code kept.
///
/// # Example
///
/// ```ignore
/// use provider_spotify::SpotifyConnector;
/// use bridge_traits::playlist::PlaylistProvider;
///
/// let connector = SpotifyConnector::new(http_client, session);
/// let page = connector.list_playlist_page("37i9dQZF1DXcBWIGoYBM5M", 0, 100).await?;
/// ```
pub struct SpotifyConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// Source of the bearer token
    session: Arc<SessionManager>,

    config: SpotifyConfig,
}

impl SpotifyConnector {
    pub fn new(http_client: Arc<dyn HttpClient>, session: Arc<SessionManager>) -> Self {
        Self::with_config(http_client, session, SpotifyConfig::default())
    }

    pub fn with_config(
        http_client: Arc<dyn HttpClient>,
        session: Arc<SessionManager>,
        config: SpotifyConfig,
    ) -> Self {
        Self {
            http_client,
            session,
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn tracks_url(&self, playlist_id: &str) -> String {
        self.url(&format!(
            "/playlists/{}/tracks",
            urlencoding::encode(playlist_id)
        ))
    }

    /// Attach the bearer token, send once, and map non-success statuses.
    #[instrument(skip(self, request), fields(method = ?request.method, url = %request.url))]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let token = self.session.request_token().await?;
        let request = request
            .bearer_token(token.secret())
            .header("Accept", "application/json")
            .timeout(self.config.request_timeout);

        let response = self.http_client.execute(request).await?;

        if response.is_success() {
            debug!(status = response.status, "API request succeeded");
            return Ok(response);
        }

        Err(self.status_error(&response).await)
    }

    async fn status_error(&self, response: &HttpResponse) -> SpotifyError {
        let message = error_message(response);

        match response.status {
            401 => {
                warn!("Access token rejected: {}", message);
                self.session.invalidate().await;
                SpotifyError::Unauthorized(message)
            }
            429 => {
                let retry_after_seconds = response
                    .header("Retry-After")
                    .and_then(|value| value.trim().parse().ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECONDS);
                warn!(retry_after_seconds, "Rate limited");
                SpotifyError::RateLimitExceeded {
                    retry_after_seconds,
                }
            }
            status_code => {
                warn!(status_code, "API request failed: {}", message);
                SpotifyError::ApiError {
                    status_code,
                    message,
                }
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        let response = self.send(HttpRequest::new(HttpMethod::Get, url)).await?;
        serde_json::from_slice(&response.body)
            .map_err(|e| SpotifyError::ParseError(e.to_string()))
    }

    async fn fetch_page(&self, playlist_id: &str, offset: u32, limit: u32) -> Result<PlaylistPage> {
        let url = format!(
            "{}?offset={}&limit={}",
            self.tracks_url(playlist_id),
            offset,
            limit
        );
        let page: PlaylistTracksPage = self.get_json(url).await?;

        Ok(PlaylistPage {
            items: page.items.into_iter().map(PlaylistEntry::from).collect(),
            declared_total: page.total,
        })
    }

    async fn fetch_user_playlists(&self, user_id: &str) -> Result<Vec<PlaylistSummary>> {
        let user_id = validate_user_id(user_id)?;
        let limit = self.config.playlists_page_limit;
        let mut playlists = Vec::new();
        let mut offset = 0u32;

        loop {
            let url = self.url(&format!(
                "/users/{}/playlists?limit={}&offset={}",
                urlencoding::encode(user_id),
                limit,
                offset
            ));
            let page: PlaylistsPage = self.get_json(url).await?;
            let received = page.items.len();

            playlists.extend(page.items.into_iter().map(PlaylistSummary::from));

            if page.next.is_none() || received == 0 {
                break;
            }
            offset += limit;
        }

        Ok(playlists)
    }
}

/// Extract `error.message` from a Spotify error body, falling back to the
/// raw body text.
fn error_message(response: &HttpResponse) -> String {
    serde_json::from_slice::<ErrorEnvelope>(&response.body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(&response.body).to_string())
}

#[async_trait]
impl PlaylistProvider for SpotifyConnector {
    #[instrument(skip(self))]
    async fn list_playlist_page(
        &self,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> BridgeResult<PlaylistPage> {
        let page = self.fetch_page(playlist_id, offset, limit).await?;
        debug!(items = page.items.len(), total = ?page.declared_total, "Read playlist page");
        Ok(page)
    }

    #[instrument(skip(self, uris), fields(count = uris.len()))]
    async fn remove_items(&self, playlist_id: &str, uris: &[String]) -> BridgeResult<()> {
        let body = RemoveTracksBody {
            tracks: uris.iter().map(|uri| UriRef { uri: uri.as_str() }).collect(),
        };
        let request = HttpRequest::new(HttpMethod::Delete, self.tracks_url(playlist_id)).json(&body)?;
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self, uris), fields(count = uris.len()))]
    async fn add_items(&self, playlist_id: &str, uris: &[String]) -> BridgeResult<()> {
        let request = HttpRequest::new(HttpMethod::Post, self.tracks_url(playlist_id))
            .json(&AddTracksBody { uris })?;
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn move_item(
        &self,
        playlist_id: &str,
        from: usize,
        insert_before: usize,
    ) -> BridgeResult<()> {
        let request = HttpRequest::new(HttpMethod::Put, self.tracks_url(playlist_id)).json(
            &ReorderBody {
                range_start: from,
                insert_before,
            },
        )?;
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn current_user_id(&self) -> BridgeResult<String> {
        let user: CurrentUser = self.get_json(self.url("/me")).await?;
        Ok(user.id)
    }

    #[instrument(skip(self))]
    async fn list_user_playlists(&self, user_id: &str) -> BridgeResult<Vec<PlaylistSummary>> {
        info!("Listing playlists");
        let playlists = self.fetch_user_playlists(user_id).await?;
        info!("Listed {} playlists", playlists.len());
        Ok(playlists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use bridge_traits::time::SystemClock;
    use bytes::Bytes;
    use core_auth::{AccessToken, SessionConfig, StaticTokenProvider};
    use core_runtime::events::EventBus;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn session() -> Arc<SessionManager> {
        let token = AccessToken::expiring_in(&SystemClock, "test_token", 3600, Vec::new());
        Arc::new(SessionManager::new(
            Arc::new(StaticTokenProvider::new(token)),
            Arc::new(SystemClock),
            SessionConfig::default(),
            EventBus::default(),
        ))
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn connector(mock_http: MockHttpClient) -> SpotifyConnector {
        SpotifyConnector::new(Arc::new(mock_http), session())
    }

    fn body_json(request: &HttpRequest) -> serde_json::Value {
        serde_json::from_slice(request.body.as_ref().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_list_playlist_page_success() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Get
                    && req.url
                        == "https://api.spotify.com/v1/playlists/p1/tracks?offset=100&limit=100"
                    && req.headers.get("Authorization") == Some(&"Bearer test_token".to_string())
            })
            .times(1)
            .returning(|_| {
                Ok(response(
                    200,
                    r#"{"items": [
                        {"track": {"uri": "spotify:track:a"}},
                        {"track": null}
                    ], "total": 102}"#,
                ))
            });

        let page = connector(mock_http)
            .list_playlist_page("p1", 100, 100)
            .await
            .unwrap();

        assert_eq!(page.declared_total, Some(102));
        assert_eq!(page.items[0], PlaylistEntry::available("spotify:track:a"));
        assert_eq!(page.items[1], PlaylistEntry::unavailable());
    }

    #[tokio::test]
    async fn test_remove_items_sends_track_objects() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Delete
                    && body_json(req)
                        == serde_json::json!({"tracks": [
                            {"uri": "spotify:track:a"},
                            {"uri": "spotify:track:b"}
                        ]})
            })
            .times(1)
            .returning(|_| Ok(response(200, r#"{"snapshot_id": "abc"}"#)));

        connector(mock_http)
            .remove_items(
                "p1",
                &["spotify:track:a".to_string(), "spotify:track:b".to_string()],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_add_items_and_move_item_bodies() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Post
                    && body_json(req) == serde_json::json!({"uris": ["spotify:track:a"]})
            })
            .times(1)
            .returning(|_| Ok(response(201, r#"{"snapshot_id": "abc"}"#)));
        mock_http
            .expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Put
                    && body_json(req) == serde_json::json!({"range_start": 0, "insert_before": 5})
            })
            .times(1)
            .returning(|_| Ok(response(200, r#"{"snapshot_id": "def"}"#)));

        let connector = connector(mock_http);
        connector
            .add_items("p1", &["spotify:track:a".to_string()])
            .await
            .unwrap();
        connector.move_item("p1", 0, 5).await.unwrap();
    }

    #[tokio::test]
    async fn test_token_inside_expiry_buffer_still_authorizes_requests() {
        use bridge_traits::time::FixedClock;
        use chrono::{TimeZone, Utc};

        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ));
        let token = AccessToken::expiring_in(clock.as_ref(), "short_lived", 120, Vec::new());
        let session = Arc::new(SessionManager::new(
            Arc::new(StaticTokenProvider::new(token)),
            clock.clone(),
            SessionConfig::default(),
            EventBus::default(),
        ));

        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .withf(|req| {
                req.headers.get("Authorization") == Some(&"Bearer short_lived".to_string())
            })
            .times(2)
            .returning(|_| Ok(response(200, r#"{"snapshot_id": "abc"}"#)));

        let connector = SpotifyConnector::new(Arc::new(mock_http), Arc::clone(&session));
        connector
            .remove_items("p1", &["spotify:track:a".to_string()])
            .await
            .unwrap();

        clock.advance(chrono::Duration::seconds(65));

        connector
            .add_items("p1", &["spotify:track:a".to_string()])
            .await
            .unwrap();
        assert!(session.valid_token().await.is_err());
    }

    #[tokio::test]
    async fn test_unauthorized_invalidates_session() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().returning(|_| {
            Ok(response(
                401,
                r#"{"error": {"status": 401, "message": "The access token expired"}}"#,
            ))
        });

        let session = session();
        let connector = SpotifyConnector::new(Arc::new(mock_http), Arc::clone(&session));
        let err = connector.current_user_id().await.unwrap_err();

        match err {
            BridgeError::Unauthorized(message) => assert_eq!(message, "The access token expired"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(session.seconds_remaining().await, None);
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_retried() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|_| {
            let mut resp = response(429, "");
            resp.headers.insert("Retry-After".to_string(), "7".to_string());
            Ok(resp)
        });

        let err = connector(mock_http)
            .add_items("p1", &["spotify:track:a".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BridgeError::RateLimited {
                retry_after_seconds: 7
            }
        ));
    }

    #[tokio::test]
    async fn test_server_error_keeps_status() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(502, "Bad gateway")));

        let err = connector(mock_http)
            .remove_items("p1", &["spotify:track:a".to_string()])
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(502));
        assert!(err.to_string().contains("Bad gateway"));
    }

    #[tokio::test]
    async fn test_list_user_playlists_walks_pages() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .withf(|req| req.url.ends_with("/users/listener/playlists?limit=2&offset=0"))
            .times(1)
            .returning(|_| {
                Ok(response(
                    200,
                    r#"{"items": [
                        {"id": "p1", "name": "One", "tracks": {"total": 3}},
                        {"id": "p2", "name": "Two", "tracks": {"total": 250}}
                    ], "next": "https://api.spotify.com/v1/users/listener/playlists?offset=2&limit=2", "total": 3}"#,
                ))
            });
        mock_http
            .expect_execute()
            .withf(|req| req.url.ends_with("/users/listener/playlists?limit=2&offset=2"))
            .times(1)
            .returning(|_| {
                Ok(response(
                    200,
                    r#"{"items": [{"id": "p3", "name": "Three", "tracks": null}], "next": null, "total": 3}"#,
                ))
            });

        let connector = SpotifyConnector::with_config(
            Arc::new(mock_http),
            session(),
            SpotifyConfig::default().with_playlists_page_limit(2),
        );
        let playlists = connector.list_user_playlists(" listener ").await.unwrap();

        assert_eq!(
            playlists.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            vec!["p1", "p2", "p3"]
        );
        assert!(!playlists[2].is_valid());
    }

    #[tokio::test]
    async fn test_blank_user_id_is_rejected_without_request() {
        let mock_http = MockHttpClient::new();
        let err = connector(mock_http)
            .list_user_playlists("  ")
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
    }
}
