use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{PlaylistPage, PlaylistProvider, PlaylistSummary};
use mockall::mock;

mock! {
    pub Provider {}

    #[async_trait]
    impl PlaylistProvider for Provider {
        async fn list_playlist_page(&self, playlist_id: &str, offset: u32, limit: u32) -> BridgeResult<PlaylistPage>;
        async fn remove_items(&self, playlist_id: &str, uris: &[String]) -> BridgeResult<()>;
        async fn add_items(&self, playlist_id: &str, uris: &[String]) -> BridgeResult<()>;
        async fn move_item(&self, playlist_id: &str, from: usize, insert_before: usize) -> BridgeResult<()>;
        async fn current_user_id(&self) -> BridgeResult<String>;
        async fn list_user_playlists(&self, user_id: &str) -> BridgeResult<Vec<PlaylistSummary>>;
    }
}

pub fn uris(range: std::ops::Range<usize>) -> Vec<String> {
    range.map(|i| format!("spotify:track:{i}")).collect()
}
