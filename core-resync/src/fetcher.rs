//! # Page Fetcher
//!
//! Materializes a whole playlist from the provider's paginated read endpoint.
//!
//! The first page is always read, even for an empty or unsized playlist; its
//! declared total decides how many more pages follow. The fetch is
//! all-or-nothing: a failed page discards everything read so far, so a
//! shuffle never runs on a partial view.
//!
//! The declared total is only trusted to bound the number of reads. Storage
//! grows with the entries actually returned, and an empty page ends the
//! fetch early when the provider over-reports.

use crate::error::{ResyncError, Result};
use crate::job::{CollectionRef, ResyncPhase};
use bridge_traits::{BridgeError, PlaylistEntry, PlaylistProvider};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// One playlist entry together with its position at fetch time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    pub uri: Option<String>,
    pub is_available: bool,
    /// 0-based index in the playlist when it was read
    pub position: usize,
}

/// Every entry of a playlist, in playlist order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchedPlaylist {
    pub items: Vec<RemoteItem>,
    pub declared_total: Option<u32>,
    pub pages_fetched: usize,
}

pub struct PageFetcher {
    provider: Arc<dyn PlaylistProvider>,
    page_size: usize,
}

impl PageFetcher {
    pub fn new(provider: Arc<dyn PlaylistProvider>, page_size: usize) -> Self {
        Self {
            provider,
            page_size: page_size.max(1),
        }
    }

    /// Number of page reads for a declared total; never less than one.
    pub fn page_count(declared_total: Option<u32>, page_size: usize) -> usize {
        let total = declared_total.unwrap_or(0) as usize;
        total.div_ceil(page_size.max(1)).max(1)
    }

    /// Read every page of `collection`.
    ///
    /// # Errors
    ///
    /// - `ResyncError::Auth` if the provider rejects the session
    /// - `ResyncError::Fetch` for any other failed page read, carrying the
    ///   1-based page index and its offset
    #[instrument(skip(self, collection), fields(collection = %collection, page_size = self.page_size))]
    pub async fn fetch_all(&self, collection: &CollectionRef) -> Result<FetchedPlaylist> {
        let first = self.read_page(collection, 0).await?;
        let declared_total = first.declared_total;
        let page_count = Self::page_count(declared_total, self.page_size);

        debug!(?declared_total, page_count, "First page read");

        let mut items: Vec<RemoteItem> = Vec::with_capacity(first.items.len());
        let mut pages_fetched = 1;
        let mut exhausted = first.items.is_empty();
        append(&mut items, first.items);

        for page_index in 1..page_count {
            if exhausted {
                warn!(
                    ?declared_total,
                    pages_fetched,
                    items = items.len(),
                    "Provider returned an empty page before the declared total; stopping"
                );
                break;
            }
            let page = self.read_page(collection, page_index).await?;
            pages_fetched += 1;
            exhausted = page.items.is_empty();
            append(&mut items, page.items);
        }

        info!(
            items = items.len(),
            pages = pages_fetched,
            "Fetched playlist"
        );

        Ok(FetchedPlaylist {
            items,
            declared_total,
            pages_fetched,
        })
    }

    async fn read_page(
        &self,
        collection: &CollectionRef,
        page_index: usize,
    ) -> Result<bridge_traits::PlaylistPage> {
        let offset = u32::try_from(page_index * self.page_size).unwrap_or(u32::MAX);
        let limit = u32::try_from(self.page_size).unwrap_or(u32::MAX);

        self.provider
            .list_playlist_page(collection.id(), offset, limit)
            .await
            .map_err(|source| fetch_error(page_index + 1, offset, source))
    }
}

fn append(items: &mut Vec<RemoteItem>, entries: Vec<PlaylistEntry>) {
    let start = items.len();
    items.extend(
        entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| RemoteItem {
                uri: entry.uri,
                is_available: entry.is_available,
                position: start + i,
            }),
    );
}

fn fetch_error(page_index: usize, offset: u32, source: BridgeError) -> ResyncError {
    if source.is_unauthorized() {
        ResyncError::Auth {
            phase: ResyncPhase::Fetching,
            remote_modified: false,
            message: source.to_string(),
        }
    } else {
        ResyncError::Fetch {
            page_index,
            offset,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockProvider;
    use bridge_traits::PlaylistPage;
    use mockall::predicate::eq;

    fn page(start: usize, len: usize, total: u32) -> PlaylistPage {
        PlaylistPage {
            items: (start..start + len)
                .map(|i| PlaylistEntry::available(format!("spotify:track:{i}")))
                .collect(),
            declared_total: Some(total),
        }
    }

    fn collection() -> CollectionRef {
        CollectionRef::parse("p1").unwrap()
    }

    #[test]
    fn test_page_count() {
        assert_eq!(PageFetcher::page_count(Some(250), 100), 3);
        assert_eq!(PageFetcher::page_count(Some(200), 100), 2);
        assert_eq!(PageFetcher::page_count(Some(1), 100), 1);
        assert_eq!(PageFetcher::page_count(Some(0), 100), 1);
        assert_eq!(PageFetcher::page_count(None, 100), 1);
    }

    #[tokio::test]
    async fn test_reads_pages_at_increasing_offsets() {
        let mut provider = MockProvider::new();
        for (offset, len) in [(0u32, 100usize), (100, 100), (200, 50)] {
            provider
                .expect_list_playlist_page()
                .with(eq("p1"), eq(offset), eq(100u32))
                .times(1)
                .returning(move |_, _, _| Ok(page(offset as usize, len, 250)));
        }

        let fetcher = PageFetcher::new(Arc::new(provider), 100);
        let fetched = fetcher.fetch_all(&collection()).await.unwrap();

        assert_eq!(fetched.pages_fetched, 3);
        assert_eq!(fetched.items.len(), 250);
        assert_eq!(fetched.declared_total, Some(250));
        for (i, item) in fetched.items.iter().enumerate() {
            assert_eq!(item.position, i);
            assert_eq!(item.uri.as_deref(), Some(format!("spotify:track:{i}").as_str()));
        }
    }

    #[tokio::test]
    async fn test_empty_playlist_reads_once() {
        let mut provider = MockProvider::new();
        provider
            .expect_list_playlist_page()
            .times(1)
            .returning(|_, _, _| Ok(PlaylistPage::default()));

        let fetcher = PageFetcher::new(Arc::new(provider), 100);
        let fetched = fetcher.fetch_all(&collection()).await.unwrap();

        assert!(fetched.items.is_empty());
        assert_eq!(fetched.pages_fetched, 1);
    }

    #[tokio::test]
    async fn test_huge_declared_total_on_empty_page() {
        let mut provider = MockProvider::new();
        provider
            .expect_list_playlist_page()
            .times(1)
            .returning(|_, _, _| {
                Ok(PlaylistPage {
                    items: Vec::new(),
                    declared_total: Some(u32::MAX),
                })
            });

        let fetcher = PageFetcher::new(Arc::new(provider), 100);
        let fetched = fetcher.fetch_all(&collection()).await.unwrap();

        assert!(fetched.items.is_empty());
        assert_eq!(fetched.pages_fetched, 1);
        assert_eq!(fetched.declared_total, Some(u32::MAX));
    }

    #[tokio::test]
    async fn test_over_reported_total_stops_at_first_empty_page() {
        let mut provider = MockProvider::new();
        provider
            .expect_list_playlist_page()
            .with(eq("p1"), eq(0u32), eq(100u32))
            .times(1)
            .returning(|_, _, _| Ok(page(0, 100, u32::MAX)));
        provider
            .expect_list_playlist_page()
            .with(eq("p1"), eq(100u32), eq(100u32))
            .times(1)
            .returning(|_, _, _| Ok(page(100, 30, u32::MAX)));
        provider
            .expect_list_playlist_page()
            .with(eq("p1"), eq(200u32), eq(100u32))
            .times(1)
            .returning(|_, _, _| Ok(page(200, 0, u32::MAX)));

        let fetcher = PageFetcher::new(Arc::new(provider), 100);
        let fetched = fetcher.fetch_all(&collection()).await.unwrap();

        assert_eq!(fetched.items.len(), 130);
        assert_eq!(fetched.pages_fetched, 3);
        assert_eq!(fetched.items[129].position, 129);
    }

    #[tokio::test]
    async fn test_failed_page_discards_everything() {
        let mut provider = MockProvider::new();
        provider
            .expect_list_playlist_page()
            .with(eq("p1"), eq(0u32), eq(100u32))
            .returning(|_, _, _| Ok(page(0, 100, 150)));
        provider
            .expect_list_playlist_page()
            .with(eq("p1"), eq(100u32), eq(100u32))
            .returning(|_, _, _| {
                Err(BridgeError::Api {
                    status_code: 500,
                    message: "Internal".to_string(),
                })
            });

        let fetcher = PageFetcher::new(Arc::new(provider), 100);
        let err = fetcher.fetch_all(&collection()).await.unwrap_err();

        assert!(matches!(
            err,
            ResyncError::Fetch {
                page_index: 2,
                offset: 100,
                ..
            }
        ));
        assert_eq!(err.status_code(), Some(500));
        assert!(!err.remote_modified());
    }

    #[tokio::test]
    async fn test_unauthorized_becomes_auth_error() {
        let mut provider = MockProvider::new();
        provider
            .expect_list_playlist_page()
            .returning(|_, _, _| Err(BridgeError::Unauthorized("expired".to_string())));

        let fetcher = PageFetcher::new(Arc::new(provider), 100);
        let err = fetcher.fetch_all(&collection()).await.unwrap_err();

        assert!(matches!(
            err,
            ResyncError::Auth {
                phase: ResyncPhase::Fetching,
                remote_modified: false,
                ..
            }
        ));
    }
}
