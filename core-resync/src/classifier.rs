//! # Item Classifier
//!
//! Splits fetched entries into those that can be removed and re-added by URI
//! and those that can only be moved by position.
//!
//! Entries are visited from the last position to the first. The resulting
//! removable order is the initial order handed to the shuffle, so it must be
//! reproduced exactly for seeded runs to match.

use crate::fetcher::RemoteItem;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Catalog item addressable by URI
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemovableItem {
    pub identifier: String,
}

/// Item that can only be repositioned, tracked by where it was at fetch time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonRemovableItem {
    pub original_position: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// In reverse fetch order
    pub removable: Vec<RemovableItem>,
    /// In reverse fetch order
    pub non_removable: Vec<NonRemovableItem>,
    /// Unavailable entries left out of both lists
    pub skipped_count: usize,
}

impl Classification {
    /// Number of entries this classification accounts for
    pub fn total(&self) -> usize {
        self.removable.len() + self.non_removable.len() + self.skipped_count
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.removable
            .iter()
            .map(|item| item.identifier.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ItemClassifier;

impl ItemClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, items: &[RemoteItem]) -> Classification {
        let mut classification = Classification::default();

        for item in items.iter().rev() {
            if !item.is_available {
                warn!(position = item.position, "Skipping unavailable item");
                classification.skipped_count += 1;
                continue;
            }

            match item.uri.as_deref() {
                Some(uri) if !is_local(uri) => {
                    classification.removable.push(RemovableItem {
                        identifier: uri.to_string(),
                    });
                }
                _ => {
                    warn!(
                        position = item.position,
                        uri = item.uri.as_deref().unwrap_or(""),
                        "Local item cannot be re-added; it will be moved instead"
                    );
                    classification.non_removable.push(NonRemovableItem {
                        original_position: item.position,
                    });
                }
            }
        }

        debug!(
            removable = classification.removable.len(),
            non_removable = classification.non_removable.len(),
            skipped = classification.skipped_count,
            "Classified items"
        );

        classification
    }
}

fn is_local(uri: &str) -> bool {
    uri.to_ascii_lowercase().contains("local")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(position: usize, uri: Option<&str>, is_available: bool) -> RemoteItem {
        RemoteItem {
            uri: uri.map(str::to_string),
            is_available,
            position,
        }
    }

    #[test]
    fn test_reverse_order_is_kept() {
        let items = vec![
            item(0, Some("spotify:track:a"), true),
            item(1, Some("spotify:track:b"), true),
            item(2, Some("spotify:episode:c"), true),
        ];

        let classification = ItemClassifier::new().classify(&items);

        assert_eq!(
            classification.identifiers(),
            vec!["spotify:episode:c", "spotify:track:b", "spotify:track:a"]
        );
        assert!(classification.non_removable.is_empty());
        assert_eq!(classification.skipped_count, 0);
    }

    #[test]
    fn test_mixed_playlist_partitions_every_item() {
        let items = vec![
            item(0, Some("spotify:local:Artist:Album:Song:215"), true),
            item(1, None, false),
            item(2, Some("spotify:track:a"), true),
            item(3, Some("spotify:track:gone"), false),
            item(4, Some("spotify:track:b"), true),
        ];

        let classification = ItemClassifier::new().classify(&items);

        assert_eq!(classification.total(), items.len());
        assert_eq!(
            classification.identifiers(),
            vec!["spotify:track:b", "spotify:track:a"]
        );
        assert_eq!(
            classification.non_removable,
            vec![NonRemovableItem {
                original_position: 0
            }]
        );
        assert_eq!(classification.skipped_count, 2);
    }

    #[test]
    fn test_local_match_ignores_case() {
        let items = vec![
            item(0, Some("spotify:LOCAL:x"), true),
            item(1, Some("spotify:track:Local1"), true),
        ];

        let classification = ItemClassifier::new().classify(&items);

        assert!(classification.removable.is_empty());
        assert_eq!(classification.non_removable.len(), 2);
        assert_eq!(classification.non_removable[0].original_position, 1);
    }

    #[test]
    fn test_available_item_without_uri_is_non_removable() {
        let classification = ItemClassifier::new().classify(&[item(0, None, true)]);
        assert_eq!(classification.non_removable.len(), 1);
        assert_eq!(classification.skipped_count, 0);
    }

    #[test]
    fn test_empty_input() {
        let classification = ItemClassifier::new().classify(&[]);
        assert_eq!(classification, Classification::default());
        assert_eq!(classification.total(), 0);
    }
}
