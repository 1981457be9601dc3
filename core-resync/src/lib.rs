//! # Playlist Resync Engine
//!
//! Rewrites a remote playlist into a uniformly random order using only the
//! provider's capped, rate-limited batch endpoints.
//!
//! ## Overview
//!
//! The provider pages every read and caps every mutation at 100 items, so a
//! resync is a sequence of small, paced remote calls:
//!
//! 1. Read every page of the playlist (`fetcher`)
//! 2. Split entries into removable, local-only and skipped (`classifier`)
//! 3. Draw a uniform permutation of the removable URIs (`shuffle`)
//! 4. Remove the old order and append the new one in chunks (`batch`)
//! 5. Scatter local-only entries with single moves (`reorder`)
//!
//! [`SyncOrchestrator`] sequences the phases through the [`ResyncJob`] state
//! machine and owns the consistency contract: nothing is mutated until the
//! permutation is verified, and a failure after the first successful remove
//! is reported with [`ResyncError::remote_modified`] set.
//!
//! ## Components
//!
//! - **Page Fetcher** (`fetcher`): all-or-nothing paginated read
//! - **Item Classifier** (`classifier`): reverse-order partition of entries
//! - **Shuffle Engine** (`shuffle`): unbiased pool-draw permutation
//! - **Batch Mutator** (`batch`): chunked, paced remove/add
//! - **Local Item Reorderer** (`reorder`): move-based scatter of local entries
//! - **Resync Job** (`job`): phase state machine with validated transitions
//! - **Sync Orchestrator** (`orchestrator`): runs one resync end to end

pub mod batch;
pub mod classifier;
pub mod error;
pub mod fetcher;
pub mod job;
pub mod orchestrator;
pub mod reorder;
pub mod shuffle;

#[cfg(test)]
mod test_support;

pub use batch::{BatchMutator, BatchOperation, BatchOutcome, BatchPlan};
pub use classifier::{Classification, ItemClassifier, NonRemovableItem, RemovableItem};
pub use error::{ResyncError, Result};
pub use fetcher::{FetchedPlaylist, PageFetcher, RemoteItem};
pub use job::{CollectionRef, ResyncJob, ResyncJobId, ResyncPhase, ResyncProgress};
pub use orchestrator::{ResyncSummary, SyncOrchestrator};
pub use reorder::{LocalItemReorderer, ReorderOutcome};
pub use shuffle::{Permutation, ShuffleEngine};
