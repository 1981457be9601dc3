//! # Sync Orchestrator
//!
//! Runs one playlist resync end to end.
//!
//! ## Workflow
//!
//! 1. Read every page of the playlist
//! 2. Classify entries into removable, local-only and skipped
//! 3. Shuffle the removable URIs and verify the result covers them all
//! 4. Remove the removable URIs in capped, paced chunks
//! 5. Pause, then append the shuffled URIs in capped, paced chunks
//! 6. Pause, then scatter local-only entries with single moves
//!
//! Every phase runs to completion before the next one starts, and every
//! remote call is awaited (pacing included) before the next is issued.
//!
//! ## Risk window
//!
//! From the first accepted remove call until the last add call the remote
//! playlist is missing items. A failure inside that window is returned with
//! [`ResyncError::remote_modified`] set and logged at error level; re-running
//! the resync re-reads the playlist and rewrites whatever is left.
//!
//! ## Cancellation
//!
//! A [`CancellationToken`] is honoured before `Removing` and before
//! `ReorderingLocal` only. Remote calls are never interrupted.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_resync::{CollectionRef, SyncOrchestrator};
//! use core_runtime::{config::ResyncConfig, events::EventBus};
//!
//! let orchestrator = SyncOrchestrator::new(provider, ResyncConfig::default(), EventBus::default())?;
//! let summary = orchestrator
//!     .resync(&CollectionRef::parse("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M")?)
//!     .await?;
//! println!("{} tracks shuffled", summary.added_count);
//! ```

use crate::batch::BatchMutator;
use crate::classifier::ItemClassifier;
use crate::error::{ResyncError, Result};
use crate::fetcher::PageFetcher;
use crate::job::{CollectionRef, ResyncJob, ResyncJobId, ResyncPhase};
use crate::reorder::{LocalItemReorderer, ReorderOutcome};
use crate::shuffle::ShuffleEngine;
use bridge_traits::PlaylistProvider;
use core_runtime::config::ResyncConfig;
use core_runtime::events::{CoreEvent, EventBus, ResyncEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Result of a completed resync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResyncSummary {
    pub job_id: ResyncJobId,
    pub removed_count: usize,
    pub added_count: usize,
    pub local_reordered_count: usize,
    pub skipped_count: usize,
    /// Remote calls issued: page reads plus remove, add and move calls
    pub elapsed_operations: usize,
    pub pages_fetched: usize,
    pub duration_ms: u64,
}

pub struct SyncOrchestrator {
    config: ResyncConfig,
    fetcher: PageFetcher,
    classifier: ItemClassifier,
    mutator: BatchMutator,
    reorderer: LocalItemReorderer,
    event_bus: EventBus,
    last_job: RwLock<Option<ResyncJob>>,
}

impl SyncOrchestrator {
    /// # Errors
    ///
    /// Returns `ResyncError::Config` if `config` fails validation.
    pub fn new(
        provider: Arc<dyn PlaylistProvider>,
        config: ResyncConfig,
        event_bus: EventBus,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            fetcher: PageFetcher::new(Arc::clone(&provider), config.page_size),
            classifier: ItemClassifier::new(),
            mutator: BatchMutator::new(
                Arc::clone(&provider),
                config.chunk_size,
                config.pacing_delay,
            )
            .with_event_bus(event_bus.clone()),
            reorderer: LocalItemReorderer::new(provider, config.pacing_delay)
                .with_event_bus(event_bus.clone()),
            config,
            event_bus,
            last_job: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &ResyncConfig {
        &self.config
    }

    /// Record of the most recent resync, whatever its outcome
    pub async fn last_job(&self) -> Option<ResyncJob> {
        self.last_job.read().await.clone()
    }

    /// Resync `collection` without a cancellation handle.
    pub async fn resync(&self, collection: &CollectionRef) -> Result<ResyncSummary> {
        self.resync_with_cancellation(collection, CancellationToken::new())
            .await
    }

    /// Resync `collection`, stopping at a safe phase boundary if `cancel`
    /// fires.
    ///
    /// # Errors
    ///
    /// - `ResyncError::Fetch` / `ResyncError::Consistency`: nothing was mutated
    /// - `ResyncError::Api` / `ResyncError::Auth`: check `remote_modified()`
    /// - `ResyncError::Cancelled`: the playlist is complete
    #[instrument(skip(self, collection, cancel), fields(collection = %collection))]
    pub async fn resync_with_cancellation(
        &self,
        collection: &CollectionRef,
        cancel: CancellationToken,
    ) -> Result<ResyncSummary> {
        let started = Instant::now();
        let mut job = ResyncJob::new(collection.clone());

        info!(job_id = %job.id, "Starting resync");
        self.emit(ResyncEvent::Started {
            job_id: job.id.to_string(),
            playlist_id: collection.id().to_string(),
        });

        let result = self.execute(&mut job, &cancel, started).await;

        match &result {
            Ok(summary) => {
                info!(
                    job_id = %job.id,
                    removed = summary.removed_count,
                    added = summary.added_count,
                    local_moves = summary.local_reordered_count,
                    skipped = summary.skipped_count,
                    duration_ms = summary.duration_ms,
                    "Resync complete"
                );
                self.emit(ResyncEvent::Completed {
                    job_id: job.id.to_string(),
                    removed_count: summary.removed_count,
                    added_count: summary.added_count,
                    local_reordered_count: summary.local_reordered_count,
                    skipped_count: summary.skipped_count,
                    duration_ms: summary.duration_ms,
                });
            }
            Err(ResyncError::Cancelled { phase }) => {
                warn!(job_id = %job.id, %phase, "Resync cancelled");
                job.cancel().ok();
                self.emit(ResyncEvent::Cancelled {
                    job_id: job.id.to_string(),
                    phase: phase.to_string(),
                });
            }
            Err(err) => {
                let phase = err.phase().unwrap_or(job.phase);
                if err.remote_modified() {
                    error!(
                        job_id = %job.id,
                        %phase,
                        "Resync failed after the playlist was modified; it may be missing \
                         items or partly ordered until the resync is re-run: {}",
                        err
                    );
                } else {
                    error!(job_id = %job.id, %phase, "Resync failed; playlist untouched: {}", err);
                }
                job.fail(err.to_string()).ok();
                self.emit(ResyncEvent::Failed {
                    job_id: job.id.to_string(),
                    phase: phase.to_string(),
                    message: err.to_string(),
                    remote_modified: err.remote_modified(),
                });
            }
        }

        *self.last_job.write().await = Some(job);
        result
    }

    async fn execute(
        &self,
        job: &mut ResyncJob,
        cancel: &CancellationToken,
        started: Instant,
    ) -> Result<ResyncSummary> {
        let collection = job.collection.clone();

        // Fetching
        self.transition(job, ResyncPhase::Fetching)?;
        let fetched = self.fetcher.fetch_all(&collection).await?;
        job.progress.items_fetched = fetched.items.len();
        job.progress.pages_fetched = fetched.pages_fetched;
        job.progress.remote_calls += fetched.pages_fetched;
        self.emit(ResyncEvent::FetchCompleted {
            job_id: job.id.to_string(),
            item_count: fetched.items.len(),
            pages_fetched: fetched.pages_fetched,
        });

        // Classifying
        self.transition(job, ResyncPhase::Classifying)?;
        let classification = self.classifier.classify(&fetched.items);
        job.progress.removable_count = classification.removable.len();
        job.progress.non_removable_count = classification.non_removable.len();
        job.progress.skipped_count = classification.skipped_count;
        self.emit(ResyncEvent::ClassifyCompleted {
            job_id: job.id.to_string(),
            removable_count: classification.removable.len(),
            non_removable_count: classification.non_removable.len(),
            skipped_count: classification.skipped_count,
        });

        // Shuffling
        self.transition(job, ResyncPhase::Shuffling)?;
        let mut engine = ShuffleEngine::from_config_seed(self.config.rng_seed);
        let removable = classification.identifiers();
        let shuffled = engine.permute(removable.clone())?;
        verify_permutation(&removable, &shuffled)?;
        self.emit(ResyncEvent::ShuffleCompleted {
            job_id: job.id.to_string(),
            item_count: shuffled.len(),
        });

        checkpoint(cancel, ResyncPhase::Removing)?;

        // Removing
        self.transition(job, ResyncPhase::Removing)?;
        let removed = self
            .mutator
            .remove_all(&job.id, &collection, &removable)
            .await?;
        job.progress.items_removed = removed.items_committed;
        job.progress.remote_calls += removed.chunks_committed;

        // Pausing
        self.transition(job, ResyncPhase::Pausing)?;
        tokio::time::sleep(self.config.phase_pause).await;

        // Adding
        self.transition(job, ResyncPhase::Adding)?;
        let added = self.mutator.add_all(&job.id, &collection, &shuffled).await?;
        job.progress.items_added = added.items_committed;
        job.progress.remote_calls += added.chunks_committed;

        // PausingBeforeReorder
        self.transition(job, ResyncPhase::PausingBeforeReorder)?;
        let local_count = if self.config.reorder_local_items {
            classification.non_removable.len()
        } else {
            0
        };
        if local_count > 0 {
            tokio::time::sleep(self.config.phase_pause).await;
        }

        checkpoint(cancel, ResyncPhase::ReorderingLocal)?;

        // ReorderingLocal
        self.transition(job, ResyncPhase::ReorderingLocal)?;
        let reordered = if local_count > 0 {
            self.reorderer
                .randomize_positions(
                    &job.id,
                    &collection,
                    local_count,
                    shuffled.len(),
                    &mut engine,
                )
                .await?
        } else {
            ReorderOutcome::default()
        };
        job.progress.local_moves = reordered.moves;
        job.progress.remote_calls += reordered.moves;

        self.transition(job, ResyncPhase::Done)?;

        Ok(ResyncSummary {
            job_id: job.id,
            removed_count: removed.items_committed,
            added_count: added.items_committed,
            local_reordered_count: reordered.moves,
            skipped_count: classification.skipped_count,
            elapsed_operations: job.progress.remote_calls,
            pages_fetched: fetched.pages_fetched,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }

    fn transition(&self, job: &mut ResyncJob, to: ResyncPhase) -> Result<()> {
        job.advance(to)?;
        debug!(job_id = %job.id, phase = %to, "Phase changed");
        self.emit(ResyncEvent::PhaseChanged {
            job_id: job.id.to_string(),
            phase: to.to_string(),
        });
        Ok(())
    }

    fn emit(&self, event: ResyncEvent) {
        self.event_bus.emit(CoreEvent::Resync(event)).ok();
    }
}

/// The shuffled list must cover exactly the removable items before anything
/// is removed.
fn verify_permutation(removable: &[String], shuffled: &[String]) -> Result<()> {
    if shuffled.len() != removable.len() {
        return Err(ResyncError::Consistency {
            shuffled: shuffled.len(),
            original: removable.len(),
        });
    }
    Ok(())
}

fn checkpoint(cancel: &CancellationToken, next: ResyncPhase) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(ResyncError::Cancelled { phase: next });
    }
    Ok(())
}
