//! # Batch Mutator
//!
//! Executes a full remove or add pass as a sequence of capped, paced calls.
//!
//! ## Chunking
//!
//! A list of `L` URIs is split into `ceil(L / cap)` non-empty chunks issued in
//! list order. An exact multiple of the cap never produces a trailing empty
//! call, and an empty list issues no call at all.
//!
//! ## Ordering
//!
//! The provider appends added URIs in call order, so issuing the add chunks
//! in list order is what realizes the shuffled order remotely.
//!
//! ## Failures
//!
//! A rejected chunk aborts the rest of the pass. Nothing is retried or rolled
//! back; the error records how many items were already committed so the
//! caller can tell whether the playlist was left partial.

use crate::error::{ResyncError, Result};
use crate::job::{CollectionRef, ResyncJobId, ResyncPhase};
use bridge_traits::{BridgeError, PlaylistProvider, MAX_ITEMS_PER_REQUEST};
use core_runtime::events::{CoreEvent, EventBus, ResyncEvent};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// Which mutation a pass performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchOperation {
    Remove,
    Add,
}

impl BatchOperation {
    pub fn phase(&self) -> ResyncPhase {
        match self {
            BatchOperation::Remove => ResyncPhase::Removing,
            BatchOperation::Add => ResyncPhase::Adding,
        }
    }
}

/// Ordered chunks covering a list exactly once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan<'a, T> {
    chunks: Vec<&'a [T]>,
}

impl<'a, T> BatchPlan<'a, T> {
    /// Split `items` into chunks of at most `cap` (clamped to 1..=100).
    pub fn new(items: &'a [T], cap: usize) -> Self {
        let cap = cap.clamp(1, MAX_ITEMS_PER_REQUEST);
        Self {
            chunks: items.chunks(cap).collect(),
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[&'a [T]] {
        &self.chunks
    }

    pub fn item_count(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.len()).sum()
    }
}

/// What a completed pass committed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub chunks_committed: usize,
    pub items_committed: usize,
}

pub struct BatchMutator {
    provider: Arc<dyn PlaylistProvider>,
    chunk_size: usize,
    pacing_delay: Duration,
    event_bus: Option<EventBus>,
}

impl BatchMutator {
    pub fn new(
        provider: Arc<dyn PlaylistProvider>,
        chunk_size: usize,
        pacing_delay: Duration,
    ) -> Self {
        Self {
            provider,
            chunk_size: chunk_size.clamp(1, MAX_ITEMS_PER_REQUEST),
            pacing_delay,
            event_bus: None,
        }
    }

    /// Publish a `ChunkCommitted` event after every accepted call
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Remove every URI in `identifiers`, chunk by chunk.
    pub async fn remove_all(
        &self,
        job_id: &ResyncJobId,
        collection: &CollectionRef,
        identifiers: &[String],
    ) -> Result<BatchOutcome> {
        self.run(BatchOperation::Remove, job_id, collection, identifiers)
            .await
    }

    /// Append every URI in `identifiers`, chunk by chunk, in list order.
    pub async fn add_all(
        &self,
        job_id: &ResyncJobId,
        collection: &CollectionRef,
        identifiers: &[String],
    ) -> Result<BatchOutcome> {
        self.run(BatchOperation::Add, job_id, collection, identifiers)
            .await
    }

    #[instrument(
        skip(self, job_id, collection, identifiers),
        fields(job_id = %job_id, collection = %collection, items = identifiers.len())
    )]
    async fn run(
        &self,
        operation: BatchOperation,
        job_id: &ResyncJobId,
        collection: &CollectionRef,
        identifiers: &[String],
    ) -> Result<BatchOutcome> {
        let plan = BatchPlan::new(identifiers, self.chunk_size);
        let chunk_count = plan.chunk_count();
        let phase = operation.phase();
        let mut outcome = BatchOutcome::default();

        for (i, chunk) in plan.chunks().iter().enumerate() {
            let chunk_index = i + 1;

            let result = match operation {
                BatchOperation::Remove => {
                    self.provider.remove_items(collection.id(), chunk).await
                }
                BatchOperation::Add => self.provider.add_items(collection.id(), chunk).await,
            };

            if let Err(source) = result {
                let err = mutation_error(
                    phase,
                    chunk_index,
                    chunk_count,
                    chunk.len(),
                    outcome.items_committed,
                    source,
                );
                error!(
                    chunk_index,
                    chunk_count,
                    items_committed = outcome.items_committed,
                    "Chunk rejected: {}",
                    err
                );
                return Err(err);
            }

            outcome.chunks_committed += 1;
            outcome.items_committed += chunk.len();

            debug!(chunk_index, chunk_count, size = chunk.len(), "Chunk committed");

            if let Some(bus) = &self.event_bus {
                bus.emit(CoreEvent::Resync(ResyncEvent::ChunkCommitted {
                    job_id: job_id.to_string(),
                    phase: phase.to_string(),
                    chunk_index,
                    chunk_count,
                    item_count: chunk.len(),
                }))
                .ok();
            }

            tokio::time::sleep(self.pacing_delay).await;
        }

        info!(
            ?operation,
            chunks = outcome.chunks_committed,
            items = outcome.items_committed,
            "Batch pass complete"
        );

        Ok(outcome)
    }
}

/// Map a rejected mutation call onto the resync taxonomy.
///
/// A removal that failed before any item was committed leaves the playlist
/// intact; every other mutation failure leaves it partial.
pub(crate) fn mutation_error(
    phase: ResyncPhase,
    chunk_index: usize,
    chunk_count: usize,
    item_count: usize,
    items_committed: usize,
    source: BridgeError,
) -> ResyncError {
    if source.is_unauthorized() {
        return ResyncError::Auth {
            phase,
            remote_modified: phase != ResyncPhase::Removing || items_committed > 0,
            message: source.to_string(),
        };
    }

    ResyncError::Api {
        phase,
        chunk_index,
        chunk_count,
        item_count,
        items_committed,
        status_code: source.status_code(),
        message: source.to_string(),
    }
}
