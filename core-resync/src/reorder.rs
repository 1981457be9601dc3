//! # Local Item Reorderer
//!
//! Local files cannot be removed and re-added by URI, so after the removable
//! items are re-appended the local ones still sit at the head of the
//! playlist. Each of the `count` moves takes whatever is at position 0 and
//! drops it before a uniformly drawn position in `[1, removable + count)`.
//!
//! This scatters the local items but does not give a uniform permutation of
//! them: an item moved early can be picked up again only if a later move
//! lands in front of it. Entries that stayed behind because they were
//! unavailable are not counted in the target range.

use crate::batch::mutation_error;
use crate::error::Result;
use crate::job::{CollectionRef, ResyncJobId, ResyncPhase};
use crate::shuffle::ShuffleEngine;
use bridge_traits::PlaylistProvider;
use core_runtime::events::{CoreEvent, EventBus, ResyncEvent};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReorderOutcome {
    /// Move calls the provider accepted
    pub moves: usize,
    /// `insert_before` of every accepted move, in call order
    pub targets: Vec<usize>,
}

pub struct LocalItemReorderer {
    provider: Arc<dyn PlaylistProvider>,
    pacing_delay: Duration,
    event_bus: Option<EventBus>,
}

impl LocalItemReorderer {
    pub fn new(provider: Arc<dyn PlaylistProvider>, pacing_delay: Duration) -> Self {
        Self {
            provider,
            pacing_delay,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Move the head item `count` times to random positions.
    ///
    /// A move whose target range is empty (a lone local item in an otherwise
    /// empty playlist) is skipped without a remote call.
    #[instrument(skip(self, job_id, collection, engine), fields(job_id = %job_id, collection = %collection))]
    pub async fn randomize_positions(
        &self,
        job_id: &ResyncJobId,
        collection: &CollectionRef,
        count: usize,
        removable_total: usize,
        engine: &mut ShuffleEngine,
    ) -> Result<ReorderOutcome> {
        let mut outcome = ReorderOutcome::default();
        let upper = removable_total + count;

        for i in 0..count {
            let move_index = i + 1;
            let Some(target) = engine.pick(1..upper) else {
                debug!(move_index, "No position to move to; skipping");
                continue;
            };

            if let Err(source) = self.provider.move_item(collection.id(), 0, target).await {
                let err = mutation_error(
                    ResyncPhase::ReorderingLocal,
                    move_index,
                    count,
                    1,
                    outcome.moves,
                    source,
                );
                error!(move_index, target, "Move rejected: {}", err);
                return Err(err);
            }

            outcome.moves += 1;
            outcome.targets.push(target);

            if let Some(bus) = &self.event_bus {
                bus.emit(CoreEvent::Resync(ResyncEvent::LocalItemMoved {
                    job_id: job_id.to_string(),
                    move_index,
                    move_count: count,
                    target_position: target,
                }))
                .ok();
            }

            tokio::time::sleep(self.pacing_delay).await;
        }

        info!(moves = outcome.moves, "Local items repositioned");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResyncError;
    use crate::test_support::MockProvider;
    use bridge_traits::BridgeError;
    use mockall::predicate::{always, eq};

    fn collection() -> CollectionRef {
        CollectionRef::parse("p1").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_moves_head_into_range() {
        let mut provider = MockProvider::new();
        provider
            .expect_move_item()
            .with(eq("p1"), eq(0usize), always())
            .times(3)
            .returning(|_, _, _| Ok(()));

        let reorderer = LocalItemReorderer::new(Arc::new(provider), Duration::from_millis(50));
        let mut engine = ShuffleEngine::with_seed(11);
        let outcome = reorderer
            .randomize_positions(&ResyncJobId::new(), &collection(), 3, 10, &mut engine)
            .await
            .unwrap();

        assert_eq!(outcome.moves, 3);
        assert!(outcome.targets.iter().all(|t| (1..13).contains(t)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_local_with_two_removable() {
        let mut provider = MockProvider::new();
        provider
            .expect_move_item()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let reorderer = LocalItemReorderer::new(Arc::new(provider), Duration::from_millis(50));
        let outcome = reorderer
            .randomize_positions(
                &ResyncJobId::new(),
                &collection(),
                1,
                2,
                &mut ShuffleEngine::with_seed(5),
            )
            .await
            .unwrap();

        assert_eq!(outcome.moves, 1);
        assert!((1..3).contains(&outcome.targets[0]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lone_local_item_is_not_moved() {
        let provider = MockProvider::new();
        let reorderer = LocalItemReorderer::new(Arc::new(provider), Duration::from_millis(50));

        let outcome = reorderer
            .randomize_positions(
                &ResyncJobId::new(),
                &collection(),
                1,
                0,
                &mut ShuffleEngine::with_seed(5),
            )
            .await
            .unwrap();

        assert_eq!(outcome, ReorderOutcome::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_move_reports_position() {
        let mut provider = MockProvider::new();
        let mut calls = 0;
        provider.expect_move_item().returning(move |_, _, _| {
            calls += 1;
            if calls == 2 {
                Err(BridgeError::Api {
                    status_code: 500,
                    message: "Internal".to_string(),
                })
            } else {
                Ok(())
            }
        });

        let reorderer = LocalItemReorderer::new(Arc::new(provider), Duration::from_millis(50));
        let err = reorderer
            .randomize_positions(
                &ResyncJobId::new(),
                &collection(),
                3,
                5,
                &mut ShuffleEngine::with_seed(5),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ResyncError::Api {
                phase: ResyncPhase::ReorderingLocal,
                chunk_index: 2,
                chunk_count: 3,
                item_count: 1,
                items_committed: 1,
                ..
            }
        ));
        assert!(err.remote_modified());
    }
}
