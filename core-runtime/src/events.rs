//! # Event Bus System
//!
//! Typed progress and failure notifications over `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! A resync is long-running and mutates a remote playlist in many small
//! steps, so the engine reports every phase change, committed chunk and
//! local move as a [`CoreEvent`]. Subscribers (a CLI progress line, a test
//! asserting on ordering) attach through [`EventBus::subscribe`] and never
//! block the publisher.
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐
//! │ Auth session ├──────────────>│           │     subscribe    ┌────────────┐
//! └──────────────┘               │ EventBus  ├─────────────────>│ Subscriber │
//! ┌──────────────┐     emit      │ (broadcast│                  └────────────┘
//! │ Resync job   ├──────────────>│  channel) │
//! └──────────────┘               └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, ResyncEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Resync(ResyncEvent::PhaseChanged {
//!         job_id: "job-1".to_string(),
//!         phase: "Removing".to_string(),
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Resync phase changed");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it may keep reading.
//! - **`RecvError::Closed`**: every sender was dropped.
//!
//! Publishers ignore send errors (`.ok()`); a resync with nobody listening is
//! still a valid resync.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// A 10,000-item playlist commits 200 chunks; subscribers slower than the
/// pacing delay lag rather than stall the engine.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published through the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Session and token events
    Auth(AuthEvent),
    /// Playlist resync progress
    Resync(ResyncEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Resync(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::AuthError { .. }) => EventSeverity::Error,
            CoreEvent::Resync(ResyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Auth(AuthEvent::TokenExpiring { .. }) => EventSeverity::Warning,
            CoreEvent::Resync(ResyncEvent::Cancelled { .. }) => EventSeverity::Warning,
            CoreEvent::Auth(AuthEvent::TokenAcquired { .. }) => EventSeverity::Info,
            CoreEvent::Resync(ResyncEvent::Started { .. }) => EventSeverity::Info,
            CoreEvent::Resync(ResyncEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Authentication Events
// ============================================================================

/// Events emitted by the session manager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// A fresh access token was obtained from the token provider.
    TokenAcquired {
        /// Expiry as Unix epoch seconds.
        expires_at: i64,
        /// Scopes granted to the token.
        scopes: Vec<String>,
    },
    /// The cached token is inside the expiry buffer.
    TokenExpiring {
        /// Seconds until the provider rejects the token.
        seconds_remaining: i64,
    },
    /// Obtaining or validating a token failed.
    AuthError {
        /// Human-readable error message.
        message: String,
        /// Whether signing in again can fix it.
        recoverable: bool,
    },
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::TokenAcquired { .. } => "Access token acquired",
            AuthEvent::TokenExpiring { .. } => "Access token expiring",
            AuthEvent::AuthError { .. } => "Authentication error",
        }
    }
}

// ============================================================================
// Resync Events
// ============================================================================

/// Events emitted while a playlist is being resynchronized.
///
/// Phases travel as their display names so this crate stays independent of
/// the engine's state machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ResyncEvent {
    /// Resync job initiated.
    Started {
        job_id: String,
        playlist_id: String,
    },
    /// The job entered a new phase.
    PhaseChanged {
        job_id: String,
        phase: String,
    },
    /// Every page of the playlist was read.
    FetchCompleted {
        job_id: String,
        item_count: usize,
        pages_fetched: usize,
    },
    /// Items were split into removable, non-removable and skipped.
    ClassifyCompleted {
        job_id: String,
        removable_count: usize,
        non_removable_count: usize,
        skipped_count: usize,
    },
    /// A new order for the removable items was drawn.
    ShuffleCompleted {
        job_id: String,
        item_count: usize,
    },
    /// One remove or add call was accepted by the provider.
    ChunkCommitted {
        job_id: String,
        phase: String,
        /// 1-based
        chunk_index: usize,
        chunk_count: usize,
        item_count: usize,
    },
    /// One local item was moved to a random position.
    LocalItemMoved {
        job_id: String,
        /// 1-based
        move_index: usize,
        move_count: usize,
        target_position: usize,
    },
    /// Resync finished successfully.
    Completed {
        job_id: String,
        removed_count: usize,
        added_count: usize,
        local_reordered_count: usize,
        skipped_count: usize,
        duration_ms: u64,
    },
    /// Resync stopped on an error.
    Failed {
        job_id: String,
        phase: String,
        message: String,
        /// True once any remove call succeeded; the playlist is then partial.
        remote_modified: bool,
    },
    /// Resync stopped at a cancellation checkpoint.
    Cancelled {
        job_id: String,
        phase: String,
    },
}

impl ResyncEvent {
    fn description(&self) -> &str {
        match self {
            ResyncEvent::Started { .. } => "Resync started",
            ResyncEvent::PhaseChanged { .. } => "Resync phase changed",
            ResyncEvent::FetchCompleted { .. } => "Playlist fetched",
            ResyncEvent::ClassifyCompleted { .. } => "Playlist items classified",
            ResyncEvent::ShuffleCompleted { .. } => "Playlist shuffled",
            ResyncEvent::ChunkCommitted { .. } => "Chunk committed",
            ResyncEvent::LocalItemMoved { .. } => "Local item moved",
            ResyncEvent::Completed { .. } => "Resync completed successfully",
            ResyncEvent::Failed { .. } => "Resync failed",
            ResyncEvent::Cancelled { .. } => "Resync cancelled",
        }
    }

    /// ID of the job that emitted the event.
    pub fn job_id(&self) -> &str {
        match self {
            ResyncEvent::Started { job_id, .. }
            | ResyncEvent::PhaseChanged { job_id, .. }
            | ResyncEvent::FetchCompleted { job_id, .. }
            | ResyncEvent::ClassifyCompleted { job_id, .. }
            | ResyncEvent::ShuffleCompleted { job_id, .. }
            | ResyncEvent::ChunkCommitted { job_id, .. }
            | ResyncEvent::LocalItemMoved { job_id, .. }
            | ResyncEvent::Completed { job_id, .. }
            | ResyncEvent::Failed { job_id, .. }
            | ResyncEvent::Cancelled { job_id, .. } => job_id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus clones the sender; every clone publishes to the same
/// subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    ///
    /// let _subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let resync_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Resync(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching event is currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase_changed(phase: &str) -> CoreEvent {
        CoreEvent::Resync(ResyncEvent::PhaseChanged {
            job_id: "job-1".to_string(),
            phase: phase.to_string(),
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);

        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(phase_changed("Fetching")).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Resync(ResyncEvent::Started {
            job_id: "job-1".to_string(),
            playlist_id: "37i9dQZF1DXcBWIGoYBM5M".to_string(),
        });

        assert_eq!(bus.emit(event.clone()).unwrap(), 2);
        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_events_arrive_in_emission_order() {
        let bus = EventBus::new(10);
        let mut sub = bus.subscribe();

        for phase in ["Fetching", "Classifying", "Shuffling"] {
            bus.emit(phase_changed(phase)).ok();
        }

        for expected in ["Fetching", "Classifying", "Shuffling"] {
            assert_eq!(sub.recv().await.unwrap(), phase_changed(expected));
        }
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream =
            EventStream::new(bus.subscribe()).filter(|event| matches!(event, CoreEvent::Auth(_)));

        bus.emit(phase_changed("Adding")).ok();

        let auth_event = CoreEvent::Auth(AuthEvent::TokenExpiring {
            seconds_remaining: 42,
        });
        bus.emit(auth_event.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), auth_event);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(CoreEvent::Resync(ResyncEvent::ChunkCommitted {
                job_id: "job-1".to_string(),
                phase: "Adding".to_string(),
                chunk_index: i + 1,
                chunk_count: 5,
                item_count: 100,
            }))
            .ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let failed = CoreEvent::Resync(ResyncEvent::Failed {
            job_id: "job-1".to_string(),
            phase: "Adding".to_string(),
            message: "403 Forbidden".to_string(),
            remote_modified: true,
        });
        assert_eq!(failed.severity(), EventSeverity::Error);

        let completed = CoreEvent::Resync(ResyncEvent::Completed {
            job_id: "job-1".to_string(),
            removed_count: 10,
            added_count: 10,
            local_reordered_count: 0,
            skipped_count: 0,
            duration_ms: 1200,
        });
        assert_eq!(completed.severity(), EventSeverity::Info);

        let expiring = CoreEvent::Auth(AuthEvent::TokenExpiring {
            seconds_remaining: 30,
        });
        assert_eq!(expiring.severity(), EventSeverity::Warning);

        assert_eq!(phase_changed("Pausing").severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_description_and_job_id() {
        let event = ResyncEvent::LocalItemMoved {
            job_id: "job-9".to_string(),
            move_index: 1,
            move_count: 2,
            target_position: 7,
        };
        assert_eq!(event.job_id(), "job-9");
        assert_eq!(
            CoreEvent::Resync(event).description(),
            "Local item moved"
        );
    }

    #[tokio::test]
    async fn test_concurrent_publishers() {
        let bus = EventBus::new(100);
        let mut sub = bus.subscribe();

        let bus1 = bus.clone();
        let bus2 = bus.clone();

        let handle1 = tokio::spawn(async move {
            for _ in 0..10 {
                bus1.emit(CoreEvent::Auth(AuthEvent::TokenExpiring {
                    seconds_remaining: 10,
                }))
                .ok();
            }
        });

        let handle2 = tokio::spawn(async move {
            for _ in 0..10 {
                bus2.emit(phase_changed("Removing")).ok();
            }
        });

        handle1.await.ok();
        handle2.await.ok();

        let mut count = 0;
        while sub.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 20);
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Resync(ResyncEvent::ClassifyCompleted {
            job_id: "job-123".to_string(),
            removable_count: 95,
            non_removable_count: 3,
            skipped_count: 2,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("job-123"));
        assert!(json.contains("ClassifyCompleted"));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[tokio::test]
    async fn test_try_recv() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());

        let event = phase_changed("Done");
        bus.emit(event.clone()).ok();

        let received = stream.try_recv().unwrap().unwrap();
        assert_eq!(received, event);
    }
}
