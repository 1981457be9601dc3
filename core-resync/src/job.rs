//! # Resync Job State Machine
//!
//! Tracks one resync through its phases with validated transitions.
//!
//! ## State Machine
//!
//! ```text
//! Pending → Fetching → Classifying → Shuffling → Removing → Pausing
//!                                                              ↓
//!     Done ← ReorderingLocal ← PausingBeforeReorder ← Adding ←─┘
//!
//! any non-terminal phase ──→ Failed
//! Pending..Shuffling, PausingBeforeReorder ──→ Cancelled
//! ```
//!
//! Phases only move forward one step at a time. Cancellation is refused
//! between `Removing` and `PausingBeforeReorder`: stopping there would leave
//! the playlist emptied or half re-added.

use crate::error::{ResyncError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a resync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResyncJobId(Uuid);

impl ResyncJobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a job ID from a string
    pub fn from_string(s: &str) -> Result<Self> {
        Ok(Self(
            Uuid::parse_str(s).map_err(|e| ResyncError::InvalidJobId(e.to_string()))?,
        ))
    }
}

impl Default for ResyncJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResyncJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The playlist a resync operates on.
///
/// Accepts a bare playlist ID or a provider URI such as
/// `spotify:playlist:37i9dQZF1DXcBWIGoYBM5M`, whose third segment is the ID.
///
/// ```
/// use core_resync::CollectionRef;
///
/// let by_uri = CollectionRef::parse("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M").unwrap();
/// let by_id = CollectionRef::parse("37i9dQZF1DXcBWIGoYBM5M").unwrap();
/// assert_eq!(by_uri, by_id);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionRef(String);

impl CollectionRef {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let id = if trimmed.contains(':') {
            trimmed.split(':').nth(2).unwrap_or_default()
        } else {
            trimmed
        };

        if id.is_empty() {
            return Err(ResyncError::InvalidCollection(input.to_string()));
        }
        Ok(Self(id.to_string()))
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Phase
// ============================================================================

/// Phase of a resync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResyncPhase {
    Pending,
    Fetching,
    Classifying,
    Shuffling,
    Removing,
    /// Pause between the last remove and the first add
    Pausing,
    Adding,
    /// Pause between the last add and the first local move
    PausingBeforeReorder,
    ReorderingLocal,
    Done,
    Failed,
    Cancelled,
}

impl ResyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResyncPhase::Pending => "Pending",
            ResyncPhase::Fetching => "Fetching",
            ResyncPhase::Classifying => "Classifying",
            ResyncPhase::Shuffling => "Shuffling",
            ResyncPhase::Removing => "Removing",
            ResyncPhase::Pausing => "Pausing",
            ResyncPhase::Adding => "Adding",
            ResyncPhase::PausingBeforeReorder => "PausingBeforeReorder",
            ResyncPhase::ReorderingLocal => "ReorderingLocal",
            ResyncPhase::Done => "Done",
            ResyncPhase::Failed => "Failed",
            ResyncPhase::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ResyncPhase::Done | ResyncPhase::Failed | ResyncPhase::Cancelled
        )
    }

    /// The single phase that may follow this one on the success path
    pub fn next(&self) -> Option<ResyncPhase> {
        let next = match self {
            ResyncPhase::Pending => ResyncPhase::Fetching,
            ResyncPhase::Fetching => ResyncPhase::Classifying,
            ResyncPhase::Classifying => ResyncPhase::Shuffling,
            ResyncPhase::Shuffling => ResyncPhase::Removing,
            ResyncPhase::Removing => ResyncPhase::Pausing,
            ResyncPhase::Pausing => ResyncPhase::Adding,
            ResyncPhase::Adding => ResyncPhase::PausingBeforeReorder,
            ResyncPhase::PausingBeforeReorder => ResyncPhase::ReorderingLocal,
            ResyncPhase::ReorderingLocal => ResyncPhase::Done,
            ResyncPhase::Done | ResyncPhase::Failed | ResyncPhase::Cancelled => return None,
        };
        Some(next)
    }

    /// Whether stopping here leaves the playlist complete
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            ResyncPhase::Pending
                | ResyncPhase::Fetching
                | ResyncPhase::Classifying
                | ResyncPhase::Shuffling
                | ResyncPhase::PausingBeforeReorder
        )
    }
}

impl fmt::Display for ResyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Counters accumulated while a resync runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResyncProgress {
    pub items_fetched: usize,
    pub pages_fetched: usize,
    pub removable_count: usize,
    pub non_removable_count: usize,
    pub skipped_count: usize,
    pub items_removed: usize,
    pub items_added: usize,
    pub local_moves: usize,
    /// Every remote call issued: page reads, remove, add and move calls
    pub remote_calls: usize,
}

// ============================================================================
// Resync Job Entity
// ============================================================================

/// One resync of one playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResyncJob {
    pub id: ResyncJobId,
    pub collection: CollectionRef,
    pub phase: ResyncPhase,
    pub progress: ResyncProgress,
    /// Unix seconds
    pub started_at: i64,
    pub completed_at: Option<i64>,
    pub error_message: Option<String>,
}

impl ResyncJob {
    pub fn new(collection: CollectionRef) -> Self {
        Self {
            id: ResyncJobId::new(),
            collection,
            phase: ResyncPhase::Pending,
            progress: ResyncProgress::default(),
            started_at: current_timestamp(),
            completed_at: None,
            error_message: None,
        }
    }

    /// Move to the next success-path phase.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` unless `to` is the phase that
    /// immediately follows the current one.
    pub fn advance(&mut self, to: ResyncPhase) -> Result<()> {
        if self.phase.next() != Some(to) {
            return Err(self.invalid(to));
        }
        self.phase = to;
        if to == ResyncPhase::Done {
            self.completed_at = Some(current_timestamp());
        }
        Ok(())
    }

    /// Record an unrecoverable error
    pub fn fail(&mut self, error_message: String) -> Result<()> {
        if self.phase.is_terminal() {
            return Err(self.invalid(ResyncPhase::Failed));
        }
        self.phase = ResyncPhase::Failed;
        self.completed_at = Some(current_timestamp());
        self.error_message = Some(error_message);
        Ok(())
    }

    /// Stop at a phase boundary where the playlist is complete
    pub fn cancel(&mut self) -> Result<()> {
        if !self.phase.is_cancellable() {
            return Err(self.invalid(ResyncPhase::Cancelled));
        }
        self.phase = ResyncPhase::Cancelled;
        self.completed_at = Some(current_timestamp());
        Ok(())
    }

    pub fn duration_secs(&self) -> Option<u64> {
        self.completed_at
            .map(|end| u64::try_from(end - self.started_at).unwrap_or(0))
    }

    fn invalid(&self, to: ResyncPhase) -> ResyncError {
        ResyncError::InvalidStateTransition {
            from: self.phase,
            to,
        }
    }
}

fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
