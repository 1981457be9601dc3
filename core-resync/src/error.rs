use crate::job::ResyncPhase;
use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResyncError {
    /// A page read failed; the playlist was not touched.
    #[error("Failed to read page {page_index} at offset {offset}: {source}")]
    Fetch {
        page_index: usize,
        offset: u32,
        #[source]
        source: BridgeError,
    },

    /// The permutation does not cover the removable items; nothing was mutated.
    #[error("Shuffled list has {shuffled} items but {original} were classified removable")]
    Consistency { shuffled: usize, original: usize },

    /// A remove, add or move call was rejected mid-phase.
    #[error(
        "{phase} call {chunk_index}/{chunk_count} ({item_count} items) failed after \
         {items_committed} items committed: {message}"
    )]
    Api {
        phase: ResyncPhase,
        /// 1-based
        chunk_index: usize,
        chunk_count: usize,
        item_count: usize,
        items_committed: usize,
        status_code: Option<u16>,
        message: String,
    },

    /// The provider rejected the session.
    #[error("Session rejected during {phase}: {message}")]
    Auth {
        phase: ResyncPhase,
        remote_modified: bool,
        message: String,
    },

    #[error("Resync cancelled before {phase}")]
    Cancelled { phase: ResyncPhase },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: ResyncPhase, to: ResyncPhase },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid job ID: {0}")]
    InvalidJobId(String),

    #[error("Invalid playlist reference: {0:?}")]
    InvalidCollection(String),
}

impl ResyncError {
    /// Phase in which the resync stopped
    pub fn phase(&self) -> Option<ResyncPhase> {
        match self {
            ResyncError::Fetch { .. } => Some(ResyncPhase::Fetching),
            ResyncError::Consistency { .. } => Some(ResyncPhase::Shuffling),
            ResyncError::Api { phase, .. }
            | ResyncError::Auth { phase, .. }
            | ResyncError::Cancelled { phase } => Some(*phase),
            ResyncError::InvalidStateTransition { from, .. } => Some(*from),
            ResyncError::Config(_)
            | ResyncError::InvalidJobId(_)
            | ResyncError::InvalidCollection(_) => None,
        }
    }

    /// True when the remote playlist was left partially rewritten.
    ///
    /// Once the first remove call succeeds the playlist no longer holds its
    /// original contents; any later failure leaves it missing items or in a
    /// partial order until the resync is re-run.
    pub fn remote_modified(&self) -> bool {
        match self {
            ResyncError::Api {
                phase,
                items_committed,
                ..
            } => *phase != ResyncPhase::Removing || *items_committed > 0,
            ResyncError::Auth {
                remote_modified, ..
            } => *remote_modified,
            _ => false,
        }
    }

    /// HTTP status returned by the provider, if the failure carried one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ResyncError::Fetch { source, .. } => source.status_code(),
            ResyncError::Api { status_code, .. } => *status_code,
            ResyncError::Auth { .. } => Some(401),
            _ => None,
        }
    }
}

impl From<core_runtime::Error> for ResyncError {
    fn from(error: core_runtime::Error) -> Self {
        ResyncError::Config(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ResyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(phase: ResyncPhase, items_committed: usize) -> ResyncError {
        ResyncError::Api {
            phase,
            chunk_index: 2,
            chunk_count: 3,
            item_count: 100,
            items_committed,
            status_code: Some(502),
            message: "Bad gateway".to_string(),
        }
    }

    #[test]
    fn test_first_remove_chunk_failure_leaves_remote_untouched() {
        assert!(!api_error(ResyncPhase::Removing, 0).remote_modified());
        assert!(api_error(ResyncPhase::Removing, 100).remote_modified());
    }

    #[test]
    fn test_add_and_reorder_failures_are_flagged() {
        assert!(api_error(ResyncPhase::Adding, 0).remote_modified());
        assert!(api_error(ResyncPhase::ReorderingLocal, 0).remote_modified());
    }

    #[test]
    fn test_pre_mutation_failures_are_not_flagged() {
        let fetch = ResyncError::Fetch {
            page_index: 1,
            offset: 100,
            source: BridgeError::Network("reset".to_string()),
        };
        assert!(!fetch.remote_modified());
        assert_eq!(fetch.phase(), Some(ResyncPhase::Fetching));

        let consistency = ResyncError::Consistency {
            shuffled: 9,
            original: 10,
        };
        assert!(!consistency.remote_modified());
        assert_eq!(consistency.phase(), Some(ResyncPhase::Shuffling));
    }

    #[test]
    fn test_error_message_carries_chunk_context() {
        let message = api_error(ResyncPhase::Removing, 100).to_string();
        assert!(message.contains("Removing call 2/3"));
        assert!(message.contains("100 items committed"));
        assert_eq!(api_error(ResyncPhase::Adding, 0).status_code(), Some(502));
    }
}
