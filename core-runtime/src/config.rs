//! # Resync Configuration
//!
//! Tunables for the batched playlist resynchronization engine.
//!
//! ## Overview
//!
//! The provider caps every read and mutation at 100 items and rate-limits
//! mutations, so the engine pages, chunks and paces its calls. All of those
//! limits live in [`ResyncConfig`], built through [`ResyncConfigBuilder`] and
//! checked by [`ResyncConfig::validate`] before a resync starts.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::ResyncConfig;
//! use std::time::Duration;
//!
//! let config = ResyncConfig::builder()
//!     .pacing_delay(Duration::from_millis(75))
//!     .rng_seed(42)
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.chunk_size, 100);
//! ```
//!
//! ## Error Handling
//!
//! Out-of-range values are rejected with an actionable message:
//!
//! ```should_panic
//! use core_runtime::config::ResyncConfig;
//! use std::time::Duration;
//!
//! // Pacing between remote calls can be tuned but never removed
//! ResyncConfig::builder()
//!     .pacing_delay(Duration::ZERO)
//!     .build()
//!     .expect("zero pacing is rejected");
//! ```

use crate::error::{Error, Result};
use bridge_traits::MAX_ITEMS_PER_REQUEST;
use std::time::Duration;

/// Default pause after every remote mutation call
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_millis(50);

/// Default pause between the remove, add and local reorder phases
pub const DEFAULT_PHASE_PAUSE: Duration = Duration::from_millis(100);

const MAX_PACING_DELAY: Duration = Duration::from_secs(60);

/// Configuration for one resync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResyncConfig {
    /// Items requested per page read (1..=100)
    pub page_size: usize,

    /// Items sent per remove/add call (1..=100)
    pub chunk_size: usize,

    /// Sleep after every remove, add and move call
    pub pacing_delay: Duration,

    /// Sleep between Removing and Adding, and between Adding and ReorderingLocal
    pub phase_pause: Duration,

    /// Whether identifier-less (local) items get randomized positions
    pub reorder_local_items: bool,

    /// Fixed seed for reproducible shuffles; `None` seeds from the OS
    pub rng_seed: Option<u64>,
}

impl Default for ResyncConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_ITEMS_PER_REQUEST,
            chunk_size: MAX_ITEMS_PER_REQUEST,
            pacing_delay: DEFAULT_PACING_DELAY,
            phase_pause: DEFAULT_PHASE_PAUSE,
            reorder_local_items: true,
            rng_seed: None,
        }
    }
}

impl ResyncConfig {
    /// Creates a new builder seeded with the defaults.
    pub fn builder() -> ResyncConfigBuilder {
        ResyncConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Page and chunk sizes are within the provider cap
    /// - Pacing delay and phase pause are non-zero and at most 60 seconds
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > MAX_ITEMS_PER_REQUEST {
            return Err(Error::Config(format!(
                "Page size must be between 1 and {} (got {})",
                MAX_ITEMS_PER_REQUEST, self.page_size
            )));
        }

        if self.chunk_size == 0 || self.chunk_size > MAX_ITEMS_PER_REQUEST {
            return Err(Error::Config(format!(
                "Chunk size must be between 1 and {} (got {})",
                MAX_ITEMS_PER_REQUEST, self.chunk_size
            )));
        }

        if self.pacing_delay.is_zero() {
            return Err(Error::Config(
                "Pacing delay must be greater than 0ms; the provider rate-limits mutations"
                    .to_string(),
            ));
        }

        if self.pacing_delay > MAX_PACING_DELAY {
            return Err(Error::Config(
                "Pacing delay exceeds maximum of 60 seconds".to_string(),
            ));
        }

        if self.phase_pause.is_zero() {
            return Err(Error::Config(
                "Phase pause must be greater than 0ms".to_string(),
            ));
        }

        if self.phase_pause > MAX_PACING_DELAY {
            return Err(Error::Config(
                "Phase pause exceeds maximum of 60 seconds".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for constructing [`ResyncConfig`] instances.
#[derive(Debug, Default)]
pub struct ResyncConfigBuilder {
    config: ResyncConfig,
}

impl ResyncConfigBuilder {
    /// Sets the number of items requested per page read.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.config.page_size = page_size;
        self
    }

    /// Sets the number of items sent per remove/add call.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_size = chunk_size;
        self
    }

    /// Sets the sleep that follows every mutation call.
    pub fn pacing_delay(mut self, delay: Duration) -> Self {
        self.config.pacing_delay = delay;
        self
    }

    /// Sets the sleep between mutation phases.
    pub fn phase_pause(mut self, pause: Duration) -> Self {
        self.config.phase_pause = pause;
        self
    }

    /// Enables or disables randomizing local item positions.
    pub fn reorder_local_items(mut self, enabled: bool) -> Self {
        self.config.reorder_local_items = enabled;
        self
    }

    /// Fixes the RNG seed so shuffles are reproducible.
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.config.rng_seed = Some(seed);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<ResyncConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
