//! # Shuffle Engine
//!
//! Draws a uniformly random order for the removable items.
//!
//! Each step picks a uniformly random index from the items not yet placed
//! and moves it to the output. `Rng::gen_range` samples without modulo bias,
//! so every one of the `n!` orderings is equally likely.

use crate::error::{ResyncError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// New order for a list, as indices into the original list.
///
/// Produced once per resync and consumed by [`Permutation::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    source_indices: Vec<usize>,
}

impl Permutation {
    pub fn identity(len: usize) -> Self {
        Self {
            source_indices: (0..len).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.source_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source_indices.is_empty()
    }

    /// Original index of the item placed at each output position
    pub fn source_indices(&self) -> &[usize] {
        &self.source_indices
    }

    /// Reorder `items`.
    ///
    /// # Errors
    ///
    /// Returns `ResyncError::Consistency` when `items` is not the list this
    /// permutation was drawn for.
    pub fn apply<T>(self, items: Vec<T>) -> Result<Vec<T>> {
        if items.len() != self.source_indices.len() {
            return Err(ResyncError::Consistency {
                shuffled: self.source_indices.len(),
                original: items.len(),
            });
        }

        let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
        let mut shuffled = Vec::with_capacity(slots.len());
        for index in self.source_indices {
            let item = slots
                .get_mut(index)
                .and_then(Option::take)
                .ok_or_else(|| ResyncError::Consistency {
                    shuffled: shuffled.len(),
                    original: slots.len(),
                })?;
            shuffled.push(item);
        }
        Ok(shuffled)
    }
}

pub struct ShuffleEngine {
    rng: StdRng,
}

impl ShuffleEngine {
    /// Engine seeded from the operating system
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible engine for golden tests
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_config_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::new, Self::with_seed)
    }

    pub fn permutation(&mut self, len: usize) -> Permutation {
        let mut pool: Vec<usize> = (0..len).collect();
        let mut source_indices = Vec::with_capacity(len);
        while !pool.is_empty() {
            let pick = self.rng.gen_range(0..pool.len());
            source_indices.push(pool.remove(pick));
        }
        Permutation { source_indices }
    }

    /// Shuffle `items` in one step
    pub fn permute<T>(&mut self, items: Vec<T>) -> Result<Vec<T>> {
        self.permutation(items.len()).apply(items)
    }

    /// Uniform draw from `range`, `None` when it is empty
    pub fn pick(&mut self, range: std::ops::Range<usize>) -> Option<usize> {
        if range.is_empty() {
            None
        } else {
            Some(self.rng.gen_range(range))
        }
    }
}

impl Default for ShuffleEngine {
    fn default() -> Self {
        Self::new()
    }
}
