//! Eviction policies of a full replay buffer.
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Selects the slot overwritten when a transition is pushed into a full buffer.
///
/// Changing the policy never changes the push/sample contract of the buffer:
/// the length stays at the capacity and sampling stays uniform over the
/// stored rows.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub enum EvictionPolicy {
    /// Overwrites the oldest row (first in, first out).
    Fifo,

    /// Overwrites a row chosen uniformly at random.
    Random,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self::Fifo
    }
}

impl EvictionPolicy {
    /// Returns the slot to overwrite.
    ///
    /// `cursor` is the slot following the most recently written one; with
    /// FIFO writes it always holds the oldest row.
    pub(super) fn victim(&self, cursor: usize, capacity: usize, rng: &mut impl Rng) -> usize {
        match self {
            Self::Fifo => cursor,
            Self::Random => rng.gen_range(0..capacity),
        }
    }
}
