// crates/ticker-core/src/epoch.rs
//
// Epoch types for the ticker.
//
// An epoch is a fixed-size, inclusive block-height range. Its JSON form
// `{"begin":..,"end":..}` is the member stored in the epoch history and is
// read by downstream consensus tracking, so the field names are part of the
// persisted contract.

use serde::{Deserialize, Serialize};

/// An inclusive block-height range `[begin, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Epoch {
    /// First block height in the epoch.
    pub begin: u64,
    /// Last block height in the epoch (inclusive).
    pub end: u64,
}

impl Epoch {
    pub fn new(begin: u64, end: u64) -> Self {
        Self { begin, end }
    }

    /// Number of blocks covered, counting both ends.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.begin) + 1
    }

    /// An epoch always covers at least one block.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl std::fmt::Display for Epoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.begin, self.end)
    }
}

/// An emitted epoch together with its emission time (unix seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub epoch: Epoch,
    pub timestamp: i64,
}
