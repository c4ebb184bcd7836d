// crates/ticker-core/src/traits.rs

use async_trait::async_trait;

use crate::epoch::{Epoch, HistoryEntry};
use crate::error::TickerError;

/// Trait for reading the source chain's current head height.
///
/// Implemented by ticker-chain (JSON-RPC over HTTP).
#[async_trait]
pub trait ChainHeadClient: Send + Sync {
    /// Return the current block height.
    ///
    /// Fails with `TickerError::ChainUnavailable` once the client's retry
    /// budget across its configured endpoints is exhausted.
    async fn current_height(&self) -> Result<u64, TickerError>;
}

/// Trait for the durable checkpoint and epoch history.
///
/// Implemented by ticker-store (RocksDB backend, in-memory backend).
/// Every method applies fully or not at all.
#[async_trait]
pub trait EpochStore: Send + Sync {
    /// Read the end height of the last fully emitted epoch, if any.
    async fn get_checkpoint(&self) -> Result<Option<u64>, TickerError>;

    /// Overwrite the checkpoint.
    async fn set_checkpoint(&self, height: u64) -> Result<(), TickerError>;

    /// Record an emitted epoch scored by `timestamp`. Re-adding the same
    /// epoch updates its timestamp instead of duplicating it.
    async fn add_history_entry(&self, epoch: &Epoch, timestamp: i64) -> Result<(), TickerError>;

    /// Number of entries currently held in history.
    async fn history_size(&self) -> Result<usize, TickerError>;

    /// Remove the oldest entries until at most `keep_at_most` remain.
    /// Returns how many entries were removed.
    async fn evict_oldest_history(&self, keep_at_most: usize) -> Result<usize, TickerError>;

    /// Up to `limit` history entries, newest first.
    async fn recent_history(&self, limit: usize) -> Result<Vec<HistoryEntry>, TickerError>;
}
