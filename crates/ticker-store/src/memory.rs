// crates/ticker-store/src/memory.rs
//
// In-memory epoch store with the same semantics as the RocksDB store:
// history is a sorted set keyed by (timestamp, begin height, member JSON),
// and re-adding a member moves it to its new timestamp.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use ticker_core::traits::EpochStore;
use ticker_core::{Epoch, HistoryEntry, TickerError};

use crate::keys::{decode_member, encode_member};

#[derive(Debug, Default)]
struct Inner {
    checkpoint: Option<u64>,
    by_score: BTreeSet<(i64, u64, String)>,
    members: HashMap<String, i64>,
}

/// Process-local `EpochStore`. Contents are lost when the value is dropped.
#[derive(Debug, Default)]
pub struct MemoryEpochStore {
    inner: RwLock<Inner>,
}

impl MemoryEpochStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a checkpoint, as after a restart.
    pub fn with_checkpoint(height: u64) -> Self {
        let inner = Inner {
            checkpoint: Some(height),
            ..Inner::default()
        };
        Self {
            inner: RwLock::new(inner),
        }
    }
}

#[async_trait]
impl EpochStore for MemoryEpochStore {
    async fn get_checkpoint(&self) -> Result<Option<u64>, TickerError> {
        Ok(self.inner.read().await.checkpoint)
    }

    async fn set_checkpoint(&self, height: u64) -> Result<(), TickerError> {
        self.inner.write().await.checkpoint = Some(height);
        Ok(())
    }

    async fn add_history_entry(&self, epoch: &Epoch, timestamp: i64) -> Result<(), TickerError> {
        let member = encode_member(epoch)?;
        let mut inner = self.inner.write().await;
        if let Some(previous) = inner.members.insert(member.clone(), timestamp) {
            inner.by_score.remove(&(previous, epoch.begin, member.clone()));
        }
        inner.by_score.insert((timestamp, epoch.begin, member));
        Ok(())
    }

    async fn history_size(&self) -> Result<usize, TickerError> {
        Ok(self.inner.read().await.by_score.len())
    }

    async fn evict_oldest_history(&self, keep_at_most: usize) -> Result<usize, TickerError> {
        let mut inner = self.inner.write().await;
        let mut removed = 0;
        while inner.by_score.len() > keep_at_most {
            if let Some((_, _, member)) = inner.by_score.pop_first() {
                inner.members.remove(&member);
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn recent_history(&self, limit: usize) -> Result<Vec<HistoryEntry>, TickerError> {
        let inner = self.inner.read().await;
        inner
            .by_score
            .iter()
            .rev()
            .take(limit)
            .map(|(timestamp, _, member)| {
                Ok(HistoryEntry {
                    epoch: decode_member(member.as_bytes())?,
                    timestamp: *timestamp,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_empty() {
        let store = MemoryEpochStore::new();
        assert_eq!(store.get_checkpoint().await.unwrap(), None);
        assert_eq!(store.history_size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn with_checkpoint_seeds_value() {
        let store = MemoryEpochStore::with_checkpoint(99);
        assert_eq!(store.get_checkpoint().await.unwrap(), Some(99));
    }

    #[tokio::test]
    async fn eviction_keeps_newest() {
        let store = MemoryEpochStore::new();
        store.add_history_entry(&Epoch::new(1, 10), 30).await.unwrap();
        store.add_history_entry(&Epoch::new(11, 20), 10).await.unwrap();
        store.add_history_entry(&Epoch::new(21, 30), 20).await.unwrap();

        assert_eq!(store.evict_oldest_history(2).await.unwrap(), 1);
        let recent = store.recent_history(5).await.unwrap();
        let epochs: Vec<Epoch> = recent.iter().map(|e| e.epoch).collect();
        // Ordering follows the score, not insertion order.
        assert_eq!(epochs, vec![Epoch::new(1, 10), Epoch::new(21, 30)]);
    }

    #[tokio::test]
    async fn same_second_eviction_keeps_highest_epoch() {
        let store = MemoryEpochStore::new();
        store.add_history_entry(&Epoch::new(990, 999), 60).await.unwrap();
        store.add_history_entry(&Epoch::new(1_000, 1_009), 60).await.unwrap();

        assert_eq!(store.evict_oldest_history(1).await.unwrap(), 1);
        let recent = store.recent_history(5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].epoch, Epoch::new(1_000, 1_009));
    }

    #[tokio::test]
    async fn readding_member_updates_score() {
        let store = MemoryEpochStore::new();
        let epoch = Epoch::new(5, 9);
        store.add_history_entry(&epoch, 1).await.unwrap();
        store.add_history_entry(&epoch, 2).await.unwrap();
        assert_eq!(store.history_size().await.unwrap(), 1);
        assert_eq!(store.recent_history(1).await.unwrap()[0].timestamp, 2);
    }
}
