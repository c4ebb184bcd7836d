// crates/ticker-store/src/rocks.rs
//
// RocksDB-backed persistent storage for the epoch checkpoint and history.
//
// See `keys.rs` for the key layout. History insertions and evictions touch
// both the score-ordered key and the member index, so each one is written as
// a single `WriteBatch` and applies fully or not at all.

use async_trait::async_trait;
use rocksdb::{DBWithThreadMode, Direction, IteratorMode, MultiThreaded, Options, WriteBatch};

use ticker_core::traits::EpochStore;
use ticker_core::{Epoch, HistoryEntry, TickerError};

use crate::keys::{decode_member, decode_score, encode_member, StoreKeys};

/// RocksDB wrapper implementing the `EpochStore` trait.
#[derive(Debug)]
pub struct RocksEpochStore {
    db: DBWithThreadMode<MultiThreaded>,
    keys: StoreKeys,
}

impl RocksEpochStore {
    /// Open a RocksDB database at the given filesystem path.
    ///
    /// Creates the database directory if it does not exist. All keys are
    /// prefixed with `namespace`.
    pub fn open(path: &str, namespace: &str) -> Result<Self, TickerError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DBWithThreadMode::<MultiThreaded>::open(&opts, path).map_err(|e| {
            TickerError::Storage(format!("Failed to open RocksDB at {}: {}", path, e))
        })?;

        tracing::debug!("Opened epoch store at {} (namespace={})", path, namespace);

        Ok(Self {
            db,
            keys: StoreKeys::new(namespace),
        })
    }

    /// Get raw bytes from RocksDB, mapping errors to TickerError::Storage.
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TickerError> {
        self.db
            .get(key)
            .map_err(|e| TickerError::Storage(format!("RocksDB get failed: {}", e)))
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), TickerError> {
        self.db
            .write(batch)
            .map_err(|e| TickerError::Storage(format!("RocksDB batch write failed: {}", e)))
    }

    /// Score-ordered history entries, oldest first, as `(key, member)` pairs.
    fn history_keys_ascending(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, TickerError> {
        let prefix = self.keys.history_score_prefix();
        let mut out = Vec::new();

        for item in self.db.prefix_iterator(&prefix) {
            let (key, value) = item
                .map_err(|e| TickerError::Storage(format!("RocksDB iteration error: {}", e)))?;

            // Stop when the prefix no longer matches.
            if !key.starts_with(&prefix) {
                break;
            }
            out.push((key.to_vec(), value.to_vec()));
        }

        Ok(out)
    }
}

#[async_trait]
impl EpochStore for RocksEpochStore {
    async fn get_checkpoint(&self) -> Result<Option<u64>, TickerError> {
        match self.get_raw(&self.keys.checkpoint())? {
            Some(bytes) => {
                let text = std::str::from_utf8(&bytes).map_err(|e| {
                    TickerError::Serialization(format!("Checkpoint is not UTF-8: {}", e))
                })?;
                let height = text.trim().parse::<u64>().map_err(|e| {
                    TickerError::Serialization(format!("Invalid checkpoint {:?}: {}", text, e))
                })?;
                Ok(Some(height))
            }
            None => Ok(None),
        }
    }

    async fn set_checkpoint(&self, height: u64) -> Result<(), TickerError> {
        self.db
            .put(self.keys.checkpoint(), height.to_string().as_bytes())
            .map_err(|e| TickerError::Storage(format!("RocksDB put failed: {}", e)))
    }

    async fn add_history_entry(&self, epoch: &Epoch, timestamp: i64) -> Result<(), TickerError> {
        let member = encode_member(epoch)?;
        let member_key = self.keys.history_member(&member);

        let mut batch = WriteBatch::default();

        // Re-adding a member moves it to its new score.
        if let Some(previous) = self.get_raw(&member_key)? {
            let previous = std::str::from_utf8(&previous)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or_else(|| {
                    TickerError::Serialization(format!("Corrupt history index for {}", member))
                })?;
            batch.delete(self.keys.history_score(previous, epoch.begin, &member));
        }

        batch.put(
            self.keys.history_score(timestamp, epoch.begin, &member),
            member.as_bytes(),
        );
        batch.put(&member_key, timestamp.to_string().as_bytes());
        self.write_batch(batch)
    }

    async fn history_size(&self) -> Result<usize, TickerError> {
        Ok(self.history_keys_ascending()?.len())
    }

    async fn evict_oldest_history(&self, keep_at_most: usize) -> Result<usize, TickerError> {
        let entries = self.history_keys_ascending()?;
        if entries.len() <= keep_at_most {
            return Ok(0);
        }

        let excess = entries.len() - keep_at_most;
        let mut batch = WriteBatch::default();
        for (score_key, member) in entries.iter().take(excess) {
            let member = std::str::from_utf8(member).map_err(|e| {
                TickerError::Serialization(format!("History member is not UTF-8: {}", e))
            })?;
            batch.delete(score_key);
            batch.delete(self.keys.history_member(member));
        }
        self.write_batch(batch)?;

        Ok(excess)
    }

    async fn recent_history(&self, limit: usize) -> Result<Vec<HistoryEntry>, TickerError> {
        let prefix = self.keys.history_score_prefix();
        let upper = self.keys.history_score_upper_bound();
        let mut out = Vec::with_capacity(limit.min(64));

        for item in self
            .db
            .iterator(IteratorMode::From(upper.as_slice(), Direction::Reverse))
        {
            if out.len() >= limit {
                break;
            }
            let (key, value) = item
                .map_err(|e| TickerError::Storage(format!("RocksDB iteration error: {}", e)))?;
            if &*key >= upper.as_slice() {
                continue;
            }
            if !key.starts_with(&prefix) {
                break;
            }
            out.push(HistoryEntry {
                epoch: decode_member(&value)?,
                timestamp: decode_score(&key, &prefix)?,
            });
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db_path(label: &str) -> String {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("ticker_store_{}_{}", label, uuid::Uuid::now_v7()));
        path.to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn checkpoint_round_trips_and_overwrites() {
        let store = RocksEpochStore::open(&temp_db_path("checkpoint"), "test").unwrap();
        assert_eq!(store.get_checkpoint().await.unwrap(), None);

        store.set_checkpoint(109).await.unwrap();
        assert_eq!(store.get_checkpoint().await.unwrap(), Some(109));

        store.set_checkpoint(119).await.unwrap();
        assert_eq!(store.get_checkpoint().await.unwrap(), Some(119));
    }

    #[tokio::test]
    async fn checkpoint_survives_reopen() {
        let path = temp_db_path("reopen");
        {
            let store = RocksEpochStore::open(&path, "test").unwrap();
            store.set_checkpoint(4_200).await.unwrap();
            store
                .add_history_entry(&Epoch::new(4_191, 4_200), 1_000)
                .await
                .unwrap();
        }
        let store = RocksEpochStore::open(&path, "test").unwrap();
        assert_eq!(store.get_checkpoint().await.unwrap(), Some(4_200));
        assert_eq!(store.history_size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let path = temp_db_path("namespaces");
        let store_a = RocksEpochStore::open(&path, "a").unwrap();
        store_a.set_checkpoint(10).await.unwrap();
        store_a
            .add_history_entry(&Epoch::new(1, 10), 1)
            .await
            .unwrap();
        drop(store_a);

        let store_b = RocksEpochStore::open(&path, "b").unwrap();
        assert_eq!(store_b.get_checkpoint().await.unwrap(), None);
        assert_eq!(store_b.history_size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn readding_member_updates_score() {
        let store = RocksEpochStore::open(&temp_db_path("upsert"), "test").unwrap();
        let epoch = Epoch::new(100, 109);

        store.add_history_entry(&epoch, 10).await.unwrap();
        store.add_history_entry(&epoch, 20).await.unwrap();

        assert_eq!(store.history_size().await.unwrap(), 1);
        let recent = store.recent_history(10).await.unwrap();
        assert_eq!(recent, vec![HistoryEntry { epoch, timestamp: 20 }]);
    }

    #[tokio::test]
    async fn eviction_removes_oldest_first() {
        let store = RocksEpochStore::open(&temp_db_path("evict"), "test").unwrap();
        for i in 0..6u64 {
            let begin = 100 + i * 10;
            store
                .add_history_entry(&Epoch::new(begin, begin + 9), 1_000 + i as i64)
                .await
                .unwrap();
        }

        let removed = store.evict_oldest_history(4).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.history_size().await.unwrap(), 4);

        let recent = store.recent_history(10).await.unwrap();
        let begins: Vec<u64> = recent.iter().map(|e| e.epoch.begin).collect();
        assert_eq!(begins, vec![150, 140, 130, 120]);

        // Evicted members can be re-added as fresh entries.
        store
            .add_history_entry(&Epoch::new(100, 109), 2_000)
            .await
            .unwrap();
        assert_eq!(store.history_size().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn same_second_eviction_keeps_highest_epoch() {
        let store = RocksEpochStore::open(&temp_db_path("same_second"), "test").unwrap();
        store
            .add_history_entry(&Epoch::new(990, 999), 60)
            .await
            .unwrap();
        store
            .add_history_entry(&Epoch::new(1_000, 1_009), 60)
            .await
            .unwrap();

        assert_eq!(store.evict_oldest_history(1).await.unwrap(), 1);
        let recent = store.recent_history(5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].epoch, Epoch::new(1_000, 1_009));
        assert_eq!(recent[0].timestamp, 60);
    }

    #[tokio::test]
    async fn eviction_below_bound_is_noop() {
        let store = RocksEpochStore::open(&temp_db_path("noop"), "test").unwrap();
        store
            .add_history_entry(&Epoch::new(1, 10), 1)
            .await
            .unwrap();
        assert_eq!(store.evict_oldest_history(5).await.unwrap(), 0);
        assert_eq!(store.history_size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn recent_history_respects_limit() {
        let store = RocksEpochStore::open(&temp_db_path("limit"), "test").unwrap();
        for i in 0..5u64 {
            store
                .add_history_entry(&Epoch::new(i * 10, i * 10 + 9), i as i64)
                .await
                .unwrap();
        }
        let recent = store.recent_history(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].epoch, Epoch::new(40, 49));
        assert_eq!(recent[1].epoch, Epoch::new(30, 39));
    }

    #[tokio::test]
    async fn corrupt_checkpoint_is_serialization_error() {
        let store = RocksEpochStore::open(&temp_db_path("corrupt"), "test").unwrap();
        store
            .db
            .put(store.keys.checkpoint(), b"not-a-number")
            .unwrap();
        match store.get_checkpoint().await {
            Err(TickerError::Serialization(msg)) => assert!(msg.contains("Invalid checkpoint")),
            other => panic!("Expected Serialization error, got: {:?}", other),
        }
    }
}
