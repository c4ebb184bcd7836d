// crates/ticker-store/src/lib.rs
//
// ticker-store: Storage layer for the epoch ticker.
//
// Provides the RocksDB-backed checkpoint and epoch-history store used in
// production and simulation, plus an in-memory store with the same
// sorted-set semantics for tests and dry runs.

pub mod keys;
pub mod memory;
pub mod rocks;

// Re-export key types for ergonomic access from downstream crates.
pub use keys::StoreKeys;
pub use memory::MemoryEpochStore;
pub use rocks::RocksEpochStore;
