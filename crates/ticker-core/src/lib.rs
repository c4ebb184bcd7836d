// crates/ticker-core/src/lib.rs
//
// ticker-core: Core types, traits, and block-range chunking for the epoch ticker.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines the epoch data structures, the error type, the chunker, and the
// trait interfaces for the chain head client and the durable epoch store.

pub mod chunk;
pub mod epoch;
pub mod error;
pub mod traits;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use ticker_core::Epoch;`

pub use chunk::{chunks, BlockChunk, Chunks};
pub use epoch::{Epoch, HistoryEntry};
pub use error::TickerError;
pub use traits::{ChainHeadClient, EpochStore};
