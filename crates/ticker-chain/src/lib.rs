// crates/ticker-chain/src/lib.rs
//
// ticker-chain: Source-chain access for the epoch ticker.
//
// Provides the HTTP JSON-RPC client that reads the chain head height from a
// set of RPC endpoints with a bounded retry budget.

pub mod rpc;

pub use rpc::{parse_block_number, RpcHeadClient};
