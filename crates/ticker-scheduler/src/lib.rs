// crates/ticker-scheduler/src/lib.rs
//
// ticker-scheduler: The epoch generation control loop.
//
// Polls the chain head, waits for enough confirmed blocks, chunks the
// eligible range into fixed-size epochs, and publishes each one to the epoch
// store with a checkpoint. Shutdown is cooperative through a shared
// cancellation flag set by the signal listener.

pub mod backpressure;
pub mod shutdown;
pub mod state;
pub mod ticker;

pub use backpressure::{assess_range, RangeReadiness};
pub use shutdown::{listen_for_signals, ShutdownCoordinator};
pub use state::{TickerState, TickerStateMachine};
pub use ticker::{EpochTicker, RunState, TickerSettings};
