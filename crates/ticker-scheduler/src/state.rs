// crates/ticker-scheduler/src/state.rs
//
// Ticker state machine.
//
// Valid transitions:
//   Initializing -> Recovering -> Seeding | Accumulating | Emitting
//   Seeding -> Accumulating | Emitting
//   Accumulating <-> Emitting
//   Any state -> ShuttingDown -> Terminated

use std::fmt;

use ticker_core::TickerError;

/// Lifecycle states of the epoch ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerState {
    /// Process started, store connection not yet consulted.
    Initializing,
    /// Reading the durable checkpoint.
    Recovering,
    /// No begin height known; anchoring to the current head.
    Seeding,
    /// Waiting for enough confirmed blocks to form a full epoch.
    Accumulating,
    /// Chunking the eligible range and publishing epochs.
    Emitting,
    /// Shutdown requested or loop finished; final checkpoint pending.
    ShuttingDown,
    /// Loop exited.
    Terminated,
}

impl fmt::Display for TickerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickerState::Initializing => write!(f, "Initializing"),
            TickerState::Recovering => write!(f, "Recovering"),
            TickerState::Seeding => write!(f, "Seeding"),
            TickerState::Accumulating => write!(f, "Accumulating"),
            TickerState::Emitting => write!(f, "Emitting"),
            TickerState::ShuttingDown => write!(f, "ShuttingDown"),
            TickerState::Terminated => write!(f, "Terminated"),
        }
    }
}

/// State machine for managing ticker lifecycle transitions.
#[derive(Debug)]
pub struct TickerStateMachine {
    pub current: TickerState,
}

impl TickerStateMachine {
    /// Create a new state machine starting in the Initializing state.
    pub fn new() -> Self {
        Self {
            current: TickerState::Initializing,
        }
    }

    /// Attempt to transition to a new state.
    ///
    /// Re-entering the current state is a silent no-op. Returns an error if
    /// the transition is not valid.
    pub fn transition(&mut self, new_state: TickerState) -> Result<(), TickerError> {
        if new_state == self.current {
            return Ok(());
        }

        let valid = match (self.current, new_state) {
            (TickerState::Terminated, _) => false,
            // Any live state can begin shutting down.
            (_, TickerState::ShuttingDown) => true,
            (TickerState::ShuttingDown, TickerState::Terminated) => true,
            (TickerState::Initializing, TickerState::Recovering) => true,
            (
                TickerState::Recovering,
                TickerState::Seeding | TickerState::Accumulating | TickerState::Emitting,
            ) => true,
            (TickerState::Seeding, TickerState::Accumulating | TickerState::Emitting) => true,
            (TickerState::Accumulating, TickerState::Emitting) => true,
            (TickerState::Emitting, TickerState::Accumulating) => true,
            _ => false,
        };

        if valid {
            tracing::info!("State transition: {} -> {}", self.current, new_state);
            self.current = new_state;
            Ok(())
        } else {
            Err(TickerError::InvalidState(format!(
                "Invalid state transition: {} -> {}",
                self.current, new_state
            )))
        }
    }
}

impl Default for TickerStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_start_path() {
        let mut sm = TickerStateMachine::new();
        sm.transition(TickerState::Recovering).unwrap();
        sm.transition(TickerState::Seeding).unwrap();
        sm.transition(TickerState::Accumulating).unwrap();
        sm.transition(TickerState::Emitting).unwrap();
        sm.transition(TickerState::Accumulating).unwrap();
        sm.transition(TickerState::ShuttingDown).unwrap();
        sm.transition(TickerState::Terminated).unwrap();
        assert_eq!(sm.current, TickerState::Terminated);
    }

    #[test]
    fn recovery_can_emit_immediately() {
        let mut sm = TickerStateMachine::new();
        sm.transition(TickerState::Recovering).unwrap();
        sm.transition(TickerState::Emitting).unwrap();
        assert_eq!(sm.current, TickerState::Emitting);
    }

    #[test]
    fn same_state_is_noop() {
        let mut sm = TickerStateMachine::new();
        sm.transition(TickerState::Recovering).unwrap();
        sm.transition(TickerState::Emitting).unwrap();
        sm.transition(TickerState::Emitting).unwrap();
        assert_eq!(sm.current, TickerState::Emitting);
    }

    #[test]
    fn cannot_seed_twice() {
        let mut sm = TickerStateMachine::new();
        sm.transition(TickerState::Recovering).unwrap();
        sm.transition(TickerState::Seeding).unwrap();
        sm.transition(TickerState::Emitting).unwrap();
        assert!(sm.transition(TickerState::Seeding).is_err());
    }

    #[test]
    fn cannot_skip_recovery() {
        let mut sm = TickerStateMachine::new();
        let err = sm.transition(TickerState::Emitting).unwrap_err();
        assert!(err.to_string().contains("Initializing -> Emitting"));
    }

    #[test]
    fn shutdown_from_any_live_state() {
        let mut sm = TickerStateMachine::new();
        sm.transition(TickerState::ShuttingDown).unwrap();
        sm.transition(TickerState::Terminated).unwrap();
        assert!(sm.transition(TickerState::ShuttingDown).is_err());
        assert!(sm.transition(TickerState::Recovering).is_err());
    }
}
