// crates/ticker-scheduler/src/ticker.rs
//
// EpochTicker: the epoch generation control loop.
//
// Per iteration:
//   1. poll the chain head (retry forever with `block_time` backoff)
//   2. seed `begin` from the head if nothing else provided one
//   3. wait proportionally if fewer than `epoch_height` confirmed blocks exist
//   4. chunk `[begin, head - head_offset]`, emitting each full window with a
//      checkpoint and a history entry, pacing emissions by `epoch_interval`
//
// The trailing short window is never emitted; `begin` is reset to its start
// so those blocks are picked up by the next poll. Shutdown is observed at the
// top of each iteration and between emissions, never inside one.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use ticker_core::traits::{ChainHeadClient, EpochStore};
use ticker_core::{chunks, Epoch, TickerError};

use crate::backpressure::{assess_range, RangeReadiness};
use crate::shutdown::ShutdownCoordinator;
use crate::state::{TickerState, TickerStateMachine};

/// Loop parameters, built once at startup.
#[derive(Debug, Clone)]
pub struct TickerSettings {
    /// Blocks per epoch.
    pub epoch_height: u64,
    /// Confirmation margin subtracted from the reported head.
    pub head_offset: u64,
    /// Source chain block time in seconds; unit of every backoff.
    pub block_time_secs: u64,
    /// Maximum number of retained history entries.
    pub history_length: usize,
    /// Fixed pause after each emitted epoch.
    pub epoch_interval: Duration,
    /// Explicit start height. Ignored when a checkpoint exists.
    pub begin_block: Option<u64>,
    /// Initial end bound from the command line, replaced on the first full range.
    pub end_block: Option<u64>,
    /// Stop after this many emissions (simulation mode).
    pub emission_cap: Option<u64>,
}

impl TickerSettings {
    fn block_time(&self) -> Duration {
        Duration::from_secs(self.block_time_secs)
    }
}

/// Process-local loop state. Only the checkpoint and history outlive it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    pub begin_block_epoch: Option<u64>,
    pub end_block_epoch: Option<u64>,
    /// Epochs emitted by this process.
    pub generated_block_counter: u64,
    /// End of the last epoch emitted by this process.
    pub last_sent_block: Option<u64>,
    /// Last value this process wrote (or read) as the checkpoint.
    pub persisted_checkpoint: Option<u64>,
}

/// Unix timestamps that advance with the runtime clock from a wall-clock
/// anchor, so history scores never go backwards within one run.
#[derive(Debug, Clone, Copy)]
struct EmissionClock {
    wall: DateTime<Utc>,
    started: Instant,
}

impl EmissionClock {
    fn new() -> Self {
        Self {
            wall: Utc::now(),
            started: Instant::now(),
        }
    }

    fn now_unix(&self) -> i64 {
        let elapsed = chrono::Duration::from_std(self.started.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        (self.wall + elapsed).timestamp()
    }
}

/// The epoch generation loop.
pub struct EpochTicker {
    settings: TickerSettings,
    chain: Arc<dyn ChainHeadClient>,
    store: Arc<dyn EpochStore>,
    shutdown: ShutdownCoordinator,
    state: TickerStateMachine,
    run: RunState,
    clock: EmissionClock,
}

impl EpochTicker {
    pub fn new(
        settings: TickerSettings,
        chain: Arc<dyn ChainHeadClient>,
        store: Arc<dyn EpochStore>,
        shutdown: ShutdownCoordinator,
    ) -> Self {
        let run = RunState {
            end_block_epoch: settings.end_block,
            ..RunState::default()
        };
        Self {
            settings,
            chain,
            store,
            shutdown,
            state: TickerStateMachine::new(),
            run,
            clock: EmissionClock::new(),
        }
    }

    pub fn run_state(&self) -> &RunState {
        &self.run
    }

    pub fn state(&self) -> TickerState {
        self.state.current
    }

    /// Run the loop to completion, then make a best-effort final checkpoint
    /// write whichever way the loop ended.
    ///
    /// Returns the loop's error, if any. Errors from the final write are
    /// logged and swallowed.
    pub async fn run(&mut self) -> Result<(), TickerError> {
        tracing::info!(
            "Epoch ticker started (epoch_height={}, head_offset={}, block_time={}s)",
            self.settings.epoch_height,
            self.settings.head_offset,
            self.settings.block_time_secs
        );

        let result = self.run_loop().await;
        if let Err(e) = &result {
            tracing::error!("Epoch ticker stopped: {}", e);
        }

        self.transition(TickerState::ShuttingDown);
        self.persist_final_checkpoint().await;
        self.transition(TickerState::Terminated);

        result
    }

    async fn run_loop(&mut self) -> Result<(), TickerError> {
        self.state.transition(TickerState::Recovering)?;
        self.recover().await?;

        loop {
            if self.shutdown.is_requested() {
                tracing::info!("Shutdown requested, leaving epoch loop");
                return Ok(());
            }
            if self.cap_reached() {
                tracing::info!(
                    "Emission cap of {} reached, leaving epoch loop",
                    self.run.generated_block_counter
                );
                return Ok(());
            }

            let head = match self.chain.current_height().await {
                Ok(head) => head,
                Err(e) if e.is_retryable() => {
                    tracing::error!(
                        "Unable to fetch latest block number: {}. Retrying after {} seconds.",
                        e,
                        self.settings.block_time_secs
                    );
                    self.pause(self.settings.block_time()).await;
                    continue;
                }
                Err(e) => return Err(e),
            };
            tracing::debug!("Got current head of chain: {}", head);

            let Some(begin) = self.run.begin_block_epoch else {
                self.state.transition(TickerState::Seeding)?;
                self.run.begin_block_epoch = Some(head);
                tracing::info!(
                    "Begin of epoch not set, anchoring to current head of chain: {}",
                    head
                );
                self.pause(self.settings.block_time()).await;
                continue;
            };

            match assess_range(
                begin,
                head,
                self.settings.epoch_height,
                self.settings.head_offset,
                self.settings.block_time_secs,
            ) {
                RangeReadiness::Accumulating {
                    end,
                    missing,
                    delay,
                } => {
                    self.state.transition(TickerState::Accumulating)?;
                    self.run.end_block_epoch = u64::try_from(end).ok();
                    tracing::debug!(
                        "Confirmed head at block {} after offsetting | {} - {} is short of epoch \
                         length {}. Sleeping for {} seconds for {} blocks to accumulate",
                        end,
                        begin,
                        end,
                        self.settings.epoch_height,
                        delay.as_secs(),
                        missing
                    );
                    self.pause(delay).await;
                }
                RangeReadiness::Ready { end } => {
                    self.state.transition(TickerState::Emitting)?;
                    self.run.end_block_epoch = Some(end);
                    self.emit_range(begin, end).await?;
                }
            }
        }
    }

    /// Resume from the durable checkpoint, which always wins over an
    /// explicit begin height.
    async fn recover(&mut self) -> Result<(), TickerError> {
        match self.store.get_checkpoint().await? {
            Some(checkpoint) => {
                if let Some(explicit) = self.settings.begin_block {
                    tracing::info!(
                        "Checkpoint {} found; ignoring configured begin block {}",
                        checkpoint,
                        explicit
                    );
                }
                let begin = checkpoint.saturating_add(1);
                tracing::info!(
                    "Resuming from checkpoint {}, next epoch begins at block {}",
                    checkpoint,
                    begin
                );
                self.run.begin_block_epoch = Some(begin);
                self.run.persisted_checkpoint = Some(checkpoint);
            }
            None => {
                match self.settings.begin_block {
                    Some(begin) => tracing::info!("No checkpoint found, starting at block {}", begin),
                    None => tracing::info!("No checkpoint or begin block, will seed from chain head"),
                }
                self.run.begin_block_epoch = self.settings.begin_block;
            }
        }
        Ok(())
    }

    async fn emit_range(&mut self, begin: u64, end: u64) -> Result<(), TickerError> {
        tracing::debug!(
            "Chunking blocks between {} - {} with chunk size: {}",
            begin,
            end,
            self.settings.epoch_height
        );

        for chunk in chunks(begin, end, self.settings.epoch_height) {
            if chunk.len() < self.settings.epoch_height {
                tracing::debug!(
                    "Skipping chunk of blocks {} - {} as minimum epoch size not satisfied | \
                     Resetting chunking to begin from block {}",
                    chunk.begin,
                    chunk.end,
                    chunk.begin
                );
                self.run.begin_block_epoch = Some(chunk.begin);
                break;
            }

            if self.shutdown.is_requested() {
                break;
            }

            self.emit(Epoch::new(chunk.begin, chunk.end)).await?;
            self.run.begin_block_epoch = Some(chunk.end.saturating_add(1));

            if self.cap_reached() {
                break;
            }

            tracing::debug!(
                "Waiting to push next epoch in {} seconds...",
                self.settings.epoch_interval.as_secs()
            );
            self.pause(self.settings.epoch_interval).await;
        }

        Ok(())
    }

    /// Publish one epoch: checkpoint, history entry, eviction.
    async fn emit(&mut self, epoch: Epoch) -> Result<(), TickerError> {
        self.run.generated_block_counter += 1;
        tracing::info!("Emitting epoch {}", epoch);

        self.store.set_checkpoint(epoch.end).await?;
        self.run.persisted_checkpoint = Some(epoch.end);

        self.store
            .add_history_entry(&epoch, self.clock.now_unix())
            .await?;

        let history_len = self.store.history_size().await?;
        if history_len > self.settings.history_length {
            let removed = self
                .store
                .evict_oldest_history(self.settings.history_length)
                .await?;
            tracing::debug!("Evicted {} oldest epochs from history", removed);
        }

        self.run.last_sent_block = Some(epoch.end);
        Ok(())
    }

    async fn persist_final_checkpoint(&mut self) {
        let Some(last) = self.run.last_sent_block else {
            tracing::debug!("No epoch emitted in this run, nothing to persist");
            return;
        };
        if self.run.persisted_checkpoint == Some(last) {
            tracing::info!(
                "Last epoch ended at block {}; next run begins at block {}",
                last,
                last.saturating_add(1)
            );
            return;
        }

        // `emit` persists before it records a send, so this write only runs
        // when the two have diverged outside the normal emission path.
        match self.store.set_checkpoint(last).await {
            Ok(()) => {
                self.run.persisted_checkpoint = Some(last);
                tracing::info!(
                    "Saved last epoch end {} as checkpoint; next run begins at block {}",
                    last,
                    last.saturating_add(1)
                );
            }
            Err(e) => tracing::error!("Error while saving last state: {}", e),
        }
    }

    fn cap_reached(&self) -> bool {
        self.settings
            .emission_cap
            .is_some_and(|cap| self.run.generated_block_counter >= cap)
    }

    /// Sleep for `duration`, waking early if shutdown is requested.
    async fn pause(&self, duration: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.shutdown.requested() => {}
        }
    }

    /// Transition on the shutdown path, where an invalid move is only logged.
    fn transition(&mut self, state: TickerState) {
        if let Err(e) = self.state.transition(state) {
            tracing::warn!("{}", e);
        }
    }
}
