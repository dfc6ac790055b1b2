//! The per-queue manager loop (spec §4.5).

use std::path::Path;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use config::QueueConfig;
use control::ControlRecord;
use spool::{SlotState, SpoolQueue};

use crate::stats::QueueStats;

/// A borrowed view of the slot a hop is about to process, handed to the
/// hop-execution callback so [`QueueManager::step`] stays independent of
/// `daemon`'s RPC/transport machinery.
pub struct HopSlot<'a> {
    /// Slot number.
    pub slot: u64,
    /// Absolute path to the slot directory.
    pub path: &'a Path,
    /// The slot's parsed control record.
    pub control: &'a ControlRecord,
}

/// One queue's lifecycle state (spec §4.5 "States").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Ready to pick up work.
    Active,
    /// Currently processing a slot.
    Running,
    /// No work, sleeping.
    Waiting,
    /// Externally suspended: refuses new work, finishes the current slot.
    Paused,
    /// Terminal: drains and exits.
    Shutdown,
    /// Terminal: exits for the supervisor to restart.
    Respawn,
    /// Terminal: gave up.
    Killed,
}

impl QueueState {
    /// Terminal states never transition back to `Active`/`Paused`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Shutdown | Self::Respawn | Self::Killed)
    }
}

/// The constant backoff between retries of the same slot (spec §4.5
/// "Backoff policy": "~2 s... no exponential growth").
pub const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// What the manager loop should do after one iteration, reported back to
/// the caller driving the loop (kept separate from the loop itself so
/// tests can single-step it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Nothing to do right now; sleep briefly and retry.
    NoWork,
    /// Slot was still `_lock`ed (ingest in flight); retry shortly.
    SlotLocked,
    /// An `ERR`-marked or uncontrolled slot was skipped forward.
    Skipped,
    /// The hop to downstream succeeded; `current` advanced.
    Advanced,
    /// The hop failed; `current` left unchanged, caller should back off.
    HopFailed,
    /// The queue is in a terminal state; the caller should stop looping.
    Stopped,
}

/// One long-lived worker for one queue (spec §4.5).
pub struct QueueManager {
    /// The queue's static configuration.
    pub config: QueueConfig,
    /// The on-disk spool backing this queue.
    pub spool: SpoolQueue,
    /// Aggregated throughput counters.
    pub stats: QueueStats,
    state: Mutex<QueueState>,
    state_changed: Condvar,
}

impl QueueManager {
    /// Creates a manager in the `active` state.
    pub fn new(config: QueueConfig, spool: SpoolQueue) -> Self {
        Self {
            config,
            spool,
            stats: QueueStats::default(),
            state: Mutex::new(QueueState::Active),
            state_changed: Condvar::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> QueueState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, new_state: QueueState) {
        let mut state = self.state.lock().unwrap();
        *state = new_state;
        self.state_changed.notify_all();
    }

    /// `startQueue`: active↔paused transition (spec §4.5). A no-op if
    /// already active (spec §8 "Round-trip and idempotence").
    pub fn start(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == QueueState::Paused {
            *state = QueueState::Active;
            self.state_changed.notify_all();
        }
    }

    /// `pauseQueue`/`stopQueue`: stop picking up new work, finish the
    /// current hop. A no-op if already paused.
    pub fn pause(&self) {
        let mut state = self.state.lock().unwrap();
        if !state.is_terminal() {
            *state = QueueState::Paused;
            self.state_changed.notify_all();
        }
    }

    /// `shutdownQueue`: terminal, drains and exits.
    pub fn shutdown(&self) {
        self.set_state(QueueState::Shutdown);
    }

    /// Supervisor hook: observed `killed`, re-enters `respawn`.
    pub fn respawn(&self) {
        self.set_state(QueueState::Respawn);
    }

    /// Observed by the supervisor when the manager gives up entirely.
    pub fn mark_killed(&self) {
        self.set_state(QueueState::Killed);
    }

    /// `pokeQueue`: force-skip the current slot without delivering it
    /// (spec §4.5 "Poison handling").
    pub fn poke(&self) -> Result<u64, spool::SpoolError> {
        let new_current = self.spool.poke()?;
        self.stats.record_failure();
        Ok(new_current)
    }

    /// One iteration of the main loop (spec §4.5 pseudocode), with the
    /// actual network hop delegated to `hop` so this function stays
    /// deterministic and unit-testable.
    pub fn step(&self, hop: &dyn Fn(&QueueManager, &HopSlot<'_>) -> bool) -> StepOutcome {
        let state = self.state();
        if state.is_terminal() {
            return StepOutcome::Stopped;
        }
        if state == QueueState::Paused {
            return StepOutcome::NoWork;
        }

        let backlog_empty = match (self.spool.current(), self.spool.next()) {
            (Ok(current), Ok(next)) => current >= next,
            _ => true,
        };
        if backlog_empty {
            return StepOutcome::NoWork;
        }

        self.set_state(QueueState::Running);
        let slot_state = match self.spool.read_current_slot() {
            Ok(slot_state) => slot_state,
            Err(_) => {
                self.set_state(QueueState::Active);
                return StepOutcome::HopFailed;
            }
        };

        let outcome = match slot_state {
            SlotState::Empty => StepOutcome::NoWork,
            SlotState::Locked { .. } => StepOutcome::SlotLocked,
            SlotState::Err { .. } => {
                let _ = self.spool.advance_current();
                self.stats.record_failure();
                StepOutcome::Skipped
            }
            SlotState::Ready { path, control } => {
                let current = self.spool.current().unwrap_or(0);
                let handle = HopSlot {
                    slot: current,
                    path: &path,
                    control: &control,
                };
                if hop(self, &handle) {
                    let _ = self.spool.advance_current();
                    self.stats.record_success(&control.original_name, control.file_size);
                    StepOutcome::Advanced
                } else {
                    StepOutcome::HopFailed
                }
            }
        };

        if !self.state().is_terminal() {
            self.set_state(QueueState::Active);
        }
        outcome
    }
}
