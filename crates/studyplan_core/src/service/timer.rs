//! Per-task elapsed-time tracking.
//!
//! # Responsibility
//! - Run a stopped/running state machine for one task.
//! - Flush elapsed whole seconds into the task's `time_spent` on pause.
//! - Hand running time back to the store when a timer is torn down.
//!
//! # Invariants
//! - A pause credits time exactly once; pausing a stopped timer is a no-op.
//! - The timer only adds to `time_spent`, never resets it.
//! - Flushes add to the task's current stored value, not to a copy read
//!   when the timer started.
//! - Dropping a running timer never loses its elapsed time while the owning
//!   store is alive.

use crate::clock::SharedClock;
use crate::model::EntityId;
use crate::repo::blob_repo::BlobRepository;
use crate::service::study_store::{StoreResult, StudyStore};
use log::{info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Seconds owed to a task by a timer that went away while running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTime {
    pub task_id: EntityId,
    pub seconds: u64,
}

/// Shared queue between a store and the timers it handed out.
#[derive(Debug, Clone, Default)]
pub struct PendingTimeLedger {
    entries: Arc<Mutex<Vec<PendingTime>>>,
}

impl PendingTimeLedger {
    pub fn push(&self, task_id: EntityId, seconds: u64) {
        self.lock().push(PendingTime { task_id, seconds });
    }

    pub fn drain(&self) -> Vec<PendingTime> {
        std::mem::take(&mut *self.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PendingTime>> {
        // A panic while holding the guard cannot leave the Vec half-written.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Stopped,
    Running {
        /// Monotonic reading taken at `start`.
        started_at: Duration,
    },
}

/// Elapsed-time tracker for one task.
///
/// Obtain one with `StudyStore::task_timer`. Call `teardown` when the host
/// view goes away; a timer dropped while running queues its time on the
/// store's ledger instead.
pub struct TaskTimer {
    task_id: EntityId,
    state: TimerState,
    clock: SharedClock,
    ledger: PendingTimeLedger,
}

impl TaskTimer {
    pub(crate) fn new(
        task_id: impl Into<EntityId>,
        clock: SharedClock,
        ledger: PendingTimeLedger,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            state: TimerState::Stopped,
            clock,
            ledger,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TimerState::Running { .. })
    }

    /// Starts accumulating from now. Returns `false` if already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        self.state = TimerState::Running {
            started_at: self.clock.monotonic(),
        };
        info!(
            "event=timer_start module=timer status=ok task_id={}",
            self.task_id
        );
        true
    }

    /// Whole seconds accumulated by the current run; `None` when stopped.
    ///
    /// This is the tick source for live displays. It stops reporting as soon
    /// as the timer is paused.
    pub fn tick(&self) -> Option<u64> {
        match self.state {
            TimerState::Stopped => None,
            TimerState::Running { started_at } => Some(
                self.clock
                    .monotonic()
                    .saturating_sub(started_at)
                    .as_secs(),
            ),
        }
    }

    /// Stored `time_spent` plus the running elapsed seconds.
    pub fn display_seconds<B: BlobRepository>(&self, store: &StudyStore<B>) -> u64 {
        let stored = store
            .find_task(&self.task_id)
            .map_or(0, |task| task.time_spent);
        stored.saturating_add(self.tick().unwrap_or(0))
    }

    /// Stops the timer and credits elapsed seconds to the task.
    ///
    /// Returns the seconds credited; `Ok(0)` when already stopped. If the
    /// task no longer exists the time is discarded and `TaskNotFound` is
    /// returned; the timer is stopped either way.
    pub fn pause<B: BlobRepository>(&mut self, store: &mut StudyStore<B>) -> StoreResult<u64> {
        let Some(elapsed) = self.stop() else {
            return Ok(0);
        };
        if elapsed == 0 {
            return Ok(0);
        }
        match store.record_study_time(&self.task_id, elapsed) {
            Ok(_) => {
                info!(
                    "event=timer_pause module=timer status=ok task_id={} seconds={}",
                    self.task_id, elapsed
                );
                Ok(elapsed)
            }
            Err(err) => {
                warn!(
                    "event=timer_pause module=timer status=dropped task_id={} seconds={} error={}",
                    self.task_id, elapsed, err
                );
                Err(err)
            }
        }
    }

    /// Flushes any running time and releases the timer.
    pub fn teardown<B: BlobRepository>(mut self, store: &mut StudyStore<B>) -> StoreResult<u64> {
        self.pause(store)
    }

    /// Transitions to stopped, returning the elapsed seconds of the run.
    fn stop(&mut self) -> Option<u64> {
        let elapsed = self.tick()?;
        self.state = TimerState::Stopped;
        Some(elapsed)
    }
}

impl Drop for TaskTimer {
    fn drop(&mut self) {
        if let Some(elapsed) = self.stop() {
            if elapsed > 0 {
                self.ledger.push(self.task_id.clone(), elapsed);
                info!(
                    "event=timer_drop module=timer status=queued task_id={} seconds={}",
                    self.task_id, elapsed
                );
            }
        }
    }
}

/// Renders seconds as `m:ss`, or `h:mm:ss` from one hour up.
pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}
