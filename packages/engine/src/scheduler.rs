//! Trial Scheduling
//!
//! The engine never sleeps or spawns threads. It asks a host-provided
//! [`Scheduler`] for one-shot callbacks and reacts when the host feeds
//! a due task back through [`TrialEngine::handle_task`]. Tasks carry
//! the epoch of the session that armed them, so a delivery that
//! outlives its session is recognised and dropped.
//!
//! [`VirtualScheduler`] is the in-process implementation with a manual
//! clock. Tests (and benches) drive whole sessions through it without
//! real waiting.
//!
//! [`TrialEngine::handle_task`]: crate::engine::TrialEngine::handle_task

use serde::{Deserialize, Serialize};

// ==================== Tasks ====================

/// Identifier for a scheduled task, unique per scheduler.
pub type TaskHandle = u64;

/// What the engine wants to happen when a delay elapses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    /// The running trial's response window has closed; evaluate it.
    TrialBoundary,
    /// The feedback pause is over; present the next stimulus.
    PresentStimulus,
}

/// A one-shot callback request. `epoch` identifies the session that
/// armed it; deliveries from a different epoch are no-ops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub epoch: u64,
    pub kind: TaskKind,
}

// ==================== Scheduler Contract ====================

/// One-shot timer service supplied by the host.
///
/// The engine keeps at most one task outstanding, cancels it whenever
/// the session stops, and tolerates late deliveries of cancelled tasks.
/// Implementations only need to deliver each scheduled task at most
/// once, at or after its delay.
pub trait Scheduler {
    /// Arms a one-shot task after `delay_ms` milliseconds.
    fn schedule(&mut self, delay_ms: u64, task: ScheduledTask) -> TaskHandle;

    /// Disarms a task if it has not fired yet. Unknown handles are
    /// ignored.
    fn cancel(&mut self, handle: TaskHandle);
}

// ==================== Virtual Scheduler ====================

#[derive(Clone, Copy, Debug)]
struct PendingEntry {
    handle: TaskHandle,
    due_ms: u64,
    task: ScheduledTask,
}

/// Deterministic scheduler with a manually advanced clock.
#[derive(Debug, Default)]
pub struct VirtualScheduler {
    now_ms: u64,
    next_handle: TaskHandle,
    pending: Vec<PendingEntry>,
}

impl VirtualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Number of armed tasks.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Due time of the earliest armed task, if any.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.pending.iter().map(|entry| entry.due_ms).min()
    }

    /// Moves the clock forward and returns every task that came due,
    /// in firing order. `advance(0)` fires tasks armed with zero delay.
    pub fn advance(&mut self, delta_ms: u64) -> Vec<ScheduledTask> {
        self.now_ms += delta_ms;
        let now = self.now_ms;
        self.pending.sort_by_key(|entry| (entry.due_ms, entry.handle));
        let split = self.pending.partition_point(|entry| entry.due_ms <= now);
        let remaining = self.pending.split_off(split);
        let due = std::mem::replace(&mut self.pending, remaining);
        due.into_iter().map(|entry| entry.task).collect()
    }

    /// Jumps the clock to the earliest armed task and returns it, or
    /// `None` when nothing is armed.
    pub fn fire_next(&mut self) -> Option<ScheduledTask> {
        self.pending.sort_by_key(|entry| (entry.due_ms, entry.handle));
        if self.pending.is_empty() {
            return None;
        }
        let entry = self.pending.remove(0);
        self.now_ms = self.now_ms.max(entry.due_ms);
        Some(entry.task)
    }
}

impl Scheduler for VirtualScheduler {
    fn schedule(&mut self, delay_ms: u64, task: ScheduledTask) -> TaskHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.pending.push(PendingEntry {
            handle,
            due_ms: self.now_ms + delay_ms,
            task,
        });
        handle
    }

    fn cancel(&mut self, handle: TaskHandle) {
        self.pending.retain(|entry| entry.handle != handle);
    }
}

// ==================== Tests ====================
