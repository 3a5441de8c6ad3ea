//! Session Runner
//!
//! Owns the real-time side of a session: an `Instant`-based scheduler
//! implementing the engine's timer contract, and a loop that multiplexes
//! keyboard commands with due trial tasks. All engine calls happen on
//! the runner's thread; the input thread only sends parsed commands
//! over a channel, which is how external input is marshalled onto the
//! engine's timeline.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use nexback_engine::{
    EngineEvent, Modality, ScheduledTask, Scheduler, SessionResult, TaskHandle, TrialEngine,
};

use crate::presentation::{self, AudioBank};
use crate::storage::{SessionStore, StorageResult};

// ==================== Commands ====================

/// A parsed keyboard command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunnerCommand {
    Respond(Modality),
    Stop,
}

/// Maps an input line to commands: `a` claims a position match, `l` an
/// audio match, `q` asks to stop. Case-insensitive, other characters
/// are ignored, and one line may carry several commands ("al" claims
/// both modalities).
pub fn parse_commands(line: &str) -> Vec<RunnerCommand> {
    line.chars()
        .filter_map(|c| match c.to_ascii_lowercase() {
            'a' => Some(RunnerCommand::Respond(Modality::Position)),
            'l' => Some(RunnerCommand::Respond(Modality::Audio)),
            'q' => Some(RunnerCommand::Stop),
            _ => None,
        })
        .collect()
}

// ==================== Realtime Scheduler ====================

/// Wall-clock implementation of the engine's timer contract. Nothing
/// here spawns threads; the runner sleeps until the earliest due time
/// and then drains whatever became due.
#[derive(Debug, Default)]
pub struct RealtimeScheduler {
    next_handle: TaskHandle,
    pending: Vec<(TaskHandle, Instant, ScheduledTask)>,
}

impl RealtimeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Due time of the earliest armed task.
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.iter().map(|entry| entry.1).min()
    }

    /// Removes and returns every task due at `now`, in firing order.
    pub fn take_due(&mut self, now: Instant) -> Vec<ScheduledTask> {
        self.pending.sort_by_key(|entry| (entry.1, entry.0));
        let split = self.pending.partition_point(|entry| entry.1 <= now);
        let remaining = self.pending.split_off(split);
        std::mem::replace(&mut self.pending, remaining)
            .into_iter()
            .map(|entry| entry.2)
            .collect()
    }
}

impl Scheduler for RealtimeScheduler {
    fn schedule(&mut self, delay_ms: u64, task: ScheduledTask) -> TaskHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        let due = Instant::now() + Duration::from_millis(delay_ms);
        self.pending.push((handle, due, task));
        handle
    }

    fn cancel(&mut self, handle: TaskHandle) {
        self.pending.retain(|entry| entry.0 != handle);
    }
}

// ==================== Session Runner ====================

/// Runs one session to completion (or until the user stops it),
/// rendering events as they come and persisting the final result.
pub struct SessionRunner {
    engine: TrialEngine,
    store: SessionStore,
    audio: AudioBank,
    commands: Receiver<RunnerCommand>,
    input_closed: bool,
}

impl SessionRunner {
    pub fn new(
        engine: TrialEngine,
        store: SessionStore,
        audio: AudioBank,
        commands: Receiver<RunnerCommand>,
    ) -> Self {
        Self { engine, store, audio, commands, input_closed: false }
    }

    /// Runs the session. Returns the result of a completed session, or
    /// `None` when the user stopped early (nothing is persisted then).
    pub fn run(&mut self) -> StorageResult<Option<SessionResult>> {
        let mut scheduler = RealtimeScheduler::new();
        self.engine.start_session(&mut scheduler);
        if let Some(result) = self.dispatch_events()? {
            return Ok(Some(result));
        }

        while self.engine.is_running() {
            match self.next_command(&scheduler) {
                Some(RunnerCommand::Respond(modality)) => {
                    self.engine.submit_response(modality);
                }
                Some(RunnerCommand::Stop) => {
                    if self.engine.config().is_clinical_mode {
                        tracing::warn!("stop ignored: clinical sessions run to completion");
                    } else {
                        self.engine.stop_session(&mut scheduler);
                        println!("Session stopped.");
                    }
                }
                None => {
                    for task in scheduler.take_due(Instant::now()) {
                        self.engine.handle_task(task, &mut scheduler);
                    }
                }
            }
            if let Some(result) = self.dispatch_events()? {
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    /// Blocks until either a command arrives or the next task is due.
    /// `None` means it is the scheduler's turn.
    fn next_command(&mut self, scheduler: &RealtimeScheduler) -> Option<RunnerCommand> {
        let due = scheduler.next_due()?;
        let wait = due.saturating_duration_since(Instant::now());
        if self.input_closed {
            std::thread::sleep(wait);
            return None;
        }
        match self.commands.recv_timeout(wait) {
            Ok(command) => Some(command),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                // Input is gone (stdin closed); keep the session on
                // timers alone.
                self.input_closed = true;
                None
            }
        }
    }

    fn dispatch_events(&mut self) -> StorageResult<Option<SessionResult>> {
        let mut finished = None;
        for event in self.engine.drain_events() {
            match event {
                EngineEvent::StimulusPresented { position, symbol } => {
                    println!("\n{}", presentation::render_grid(position));
                    println!("Audio: {symbol}");
                    if let Some(path) = self.audio.announce(symbol) {
                        tracing::debug!(path = %path.display(), "audio cue resolved");
                    }
                }
                EngineEvent::Feedback { modality, outcome } => {
                    tracing::debug!(?modality, ?outcome, "trial feedback");
                    println!("{}", presentation::feedback_line(modality, outcome));
                }
                EngineEvent::ScoreChanged { hits, .. } => {
                    println!("Score: {hits}");
                }
                EngineEvent::Progress { current_trial, total_trials } => {
                    println!("Trial {current_trial}/{total_trials}");
                }
                EngineEvent::SessionFinished { result } => {
                    println!("\n{}", presentation::format_result(&result));
                    let config = self.engine.config().clone();
                    self.store.save_session(&result, &config)?;
                    finished = Some(result);
                }
            }
        }
        Ok(finished)
    }
}

// ==================== Tests ====================
