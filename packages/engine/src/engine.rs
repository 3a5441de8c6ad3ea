//! Trial Engine
//!
//! Drives one dual n-back session: presents stimuli, keeps the single
//! source of truth for history and counters, classifies responses,
//! evaluates each trial exactly once at its boundary and finalises the
//! session with a score and an adaptive level adjustment.
//!
//! The engine is synchronous and single-threaded. Time only moves when
//! the host feeds a due [`ScheduledTask`] back into [`handle_task`];
//! everything else happens inside the calling thread. External calls
//! that make no sense in the current state (starting twice, responding
//! while idle, responding twice in one trial) are silently ignored
//! rather than surfaced as errors.
//!
//! [`handle_task`]: TrialEngine::handle_task

use crate::config::EngineConfig;
use crate::events::EngineEvent;
use crate::generator::StimulusGenerator;
use crate::scheduler::{ScheduledTask, Scheduler, TaskHandle, TaskKind};
use crate::scoring;
use crate::types::{Modality, Outcome, SessionResult, SessionState, SessionStats, Stimulus};

// ==================== Response Window ====================

/// Per-trial response flags. A closed window reports both modalities as
/// already answered, which is how late responses in the feedback gap
/// are shut out.
#[derive(Clone, Copy, Debug, Default)]
struct ResponseWindow {
    position: bool,
    audio: bool,
}

impl ResponseWindow {
    fn responded(&self, modality: Modality) -> bool {
        match modality {
            Modality::Position => self.position,
            Modality::Audio => self.audio,
        }
    }

    fn record(&mut self, modality: Modality) {
        match modality {
            Modality::Position => self.position = true,
            Modality::Audio => self.audio = true,
        }
    }

    fn close(&mut self) {
        self.position = true;
        self.audio = true;
    }

    fn reopen(&mut self) {
        self.position = false;
        self.audio = false;
    }
}

// ==================== Engine ====================

/// The dual n-back session engine.
///
/// Owns its RNG stream, the stimulus history and all counters. Hosts
/// call [`start_session`], feed user input through [`submit_response`],
/// relay due scheduler tasks into [`handle_task`] and pull buffered
/// [`EngineEvent`]s with [`drain_events`] after each call.
///
/// [`start_session`]: TrialEngine::start_session
/// [`submit_response`]: TrialEngine::submit_response
/// [`handle_task`]: TrialEngine::handle_task
/// [`drain_events`]: TrialEngine::drain_events
#[derive(Debug)]
pub struct TrialEngine {
    config: EngineConfig,
    generator: StimulusGenerator,
    state: SessionState,
    history: Vec<Stimulus>,
    stats: SessionStats,
    window: ResponseWindow,
    current_trial: u32,
    epoch: u64,
    pending: Option<(TaskHandle, TaskKind)>,
    events: Vec<EngineEvent>,
}

impl TrialEngine {
    /// Creates an idle engine. A configured seed fixes the stimulus
    /// stream; otherwise the stream starts from fresh entropy.
    pub fn new(config: EngineConfig) -> Self {
        let generator = StimulusGenerator::new(config.random_seed);
        Self {
            config,
            generator,
            state: SessionState::Idle,
            history: Vec::new(),
            stats: SessionStats::default(),
            window: ResponseWindow::default(),
            current_trial: 0,
            epoch: 0,
            pending: None,
            events: Vec::new(),
        }
    }

    /// Creates an engine with a fixed stimulus stream (for testing).
    pub fn with_seed(config: EngineConfig, seed: u64) -> Self {
        let mut engine = Self::new(config);
        engine.generator = StimulusGenerator::with_seed(seed);
        engine
    }

    // ==================== Accessors ====================

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    /// Stimuli presented so far, oldest first.
    pub fn history(&self) -> &[Stimulus] {
        &self.history
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Trials presented so far in the current session.
    pub fn current_trial(&self) -> u32 {
        self.current_trial
    }

    /// Session counter used to tag scheduled tasks. Tasks carrying any
    /// other epoch are dropped on delivery.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Takes all buffered events, oldest first.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    // ==================== Configuration ====================

    /// Replaces the configuration. Ignored while a session runs. A
    /// changed seed takes effect immediately; a cleared seed switches
    /// to a fresh entropy stream.
    pub fn set_config(&mut self, config: EngineConfig) {
        if self.state == SessionState::Running {
            return;
        }
        if config.random_seed != self.config.random_seed {
            self.generator = StimulusGenerator::new(config.random_seed);
        }
        self.config = config;
    }

    // ==================== Session Control ====================

    /// Starts a session: resets history and counters, restarts a seeded
    /// stream from its seed and presents the first stimulus right away.
    /// Ignored while a session already runs.
    pub fn start_session(&mut self, scheduler: &mut dyn Scheduler) {
        if self.state == SessionState::Running {
            return;
        }
        self.epoch += 1;
        if let Some(seed) = self.config.random_seed {
            self.generator.reseed(seed);
        }
        self.history.clear();
        self.stats = SessionStats::default();
        self.window.reopen();
        self.current_trial = 0;
        self.state = SessionState::Running;
        self.present_stimulus(scheduler);
    }

    /// Aborts the session without evaluation, scoring or persistence.
    /// Ignored while idle.
    pub fn stop_session(&mut self, scheduler: &mut dyn Scheduler) {
        if self.state != SessionState::Running {
            return;
        }
        self.state = SessionState::Idle;
        self.cancel_pending(scheduler);
    }

    // ==================== Responses ====================

    /// Registers a user response for one modality of the current trial.
    /// Only the first response per modality per trial counts; repeats,
    /// responses outside a session and responses after the trial's
    /// boundary are ignored.
    pub fn submit_response(&mut self, modality: Modality) {
        if self.state != SessionState::Running || self.history.is_empty() {
            return;
        }
        if self.window.responded(modality) {
            return;
        }
        self.window.record(modality);

        let outcome = if self.current_is_match(modality) {
            self.stats.modality_mut(modality).hit += 1;
            Outcome::Hit
        } else {
            self.stats.modality_mut(modality).false_alarm += 1;
            Outcome::FalseAlarm
        };
        self.events.push(EngineEvent::Feedback { modality, outcome });
        self.emit_score();
    }

    // ==================== Task Handling ====================

    /// Delivers a due scheduler task. Deliveries are dropped unless the
    /// epoch matches the current session, the engine is running and the
    /// task is the one the engine is actually waiting for, so stale or
    /// replayed callbacks can never double-fire a trial boundary.
    pub fn handle_task(&mut self, task: ScheduledTask, scheduler: &mut dyn Scheduler) {
        if task.epoch != self.epoch || self.state != SessionState::Running {
            return;
        }
        match self.pending {
            Some((_, kind)) if kind == task.kind => self.pending = None,
            _ => return,
        }
        match task.kind {
            TaskKind::TrialBoundary => self.trial_boundary(scheduler),
            TaskKind::PresentStimulus => self.present_stimulus(scheduler),
        }
    }

    // ==================== Trial Flow ====================

    /// The response window of the running trial has closed. Either the
    /// session is over, or the elapsed trial is evaluated and the next
    /// presentation is armed after the feedback pause.
    fn trial_boundary(&mut self, scheduler: &mut dyn Scheduler) {
        if self.current_trial >= self.config.total_trials {
            self.finish_session(scheduler);
            return;
        }
        self.evaluate_elapsed_trial();
        self.window.close();
        let handle = scheduler.schedule(
            self.config.feedback_duration_ms,
            ScheduledTask { epoch: self.epoch, kind: TaskKind::PresentStimulus },
        );
        self.pending = Some((handle, TaskKind::PresentStimulus));
    }

    fn present_stimulus(&mut self, scheduler: &mut dyn Scheduler) {
        if self.state != SessionState::Running {
            return;
        }
        let stimulus = self.generator.generate(&self.config, &self.history);
        self.history.push(stimulus);
        self.window.reopen();
        self.events.push(EngineEvent::StimulusPresented {
            position: stimulus.position,
            symbol: stimulus.symbol,
        });
        self.events.push(EngineEvent::Progress {
            current_trial: self.current_trial + 1,
            total_trials: self.config.total_trials,
        });
        self.current_trial += 1;
        let handle = scheduler.schedule(
            self.config.trial_duration_ms,
            ScheduledTask { epoch: self.epoch, kind: TaskKind::TrialBoundary },
        );
        self.pending = Some((handle, TaskKind::TrialBoundary));
    }

    /// Settles the trial that just elapsed: counts its targets, books a
    /// miss for every unanswered target and emits feedback for the
    /// modalities the user left alone.
    fn evaluate_elapsed_trial(&mut self) {
        if self.history.is_empty() {
            return;
        }
        for modality in Modality::ALL {
            if self.current_is_match(modality) {
                self.stats.modality_mut(modality).targets += 1;
                if !self.window.responded(modality) {
                    self.stats.modality_mut(modality).miss += 1;
                    self.events.push(EngineEvent::Feedback { modality, outcome: Outcome::Miss });
                }
            } else if !self.window.responded(modality) {
                self.events.push(EngineEvent::Feedback {
                    modality,
                    outcome: Outcome::Rejection,
                });
            }
        }
        self.emit_score();
    }

    /// Ends the session: evaluates the final trial, computes the score,
    /// applies the adaptive level adjustment and emits the result.
    fn finish_session(&mut self, scheduler: &mut dyn Scheduler) {
        self.state = SessionState::Idle;
        self.cancel_pending(scheduler);
        self.evaluate_elapsed_trial();

        let final_score = scoring::final_score(&self.stats, &self.config);
        let mut promotion = false;
        let mut demotion = false;
        if !self.config.is_clinical_mode {
            if final_score >= self.config.promotion_threshold {
                promotion = true;
                self.config.n_level += 1;
            } else if final_score < self.config.demotion_threshold {
                // The flag is reported even at the floor; only the level
                // itself is clamped.
                demotion = true;
                if self.config.n_level > 1 {
                    self.config.n_level -= 1;
                }
            }
        }

        let result = SessionResult {
            stats: self.stats,
            final_score,
            promotion,
            demotion,
            n_level: self.config.n_level,
        };
        self.events.push(EngineEvent::SessionFinished { result });
    }

    // ==================== Internals ====================

    /// Whether the latest stimulus matches the one n trials earlier in
    /// `modality`. False until the history is deep enough.
    fn current_is_match(&self, modality: Modality) -> bool {
        let n = self.config.n_level as usize;
        if self.history.len() <= n {
            return false;
        }
        let current = self.history[self.history.len() - 1];
        let n_back = self.history[self.history.len() - 1 - n];
        current.matches(&n_back, modality)
    }

    fn emit_score(&mut self) {
        self.events.push(EngineEvent::ScoreChanged {
            hits: self.stats.total_hits(),
            total_possible: 0,
        });
    }

    fn cancel_pending(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some((handle, _)) = self.pending.take() {
            scheduler.cancel(handle);
        }
    }
}

// ==================== Tests ====================
