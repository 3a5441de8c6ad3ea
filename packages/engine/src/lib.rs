//! # nexback-engine
//!
//! Dual n-back trial engine. The engine owns the full session logic:
//! stimulus generation with forced matches and interference lures,
//! response classification, exactly-once trial evaluation, scoring and
//! adaptive difficulty. It contains no clock, no threads and no I/O;
//! hosts supply a [`Scheduler`] for timing and render the
//! [`EngineEvent`]s the engine buffers.
//!
//! ## Modules
//!
//! - [`types`]: stimuli, modalities, outcomes, statistics, results
//! - [`config`]: session parameters and defaults
//! - [`generator`]: seeded stimulus generation
//! - [`scoring`]: standard and clinical score formulas
//! - [`events`]: engine-to-host notifications
//! - [`scheduler`]: timer contract and the virtual-clock implementation
//! - [`engine`]: the session state machine
//!
//! ## Example
//!
//! ```rust
//! use nexback_engine::{EngineConfig, Modality, TrialEngine, VirtualScheduler};
//!
//! let mut scheduler = VirtualScheduler::new();
//! let mut engine = TrialEngine::with_seed(EngineConfig::default(), 42);
//!
//! engine.start_session(&mut scheduler);
//! engine.submit_response(Modality::Position);
//!
//! // The host decides when time passes; the engine only reacts.
//! for task in scheduler.advance(3000) {
//!     engine.handle_task(task, &mut scheduler);
//! }
//! assert!(!engine.drain_events().is_empty());
//! ```

// ==================== Modules ====================

pub mod config;
pub mod engine;
pub mod events;
pub mod generator;
pub mod scheduler;
pub mod scoring;
pub mod types;

// ==================== Re-exports ====================

/// Session parameters.
pub use config::EngineConfig;
/// The session state machine.
pub use engine::TrialEngine;
/// Engine-to-host notifications.
pub use events::EngineEvent;
/// Stimulus source and trial construction labels.
pub use generator::{MatchKind, StimulusGenerator, TrialLabel};
/// Timing contract and deterministic test scheduler.
pub use scheduler::{ScheduledTask, Scheduler, TaskHandle, TaskKind, VirtualScheduler};
/// Core vocabulary types.
pub use types::{
    Modality, ModalityStats, Outcome, ScoringMethod, SessionResult, SessionState, SessionStats,
    Stimulus, GRID_CELLS, SYMBOL_POOL,
};
