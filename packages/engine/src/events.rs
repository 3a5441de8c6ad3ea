//! Engine Events
//!
//! Everything the engine wants the outside world to know is expressed
//! as an [`EngineEvent`]. The engine never calls a frontend directly;
//! it buffers events and the host drains them after each call, on the
//! same thread, in emission order.

use serde::{Deserialize, Serialize};

use crate::types::{Modality, Outcome, SessionResult};

/// A notification from the engine to its host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineEvent {
    /// A new trial began and its stimulus should be rendered now.
    StimulusPresented {
        /// Grid cell to light, 0-8 row-major.
        position: u8,
        /// Symbol to announce.
        symbol: char,
    },
    /// One modality of the elapsed or current trial was classified.
    Feedback { modality: Modality, outcome: Outcome },
    /// Running hit total changed. `total_possible` is reserved for a
    /// denominator and is currently always 0.
    ScoreChanged { hits: u32, total_possible: u32 },
    /// Trial counter for progress display, 1-based.
    Progress { current_trial: u32, total_trials: u32 },
    /// The session ended on its own and produced a result.
    SessionFinished { result: SessionResult },
}

impl EngineEvent {
    /// Stable wire name of the event, mirroring the serialized `type`
    /// field.
    pub fn event_type(&self) -> &'static str {
        match self {
            EngineEvent::StimulusPresented { .. } => "STIMULUS_PRESENTED",
            EngineEvent::Feedback { .. } => "FEEDBACK",
            EngineEvent::ScoreChanged { .. } => "SCORE_CHANGED",
            EngineEvent::Progress { .. } => "PROGRESS",
            EngineEvent::SessionFinished { .. } => "SESSION_FINISHED",
        }
    }
}

// ==================== Tests ====================
