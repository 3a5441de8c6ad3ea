//! Common Types and Constants
//!
//! Shared vocabulary for the trial engine: stimuli, modalities,
//! response outcomes, per-session statistics and session results.

use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Number of cells on the position grid (3x3, row-major indices 0-8).
pub const GRID_CELLS: u8 = 9;

/// Fixed pool of symbol stimuli. One audio cue exists per entry.
pub const SYMBOL_POOL: [char; 8] = ['A', 'B', 'C', 'H', 'K', 'L', 'Q', 'R'];

// ==================== Modalities ====================

/// A stimulus channel. Every trial presents one value per modality and
/// each modality is matched and scored independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    /// Grid position (0-8).
    Position,
    /// Spoken symbol from [`SYMBOL_POOL`].
    Audio,
}

impl Modality {
    /// Both modalities, in evaluation order.
    pub const ALL: [Modality; 2] = [Modality::Position, Modality::Audio];

    /// Display name used in feedback lines and result summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Modality::Position => "Position",
            Modality::Audio => "Audio",
        }
    }
}

// ==================== Stimuli ====================

/// A single dual stimulus: one value per modality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stimulus {
    /// Grid cell index, 0-8 row-major.
    pub position: u8,
    /// Symbol drawn from [`SYMBOL_POOL`].
    pub symbol: char,
}

impl Stimulus {
    /// Whether `self` and `other` carry the same value in `modality`.
    pub fn matches(&self, other: &Stimulus, modality: Modality) -> bool {
        match modality {
            Modality::Position => self.position == other.position,
            Modality::Audio => self.symbol == other.symbol,
        }
    }
}

// ==================== Responses ====================

/// Classification of a single modality within a single trial.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// Responded and the trial was an n-back match.
    Hit,
    /// Did not respond although the trial was an n-back match.
    Miss,
    /// Responded although the trial was not an n-back match.
    FalseAlarm,
    /// Did not respond and the trial was not an n-back match.
    Rejection,
}

impl Outcome {
    /// Hits and rejections are the correct behaviours.
    pub fn is_correct(&self) -> bool {
        matches!(self, Outcome::Hit | Outcome::Rejection)
    }
}

// ==================== Scoring ====================

/// How the final session score is computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoringMethod {
    /// Mean accuracy over modalities, lenient towards unanswered trials.
    #[default]
    Standard,
    /// Worst-modality accuracy over all valid trials.
    Clinical,
}

impl ScoringMethod {
    /// Parses a method name, case-insensitively. Returns `None` for
    /// unrecognised input.
    pub fn from_str(value: &str) -> Option<ScoringMethod> {
        match value.to_lowercase().as_str() {
            "standard" => Some(ScoringMethod::Standard),
            "clinical" => Some(ScoringMethod::Clinical),
            _ => None,
        }
    }
}

// ==================== Statistics ====================

/// Signal-detection counters for one modality.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalityStats {
    /// Correct responses to n-back matches.
    pub hit: u32,
    /// Unanswered n-back matches.
    pub miss: u32,
    /// Responses to non-matches.
    pub false_alarm: u32,
    /// Total n-back matches that occurred, answered or not.
    pub targets: u32,
}

/// Counters for the whole session, one set per modality.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Position-channel counters.
    pub position: ModalityStats,
    /// Audio-channel counters.
    pub audio: ModalityStats,
}

impl SessionStats {
    /// Counters for one modality.
    pub fn modality(&self, modality: Modality) -> &ModalityStats {
        match modality {
            Modality::Position => &self.position,
            Modality::Audio => &self.audio,
        }
    }

    /// Mutable counters for one modality.
    pub fn modality_mut(&mut self, modality: Modality) -> &mut ModalityStats {
        match modality {
            Modality::Position => &mut self.position,
            Modality::Audio => &mut self.audio,
        }
    }

    /// Sum of hits across both modalities.
    pub fn total_hits(&self) -> u32 {
        self.position.hit + self.audio.hit
    }
}

// ==================== Session State ====================

/// The engine's lifecycle state. There is no paused state; a session is
/// either in progress or it is not.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// No session in progress. Configuration may be changed.
    #[default]
    Idle,
    /// A session is in progress. Configuration changes are ignored.
    Running,
}

// ==================== Session Result ====================

/// Everything a finished session produced, including the n-level after
/// any adaptive adjustment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    /// Final signal-detection counters.
    pub stats: SessionStats,
    /// Score in `[0, 1]` per the configured scoring method.
    pub final_score: f64,
    /// Whether the session earned a level promotion.
    pub promotion: bool,
    /// Whether the session triggered a demotion, even at the level floor.
    pub demotion: bool,
    /// N-level in effect after the adjustment.
    pub n_level: u32,
}

// ==================== Tests ====================
