//! Engine Configuration
//!
//! All knobs a session reads. The engine treats the values as trusted;
//! range validation belongs to whichever frontend collects them.

use serde::{Deserialize, Serialize};

use crate::types::ScoringMethod;

/// Parameters for a training session.
///
/// A copy is taken when the session starts; the only field the engine
/// itself mutates is `n_level`, via the adaptive controller at session
/// end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How many trials back a stimulus must recur to count as a match.
    pub n_level: u32,
    /// Full length of one trial in milliseconds. The response window
    /// spans the whole trial.
    pub trial_duration_ms: u64,
    /// How long the stimulus itself stays visible, in milliseconds.
    pub stimulus_duration_ms: u64,
    /// Pause between a trial's evaluation and the next presentation,
    /// in milliseconds. Not applied before the first trial.
    pub feedback_duration_ms: u64,
    /// Number of trials in the session.
    pub total_trials: u32,
    /// Probability that a trial is forced to be an n-back match.
    pub match_probability: f64,
    /// Probability that a non-match trial becomes an interference lure.
    pub interference_probability: f64,
    /// Final score at or above which the n-level is raised.
    pub promotion_threshold: f64,
    /// Final score below which the n-level is lowered.
    pub demotion_threshold: f64,
    /// Which formula produces the final score.
    pub scoring_method: ScoringMethod,
    /// Clinical sessions never adjust the n-level and are expected to
    /// run with a fixed seed.
    pub is_clinical_mode: bool,
    /// Fixed RNG seed. `None` draws fresh entropy per engine.
    pub random_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            n_level: 2,
            trial_duration_ms: 3000,
            stimulus_duration_ms: 1000,
            feedback_duration_ms: 500,
            total_trials: 20,
            match_probability: 0.3,
            interference_probability: 0.1,
            promotion_threshold: 0.8,
            demotion_threshold: 0.5,
            scoring_method: ScoringMethod::Standard,
            is_clinical_mode: false,
            random_seed: None,
        }
    }
}

// ==================== Tests ====================
