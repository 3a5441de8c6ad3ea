//! Trainer Configuration
//!
//! Settings come from `NEXBACK_*` environment variables (plus `.env`
//! via dotenvy) with sensible defaults for everything. Unparseable
//! values silently fall back to the default; out-of-range values are
//! rejected by [`TrainerConfig::validate`] before a session starts.

use std::path::PathBuf;

use thiserror::Error;

use nexback_engine::{EngineConfig, ScoringMethod};

/// Seed pinned when clinical mode is enabled without an explicit seed,
/// so clinical runs stay comparable across participants.
pub const CLINICAL_DEFAULT_SEED: u64 = 42;

/// Largest seed the settings surface accepts.
pub const MAX_SEED: u64 = 999_999;

#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Session parameters handed to the engine.
    pub engine: EngineConfig,
    /// Directory for session history and the clinical archive.
    pub data_dir: PathBuf,
    /// Directory holding one audio cue per symbol.
    pub audio_dir: PathBuf,
    /// Tracing filter, from `RUST_LOG`.
    pub log_level: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange { field: &'static str, value: f64, min: f64, max: f64 },
    #[error("demotion_threshold must be below promotion_threshold")]
    ThresholdOrder,
}

impl TrainerConfig {
    pub fn from_env() -> Self {
        let mut engine = EngineConfig::default();
        engine.n_level = env_parse("NEXBACK_N_LEVEL", engine.n_level);
        engine.total_trials = env_parse("NEXBACK_TOTAL_TRIALS", engine.total_trials);
        engine.trial_duration_ms = env_parse("NEXBACK_TRIAL_MS", engine.trial_duration_ms);
        engine.stimulus_duration_ms = env_parse("NEXBACK_STIMULUS_MS", engine.stimulus_duration_ms);
        engine.feedback_duration_ms = env_parse("NEXBACK_FEEDBACK_MS", engine.feedback_duration_ms);
        engine.match_probability = env_parse("NEXBACK_MATCH_PROBABILITY", engine.match_probability);
        engine.interference_probability =
            env_parse("NEXBACK_INTERFERENCE_PROBABILITY", engine.interference_probability);
        engine.promotion_threshold =
            env_parse("NEXBACK_PROMOTION_THRESHOLD", engine.promotion_threshold);
        engine.demotion_threshold =
            env_parse("NEXBACK_DEMOTION_THRESHOLD", engine.demotion_threshold);

        let clinical = std::env::var("NEXBACK_CLINICAL")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let seed = std::env::var("NEXBACK_SEED")
            .ok()
            .and_then(|value| value.parse::<u64>().ok());

        engine.is_clinical_mode = clinical;
        engine.random_seed = if clinical {
            seed.or(Some(CLINICAL_DEFAULT_SEED))
        } else {
            seed
        };
        engine.scoring_method = std::env::var("NEXBACK_SCORING")
            .ok()
            .and_then(|value| ScoringMethod::from_str(&value))
            .unwrap_or(if clinical { ScoringMethod::Clinical } else { ScoringMethod::Standard });

        let data_dir = std::env::var("NEXBACK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".data"));
        let audio_dir = std::env::var("NEXBACK_AUDIO_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("resources/audio"));
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self { engine, data_dir, audio_dir, log_level }
    }

    /// Checks every setting against the ranges the trainer supports.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let engine = &self.engine;
        in_range("n_level", f64::from(engine.n_level), 1.0, 20.0)?;
        in_range("total_trials", f64::from(engine.total_trials), 10.0, 1000.0)?;
        in_range("trial_duration_ms", engine.trial_duration_ms as f64, 500.0, 10_000.0)?;
        in_range("stimulus_duration_ms", engine.stimulus_duration_ms as f64, 100.0, 5_000.0)?;
        in_range("feedback_duration_ms", engine.feedback_duration_ms as f64, 0.0, 5_000.0)?;
        in_range("match_probability", engine.match_probability, 0.1, 0.9)?;
        in_range("interference_probability", engine.interference_probability, 0.0, 0.5)?;
        in_range("promotion_threshold", engine.promotion_threshold, 0.5, 1.0)?;
        in_range("demotion_threshold", engine.demotion_threshold, 0.0, 0.9)?;
        if engine.demotion_threshold >= engine.promotion_threshold {
            return Err(ConfigError::ThresholdOrder);
        }
        if let Some(seed) = engine.random_seed {
            in_range("random_seed", seed as f64, 0.0, MAX_SEED as f64)?;
        }
        Ok(())
    }

    /// Switches clinical mode on or off, adjusting the coupled settings
    /// the way the settings surface does: enabling pins the clinical
    /// scoring formula and the default seed, disabling restores the
    /// standard formula and a free-running seed.
    pub fn apply_clinical_mode(&mut self, enabled: bool) {
        self.engine.is_clinical_mode = enabled;
        if enabled {
            self.engine.scoring_method = ScoringMethod::Clinical;
            self.engine.random_seed = Some(CLINICAL_DEFAULT_SEED);
        } else {
            self.engine.scoring_method = ScoringMethod::Standard;
            self.engine.random_seed = None;
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

fn in_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange { field, value, min, max });
    }
    Ok(())
}

// ==================== Tests ====================
