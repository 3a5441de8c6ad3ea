//! Session Scoring
//!
//! Two formulas over the signal-detection counters. Standard scoring
//! averages per-modality accuracy and only counts trials the subject
//! engaged with or should have engaged with. Clinical scoring credits
//! correct rejections too, normalises by every valid trial and takes
//! the worse modality, so a single neglected channel caps the score.

use crate::config::EngineConfig;
use crate::types::{ModalityStats, ScoringMethod, SessionStats};

/// Mean over modalities of `hit / (hit + false_alarm + miss)`.
/// A modality with no scoreable events contributes 0.
pub fn standard_score(stats: &SessionStats) -> f64 {
    fn modality(m: &ModalityStats) -> f64 {
        let denominator = m.hit + m.false_alarm + m.miss;
        if denominator == 0 {
            0.0
        } else {
            f64::from(m.hit) / f64::from(denominator)
        }
    }
    (modality(&stats.position) + modality(&stats.audio)) / 2.0
}

/// Worst modality of `(hit + correct_rejections) / valid_trials`, where
/// `valid_trials = max(0, total_trials - n_level)` and correct
/// rejections are the non-target trials without a false alarm.
/// Returns 0 when there are no valid trials.
pub fn clinical_score(stats: &SessionStats, total_trials: u32, n_level: u32) -> f64 {
    let valid_trials = total_trials.saturating_sub(n_level);

    fn modality(m: &ModalityStats, valid_trials: u32) -> f64 {
        if valid_trials == 0 {
            return 0.0;
        }
        let non_targets = valid_trials.saturating_sub(m.targets);
        let rejections = non_targets.saturating_sub(m.false_alarm);
        f64::from(m.hit + rejections) / f64::from(valid_trials)
    }

    f64::min(
        modality(&stats.position, valid_trials),
        modality(&stats.audio, valid_trials),
    )
}

/// Applies whichever formula the configuration selects.
pub fn final_score(stats: &SessionStats, config: &EngineConfig) -> f64 {
    match config.scoring_method {
        ScoringMethod::Standard => standard_score(stats),
        ScoringMethod::Clinical => clinical_score(stats, config.total_trials, config.n_level),
    }
}

// ==================== Tests ====================
