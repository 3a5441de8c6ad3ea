//! Stimulus Generation
//!
//! Produces the dual stimulus for each trial. Per trial the pipeline is:
//!
//! 1. Draw an unconstrained position and symbol.
//! 2. With `match_probability`, overwrite one or both channels from the
//!    stimulus n trials back, forcing a match.
//! 3. Otherwise, with `interference_probability`, overwrite one channel
//!    from a near-n offset (n-1 or n+1) to create a lure. A lure that
//!    would accidentally reproduce the n-back value is redrawn so it
//!    never scores as a match.
//! 4. Otherwise the unconstrained draw stands.
//!
//! Trials before the history holds n entries are always unconstrained.
//! All randomness comes from one owned ChaCha8 stream so that a fixed
//! seed reproduces an entire session exactly.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::config::EngineConfig;
use crate::types::{Modality, Stimulus, GRID_CELLS, SYMBOL_POOL};

// ==================== Trial Labels ====================

/// Which channels a forced match copied from n trials back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchKind {
    Position,
    Audio,
    Both,
}

/// How a generated trial was constructed. Diagnostic only; evaluation
/// always re-derives matches from the history itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrialLabel {
    /// Unconstrained draw.
    Filler,
    /// Forced n-back match on the given channels.
    Match(MatchKind),
    /// Lure copied from `offset` trials back into one modality.
    Interference { offset: usize, modality: Modality },
}

// ==================== Generator ====================

/// Stateful stimulus source for one engine.
#[derive(Clone, Debug)]
pub struct StimulusGenerator {
    rng: ChaCha8Rng,
}

impl StimulusGenerator {
    /// Creates a generator. `Some(seed)` gives a reproducible stream;
    /// `None` seeds from the clock.
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::with_seed(seed),
            None => {
                let seed = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.subsec_nanos() as u64)
                    .unwrap_or(42);
                Self::with_seed(seed)
            }
        }
    }

    /// Creates a generator with a fixed seed (for testing).
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    /// Restarts the stream from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Generates the next stimulus given the session history so far.
    pub fn generate(&mut self, config: &EngineConfig, history: &[Stimulus]) -> Stimulus {
        self.generate_labeled(config, history).0
    }

    /// Like [`generate`](Self::generate) but also reports how the trial
    /// was constructed.
    pub fn generate_labeled(
        &mut self,
        config: &EngineConfig,
        history: &[Stimulus],
    ) -> (Stimulus, TrialLabel) {
        let mut stimulus = Stimulus {
            position: self.draw_position(),
            symbol: self.draw_symbol(),
        };

        let n = config.n_level as usize;
        if history.len() < n {
            return (stimulus, TrialLabel::Filler);
        }

        if self.rng.gen::<f64>() < config.match_probability {
            let kind = self.apply_match(&mut stimulus, history, n);
            return (stimulus, TrialLabel::Match(kind));
        }

        if self.rng.gen::<f64>() < config.interference_probability {
            if let Some(label) = self.apply_interference(&mut stimulus, history, n) {
                return (stimulus, label);
            }
        }

        (stimulus, TrialLabel::Filler)
    }

    // ==================== Constrained Draws ====================

    fn apply_match(&mut self, stimulus: &mut Stimulus, history: &[Stimulus], n: usize) -> MatchKind {
        let kind = match self.rng.gen_range(0..3u8) {
            0 => MatchKind::Position,
            1 => MatchKind::Audio,
            _ => MatchKind::Both,
        };
        let target = history[history.len() - n];
        match kind {
            MatchKind::Position => stimulus.position = target.position,
            MatchKind::Audio => stimulus.symbol = target.symbol,
            MatchKind::Both => {
                stimulus.position = target.position;
                stimulus.symbol = target.symbol;
            }
        }
        kind
    }

    /// Returns `None` when no interference offset is available, in which
    /// case the unconstrained draw stands.
    fn apply_interference(
        &mut self,
        stimulus: &mut Stimulus,
        history: &[Stimulus],
        n: usize,
    ) -> Option<TrialLabel> {
        let mut offsets: Vec<usize> = Vec::with_capacity(2);
        if n > 1 {
            offsets.push(n - 1);
        }
        if history.len() >= n + 1 {
            offsets.push(n + 1);
        }
        if offsets.is_empty() {
            return None;
        }

        let offset = offsets[self.rng.gen_range(0..offsets.len())];
        let modality = Modality::ALL[self.rng.gen_range(0..Modality::ALL.len())];
        let source = history[history.len() - offset];
        let n_back = history[history.len() - n];

        // A lure must never be an actual match; redraw on collision.
        match modality {
            Modality::Position => {
                stimulus.position = source.position;
                if stimulus.position == n_back.position {
                    stimulus.position = self.draw_position_excluding(n_back.position);
                }
            }
            Modality::Audio => {
                stimulus.symbol = source.symbol;
                if stimulus.symbol == n_back.symbol {
                    stimulus.symbol = self.draw_symbol_excluding(n_back.symbol);
                }
            }
        }

        Some(TrialLabel::Interference { offset, modality })
    }

    // ==================== Uniform Draws ====================

    fn draw_position(&mut self) -> u8 {
        self.rng.gen_range(0..GRID_CELLS)
    }

    fn draw_symbol(&mut self) -> char {
        SYMBOL_POOL[self.rng.gen_range(0..SYMBOL_POOL.len())]
    }

    fn draw_position_excluding(&mut self, excluded: u8) -> u8 {
        let candidates: Vec<u8> = (0..GRID_CELLS).filter(|&c| c != excluded).collect();
        candidates[self.rng.gen_range(0..candidates.len())]
    }

    fn draw_symbol_excluding(&mut self, excluded: char) -> char {
        let candidates: Vec<char> =
            SYMBOL_POOL.iter().copied().filter(|&c| c != excluded).collect();
        candidates[self.rng.gen_range(0..candidates.len())]
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    fn in_domain(stimulus: &Stimulus) -> bool {
        stimulus.position < GRID_CELLS && SYMBOL_POOL.contains(&stimulus.symbol)
    }

    fn sample_history() -> Vec<Stimulus> {
        vec![
            Stimulus { position: 0, symbol: 'A' },
            Stimulus { position: 3, symbol: 'C' },
            Stimulus { position: 6, symbol: 'H' },
            Stimulus { position: 1, symbol: 'L' },
        ]
    }

    #[test]
    fn test_short_history_is_always_filler() {
        let config = EngineConfig {
            n_level: 3,
            match_probability: 1.0,
            interference_probability: 1.0,
            ..Default::default()
        };
        let mut generator = StimulusGenerator::with_seed(42);
        let mut history = Vec::new();
        for _ in 0..3 {
            let (stimulus, label) = generator.generate_labeled(&config, &history);
            assert_eq!(label, TrialLabel::Filler, "history len {}", history.len());
            assert!(in_domain(&stimulus));
            history.push(stimulus);
        }
    }

    #[test]
    fn test_forced_match_copies_from_n_back() {
        let config = EngineConfig { n_level: 2, match_probability: 1.0, ..Default::default() };
        let history = sample_history();
        let n_back = history[history.len() - 2];

        for seed in 0..50 {
            let mut generator = StimulusGenerator::with_seed(seed);
            let (stimulus, label) = generator.generate_labeled(&config, &history);
            match label {
                TrialLabel::Match(MatchKind::Position) => {
                    assert_eq!(stimulus.position, n_back.position)
                }
                TrialLabel::Match(MatchKind::Audio) => assert_eq!(stimulus.symbol, n_back.symbol),
                TrialLabel::Match(MatchKind::Both) => {
                    assert_eq!(stimulus.position, n_back.position);
                    assert_eq!(stimulus.symbol, n_back.symbol);
                }
                other => panic!("expected a forced match, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_interference_uses_near_offsets_and_never_matches() {
        let config = EngineConfig {
            n_level: 2,
            match_probability: 0.0,
            interference_probability: 1.0,
            ..Default::default()
        };
        let history = sample_history();
        let n_back = history[history.len() - 2];

        for seed in 0..50 {
            let mut generator = StimulusGenerator::with_seed(seed);
            let (stimulus, label) = generator.generate_labeled(&config, &history);
            match label {
                TrialLabel::Interference { offset, modality } => {
                    assert!(offset == 1 || offset == 3, "unexpected offset {}", offset);
                    assert!(
                        !stimulus.matches(&n_back, modality),
                        "lure in {:?} reproduced the n-back value",
                        modality
                    );
                }
                other => panic!("expected interference, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_interference_collision_is_redrawn() {
        // Uniform history: every offset source equals the n-back value,
        // so the lure must always be redrawn away from it.
        let config = EngineConfig {
            n_level: 2,
            match_probability: 0.0,
            interference_probability: 1.0,
            ..Default::default()
        };
        let same = Stimulus { position: 4, symbol: 'Q' };
        let history = vec![same; 5];

        for seed in 0..50 {
            let mut generator = StimulusGenerator::with_seed(seed);
            let (stimulus, label) = generator.generate_labeled(&config, &history);
            match label {
                TrialLabel::Interference { modality, .. } => {
                    assert!(!stimulus.matches(&same, modality));
                    assert!(in_domain(&stimulus));
                }
                other => panic!("expected interference, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_interference_without_offsets_degrades_to_filler() {
        // n = 1 removes the n-1 offset and a single-entry history removes
        // the n+1 offset, so interference silently degrades.
        let config = EngineConfig {
            n_level: 1,
            match_probability: 0.0,
            interference_probability: 1.0,
            ..Default::default()
        };
        let history = vec![Stimulus { position: 2, symbol: 'B' }];

        for seed in 0..20 {
            let mut generator = StimulusGenerator::with_seed(seed);
            let (stimulus, label) = generator.generate_labeled(&config, &history);
            assert_eq!(label, TrialLabel::Filler);
            assert!(in_domain(&stimulus));
        }
    }

    #[test]
    fn test_same_seed_reproduces_sequence() {
        let config = EngineConfig {
            n_level: 2,
            match_probability: 0.4,
            interference_probability: 0.4,
            ..Default::default()
        };
        let mut a = StimulusGenerator::with_seed(7);
        let mut b = StimulusGenerator::with_seed(7);
        let mut history_a = Vec::new();
        let mut history_b = Vec::new();
        for _ in 0..30 {
            let sa = a.generate(&config, &history_a);
            let sb = b.generate(&config, &history_b);
            assert_eq!(sa, sb);
            history_a.push(sa);
            history_b.push(sb);
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let config = EngineConfig::default();
        let mut a = StimulusGenerator::with_seed(1);
        let mut b = StimulusGenerator::with_seed(2);
        let mut history_a = Vec::new();
        let mut history_b = Vec::new();
        for _ in 0..30 {
            history_a.push(a.generate(&config, &history_a));
            history_b.push(b.generate(&config, &history_b));
        }
        assert_ne!(history_a, history_b);
    }

    #[test]
    fn test_reseed_restarts_the_stream() {
        let config = EngineConfig::default();
        let mut generator = StimulusGenerator::with_seed(9);
        let first: Vec<Stimulus> = {
            let mut history = Vec::new();
            for _ in 0..10 {
                history.push(generator.generate(&config, &history));
            }
            history
        };
        generator.reseed(9);
        let second: Vec<Stimulus> = {
            let mut history = Vec::new();
            for _ in 0..10 {
                history.push(generator.generate(&config, &history));
            }
            history
        };
        assert_eq!(first, second);
    }
}
