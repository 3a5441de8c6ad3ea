//! Terminal Presentation
//!
//! Renders the position grid, feedback lines and the end-of-session
//! summary, and resolves the audio cue file for each symbol. The
//! trainer has no audio device handling; it resolves cue paths and
//! leaves playback to the platform player configured by the user.

use std::path::{Path, PathBuf};

use nexback_engine::{Modality, Outcome, SessionResult};

// ==================== Grid ====================

/// Row and column of a grid cell, row-major from the top left.
pub fn grid_coords(position: u8) -> (u8, u8) {
    (position / 3, position % 3)
}

/// Three-line ASCII board with the active cell marked.
pub fn render_grid(position: u8) -> String {
    let mut out = String::new();
    for row in 0..3u8 {
        for col in 0..3u8 {
            out.push_str(if (row, col) == grid_coords(position) { "[*]" } else { "[ ]" });
            if col < 2 {
                out.push(' ');
            }
        }
        if row < 2 {
            out.push('\n');
        }
    }
    out
}

// ==================== Feedback ====================

/// One-line verdict for a classified modality.
pub fn feedback_line(modality: Modality, outcome: Outcome) -> String {
    let verdict = if outcome.is_correct() { "correct" } else { "wrong" };
    format!("{}: {}", modality.label(), verdict)
}

// ==================== Session Summary ====================

/// Multi-line end-of-session summary with the score, the level verdict
/// and per-modality counters.
pub fn format_result(result: &SessionResult) -> String {
    let verdict = if result.promotion {
        format!("PROMOTED to N-Level {}!", result.n_level)
    } else if result.demotion {
        format!("DEMOTED to N-Level {}...", result.n_level)
    } else {
        format!("Level Maintained at {}", result.n_level)
    };

    let mut out = String::new();
    out.push_str("Session Finished!\n\n");
    out.push_str(&format!("Final Score: {:.2}%\n", result.final_score * 100.0));
    out.push_str(&format!("Result: {}\n", verdict));
    for modality in Modality::ALL {
        let stats = result.stats.modality(modality);
        out.push_str(&format!(
            "\n{}:\n  Hits: {}  Misses: {}  False Alarms: {}",
            modality.label(),
            stats.hit,
            stats.miss,
            stats.false_alarm
        ));
    }
    out.push('\n');
    out
}

// ==================== Audio Cues ====================

/// Locates the audio cue file for each symbol: `<dir>/<SYMBOL>.opus`.
#[derive(Debug, Clone)]
pub struct AudioBank {
    audio_dir: PathBuf,
}

impl AudioBank {
    pub fn new<P: AsRef<Path>>(audio_dir: P) -> Self {
        Self { audio_dir: audio_dir.as_ref().to_path_buf() }
    }

    /// Path the cue for `symbol` is expected at.
    pub fn cue_path(&self, symbol: char) -> PathBuf {
        self.audio_dir.join(format!("{symbol}.opus"))
    }

    /// The cue path if the file exists.
    pub fn resolve(&self, symbol: char) -> Option<PathBuf> {
        let path = self.cue_path(symbol);
        path.is_file().then_some(path)
    }

    /// Resolves the cue for a presented symbol, warning once per miss.
    pub fn announce(&self, symbol: char) -> Option<PathBuf> {
        match self.resolve(symbol) {
            Some(path) => Some(path),
            None => {
                tracing::warn!(
                    symbol = %symbol,
                    path = %self.cue_path(symbol).display(),
                    "audio cue not found"
                );
                None
            }
        }
    }
}

// ==================== Tests ====================
