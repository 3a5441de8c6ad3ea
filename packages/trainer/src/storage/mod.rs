//! Session Storage
//!
//! Every finished session is appended to a human-readable JSON history
//! file. Clinical sessions are additionally written to a restricted
//! SQLite archive (see [`clinical`]), so research data survives manual
//! edits to the history file.

pub mod clinical;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use nexback_engine::{EngineConfig, SessionResult};

use self::clinical::ClinicalArchive;

/// File inside the data directory holding the JSON session history.
pub const HISTORY_FILE: &str = "history.json";

/// File inside the data directory holding the clinical archive.
pub const CLINICAL_DB_FILE: &str = "clinical.sqlite3";

// ==================== Errors ====================

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Lock error: {0}")]
    Lock(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// ==================== Records ====================

/// One archived session: when it ran, with which settings, and what
/// came out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub timestamp: DateTime<Utc>,
    pub config: EngineConfig,
    pub result: SessionResult,
}

// ==================== Store ====================

/// Owns the data directory. The clinical archive is opened lazily on
/// the first clinical save, so standard installs never create it.
#[derive(Debug)]
pub struct SessionStore {
    data_dir: PathBuf,
    history_path: PathBuf,
    clinical: Option<ClinicalArchive>,
}

impl SessionStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> StorageResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;
        let history_path = data_dir.join(HISTORY_FILE);
        Ok(Self { data_dir, history_path, clinical: None })
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    /// Appends a finished session to the history file, rewriting it in
    /// full. Clinical sessions also go to the clinical archive.
    pub fn save_session(
        &mut self,
        result: &SessionResult,
        config: &EngineConfig,
    ) -> StorageResult<()> {
        let record = SessionRecord {
            timestamp: Utc::now(),
            config: config.clone(),
            result: result.clone(),
        };

        let mut history = self.load_history();
        history.push(record.clone());
        let json = serde_json::to_string_pretty(&history)?;
        fs::write(&self.history_path, json)?;

        if config.is_clinical_mode {
            if self.clinical.is_none() {
                let archive = ClinicalArchive::open(self.data_dir.join(CLINICAL_DB_FILE))?;
                self.clinical = Some(archive);
            }
            if let Some(archive) = self.clinical.as_ref() {
                let total = archive.insert(&record)?;
                tracing::info!(total, "clinical session archived");
            }
        }
        Ok(())
    }

    /// Reads the full session history. A missing file is an empty
    /// history; a corrupt one is treated as empty rather than blocking
    /// future saves.
    pub fn load_history(&self) -> Vec<SessionRecord> {
        let raw = match fs::read_to_string(&self.history_path) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&raw) {
            Ok(history) => history,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    path = %self.history_path.display(),
                    "history file is corrupt; starting fresh"
                );
                Vec::new()
            }
        }
    }
}

// ==================== Tests ====================
