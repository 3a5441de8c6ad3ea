//! Clinical Archive
//!
//! Append-only SQLite archive for clinical sessions. The file is kept
//! out of the editable JSON history on purpose: clinical records are
//! study data, so they get a schema, a migrations table and restricted
//! file permissions.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection};

use super::{SessionRecord, StorageError, StorageResult};

// ==================== Migrations ====================

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 1] = [Migration {
    version: 1,
    name: "create_clinical_sessions",
    sql: "
        CREATE TABLE IF NOT EXISTS clinical_sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recorded_at TEXT NOT NULL,
            n_level INTEGER NOT NULL,
            final_score REAL NOT NULL,
            promotion INTEGER NOT NULL,
            demotion INTEGER NOT NULL,
            config_json TEXT NOT NULL,
            stats_json TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_clinical_sessions_recorded_at
            ON clinical_sessions (recorded_at);
    ",
}];

fn run_migrations(connection: &Connection) -> StorageResult<()> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at INTEGER NOT NULL
        );",
    )?;
    let current: i64 = connection.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        connection.execute_batch("BEGIN IMMEDIATE;")?;
        let applied = connection.execute_batch(migration.sql).and_then(|_| {
            connection
                .execute(
                    "INSERT INTO schema_migrations (version, name, applied_at)
                     VALUES (?1, ?2, ?3)",
                    params![migration.version, migration.name, Utc::now().timestamp()],
                )
                .map(|_| ())
        });
        match applied {
            Ok(()) => connection.execute_batch("COMMIT;")?,
            Err(err) => {
                let _ = connection.execute_batch("ROLLBACK;");
                return Err(err.into());
            }
        }
    }
    Ok(())
}

// ==================== Archive ====================

/// Connection to the clinical session archive.
#[derive(Debug)]
pub struct ClinicalArchive {
    connection: Mutex<Connection>,
}

impl ClinicalArchive {
    /// Opens (creating if needed) the archive at `path`, applies
    /// pending migrations and restricts the file to the owning user.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let connection = Connection::open(&path)?;
        connection.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;
        run_migrations(&connection)?;
        restrict_permissions(path.as_ref())?;
        Ok(Self { connection: Mutex::new(connection) })
    }

    /// In-memory archive (for testing).
    pub fn in_memory() -> StorageResult<Self> {
        let connection = Connection::open_in_memory()?;
        connection.execute_batch("PRAGMA foreign_keys=ON;")?;
        run_migrations(&connection)?;
        Ok(Self { connection: Mutex::new(connection) })
    }

    /// Appends one session and returns how many the archive now holds.
    pub fn insert(&self, record: &SessionRecord) -> StorageResult<i64> {
        let connection = self.lock()?;
        connection.execute(
            "INSERT INTO clinical_sessions
                (recorded_at, n_level, final_score, promotion, demotion, config_json, stats_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.timestamp.to_rfc3339(),
                record.result.n_level,
                record.result.final_score,
                record.result.promotion,
                record.result.demotion,
                serde_json::to_string(&record.config)?,
                serde_json::to_string(&record.result.stats)?,
            ],
        )?;
        let total =
            connection.query_row("SELECT COUNT(*) FROM clinical_sessions", [], |row| row.get(0))?;
        Ok(total)
    }

    pub fn session_count(&self) -> StorageResult<i64> {
        let connection = self.lock()?;
        let count =
            connection.query_row("SELECT COUNT(*) FROM clinical_sessions", [], |row| row.get(0))?;
        Ok(count)
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|err| StorageError::Lock(err.to_string()))
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

// ==================== Tests ====================
