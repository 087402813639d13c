//! SQLite schema migration.
//!
//! Executes one SQL script against an existing database inside a single
//! transaction, then checks `sqlite_master` for the tables the script is
//! expected to create. A failing script commits nothing.

use rusqlite::{Connection, Transaction};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Bundled authentication/purchase schema.
pub const AUTH_SCHEMA: &str = include_str!("../sql/schema-auth.sql");

/// Tables `AUTH_SCHEMA` must leave behind.
pub const AUTH_TABLES: &[&str] = &["users", "chat_history", "user_purchases", "document_pricing"];

/// Errors from schema migration.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("database not found: {}", path.display())]
    DatabaseNotFound { path: PathBuf },
    #[error("schema script not found: {}", path.display())]
    ScriptNotFound { path: PathBuf },
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open database {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("schema execution failed: {0}")]
    SchemaExecution(#[source] rusqlite::Error),
    #[error("table verification failed: {0}")]
    Verify(#[source] rusqlite::Error),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MigrateOptions {
    /// Create the database file (and its parent directory) when missing.
    pub create_missing: bool,
}

/// Which expected tables exist after the migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub present: Vec<String>,
    pub missing: Vec<String>,
}

impl MigrationReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Reads a schema script from disk.
pub fn load_script(path: &Path) -> Result<String, MigrateError> {
    std::fs::read_to_string(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => MigrateError::ScriptNotFound {
            path: path.to_path_buf(),
        },
        _ => MigrateError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Runs `script` against the database at `db_path` and reports on
/// `expected` tables.
///
/// # Errors
/// - `DatabaseNotFound` if the file is missing and `create_missing` is off.
/// - `SchemaExecution` if any statement fails; the transaction is rolled back.
pub fn migrate(
    db_path: &Path,
    script: &str,
    expected: &[&str],
    options: MigrateOptions,
) -> Result<MigrationReport, MigrateError> {
    if !db_path.exists() {
        if !options.create_missing {
            return Err(MigrateError::DatabaseNotFound {
                path: db_path.to_path_buf(),
            });
        }
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| MigrateError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let mut conn = Connection::open(db_path).map_err(|source| MigrateError::Open {
        path: db_path.to_path_buf(),
        source,
    })?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(MigrateError::SchemaExecution)?;

    apply_script(&mut conn, script)?;
    info!(db = %db_path.display(), "schema script committed");

    let report = verify_tables(&conn, expected)?;
    if !report.is_complete() {
        warn!(missing = ?report.missing, "expected tables missing after migration");
    }
    Ok(report)
}

/// Executes `script` in one transaction.
///
/// The script must not open its own transaction (`BEGIN`/`COMMIT`).
pub fn apply_script(conn: &mut Connection, script: &str) -> Result<(), MigrateError> {
    let tx: Transaction<'_> = conn.transaction().map_err(MigrateError::SchemaExecution)?;
    // Dropping `tx` without commit rolls back.
    tx.execute_batch(script)
        .map_err(MigrateError::SchemaExecution)?;
    tx.commit().map_err(MigrateError::SchemaExecution)
}

/// Looks up `expected` table names in `sqlite_master`.
pub fn verify_tables(conn: &Connection, expected: &[&str]) -> Result<MigrationReport, MigrateError> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")
        .map_err(MigrateError::Verify)?;
    let existing: HashSet<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(MigrateError::Verify)?
        .collect::<Result<_, _>>()
        .map_err(MigrateError::Verify)?;

    let (present, missing): (Vec<&str>, Vec<&str>) =
        expected.iter().copied().partition(|name| existing.contains(*name));

    Ok(MigrationReport {
        present: present.into_iter().map(String::from).collect(),
        missing: missing.into_iter().map(String::from).collect(),
    })
}
