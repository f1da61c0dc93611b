//! Schema migrations for the generation store.
//!
//! Applied in order on open; the highest applied version is kept in
//! `_schema`. Each step runs in its own transaction together with its
//! bookkeeping row, so a failing step leaves the previous version intact.

use tokio_rusqlite::{Connection, params, rusqlite};

use super::Error;

/// A numbered schema step.
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration { version: 1, name: "generations", sql: include_str!("../../migrations/001_generations.sql") },
    Migration { version: 2, name: "entries", sql: include_str!("../../migrations/002_entries.sql") },
];

/// Latest schema version this build knows about.
pub const SCHEMA_VERSION: u32 = 2;

fn applied_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _schema (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )?;
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _schema", [], |row| row.get(0))
}

/// Bring the schema up to [`SCHEMA_VERSION`].
///
/// # Errors
///
/// Returns `Error::MigrationFailed` naming the step that could not be applied,
/// or if the database was written by a newer build.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        let current = applied_version(conn)?;
        if current > SCHEMA_VERSION {
            return Err(Error::MigrationFailed(format!(
                "database schema v{current} is newer than supported v{SCHEMA_VERSION}"
            )));
        }

        for step in MIGRATIONS.iter().filter(|m| m.version > current) {
            let tx = conn.transaction()?;
            tx.execute_batch(step.sql)
                .map_err(|e| Error::MigrationFailed(format!("{} ({}): {e}", step.version, step.name)))?;
            tx.execute(
                "INSERT INTO _schema (version, name, applied_at) VALUES (?1, ?2, ?3)",
                params![step.version, step.name, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
            tracing::debug!(version = step.version, name = step.name, "applied migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

/// Highest applied schema version.
pub async fn version(conn: &Connection) -> Result<u32, Error> {
    conn.call(|conn| -> Result<u32, Error> { Ok(applied_version(conn)?) })
        .await
        .map_err(Error::from)
}
