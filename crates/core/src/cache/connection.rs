//! Opening the generation store.

use std::path::Path;

use tokio_rusqlite::Connection;

use super::migrations;
use crate::Error;

/// Journal in WAL so readers never block the writer; cascade deletes need
/// foreign keys switched on per connection.
const PRAGMAS: &[(&str, &str)] = &[
    ("journal_mode", "WAL"),
    ("synchronous", "NORMAL"),
    ("temp_store", "MEMORY"),
    ("foreign_keys", "ON"),
];

/// Handle to the SQLite database holding every cache generation.
///
/// Statements run on tokio-rusqlite's background thread. Clones share the
/// connection, so every handle sees the same generations.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
}

impl CacheDb {
    /// Open (or create) the store at `path`, creating missing parent
    /// directories, then migrate it.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::InvalidInput(format!("cannot create {}: {e}", parent.display())))?;
        }

        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        let db = Self::configure(conn).await?;
        tracing::debug!(path = %path.display(), "cache database opened");
        Ok(db)
    }

    /// Open a private in-memory store.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::configure(conn).await
    }

    /// Applied schema version.
    pub async fn schema_version(&self) -> Result<u32, Error> {
        migrations::version(&self.conn).await
    }

    async fn configure(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| -> Result<(), Error> {
            for (pragma, value) in PRAGMAS {
                conn.execute_batch(&format!("PRAGMA {pragma}={value};"))?;
            }
            Ok(())
        })
        .await
        .map_err(Error::from)?;

        migrations::run(&conn).await?;
        Ok(Self { conn })
    }
}
