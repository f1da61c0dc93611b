//! Per-generation entry operations.

use bytes::Bytes;
use tokio_rusqlite::{params, rusqlite};
use url::Url;

use super::connection::CacheDb;
use crate::{Error, Request, StoredResponse};

/// Handle to one cache generation.
///
/// Cheap to clone. Writes require the generation to exist (see
/// [`CacheDb::open_generation`]); reads on a missing generation return nothing.
#[derive(Clone, Debug)]
pub struct Generation {
    db: CacheDb,
    name: String,
}

struct EntryRow {
    response_url: String,
    status: i64,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn decode(self) -> Result<StoredResponse, Error> {
        let url = Url::parse(&self.response_url).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        let status = u16::try_from(self.status).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)?;
        Ok(StoredResponse { url, status, headers, body: Bytes::from(self.body) })
    }
}

/// Values bound into one `entries` row.
struct EntryParams {
    key_hash: String,
    method: String,
    url: String,
    response_url: String,
    status: i64,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryParams {
    fn encode(request: &Request, response: &StoredResponse) -> Result<Self, Error> {
        if !request.is_get() {
            return Err(Error::InvalidInput(format!(
                "only GET requests can be cached, got {}",
                request.method()
            )));
        }

        Ok(Self {
            key_hash: request.cache_key(),
            method: request.method().to_string(),
            url: request.url().to_string(),
            response_url: response.url.to_string(),
            status: i64::from(response.status),
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.to_vec(),
        })
    }
}

const UPSERT_ENTRY: &str = "INSERT INTO entries (
        generation, key_hash, method, url, response_url, status, headers_json, body, stored_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    ON CONFLICT(generation, key_hash) DO UPDATE SET
        method = excluded.method,
        url = excluded.url,
        response_url = excluded.response_url,
        status = excluded.status,
        headers_json = excluded.headers_json,
        body = excluded.body,
        stored_at = excluded.stored_at";

fn upsert(conn: &rusqlite::Connection, generation: &str, entry: &EntryParams, stored_at: &str) -> rusqlite::Result<()> {
    conn.execute(
        UPSERT_ENTRY,
        params![
            generation,
            &entry.key_hash,
            &entry.method,
            &entry.url,
            &entry.response_url,
            entry.status,
            &entry.headers_json,
            &entry.body,
            stored_at,
        ],
    )?;
    Ok(())
}

impl Generation {
    pub(crate) fn new(db: CacheDb, name: String) -> Self {
        Self { db, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up the stored response for a request.
    pub async fn get(&self, request: &Request) -> Result<Option<StoredResponse>, Error> {
        let generation = self.name.clone();
        let key_hash = request.cache_key();

        let row = self
            .db
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT response_url, status, headers_json, body
                     FROM entries WHERE generation = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![generation, key_hash], |row| {
                    Ok(EntryRow {
                        response_url: row.get(0)?,
                        status: row.get(1)?,
                        headers_json: row.get(2)?,
                        body: row.get(3)?,
                    })
                });

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(EntryRow::decode).transpose()
    }

    /// Store a response for a request, replacing any previous value.
    pub async fn put(&self, request: &Request, response: &StoredResponse) -> Result<(), Error> {
        let entry = EntryParams::encode(request, response)?;
        let generation = self.name.clone();
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                upsert(conn, &generation, &entry, &stored_at)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store several entries in one transaction. Either all land or none do.
    pub async fn put_all(&self, entries: &[(Request, StoredResponse)]) -> Result<(), Error> {
        let encoded = entries
            .iter()
            .map(|(request, response)| EntryParams::encode(request, response))
            .collect::<Result<Vec<_>, _>>()?;
        let generation = self.name.clone();
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for entry in &encoded {
                    upsert(&tx, &generation, entry, &stored_at)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Whether an entry is stored for every one of `requests`.
    pub async fn contains_all(&self, requests: &[Request]) -> Result<bool, Error> {
        let generation = self.name.clone();
        let mut keys: Vec<String> = requests.iter().map(Request::cache_key).collect();
        keys.sort();
        keys.dedup();

        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let mut stmt =
                    conn.prepare("SELECT EXISTS(SELECT 1 FROM entries WHERE generation = ?1 AND key_hash = ?2)")?;
                for key in &keys {
                    let found: bool = stmt.query_row(params![generation, key], |row| row.get(0))?;
                    if !found {
                        return Ok(false);
                    }
                }
                Ok(true)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of stored entries.
    pub async fn len(&self) -> Result<u64, Error> {
        let generation = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE generation = ?1",
                    params![generation],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }

    /// URLs of all stored entries, sorted.
    pub async fn urls(&self) -> Result<Vec<String>, Error> {
        let generation = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE generation = ?1 ORDER BY url")?;
                let urls = stmt
                    .query_map(params![generation], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}
