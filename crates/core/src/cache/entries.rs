//! Store and entry operations for the SQLite backend.
//!
//! Entries are keyed by `(store_name, key_hash)` where the hash covers the
//! request method and URL. Writes are UPSERTs, so the last write for a
//! request wins.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::{Cache, CacheStorage, CachedEntry, ensure_cacheable};
use crate::Error;
use crate::http::{Request, Response};

/// Raw row as stored; decoded outside the connection thread.
struct EntryRow {
    status: i64,
    status_text: String,
    headers_json: String,
    final_url: Option<String>,
    body: Vec<u8>,
    stored_at: String,
}

impl EntryRow {
    fn decode(self) -> Result<CachedEntry, Error> {
        let status = u16::try_from(self.status)
            .map_err(|_| Error::Corrupt(format!("status out of range: {}", self.status)))?;
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)
            .map_err(|e| Error::Corrupt(format!("invalid headers_json: {e}")))?;
        let stored_at = DateTime::parse_from_rfc3339(&self.stored_at)
            .map_err(|e| Error::Corrupt(format!("invalid stored_at: {e}")))?
            .with_timezone(&Utc);

        Ok(CachedEntry {
            response: Response {
                status,
                status_text: self.status_text,
                headers,
                body: self.body.into(),
                url: self.final_url,
            },
            stored_at,
        })
    }
}

impl CacheDb {
    /// Create a store if it doesn't exist yet.
    pub async fn create_store(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let created_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![name, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all stores in creation order.
    pub async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_stores ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, rusqlite::Error>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a store; its entries go with it via cascade.
    ///
    /// Returns false if no such store existed.
    pub async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM cache_stores WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Get an entry by store name and key hash.
    pub async fn get_entry(&self, store: &str, key_hash: &str) -> Result<Option<CachedEntry>, Error> {
        let store = store.to_string();
        let key_hash = key_hash.to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, status_text, headers_json, final_url, body, stored_at
                    FROM cache_entries WHERE store_name = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![store, key_hash], |row| {
                    Ok(EntryRow {
                        status: row.get(0)?,
                        status_text: row.get(1)?,
                        headers_json: row.get(2)?,
                        final_url: row.get(3)?,
                        body: row.get(4)?,
                        stored_at: row.get(5)?,
                    })
                });

                match result {
                    Ok(r) => Ok(Some(r)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(EntryRow::decode).transpose()
    }

    /// Insert or replace the entry for a request in a store.
    ///
    /// Creates the store if needed, so a write never fails on a store that
    /// was deleted between open and put.
    pub async fn put_entry(&self, store: &str, request: &Request, response: &Response) -> Result<(), Error> {
        ensure_cacheable(request)?;

        let store = store.to_string();
        let key_hash = request.cache_key();
        let method = request.method.clone();
        let url = request.url.to_string();
        let status = i64::from(response.status);
        let status_text = response.status_text.clone();
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::InvalidInput(format!("failed to encode headers: {e}")))?;
        let final_url = response.url.clone();
        let body = response.body.to_vec();
        let stored_at = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![store, stored_at],
                )?;
                conn.execute(
                    "INSERT INTO cache_entries (
                        store_name, key_hash, method, url, status, status_text,
                        headers_json, final_url, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    ON CONFLICT(store_name, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        status_text = excluded.status_text,
                        headers_json = excluded.headers_json,
                        final_url = excluded.final_url,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![store, key_hash, method, url, status, status_text, headers_json, final_url, body, stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a store.
    pub async fn count_entries(&self, store: &str) -> Result<u64, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE store_name = ?1",
                    params![store],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Request URLs stored in a store, oldest write first.
    pub async fn entry_urls(&self, store: &str) -> Result<Vec<String>, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT url FROM cache_entries WHERE store_name = ?1 ORDER BY stored_at ASC, url ASC")?;
                let urls = stmt
                    .query_map(params![store], |row| row.get(0))?
                    .collect::<Result<Vec<String>, rusqlite::Error>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}

/// Scoped handle to one SQLite-backed store.
#[derive(Debug, Clone)]
pub struct SqliteCache {
    db: CacheDb,
    name: String,
}

#[async_trait]
impl Cache for SqliteCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, request: &Request) -> Result<Option<CachedEntry>, Error> {
        self.db.get_entry(&self.name, &request.cache_key()).await
    }

    async fn put(&self, request: &Request, response: Response) -> Result<(), Error> {
        self.db.put_entry(&self.name, request, &response).await
    }

    async fn count(&self) -> Result<u64, Error> {
        self.db.count_entries(&self.name).await
    }

    async fn urls(&self) -> Result<Vec<String>, Error> {
        self.db.entry_urls(&self.name).await
    }
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>, Error> {
        self.create_store(name).await?;
        Ok(Arc::new(SqliteCache { db: self.clone(), name: name.to_string() }))
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.store_names().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.delete_store(name).await
    }
}
