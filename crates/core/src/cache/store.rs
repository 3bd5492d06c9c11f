//! Generation-scoped entry operations.
//!
//! A [`GenerationStore`] is a cheap handle onto one generation's slice of
//! the database. Entry lookups treat absence as `None`, writes are
//! UPSERTs, and only successful responses may be persisted.

use super::connection::CacheDb;
use crate::Error;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A captured response stored under a request key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub request_key: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl CacheEntry {
    /// Build an entry from captured response parts, stamping capture time.
    ///
    /// The body is owned outright: callers hand in their own copy, so the
    /// stored bytes share nothing with the buffer the page receives.
    pub fn new(
        request_key: String,
        method: String,
        url: String,
        status: u16,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            request_key,
            method,
            url,
            status,
            headers,
            body,
            stored_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Handle to one generation's slice of the store.
#[derive(Clone, Debug)]
pub struct GenerationStore {
    db: CacheDb,
    id: String,
}

impl CacheDb {
    /// Open the named generation, creating it if absent.
    pub async fn open_generation(&self, id: &str) -> Result<GenerationStore, Error> {
        let gen_id = id.to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (id, created_at) VALUES (?1, ?2)",
                    params![gen_id, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(GenerationStore { db: self.clone(), id: id.to_string() })
    }

    /// List all generation identifiers currently persisted, oldest first.
    pub async fn list_generations(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT id FROM generations ORDER BY created_at, id")?;
                let ids = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, rusqlite::Error>>()?;
                Ok(ids)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the named generation and everything stored under it.
    ///
    /// Idempotent: deleting an absent generation is not an error. Returns
    /// the number of entries removed.
    pub async fn delete_generation(&self, id: &str) -> Result<u64, Error> {
        let gen_id = id.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let entries = conn.execute("DELETE FROM entries WHERE generation = ?1", params![gen_id])?;
                conn.execute("DELETE FROM generations WHERE id = ?1", params![gen_id])?;
                Ok(entries as u64)
            })
            .await
            .map_err(Error::from)
    }
}

impl GenerationStore {
    /// The generation identifier this handle is scoped to.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Look up the entry for `request_key`.
    ///
    /// Absence is `None`, not an error.
    pub async fn match_request(&self, request_key: &str) -> Result<Option<CacheEntry>, Error> {
        let gen_id = self.id.clone();
        let key = request_key.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT request_key, method, url, status, headers_json, body, stored_at
                     FROM entries WHERE generation = ?1 AND request_key = ?2",
                )?;

                let result = stmt.query_row(params![gen_id, key], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Vec<u8>>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                });

                match result {
                    Ok((request_key, method, url, status, headers_json, body, stored_at)) => {
                        let headers = serde_json::from_str(&headers_json).unwrap_or_default();
                        Ok(Some(CacheEntry {
                            request_key,
                            method,
                            url,
                            status: status as u16,
                            headers,
                            body,
                            stored_at,
                        }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Persist a duplicate-safe copy of a captured response.
    ///
    /// Overwrites any prior entry for the same key. Only successful (2xx)
    /// responses may be stored. If the generation was cleared after this
    /// handle was opened, the row is re-registered, so writes lazily
    /// re-create the store the way the source platform's `open` does.
    pub async fn put(&self, entry: &CacheEntry) -> Result<(), Error> {
        if !(200..300).contains(&entry.status) {
            return Err(Error::NotCacheable(entry.status));
        }

        let gen_id = self.id.clone();
        let entry = entry.clone();
        let now = Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let headers_json = serde_json::to_string(&entry.headers).unwrap_or_else(|_| "[]".into());

                conn.execute(
                    "INSERT OR IGNORE INTO generations (id, created_at) VALUES (?1, ?2)",
                    params![gen_id, now],
                )?;
                conn.execute(
                    "INSERT INTO entries (generation, request_key, method, url, status, headers_json, body, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(generation, request_key) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        gen_id,
                        entry.request_key,
                        entry.method,
                        entry.url,
                        entry.status as i64,
                        headers_json,
                        entry.body,
                        entry.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries currently stored under this generation.
    pub async fn count(&self) -> Result<u64, Error> {
        let gen_id = self.id.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let n: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE generation = ?1",
                    params![gen_id],
                    |row| row.get(0),
                )?;
                Ok(n as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::request_key;

    fn make_entry(url: &str, status: u16, body: &[u8]) -> CacheEntry {
        CacheEntry::new(
            request_key("GET", url),
            "GET".to_string(),
            url.to_string(),
            status,
            vec![("content-type".to_string(), "text/html".to_string())],
            body.to_vec(),
        )
    }

    #[tokio::test]
    async fn test_put_then_match_round_trip() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_generation("app-v1").await.unwrap();
        let entry = make_entry("https://example.com/", 200, b"<html>home</html>");

        store.put(&entry).await.unwrap();

        let found = store.match_request(&entry.request_key).await.unwrap().unwrap();
        assert_eq!(found.status, entry.status);
        assert_eq!(found.body, entry.body);
        assert_eq!(found.headers, entry.headers);
    }

    #[tokio::test]
    async fn test_match_missing_is_none() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_generation("app-v1").await.unwrap();
        assert!(store.match_request("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_same_key() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_generation("app-v1").await.unwrap();

        store.put(&make_entry("https://example.com/a", 200, b"old")).await.unwrap();
        store.put(&make_entry("https://example.com/a", 200, b"new")).await.unwrap();

        let key = request_key("GET", "https://example.com/a");
        let found = store.match_request(&key).await.unwrap().unwrap();
        assert_eq!(found.body, b"new");
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_put_rejects_non_success_status() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_generation("app-v1").await.unwrap();

        let result = store.put(&make_entry("https://example.com/missing", 404, b"not found")).await;
        assert!(matches!(result, Err(Error::NotCacheable(404))));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_generation_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert_eq!(db.delete_generation("never-existed").await.unwrap(), 0);

        let store = db.open_generation("app-v1").await.unwrap();
        store.put(&make_entry("https://example.com/", 200, b"x")).await.unwrap();

        assert_eq!(db.delete_generation("app-v1").await.unwrap(), 1);
        assert_eq!(db.delete_generation("app-v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_generations() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("app-v1").await.unwrap();
        db.open_generation("app-v2").await.unwrap();

        let ids = db.list_generations().await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"app-v1".to_string()));
        assert!(ids.contains(&"app-v2".to_string()));
    }

    #[tokio::test]
    async fn test_generations_are_isolated() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let v1 = db.open_generation("app-v1").await.unwrap();
        let v2 = db.open_generation("app-v2").await.unwrap();

        v1.put(&make_entry("https://example.com/", 200, b"v1 body")).await.unwrap();

        let key = request_key("GET", "https://example.com/");
        assert!(v2.match_request(&key).await.unwrap().is_none());

        db.delete_generation("app-v2").await.unwrap();
        assert!(v1.match_request(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_put_after_clear_re_registers_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_generation("app-v1").await.unwrap();

        db.delete_generation("app-v1").await.unwrap();

        store.put(&make_entry("https://example.com/", 200, b"x")).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(db.list_generations().await.unwrap().contains(&"app-v1".to_string()));
    }

    #[tokio::test]
    async fn test_concurrent_same_key_puts_keep_one_intact_body() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_generation("app-v1").await.unwrap();

        let first = make_entry("https://example.com/data", 200, b"first writer");
        let second = make_entry("https://example.com/data", 200, b"second writer");

        let (a, b) = tokio::join!(store.put(&first), store.put(&second));
        a.unwrap();
        b.unwrap();

        let key = request_key("GET", "https://example.com/data");
        let found = store.match_request(&key).await.unwrap().unwrap();
        assert!(found.body == b"first writer" || found.body == b"second writer");
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
