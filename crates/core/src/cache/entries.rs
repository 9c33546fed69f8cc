//! Entry operations: match, put, delete, keys, and size accounting.
//!
//! Only GET requests with successful, non-opaque responses are ever written.
//! `put_entry` enforces that, so no caller can persist a non-GET key.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

/// Identity of a cached request: method + absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self { method: method.into().to_ascii_uppercase(), url: url.into() }
    }

    /// Key for a GET of `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Only GET requests may be stored.
    pub fn is_cacheable(&self) -> bool {
        self.method == "GET"
    }

    /// Storage hash of this key.
    pub fn hash(&self) -> String {
        compute_request_key(&self.method, &self.url)
    }
}

/// How the response was obtained, mirroring fetch response types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Same-origin response.
    #[default]
    Basic,
    /// Readable cross-origin response.
    Cors,
    /// Unreadable cross-origin response; status and body are hidden.
    Opaque,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Cors => "cors",
            Self::Opaque => "opaque",
        }
    }

    fn parse(value: &str) -> Self {
        match value {
            "cors" => Self::Cors,
            "opaque" => Self::Opaque,
            _ => Self::Basic,
        }
    }
}

/// A response as persisted in a partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub url: String,
    pub status: u16,
    pub kind: ResponseKind,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl StoredResponse {
    pub fn new(
        url: impl Into<String>, status: u16, kind: ResponseKind, headers: Vec<(String, String)>, body: Vec<u8>,
    ) -> Self {
        Self { url: url.into(), status, kind, headers, body, stored_at: chrono::Utc::now().to_rfc3339() }
    }

    /// Byte length counted against partition budgets.
    pub fn byte_len(&self) -> u64 {
        self.body.len() as u64
    }

    /// Successful (2xx) and not opaque.
    pub fn is_cacheable(&self) -> bool {
        (200..300).contains(&self.status) && self.kind != ResponseKind::Opaque
    }

    /// First header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl CacheDb {
    /// Store a response under a request key, replacing any previous entry.
    ///
    /// A replaced entry moves to the end of the partition's insertion order.
    /// The partition is created if needed.
    ///
    /// # Errors
    ///
    /// - `Error::NotCacheable` for non-GET keys and non-2xx or opaque responses
    /// - `Error::QuotaExceeded` if the store would grow past its quota
    pub async fn put_entry(&self, partition: &str, key: &RequestKey, response: StoredResponse) -> Result<(), Error> {
        if !key.is_cacheable() {
            return Err(Error::NotCacheable(format!("{} {}", key.method, key.url)));
        }
        if !response.is_cacheable() {
            return Err(Error::NotCacheable(format!(
                "{} responded {} ({})",
                key.url,
                response.status,
                response.kind.as_str()
            )));
        }

        let partition = partition.to_string();
        let key = key.clone();
        let quota = self.quota_bytes;
        let headers_json = serde_json::to_string(&response.headers)?;

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let key_hash = key.hash();
                let byte_len = response.byte_len();
                let tx = conn.transaction()?;

                tx.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![partition, response.stored_at],
                )?;

                if let Some(quota) = quota {
                    let others: i64 = tx.query_row(
                        "SELECT COALESCE(SUM(byte_len), 0) FROM entries
                         WHERE NOT (partition = ?1 AND key_hash = ?2)",
                        params![partition, key_hash],
                        |row| row.get(0),
                    )?;
                    let needed = others as u64 + byte_len;
                    if needed > quota {
                        return Err(Error::QuotaExceeded { needed, quota });
                    }
                }

                tx.execute(
                    "DELETE FROM entries WHERE partition = ?1 AND key_hash = ?2",
                    params![partition, key_hash],
                )?;
                tx.execute(
                    "INSERT INTO entries (
                        partition, key_hash, method, url, status, kind,
                        headers_json, body, byte_len, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        partition,
                        key_hash,
                        key.method,
                        key.url,
                        response.status,
                        response.kind.as_str(),
                        headers_json,
                        response.body,
                        byte_len as i64,
                        response.stored_at,
                    ],
                )?;

                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the response stored for a request key.
    ///
    /// Returns None if the partition or the entry doesn't exist.
    pub async fn match_entry(&self, partition: &str, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        let partition = partition.to_string();
        let key_hash = key.hash();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let result = conn.query_row(
                    "SELECT url, status, kind, headers_json, body, stored_at
                     FROM entries WHERE partition = ?1 AND key_hash = ?2",
                    params![partition, key_hash],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, u16>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, Vec<u8>>(4)?,
                            row.get::<_, String>(5)?,
                        ))
                    },
                );

                match result {
                    Ok((url, status, kind, headers_json, body, stored_at)) => Ok(Some(StoredResponse {
                        url,
                        status,
                        kind: ResponseKind::parse(&kind),
                        headers: serde_json::from_str(&headers_json)?,
                        body,
                        stored_at,
                    })),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one entry.
    ///
    /// Returns false if there was nothing to delete.
    pub async fn delete_entry(&self, partition: &str, key: &RequestKey) -> Result<bool, Error> {
        let partition = partition.to_string();
        let key_hash = key.hash();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE partition = ?1 AND key_hash = ?2",
                    params![partition, key_hash],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Request keys of a partition, oldest first.
    pub async fn keys(&self, partition: &str) -> Result<Vec<RequestKey>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<RequestKey>, Error> {
                let mut stmt = conn.prepare("SELECT method, url FROM entries WHERE partition = ?1 ORDER BY seq")?;
                let keys = stmt
                    .query_map(params![partition], |row| Ok(RequestKey { method: row.get(0)?, url: row.get(1)? }))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Total stored bytes of a partition.
    pub async fn size_of(&self, partition: &str) -> Result<u64, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let size: i64 = conn.query_row(
                    "SELECT COALESCE(SUM(byte_len), 0) FROM entries WHERE partition = ?1",
                    params![partition],
                    |row| row.get(0),
                )?;
                Ok(size as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Total stored bytes across all partitions.
    pub async fn total_size(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let size: i64 = conn.query_row("SELECT COALESCE(SUM(byte_len), 0) FROM entries", [], |row| row.get(0))?;
                Ok(size as u64)
            })
            .await
            .map_err(Error::from)
    }
}
