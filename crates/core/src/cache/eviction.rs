//! Byte-budget eviction for size-bounded partitions.
//!
//! A pass that finds a partition over budget removes the oldest share of its
//! keys (by insertion order) in one batch and stops. It is not LRU: an entry
//! read often but written long ago is still among the first to go. No lock is
//! held between measuring and deleting; a write racing the trim is corrected
//! by the next pass.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// Default share of keys removed per pass.
pub const DEFAULT_TRIM_RATIO: f64 = 0.2;

/// Outcome of one eviction pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvictionReport {
    pub partition: String,
    pub budget: u64,
    pub size_before: u64,
    pub size_after: u64,
    /// URLs of evicted entries, oldest first.
    pub evicted: Vec<String>,
}

impl EvictionReport {
    pub fn is_noop(&self) -> bool {
        self.evicted.is_empty()
    }
}

/// Number of keys one pass removes from a partition holding `len` keys.
///
/// Rounds up and never returns 0 for a non-empty partition.
pub fn trim_count(len: usize, ratio: f64) -> usize {
    if len == 0 {
        return 0;
    }
    ((len as f64 * ratio).ceil() as usize).clamp(1, len)
}

impl CacheDb {
    /// Trim a partition if its stored bytes exceed `budget`.
    ///
    /// Deletes the oldest `trim_count(len, ratio)` entries and stops, even if
    /// the partition is still over budget afterwards.
    pub async fn enforce_budget(&self, partition: &str, budget: u64, ratio: f64) -> Result<EvictionReport, Error> {
        let size_before = self.size_of(partition).await?;
        let mut report = EvictionReport {
            partition: partition.to_string(),
            budget,
            size_before,
            size_after: size_before,
            evicted: Vec::new(),
        };

        if size_before <= budget {
            return Ok(report);
        }

        let name = partition.to_string();
        let evicted = self
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let len: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![name], |row| {
                        row.get(0)
                    })?;
                let count = trim_count(len as usize, ratio) as i64;

                let mut stmt = conn.prepare("SELECT seq, url FROM entries WHERE partition = ?1 ORDER BY seq LIMIT ?2")?;
                let oldest = stmt
                    .query_map(params![name, count], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;

                let mut urls = Vec::with_capacity(oldest.len());
                for (seq, url) in oldest {
                    conn.execute("DELETE FROM entries WHERE seq = ?1", params![seq])?;
                    urls.push(url);
                }
                Ok(urls)
            })
            .await
            .map_err(Error::from)?;

        report.size_after = self.size_of(partition).await?;
        report.evicted = evicted;

        tracing::debug!(
            partition,
            budget,
            size_before = report.size_before,
            size_after = report.size_after,
            evicted = report.evicted.len(),
            "trimmed partition over budget"
        );

        Ok(report)
    }
}
