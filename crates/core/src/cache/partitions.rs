//! Partition naming and partition-level operations.
//!
//! A partition name is `{prefix}-{suffix}-{version}` (or `{suffix}-{version}`
//! without a prefix). Version migration works purely on names: anything in the
//! prefix namespace that does not end in the current version is stale.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// Resource class a partition holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionKind {
    /// Documents and everything unclassified.
    Core,
    /// Stylesheets and scripts.
    Assets,
    /// Images. Size-bounded.
    Images,
    /// Web fonts. Size-bounded.
    Fonts,
}

impl PartitionKind {
    pub const ALL: [PartitionKind; 4] = [Self::Core, Self::Assets, Self::Images, Self::Fonts];

    /// Semantic suffix used in partition names.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Assets => "assets",
            Self::Images => "images",
            Self::Fonts => "fonts",
        }
    }

    /// Full partition name for a prefix and version tag.
    pub fn name(&self, prefix: &str, version: &str) -> String {
        if prefix.is_empty() {
            format!("{}-{version}", self.suffix())
        } else {
            format!("{prefix}-{}-{version}", self.suffix())
        }
    }
}

/// Whether a partition name carries the given version tag.
pub fn carries_version(name: &str, version: &str) -> bool {
    name.strip_suffix(version).is_some_and(|rest| rest.ends_with('-'))
}

/// Whether a partition name belongs to the prefix namespace.
///
/// Names in a namespace are exactly `{prefix}-{name}-{tag}`, or `{name}-{tag}`
/// without a prefix. Extra segments belong to a longer prefix.
pub fn in_namespace(name: &str, prefix: &str) -> bool {
    let rest = if prefix.is_empty() {
        Some(name)
    } else {
        name.strip_prefix(prefix).and_then(|rest| rest.strip_prefix('-'))
    };
    rest.and_then(|rest| rest.split_once('-'))
        .is_some_and(|(name, tag)| !name.is_empty() && !tag.is_empty() && !tag.contains('-'))
}

impl CacheDb {
    /// Create a partition if it doesn't exist yet.
    pub async fn open_partition(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![name, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Check whether a partition exists.
    pub async fn has_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM partitions WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List partition names in creation order.
    pub async fn partitions(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY rowid")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition with all its entries.
    ///
    /// Returns false if the partition didn't exist.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Total number of entries across all partitions.
    pub async fn entry_count(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_name() {
        assert_eq!(PartitionKind::Images.name("", "v3"), "images-v3");
        assert_eq!(PartitionKind::Core.name("finance", "v3"), "finance-core-v3");
    }

    #[test]
    fn test_carries_version() {
        assert!(carries_version("images-v3", "v3"));
        assert!(carries_version("finance-core-v3", "v3"));
        assert!(!carries_version("images-v2", "v3"));
        assert!(!carries_version("images-v13", "v3"));
        assert!(!carries_version("v3", "v3"));
    }

    #[test]
    fn test_in_namespace() {
        assert!(in_namespace("images-v3", ""));
        assert!(in_namespace("finance-core-v3", "finance"));
        assert!(!in_namespace("core-v3", "finance"));
        assert!(!in_namespace("financial-core-v3", "finance"));
    }

    #[test]
    fn test_in_namespace_rejects_longer_prefixes() {
        assert!(!in_namespace("shop-mobile-core-v1", "shop"));
        assert!(in_namespace("shop-mobile-core-v1", "shop-mobile"));
        assert!(!in_namespace("finance-core-v3", ""));
        assert!(!in_namespace("finance-", "finance"));
        assert!(!in_namespace("core", ""));
    }

    #[tokio::test]
    async fn test_open_and_list() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_partition("core-v1").await.unwrap();
        db.open_partition("assets-v1").await.unwrap();
        db.open_partition("core-v1").await.unwrap();

        assert_eq!(db.partitions().await.unwrap(), vec!["core-v1".to_string(), "assets-v1".to_string()]);
        assert!(db.has_partition("assets-v1").await.unwrap());
        assert!(!db.has_partition("images-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_partition() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_partition("core-v1").await.unwrap();

        assert!(db.delete_partition("core-v1").await.unwrap());
        assert!(!db.delete_partition("core-v1").await.unwrap());
        assert!(db.partitions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_entry_count_empty() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert_eq!(db.entry_count().await.unwrap(), 0);
    }
}
