//! SQLite-backed partitioned response cache.
//!
//! This module provides the durable store behind the cache engine using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Named partitions whose names embed a version tag
//! - Request-keyed entries kept in insertion order
//! - Per-partition byte accounting and an optional global quota
//! - Batch eviction for size-bounded partitions
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod eviction;
pub mod hash;
pub mod migrations;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{RequestKey, ResponseKind, StoredResponse};
pub use eviction::{DEFAULT_TRIM_RATIO, EvictionReport, trim_count};
pub use partitions::{PartitionKind, carries_version, in_namespace};
