//! Core types and shared functionality for keepsake.
//!
//! This crate provides:
//! - Partitioned response cache with SQLite backend
//! - Size-budget eviction for bounded partitions
//! - Strategy table types
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod strategy;

pub use cache::{CacheDb, EvictionReport, PartitionKind, RequestKey, ResponseKind, StoredResponse};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use strategy::{ResourceClass, StrategyKind, StrategyTable};
