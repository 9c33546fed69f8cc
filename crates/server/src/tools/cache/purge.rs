//! cache_purge tool implementation.
//!
//! Deletes a partition outright, or trims it back under its size budget.

use keepsake_client::CacheEngine;
use keepsake_core::{Error, EvictionReport};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Partition name, e.g. "images-v1".
    pub partition: String,

    /// Evict oldest entries until the partition fits its budget instead of
    /// deleting it. Only images and fonts partitions have a budget.
    #[serde(default)]
    pub trim: bool,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CachePurgeOutput {
    Trimmed(EvictionReport),
    Deleted { deleted: String },
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(engine: &CacheEngine, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let CachePurgeParams { partition, trim } = params;

    let output = if trim {
        CachePurgeOutput::Trimmed(engine.trim(&partition).await?)
    } else {
        if !engine.db().delete_partition(&partition).await? {
            return Err(Error::PartitionNotFound(partition).into());
        }
        tracing::info!(partition = %partition, "partition purged");
        CachePurgeOutput::Deleted { deleted: partition }
    };

    Ok(json_result(&output)?)
}
