//! cache_keys tool implementation.
//!
//! Lists partitions, or the request keys stored in one partition.

use keepsake_core::{CacheDb, Error, RequestKey};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Partition to list. When omitted, every partition is summarized along
    /// with the total stored bytes.
    pub partition: Option<String>,
}

/// Size summary of one partition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PartitionSummary {
    pub name: String,
    pub entries: usize,
    pub bytes: u64,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheKeysOutput {
    Partitions { partitions: Vec<PartitionSummary>, total_bytes: u64 },
    Keys { partition: String, bytes: u64, keys: Vec<RequestKey> },
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(cache: &CacheDb, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let output = match params.partition {
        Some(partition) => {
            if !cache.has_partition(&partition).await? {
                return Err(Error::PartitionNotFound(partition).into());
            }
            let keys = cache.keys(&partition).await?;
            let bytes = cache.size_of(&partition).await?;
            CacheKeysOutput::Keys { partition, bytes, keys }
        }
        None => {
            let mut partitions = Vec::new();
            for name in cache.partitions().await? {
                let entries = cache.keys(&name).await?.len();
                let bytes = cache.size_of(&name).await?;
                partitions.push(PartitionSummary { name, entries, bytes });
            }
            let total_bytes = cache.total_size().await?;
            CacheKeysOutput::Partitions { partitions, total_bytes }
        }
    };

    Ok(json_result(&output)?)
}
