//! post_message tool implementation.
//!
//! Delivers a control message to the engine as a page would via postMessage.

use keepsake_client::{CacheEngine, ControlReply};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::json_result;

/// Input parameters for the post_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PostMessageParams {
    /// Message object with a `type` field: SKIP_WAITING, CACHE_NEW_ASSETS
    /// (with `urls` and `partition`), GET_CACHE_SIZE or CLEAR_CACHE.
    pub message: Value,
}

/// Output structure for the post_message tool.
#[derive(Debug, Clone, Serialize)]
pub struct PostMessageOutput {
    /// Reply sent back to the page; null when the message needs none or was ignored.
    pub reply: Option<ControlReply>,
}

/// Implementation of the post_message tool.
pub async fn post_message_impl(engine: &CacheEngine, params: PostMessageParams) -> Result<CallToolResult, McpError> {
    let reply = engine.handle_message(params.message).await?;
    Ok(json_result(&PostMessageOutput { reply })?)
}
