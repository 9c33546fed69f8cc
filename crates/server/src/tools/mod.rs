//! MCP tool implementations.
//!
//! This module contains all tools exposed by the keepsake server.

pub mod cache;
pub mod fetch;
pub mod message;

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

use crate::error::ToolError;

pub use fetch::{FetchParams, fetch_impl};
pub use message::{PostMessageParams, post_message_impl};

/// Wrap a serializable output as a successful tool result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, ToolError> {
    let json = serde_json::to_string_pretty(output)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
