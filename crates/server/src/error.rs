//! Errors raised by tool argument handling.
//!
//! Engine failures arrive as `keepsake_core::Error` and convert on their own;
//! this covers what goes wrong before a request reaches the engine.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Tool-level errors for the keepsake server.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// A tool argument could not be interpreted (e.g., unknown HTTP method).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Tool output could not be encoded.
    #[error("SERIALIZATION_FAILED: {0}")]
    Serialization(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::Serialization(msg) => (-32603, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_codes() {
        let err: McpError = ToolError::InvalidInput("method".into()).into();
        assert_eq!(err.code.0, -32602);

        let err: McpError = ToolError::Serialization("bad".into()).into();
        assert_eq!(err.code.0, -32603);
    }
}
