//! Unified error types for keepsake.
//!
//! Each variant renders with a stable code prefix so callers on the other side
//! of the control channel can match on it.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the keepsake cache engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty partition name).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid or unroutable URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Named partition does not exist.
    #[error("CACHE_MISS: {0}")]
    PartitionNotFound(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored headers could not be encoded or decoded.
    #[error("CACHE_ERROR: serialization failed: {0}")]
    Serialization(String),

    /// Writing the entry would push the store past its byte quota.
    #[error("QUOTA_EXCEEDED: {needed} bytes needed, quota is {quota}")]
    QuotaExceeded { needed: u64, quota: u64 },

    /// Request or response is not eligible for storage.
    #[error("NOT_CACHEABLE: {0}")]
    NotCacheable(String),

    /// Network failure with no fallback available.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Lifecycle transition requested from the wrong state.
    #[error("LIFECYCLE_ERROR: {0}")]
    Lifecycle(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::PartitionNotFound(msg) => (-32001, msg.clone()),
            Error::Network(msg) => (-32008, msg.clone()),
            Error::QuotaExceeded { .. } => (-32007, err.to_string()),
            Error::NotCacheable(msg) => (-32009, msg.clone()),
            Error::Lifecycle(msg) => (-32010, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::Serialization(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PartitionNotFound("images-v2".to_string());
        assert!(err.to_string().contains("CACHE_MISS"));
        assert!(err.to_string().contains("images-v2"));
    }

    #[test]
    fn test_quota_display() {
        let err = Error::QuotaExceeded { needed: 2048, quota: 1024 };
        assert_eq!(err.to_string(), "QUOTA_EXCEEDED: 2048 bytes needed, quota is 1024");
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::PartitionNotFound("images-v2".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32001);

        let mcp_err: McpError = Error::Network("offline".into()).into();
        assert_eq!(mcp_err.code.0, -32008);
    }
}
