//! fetch tool implementation.
//!
//! Runs one request through the cache engine, the way a page's fetch would be
//! intercepted.

use keepsake_client::{CacheEngine, Destination, Method, Request, RequestMode};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;
use crate::tools::json_result;

/// Input parameters for the fetch tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FetchParams {
    /// URL to fetch, absolute or relative to the site origin.
    pub url: String,

    /// HTTP method (default: GET). Anything but GET bypasses the cache.
    #[serde(default)]
    pub method: Option<String>,

    /// Request destination: "document", "image", "font", "style", "script",
    /// "manifest" or "empty" (default).
    #[serde(default)]
    pub destination: Option<String>,

    /// Request mode: "navigate", "same-origin", "no-cors" or "cors" (default).
    #[serde(default)]
    pub mode: Option<String>,

    /// Include the response body as text when it is valid UTF-8 (default: true).
    #[serde(default = "default_true")]
    pub include_body: bool,

    /// Wait for background cache writes before returning (default: false).
    #[serde(default)]
    pub settle: bool,
}

fn default_true() -> bool {
    true
}

/// Output structure for the fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchOutput {
    /// The URL that was requested.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Where the response came from: network, cache, offline or bypass.
    pub source: String,
    /// Strategy that served the request, if any.
    pub strategy: Option<String>,
    /// Partition the request belongs to.
    pub partition: String,
    /// Content-Type header.
    pub content_type: Option<String>,
    /// Body length in bytes.
    pub bytes: usize,
    /// Body text, if requested and valid UTF-8.
    pub body: Option<String>,
    /// Network time in milliseconds (0 when not from the network).
    pub fetch_ms: u64,
}

fn parse_enum<T: serde::de::DeserializeOwned>(field: &str, value: &str) -> Result<T, ToolError> {
    serde_json::from_value(Value::String(value.to_ascii_lowercase()))
        .map_err(|_| ToolError::InvalidInput(format!("unsupported {field}: {value}")))
}

fn build_request(engine: &CacheEngine, params: &FetchParams) -> Result<Request, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()).into());
    }

    let url = engine.resolve(&params.url)?;
    let mut request = Request::get(url);

    if let Some(method) = &params.method {
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| ToolError::InvalidInput(format!("unsupported method: {method}")))?;
        request = request.with_method(method);
    }
    if let Some(destination) = &params.destination {
        request = request.with_destination(parse_enum::<Destination>("destination", destination)?);
    }
    if let Some(mode) = &params.mode {
        request = request.with_mode(parse_enum::<RequestMode>("mode", mode)?);
    }

    Ok(request)
}

/// Implementation of the fetch tool.
pub async fn fetch_impl(engine: &CacheEngine, params: FetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(engine, &params)?;
    let partition = engine.namer().resolve_partition(&request);

    let mut outcome = engine.handle_fetch(request.clone()).await?;
    if params.settle {
        outcome.settle().await;
    }

    let response = &outcome.response;
    let body = if params.include_body { String::from_utf8(response.bytes.to_vec()).ok() } else { None };

    let output = FetchOutput {
        url: request.url.to_string(),
        status: response.status.as_u16(),
        source: outcome.source.as_str().to_string(),
        strategy: outcome.strategy.map(|s| s.to_string()),
        partition,
        content_type: response.content_type().map(String::from),
        bytes: response.bytes.len(),
        body,
        fetch_ms: response.fetch_ms,
    };

    Ok(json_result(&output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{engine, output};
    use std::sync::atomic::Ordering;

    fn params(url: &str) -> FetchParams {
        FetchParams { url: url.into(), include_body: true, ..Default::default() }
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let (engine, _) = engine().await;
        assert!(fetch_impl(&engine, params("")).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_invalid_method() {
        let (engine, _) = engine().await;
        let params = FetchParams { method: Some("GE T".into()), ..params("/") };
        let err = fetch_impl(&engine, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_fetch_invalid_destination() {
        let (engine, _) = engine().await;
        let params = FetchParams { destination: Some("video".into()), ..params("/") };
        assert!(fetch_impl(&engine, params).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_image_writes_through() {
        let (engine, _) = engine().await;
        let params = FetchParams { settle: true, ..params("/images/logo.png") };

        let result = fetch_impl(&engine, params).await.unwrap();
        let out: FetchOutput = output(&result);
        assert_eq!(out.status, 200);
        assert_eq!(out.source, "network");
        assert_eq!(out.strategy.as_deref(), Some("stale-while-revalidate"));
        assert_eq!(out.partition, "images-v1");
        assert_eq!(engine.db().keys("images-v1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_post_bypasses() {
        let (engine, _) = engine().await;
        let params = FetchParams { method: Some("post".into()), ..params("/api/order") };

        let out: FetchOutput = output(&fetch_impl(&engine, params).await.unwrap());
        assert_eq!(out.source, "bypass");
        assert!(out.strategy.is_none());
    }

    #[tokio::test]
    async fn test_fetch_offline_navigation() {
        let (engine, fetcher) = engine().await;
        fetcher.offline.store(true, Ordering::SeqCst);
        let params = FetchParams { mode: Some("navigate".into()), ..params("/not-cached.html") };

        let out: FetchOutput = output(&fetch_impl(&engine, params).await.unwrap());
        assert_eq!(out.status, 200);
        assert_eq!(out.source, "offline");
        assert!(out.body.unwrap().contains("offline.html"));
    }
}
