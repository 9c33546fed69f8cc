//! Offline fallback: the terminal failure path.
//!
//! Navigations get the cached offline page when there is one, otherwise a
//! minimal synthesized HTML page. Images get an inline SVG placeholder.
//! Synthesized responses carry `Cache-Control: no-store` and are never
//! written to a partition.

use keepsake_core::PartitionKind;

use super::StrategyContext;
use crate::fetch::{FetchResponse, Request};
use crate::routing::classify;

pub const OFFLINE_HTML_TYPE: &str = "text/html; charset=utf-8";
pub const PLACEHOLDER_SVG_TYPE: &str = "image/svg+xml";

const OFFLINE_HTML: &str = "<!DOCTYPE html>
<html lang=\"en\">
<head>
<meta charset=\"utf-8\">
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">
<title>Offline</title>
<style>body{font-family:system-ui,sans-serif;text-align:center;padding:3rem 1rem;color:#333}</style>
</head>
<body>
<h1>You are offline</h1>
<p>This page is not available without a connection. Check your network and try again.</p>
<button onclick=\"location.reload()\">Retry</button>
</body>
</html>
";

const PLACEHOLDER_SVG: &str = "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"200\" height=\"200\" viewBox=\"0 0 200 200\">\
<rect width=\"200\" height=\"200\" fill=\"#eeeeee\"/>\
<text x=\"100\" y=\"105\" font-family=\"sans-serif\" font-size=\"14\" fill=\"#999999\" text-anchor=\"middle\">Offline</text>\
</svg>";

/// Fallback response for a request, if its kind has one.
pub async fn fallback(ctx: &StrategyContext, request: &Request) -> Option<FetchResponse> {
    if request.is_navigation() {
        return Some(offline_page(ctx, request).await);
    }
    if classify(request) == PartitionKind::Images {
        return Some(placeholder_image(request));
    }
    None
}

/// Cached offline page, or the synthesized one.
pub async fn offline_page(ctx: &StrategyContext, request: &Request) -> FetchResponse {
    if let Some(page) = &ctx.offline_page {
        let page_request = Request::get(page.clone());
        if let Some(cached) = ctx.lookup(&ctx.namer.name(PartitionKind::Core), &page_request).await {
            tracing::debug!(url = %request.url, page = %page, "serving cached offline page");
            return cached;
        }
    }

    tracing::debug!(url = %request.url, "serving synthesized offline page");
    FetchResponse::synthesized(request.url.clone(), OFFLINE_HTML_TYPE, OFFLINE_HTML)
}

/// Inline SVG placeholder for an image.
pub fn placeholder_image(request: &Request) -> FetchResponse {
    FetchResponse::synthesized(request.url.clone(), PLACEHOLDER_SVG_TYPE, PLACEHOLDER_SVG)
}
