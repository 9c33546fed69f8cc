//! Responses handed back to the page, and their stored form.

use bytes::Bytes;
use keepsake_core::{Error, ResponseKind, StoredResponse};
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use url::Url;

/// A response from the network, the cache, or the offline fallback.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL the response belongs to
    pub url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Basic, CORS or opaque
    pub kind: ResponseKind,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds (0 when not from the network)
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Content-Type header, if present.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Whether the response may be written to a partition.
    ///
    /// Requires a 2xx status, a non-opaque type, and no `no-store` directive.
    pub fn is_storable(&self) -> bool {
        let no_store = self
            .headers
            .get_all(header::CACHE_CONTROL)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.split(',').any(|d| d.trim().eq_ignore_ascii_case("no-store")));

        self.status.is_success() && self.kind != ResponseKind::Opaque && !no_store
    }

    /// Convert to the stored representation.
    pub fn to_stored(&self) -> StoredResponse {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        StoredResponse::new(self.url.as_str(), self.status.as_u16(), self.kind, headers, self.bytes.to_vec())
    }

    /// Rebuild a response from its stored representation.
    ///
    /// Headers that are no longer valid are dropped.
    pub fn from_stored(stored: StoredResponse) -> Result<Self, Error> {
        let url = Url::parse(&stored.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", stored.url)))?;
        let status = StatusCode::from_u16(stored.status)
            .map_err(|e| Error::Serialization(format!("status {}: {e}", stored.status)))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &stored.headers {
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                headers.append(name, value);
            }
        }

        Ok(Self { url, status, kind: stored.kind, headers, bytes: Bytes::from(stored.body), fetch_ms: 0 })
    }

    /// A locally built response that must never be cached.
    pub fn synthesized(url: Url, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

        Self { url, status: StatusCode::OK, kind: ResponseKind::Basic, headers, bytes: body.into(), fetch_ms: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: StatusCode) -> FetchResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/css"));
        FetchResponse {
            url: Url::parse("https://shop.example/css/styles.css").unwrap(),
            status,
            kind: ResponseKind::Basic,
            headers,
            bytes: Bytes::from_static(b"body{}"),
            fetch_ms: 12,
        }
    }

    #[test]
    fn test_storable() {
        assert!(response(StatusCode::OK).is_storable());
        assert!(!response(StatusCode::NOT_FOUND).is_storable());
        assert!(!response(StatusCode::INTERNAL_SERVER_ERROR).is_storable());

        let opaque = FetchResponse { kind: ResponseKind::Opaque, ..response(StatusCode::OK) };
        assert!(!opaque.is_storable());
    }

    #[test]
    fn test_no_store_not_storable() {
        let mut res = response(StatusCode::OK);
        res.headers
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("private, no-store"));
        assert!(!res.is_storable());
    }

    #[test]
    fn test_stored_conversion_keeps_payload() {
        let original = response(StatusCode::OK);
        let restored = FetchResponse::from_stored(original.to_stored()).unwrap();

        assert_eq!(restored.url, original.url);
        assert_eq!(restored.status, StatusCode::OK);
        assert_eq!(restored.bytes, original.bytes);
        assert_eq!(restored.content_type(), Some("text/css"));
        assert_eq!(restored.fetch_ms, 0);
    }

    #[test]
    fn test_synthesized_is_not_storable() {
        let res = FetchResponse::synthesized(
            Url::parse("https://shop.example/").unwrap(),
            "text/html; charset=utf-8",
            "<h1>Offline</h1>",
        );
        assert_eq!(res.status, StatusCode::OK);
        assert!(!res.is_storable());
    }
}
