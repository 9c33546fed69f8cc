//! Network fetch primitive.
//!
//! The engine only ever talks to the network through [`Fetcher`]. A network
//! failure is an expected outcome that drives the fallback paths, so it is a
//! value ([`NetworkError`]), not a crate error.
//!
//! ### HttpFetcher
//! - reqwest client with rustls, gzip/brotli/deflate
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//! - Response kind derived from the site origin and request mode

pub mod request;
pub mod response;
pub mod url;

use async_trait::async_trait;
use keepsake_core::{AppConfig, Error, ResponseKind};
use reqwest::Client;
use std::time::{Duration, Instant};

pub use request::{Destination, Request, RequestMode};
pub use reqwest::Method;
pub use response::FetchResponse;
pub use url::{UrlError, resolve, same_origin};

/// Why a network fetch produced no response.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    #[error("network unreachable: {0}")]
    Unreachable(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("response too large: {len} bytes exceeds {max}")]
    TooLarge { len: usize, max: usize },
}

impl From<NetworkError> for Error {
    fn from(err: NetworkError) -> Self {
        Error::Network(err.to_string())
    }
}

/// The network: request in, response or failure out.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<FetchResponse, NetworkError>;
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "keepsake/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Site origin used to tell basic from cross-origin responses
    pub origin: Option<::url::Url>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "keepsake/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
            origin: None,
        }
    }
}

impl FetchConfig {
    /// Derive fetch settings from the application config.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            origin: Some(origin),
            ..Default::default()
        })
    }
}

/// reqwest-backed [`Fetcher`].
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn response_kind(&self, request: &Request) -> ResponseKind {
        match &self.config.origin {
            Some(origin) if !same_origin(origin, &request.url) => {
                if request.mode == RequestMode::NoCors {
                    ResponseKind::Opaque
                } else {
                    ResponseKind::Cors
                }
            }
            _ => ResponseKind::Basic,
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<FetchResponse, NetworkError> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NetworkError::Timeout(e.to_string())
                } else {
                    NetworkError::Unreachable(e.to_string())
                }
            })?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(NetworkError::TooLarge { len: len as usize, max: self.config.max_bytes });
        }

        let url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| NetworkError::Unreachable(format!("failed to read response: {e}")))?;

        if bytes.len() > self.config.max_bytes {
            return Err(NetworkError::TooLarge { len: bytes.len(), max: self.config.max_bytes });
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url, status, kind: self.response_kind(request), headers, bytes, fetch_ms })
    }
}
