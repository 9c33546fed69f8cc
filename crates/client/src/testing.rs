//! In-process network double for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use keepsake_core::{AppConfig, CacheDb, ResponseKind};
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};
use tokio::sync::watch;
use url::Url;

use crate::fetch::{FetchResponse, Fetcher, NetworkError, Request, RequestMode, same_origin};
use crate::strategy::StrategyContext;

pub const ORIGIN: &str = "https://shop.example";

#[derive(Clone)]
struct Scripted {
    status: u16,
    content_type: String,
    body: Bytes,
}

/// Fetcher answering from a script: per-URL responses, an offline switch, a
/// hold gate and call counters. Unscripted URLs answer 404.
pub struct ScriptedFetcher {
    origin: Url,
    routes: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<HashMap<String, usize>>,
    offline: AtomicBool,
    held: watch::Sender<bool>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        let (held, _) = watch::channel(false);
        Self {
            origin: Url::parse(ORIGIN).unwrap(),
            routes: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
            held,
        }
    }

    /// Absolute URL for a path on the test origin; absolute inputs pass through.
    pub fn url(&self, path: &str) -> Url {
        self.origin.join(path).unwrap()
    }

    pub fn get(&self, path: &str) -> Request {
        Request::get(self.url(path))
    }

    pub fn respond(&self, path: &str, status: u16, content_type: &str, body: impl Into<Bytes>) {
        let scripted = Scripted { status, content_type: content_type.to_string(), body: body.into() };
        self.routes.lock().unwrap().insert(self.url(path).to_string(), scripted);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Park every fetch until [`ScriptedFetcher::release`].
    pub fn hold(&self) {
        self.held.send_replace(true);
    }

    pub fn release(&self) {
        self.held.send_replace(false);
    }

    pub fn calls(&self, path: &str) -> usize {
        self.calls.lock().unwrap().get(self.url(path).as_str()).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request) -> Result<FetchResponse, NetworkError> {
        *self.calls.lock().unwrap().entry(request.url.to_string()).or_default() += 1;

        let mut held = self.held.subscribe();
        let _ = held.wait_for(|held| !*held).await;

        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::Unreachable(format!("offline: {}", request.url)));
        }

        let scripted = self.routes.lock().unwrap().get(request.url.as_str()).cloned().unwrap_or(Scripted {
            status: 404,
            content_type: "text/plain".into(),
            body: Bytes::from_static(b"not found"),
        });

        let kind = if same_origin(&self.origin, &request.url) {
            ResponseKind::Basic
        } else if request.mode == RequestMode::NoCors {
            ResponseKind::Opaque
        } else {
            ResponseKind::Cors
        };

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(&scripted.content_type).unwrap());

        Ok(FetchResponse {
            url: request.url.clone(),
            status: StatusCode::from_u16(scripted.status).unwrap(),
            kind,
            headers,
            bytes: scripted.body,
            fetch_ms: 1,
        })
    }
}

/// Engine configuration pointing at the test origin.
pub fn config() -> AppConfig {
    AppConfig { origin: ORIGIN.into(), ..Default::default() }
}

/// Strategy context over an in-memory store and the given fetcher.
pub async fn context(fetcher: ScriptedFetcher) -> (StrategyContext, Arc<ScriptedFetcher>) {
    let fetcher = Arc::new(fetcher);
    let db = CacheDb::open_in_memory().await.unwrap();
    let ctx = StrategyContext::new(&config(), db, fetcher.clone()).unwrap();
    (ctx, fetcher)
}
