//! Fetch strategies.
//!
//! Every strategy reads and writes through the same [`StrategyContext`].
//! Writes never fail a fetch: write-through, revalidation and eviction run in
//! detached tasks whose errors are logged and dropped. Read errors count as
//! misses.

pub mod cache_first;
pub mod network_first;
pub mod offline;
pub mod stale_while_revalidate;

use std::future::Future;
use std::sync::Arc;

use keepsake_core::{AppConfig, CacheDb, Error, PartitionKind, StrategyKind};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use url::Url;

use crate::fetch::{FetchResponse, Fetcher, NetworkError, Request};
use crate::routing::CacheNamer;

pub use cache_first::cache_first;
pub use network_first::network_first;
pub use stale_while_revalidate::stale_while_revalidate;

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    Offline,
    Bypass,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Cache => "cache",
            Self::Offline => "offline",
            Self::Bypass => "bypass",
        }
    }
}

/// Handle to detached work started by a strategy.
///
/// Dropping it leaves the task running. Awaiting [`Background::settle`]
/// waits for the work to land.
#[derive(Debug)]
pub struct Background {
    handle: JoinHandle<()>,
}

impl Background {
    pub(crate) fn spawn<F>(work: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self { handle: tokio::spawn(work) }
    }

    pub(crate) fn from_handle(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    /// Wait for the background work to finish.
    pub async fn settle(self) {
        if let Err(e) = self.handle.await {
            tracing::warn!("background cache task failed: {e}");
        }
    }
}

/// Result of running a request through the engine.
#[derive(Debug)]
pub struct FetchOutcome {
    pub response: FetchResponse,
    pub source: ResponseSource,
    /// Strategy that served the request; None when bypassed.
    pub strategy: Option<StrategyKind>,
    pub background: Option<Background>,
}

impl FetchOutcome {
    pub(crate) fn new(response: FetchResponse, source: ResponseSource, strategy: StrategyKind) -> Self {
        Self { response, source, strategy: Some(strategy), background: None }
    }

    pub(crate) fn bypass(response: FetchResponse) -> Self {
        Self { response, source: ResponseSource::Bypass, strategy: None, background: None }
    }

    pub(crate) fn with_background(mut self, background: Option<Background>) -> Self {
        self.background = background;
        self
    }

    /// Wait for any background work attached to this outcome.
    pub async fn settle(&mut self) {
        if let Some(background) = self.background.take() {
            background.settle().await;
        }
    }
}

/// Shared collaborators of every strategy.
#[derive(Clone)]
pub struct StrategyContext {
    pub db: CacheDb,
    pub fetcher: Arc<dyn Fetcher>,
    pub namer: CacheNamer,
    /// Budgets and trim ratio.
    pub config: Arc<AppConfig>,
    /// Cached page preferred over the synthesized offline page.
    pub offline_page: Option<Url>,
}

impl StrategyContext {
    pub fn new(config: &AppConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let offline_page = match &config.offline_page {
            Some(page) => Some(
                crate::fetch::resolve(&origin, page).map_err(|e| Error::InvalidUrl(format!("{page}: {e}")))?,
            ),
            None => None,
        };

        Ok(Self {
            db,
            fetcher,
            namer: CacheNamer::from_config(config),
            config: Arc::new(config.clone()),
            offline_page,
        })
    }

    /// Byte budget of a partition of the current version, if bounded.
    pub fn budget_for(&self, partition: &str) -> Option<u64> {
        let kind = PartitionKind::ALL.into_iter().find(|kind| self.namer.name(*kind) == partition)?;
        self.config.budget_for(kind)
    }

    /// Cached response for a request; storage errors count as a miss.
    pub async fn lookup(&self, partition: &str, request: &Request) -> Option<FetchResponse> {
        let stored = match self.db.match_entry(partition, &request.key()).await {
            Ok(stored) => stored?,
            Err(e) => {
                tracing::warn!(partition, url = %request.url, "cache read failed, treating as miss: {e}");
                return None;
            }
        };

        match FetchResponse::from_stored(stored) {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::warn!(partition, url = %request.url, "stored entry unreadable, treating as miss: {e}");
                None
            }
        }
    }

    /// Write a response and trim the partition if it is size-bounded.
    pub async fn store(&self, partition: &str, request: &Request, response: &FetchResponse) -> Result<(), Error> {
        if !response.is_storable() {
            return Err(Error::NotCacheable(format!("{} responded {}", request.url, response.status)));
        }

        self.db.put_entry(partition, &request.key(), response.to_stored()).await?;

        if let Some(budget) = self.budget_for(partition) {
            let report = self.db.enforce_budget(partition, budget, self.config.trim_ratio).await?;
            if !report.is_noop() {
                tracing::info!(
                    partition,
                    evicted = report.evicted.len(),
                    size_after = report.size_after,
                    "partition trimmed to budget"
                );
            }
        }

        Ok(())
    }

    /// Store a response in the background.
    ///
    /// Returns None when the response is not storable.
    pub fn write_through(&self, partition: &str, request: &Request, response: &FetchResponse) -> Option<Background> {
        if !response.is_storable() {
            tracing::debug!(url = %request.url, status = response.status.as_u16(), "response not stored");
            return None;
        }

        let ctx = self.clone();
        let partition = partition.to_string();
        let request = request.clone();
        let response = response.clone();

        Some(Background::spawn(async move {
            if let Err(e) = ctx.store(&partition, &request, &response).await {
                tracing::warn!(partition = %partition, url = %request.url, "cache write failed: {e}");
            }
        }))
    }

    /// Refresh an entry from the network in the background.
    pub fn revalidate(&self, partition: &str, request: &Request) -> Background {
        let ctx = self.clone();
        let partition = partition.to_string();
        let request = request.clone();

        Background::spawn(async move {
            match ctx.fetcher.fetch(&request).await {
                Ok(response) if response.is_storable() => {
                    if let Err(e) = ctx.store(&partition, &request, &response).await {
                        tracing::warn!(partition = %partition, url = %request.url, "cache refresh failed: {e}");
                    }
                }
                Ok(response) => {
                    tracing::debug!(url = %request.url, status = response.status.as_u16(), "refresh not stored");
                }
                Err(e) => tracing::debug!(url = %request.url, "refresh skipped: {e}"),
            }
        })
    }

    /// Fetch a request and wait for it to be stored.
    pub async fn fetch_and_store(&self, partition: &str, request: &Request) -> Result<(), Error> {
        let response = self.fetcher.fetch(request).await?;
        self.store(partition, request, &response).await
    }
}

/// One URL that could not be pre-warmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrecacheFailure {
    pub url: String,
    pub reason: String,
}

/// Outcome of a pre-warm batch. Each URL succeeds or fails on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrecacheReport {
    pub cached: Vec<String>,
    pub failed: Vec<PrecacheFailure>,
}

/// Fetch and store a batch of requests with bounded concurrency.
///
/// Results are reported in input order.
pub async fn precache(
    ctx: &StrategyContext, items: Vec<(String, Request)>, max_concurrency: usize,
) -> PrecacheReport {
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut join_set = JoinSet::new();

    for (index, (partition, request)) in items.into_iter().enumerate() {
        let semaphore = semaphore.clone();
        let ctx = ctx.clone();

        join_set.spawn(async move {
            // Hold permit for task duration to enforce concurrency limit
            let _permit = semaphore.acquire_owned().await;
            let result = ctx.fetch_and_store(&partition, &request).await;
            (index, request.url.to_string(), result)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(item) => results.push(item),
            Err(e) => tracing::warn!("precache task failed: {e}"),
        }
    }
    results.sort_by_key(|(index, _, _)| *index);

    let mut report = PrecacheReport::default();
    for (_, url, result) in results {
        match result {
            Ok(()) => report.cached.push(url),
            Err(e) => {
                tracing::warn!(url = %url, "precache failed: {e}");
                report.failed.push(PrecacheFailure { url, reason: e.to_string() });
            }
        }
    }
    report
}

/// Map a network failure with no fallback to the crate error.
pub(crate) fn propagate(request: &Request, err: NetworkError) -> Error {
    tracing::debug!(url = %request.url, "no fallback for failed request: {err}");
    err.into()
}
