//! The cache engine: routing, strategies and lifecycle behind one handle.

use std::sync::Arc;

use keepsake_core::{AppConfig, CacheDb, Error, EvictionReport, StrategyKind};
use serde::Serialize;
use tokio::sync::watch;
use url::Url;

use crate::fetch::{Fetcher, Request, resolve};
use crate::lifecycle::{ActivationReport, InstallReport, LifecycleController, WorkerState};
use crate::routing::{CacheNamer, Route, StrategySelector};
use crate::strategy::{
    FetchOutcome, ResponseSource, StrategyContext, cache_first, network_first, offline, stale_while_revalidate,
};

/// Outcome of [`CacheEngine::start`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartReport {
    pub install: InstallReport,
    /// None when activation waits for SKIP_WAITING.
    pub activation: Option<ActivationReport>,
}

struct EngineInner {
    config: AppConfig,
    origin: Url,
    ctx: StrategyContext,
    selector: StrategySelector,
    lifecycle: LifecycleController,
}

/// Offline cache engine handle. Cloning is cheap.
#[derive(Clone)]
pub struct CacheEngine {
    inner: Arc<EngineInner>,
}

impl CacheEngine {
    /// Open the store at `config.db_path` and build the engine.
    pub async fn new(config: AppConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let db = CacheDb::open(&config.db_path).await?;
        Self::with_db(config, db, fetcher)
    }

    /// Build the engine over an already opened store.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the configuration does not validate
    /// and `Error::InvalidUrl` if the origin or an asset URL does not resolve.
    pub fn with_db(config: AppConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        config.validate().map_err(|e| Error::InvalidInput(e.to_string()))?;

        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let db = db.with_quota(config.quota_bytes);
        let ctx = StrategyContext::new(&config, db, fetcher)?;
        let selector = StrategySelector::from_config(&config)?;
        let lifecycle = LifecycleController::new(&config, ctx.clone())?;

        Ok(Self { inner: Arc::new(EngineInner { config, origin, ctx, selector, lifecycle }) })
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn db(&self) -> &CacheDb {
        &self.inner.ctx.db
    }

    pub fn namer(&self) -> &CacheNamer {
        &self.inner.ctx.namer
    }

    pub fn origin(&self) -> &Url {
        &self.inner.origin
    }

    pub(crate) fn context(&self) -> &StrategyContext {
        &self.inner.ctx
    }

    pub(crate) fn lifecycle(&self) -> &LifecycleController {
        &self.inner.lifecycle
    }

    pub async fn state(&self) -> WorkerState {
        self.inner.lifecycle.state().await
    }

    /// Follow which version controls clients.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.inner.lifecycle.subscribe()
    }

    /// Resolve a possibly relative URL against the origin.
    pub fn resolve(&self, input: &str) -> Result<Url, Error> {
        resolve(&self.inner.origin, input).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))
    }

    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.inner.lifecycle.install().await
    }

    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        self.inner.lifecycle.activate().await
    }

    /// Install, then activate unless configured to wait for SKIP_WAITING.
    pub async fn start(&self) -> Result<StartReport, Error> {
        let install = self.install().await?;
        let activation = if self.inner.config.skip_waiting { Some(self.activate().await?) } else { None };
        Ok(StartReport { install, activation })
    }

    /// Run an intercepted request through the cache layer.
    ///
    /// Until the engine is active every request goes straight to the network.
    pub async fn handle_fetch(&self, request: Request) -> Result<FetchOutcome, Error> {
        let state = self.state().await;
        if state != WorkerState::Active {
            tracing::debug!(url = %request.url, %state, "engine not active, bypassing cache");
            return self.passthrough(&request).await;
        }

        match self.inner.selector.select_strategy(&request) {
            Route::Bypass(reason) => {
                tracing::debug!(method = %request.method, url = %request.url, ?reason, "bypassing cache");
                self.passthrough(&request).await
            }
            Route::Strategy(kind) => {
                let ctx = &self.inner.ctx;
                let partition = ctx.namer.resolve_partition(&request);
                tracing::debug!(url = %request.url, strategy = %kind, partition = %partition, "routing request");

                match kind {
                    StrategyKind::NetworkFirst => network_first(ctx, &partition, &request).await,
                    StrategyKind::CacheFirst => cache_first(ctx, &partition, &request).await,
                    StrategyKind::StaleWhileRevalidate => stale_while_revalidate(ctx, &partition, &request).await,
                    StrategyKind::OfflineFallback => match offline::fallback(ctx, &request).await {
                        Some(response) => Ok(FetchOutcome::new(response, ResponseSource::Offline, kind)),
                        None => Err(Error::Network(format!("no offline fallback for {}", request.url))),
                    },
                }
            }
        }
    }

    async fn passthrough(&self, request: &Request) -> Result<FetchOutcome, Error> {
        let response = self.inner.ctx.fetcher.fetch(request).await?;
        Ok(FetchOutcome::bypass(response))
    }

    /// Trim a partition to its byte budget now.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the partition has no budget.
    pub async fn trim(&self, partition: &str) -> Result<EvictionReport, Error> {
        let ctx = &self.inner.ctx;
        let budget = ctx
            .budget_for(partition)
            .ok_or_else(|| Error::InvalidInput(format!("partition {partition} has no size budget")))?;
        ctx.db.enforce_budget(partition, budget, ctx.config.trim_ratio).await
    }
}
