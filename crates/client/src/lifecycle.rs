//! Worker lifecycle: install, activate, version migration and claim.
//!
//! ```text
//! Parsed → Installing → Installed → Activating → Active
//!              ↓
//!          Redundant
//! ```
//!
//! Install pre-warms the critical assets; each URL succeeds or fails on its
//! own. Activation deletes every partition in the prefix namespace whose name
//! does not carry the current version, then claims clients by publishing the
//! version on the controller channel.

use keepsake_core::cache::{carries_version, in_namespace};
use keepsake_core::{AppConfig, Error, PartitionKind};
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use url::Url;

use crate::fetch::{Request, resolve};
use crate::strategy::{PrecacheFailure, StrategyContext, precache};

/// Lifecycle state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Active,
    /// Install failed; the engine never serves from cache.
    Redundant,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Active => "active",
            Self::Redundant => "redundant",
        }
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub version: String,
    pub cached: Vec<String>,
    pub failed: Vec<PrecacheFailure>,
}

/// Outcome of activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    pub version: String,
    /// Stale partitions removed, in creation order.
    pub deleted: Vec<String>,
    /// Clients subscribed to the controller channel when it was claimed.
    pub claimed: usize,
}

/// Drives the engine through its lifecycle states.
pub struct LifecycleController {
    ctx: StrategyContext,
    critical_assets: Vec<Url>,
    precache_concurrency: usize,
    state: Mutex<WorkerState>,
    controller: watch::Sender<Option<String>>,
}

impl LifecycleController {
    /// Resolve the critical asset list against the origin.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if a critical asset does not resolve to an
    /// http(s) URL.
    pub fn new(config: &AppConfig, ctx: StrategyContext) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let critical_assets = config
            .critical_assets
            .iter()
            .map(|asset| resolve(&origin, asset).map_err(|e| Error::InvalidUrl(format!("{asset}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;
        let (controller, _) = watch::channel(None);

        Ok(Self {
            ctx,
            critical_assets,
            precache_concurrency: config.precache_concurrency,
            state: Mutex::new(WorkerState::Parsed),
            controller,
        })
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.lock().await
    }

    /// Receive the controlling version every time clients are claimed.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.controller.subscribe()
    }

    async fn transition(&self, allowed: &[WorkerState], next: WorkerState) -> Result<WorkerState, Error> {
        let mut state = self.state.lock().await;
        if !allowed.contains(&*state) {
            return Err(Error::Lifecycle(format!("cannot move from {} to {next}", *state)));
        }
        let previous = *state;
        *state = next;
        tracing::info!(version = self.ctx.namer.version(), from = %previous, to = %next, "lifecycle transition");
        Ok(previous)
    }

    async fn set(&self, next: WorkerState) {
        *self.state.lock().await = next;
        tracing::info!(version = self.ctx.namer.version(), state = %next, "lifecycle state");
    }

    /// Open the core and asset partitions and pre-warm the critical assets.
    ///
    /// A storage failure while opening partitions makes the engine redundant.
    /// Individual asset failures are reported, not fatal.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(&[WorkerState::Parsed, WorkerState::Redundant], WorkerState::Installing)
            .await?;

        for kind in [PartitionKind::Core, PartitionKind::Assets] {
            if let Err(e) = self.ctx.db.open_partition(&self.ctx.namer.name(kind)).await {
                tracing::warn!("install failed: {e}");
                self.set(WorkerState::Redundant).await;
                return Err(e);
            }
        }

        let items = self
            .critical_assets
            .iter()
            .map(|url| {
                let request = Request::get(url.clone());
                (self.ctx.namer.resolve_partition(&request), request)
            })
            .collect();

        let report = precache(&self.ctx, items, self.precache_concurrency).await;
        tracing::info!(cached = report.cached.len(), failed = report.failed.len(), "critical assets pre-warmed");

        self.set(WorkerState::Installed).await;

        Ok(InstallReport {
            version: self.ctx.namer.version().to_string(),
            cached: report.cached,
            failed: report.failed,
        })
    }

    /// Delete stale partitions and claim clients.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        self.transition(&[WorkerState::Installed], WorkerState::Activating).await?;

        let deleted = match self.migrate().await {
            Ok(deleted) => deleted,
            Err(e) => {
                // Stay installed so activation can be retried.
                self.set(WorkerState::Installed).await;
                return Err(e);
            }
        };

        self.set(WorkerState::Active).await;

        let version = self.ctx.namer.version().to_string();
        let claimed = self.controller.receiver_count();
        self.controller.send_replace(Some(version.clone()));
        tracing::info!(version = %version, deleted = deleted.len(), claimed, "activated");

        Ok(ActivationReport { version, deleted, claimed })
    }

    /// Activate now if an installed version is waiting.
    pub async fn skip_waiting(&self) -> Result<Option<ActivationReport>, Error> {
        if self.state().await != WorkerState::Installed {
            tracing::debug!("skip waiting ignored: nothing is waiting");
            return Ok(None);
        }
        self.activate().await.map(Some)
    }

    async fn migrate(&self) -> Result<Vec<String>, Error> {
        let prefix = self.ctx.namer.prefix();
        let version = self.ctx.namer.version();

        let mut deleted = Vec::new();
        for name in self.ctx.db.partitions().await? {
            if in_namespace(&name, prefix) && !carries_version(&name, version) {
                self.ctx.db.delete_partition(&name).await?;
                tracing::info!(partition = %name, "deleted stale partition");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }
}
