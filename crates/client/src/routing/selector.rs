//! Request → strategy selection.

use keepsake_core::{AppConfig, Error, StrategyKind, StrategyTable};
use reqwest::Method;
use serde::Serialize;
use url::Url;

use super::namer::resource_class;
use crate::fetch::{Request, same_origin};

/// Why a request skips the cache layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BypassReason {
    /// Only GET is ever cached.
    NonGet,
    /// Cross-origin host outside the allow-list.
    CrossOrigin,
}

/// Routing decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Pass straight to the network.
    Bypass(BypassReason),
    /// Serve through a cache strategy.
    Strategy(StrategyKind),
}

/// Maps requests to strategies through the configured table.
#[derive(Debug, Clone)]
pub struct StrategySelector {
    origin: Url,
    cross_origin_hosts: Vec<String>,
    table: StrategyTable,
}

impl StrategySelector {
    pub fn new(origin: Url, cross_origin_hosts: Vec<String>, table: StrategyTable) -> Self {
        let cross_origin_hosts = cross_origin_hosts.into_iter().map(|h| h.to_ascii_lowercase()).collect();
        Self { origin, cross_origin_hosts, table }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self::new(origin, config.cross_origin_hosts.clone(), config.strategies.clone()))
    }

    /// Pick the route for a request.
    ///
    /// - non-GET bypasses
    /// - allow-listed cross-origin hosts are cache-first, other cross-origin
    ///   requests bypass
    /// - same-origin requests use the table entry of their resource class
    pub fn select_strategy(&self, request: &Request) -> Route {
        if request.method != Method::GET {
            return Route::Bypass(BypassReason::NonGet);
        }

        if !same_origin(&self.origin, &request.url) {
            return if self.is_allow_listed(&request.url) {
                Route::Strategy(StrategyKind::CacheFirst)
            } else {
                Route::Bypass(BypassReason::CrossOrigin)
            };
        }

        Route::Strategy(self.table.lookup(resource_class(request)))
    }

    /// Exact host or a subdomain of an allow-listed host.
    fn is_allow_listed(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        self.cross_origin_hosts.iter().any(|allowed| {
            host == allowed.as_str() || host.strip_suffix(allowed.as_str()).is_some_and(|rest| rest.ends_with('.'))
        })
    }
}
