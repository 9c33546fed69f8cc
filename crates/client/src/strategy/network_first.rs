//! Network-first: live response when reachable, cache when not.

use keepsake_core::{Error, StrategyKind};

use super::{FetchOutcome, ResponseSource, StrategyContext, offline, propagate};
use crate::fetch::Request;

/// Fetch, write through and return the live response.
///
/// On network failure the cached entry is served; a navigation with nothing
/// cached gets the offline page. Anything else propagates the failure.
pub async fn network_first(ctx: &StrategyContext, partition: &str, request: &Request) -> Result<FetchOutcome, Error> {
    const STRATEGY: StrategyKind = StrategyKind::NetworkFirst;

    match ctx.fetcher.fetch(request).await {
        Ok(response) => {
            let background = ctx.write_through(partition, request, &response);
            Ok(FetchOutcome::new(response, ResponseSource::Network, STRATEGY).with_background(background))
        }
        Err(err) => {
            tracing::debug!(url = %request.url, "network failed, trying cache: {err}");

            if let Some(cached) = ctx.lookup(partition, request).await {
                return Ok(FetchOutcome::new(cached, ResponseSource::Cache, STRATEGY));
            }

            if request.is_navigation() {
                let page = offline::offline_page(ctx, request).await;
                return Ok(FetchOutcome::new(page, ResponseSource::Offline, STRATEGY));
            }

            Err(propagate(request, err))
        }
    }
}
