//! Stale-while-revalidate: cache and network race, the cache answers first.

use keepsake_core::{Error, StrategyKind};
use tokio::sync::oneshot;

use super::{Background, FetchOutcome, ResponseSource, StrategyContext, offline, propagate};
use crate::fetch::{NetworkError, Request};

/// Issue the revalidation fetch, then look in the cache.
///
/// A hit is returned at once while the fetch keeps running detached. A miss
/// waits for the network result. The fetch writes through whenever it
/// succeeds, hit or miss.
pub async fn stale_while_revalidate(
    ctx: &StrategyContext, partition: &str, request: &Request,
) -> Result<FetchOutcome, Error> {
    const STRATEGY: StrategyKind = StrategyKind::StaleWhileRevalidate;

    let (tx, rx) = oneshot::channel();
    let revalidation = {
        let ctx = ctx.clone();
        let partition = partition.to_string();
        let request = request.clone();

        tokio::spawn(async move {
            let result = ctx.fetcher.fetch(&request).await;
            // Nobody is listening on a hit.
            let _ = tx.send(result.clone());

            match result {
                Ok(response) if response.is_storable() => {
                    if let Err(e) = ctx.store(&partition, &request, &response).await {
                        tracing::warn!(partition = %partition, url = %request.url, "revalidation write failed: {e}");
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(url = %request.url, "revalidation failed: {e}"),
            }
        })
    };
    let background = Background::from_handle(revalidation);

    if let Some(cached) = ctx.lookup(partition, request).await {
        tracing::debug!(partition, url = %request.url, "serving stale entry");
        return Ok(FetchOutcome::new(cached, ResponseSource::Cache, STRATEGY).with_background(Some(background)));
    }

    let result = rx
        .await
        .unwrap_or_else(|_| Err(NetworkError::Unreachable("revalidation task ended without a result".into())));

    match result {
        Ok(response) => {
            Ok(FetchOutcome::new(response, ResponseSource::Network, STRATEGY).with_background(Some(background)))
        }
        Err(err) => match offline::fallback(ctx, request).await {
            Some(response) => Ok(FetchOutcome::new(response, ResponseSource::Offline, STRATEGY)),
            None => Err(propagate(request, err)),
        },
    }
}
