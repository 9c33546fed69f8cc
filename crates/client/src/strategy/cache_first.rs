//! Cache-first: stored response when present, refreshed behind the scenes.

use keepsake_core::{Error, StrategyKind};

use super::{FetchOutcome, ResponseSource, StrategyContext, offline, propagate};
use crate::fetch::Request;

/// Serve from cache and refresh in the background; fetch and store on miss.
///
/// A miss with the network down falls back for images and navigations and
/// propagates the failure for everything else.
pub async fn cache_first(ctx: &StrategyContext, partition: &str, request: &Request) -> Result<FetchOutcome, Error> {
    const STRATEGY: StrategyKind = StrategyKind::CacheFirst;

    if let Some(cached) = ctx.lookup(partition, request).await {
        tracing::debug!(partition, url = %request.url, "cache hit");
        let background = ctx.revalidate(partition, request);
        return Ok(FetchOutcome::new(cached, ResponseSource::Cache, STRATEGY).with_background(Some(background)));
    }

    tracing::debug!(partition, url = %request.url, "cache miss");
    match ctx.fetcher.fetch(request).await {
        Ok(response) => {
            let background = ctx.write_through(partition, request, &response);
            Ok(FetchOutcome::new(response, ResponseSource::Network, STRATEGY).with_background(background))
        }
        Err(err) => match offline::fallback(ctx, request).await {
            Some(response) => Ok(FetchOutcome::new(response, ResponseSource::Offline, STRATEGY)),
            None => Err(propagate(request, err)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedFetcher, context};

    #[tokio::test]
    async fn test_miss_fetches_and_stores() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond("/css/styles.css", 200, "text/css", "body{}");
        let (ctx, fetcher) = context(fetcher).await;
        let request = fetcher.get("/css/styles.css");

        let mut outcome = cache_first(&ctx, "assets-v1", &request).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Network);
        outcome.settle().await;

        let outcome = cache_first(&ctx, "assets-v1", &request).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Cache);
        assert_eq!(&outcome.response.bytes[..], b"body{}");
    }

    #[tokio::test]
    async fn test_hit_refreshes_in_background() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond("/js/main.js", 200, "text/javascript", "v1()");
        let (ctx, fetcher) = context(fetcher).await;
        let request = fetcher.get("/js/main.js");

        cache_first(&ctx, "assets-v1", &request).await.unwrap().settle().await;
        fetcher.respond("/js/main.js", 200, "text/javascript", "v2()");

        let mut outcome = cache_first(&ctx, "assets-v1", &request).await.unwrap();
        assert_eq!(&outcome.response.bytes[..], b"v1()");
        outcome.settle().await;
        assert_eq!(fetcher.calls("/js/main.js"), 2);

        let outcome = cache_first(&ctx, "assets-v1", &request).await.unwrap();
        assert_eq!(&outcome.response.bytes[..], b"v2()");
    }

    #[tokio::test]
    async fn test_hit_survives_offline_refresh() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond("/fonts/inter.woff2", 200, "font/woff2", vec![7u8; 64]);
        let (ctx, fetcher) = context(fetcher).await;
        let request = fetcher.get("/fonts/inter.woff2");

        cache_first(&ctx, "fonts-v1", &request).await.unwrap().settle().await;
        fetcher.set_offline(true);

        let mut first = cache_first(&ctx, "fonts-v1", &request).await.unwrap();
        first.settle().await;
        let second = cache_first(&ctx, "fonts-v1", &request).await.unwrap();
        assert_eq!(first.response.bytes, second.response.bytes);
        assert_eq!(ctx.db.keys("fonts-v1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_miss_offline_image_gets_placeholder() {
        let fetcher = ScriptedFetcher::new();
        fetcher.set_offline(true);
        let (ctx, fetcher) = context(fetcher).await;

        let outcome = cache_first(&ctx, "images-v1", &fetcher.get("/images/hero.webp")).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Offline);
        assert_eq!(outcome.response.content_type(), Some(offline::PLACEHOLDER_SVG_TYPE));
    }

    #[tokio::test]
    async fn test_miss_offline_asset_propagates() {
        let fetcher = ScriptedFetcher::new();
        fetcher.set_offline(true);
        let (ctx, fetcher) = context(fetcher).await;

        let result = cache_first(&ctx, "assets-v1", &fetcher.get("/js/main.js")).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }
}
