//! Control channel: JSON messages from pages to the engine.
//!
//! Messages are `{type, ...payload}` objects. Unknown types and malformed
//! payloads are ignored without a reply.

use keepsake_core::Error;
use keepsake_core::cache::{carries_version, in_namespace};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::CacheEngine;
use crate::fetch::Request;
use crate::strategy::{PrecacheFailure, precache};

/// Message sent to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate a waiting version now.
    SkipWaiting,
    /// Fetch and store URLs into a named partition.
    CacheNewAssets { urls: Vec<String>, partition: String },
    /// Count entries across all partitions.
    GetCacheSize,
    /// Delete every partition of the current version.
    ClearCache,
    #[serde(other)]
    Unknown,
}

/// Reply sent back to the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlReply {
    Activated { version: String, deleted: Vec<String>, claimed: usize },
    CacheNewAssetsComplete { partition: String, cached: Vec<String>, failed: Vec<PrecacheFailure> },
    CacheSize { size: u64 },
    CacheCleared { deleted: Vec<String> },
}

impl ControlMessage {
    /// Parse a raw message; None for anything unusable.
    pub fn parse(message: Value) -> Option<Self> {
        match serde_json::from_value(message) {
            Ok(ControlMessage::Unknown) => {
                tracing::debug!("ignoring unknown control message");
                None
            }
            Ok(message) => Some(message),
            Err(e) => {
                tracing::debug!("ignoring malformed control message: {e}");
                None
            }
        }
    }
}

impl CacheEngine {
    /// Handle one control message.
    ///
    /// Returns Ok(None) when the message needs no reply.
    pub async fn handle_message(&self, message: Value) -> Result<Option<ControlReply>, Error> {
        let Some(message) = ControlMessage::parse(message) else {
            return Ok(None);
        };

        match message {
            ControlMessage::SkipWaiting => {
                let reply = self.lifecycle().skip_waiting().await?.map(|report| ControlReply::Activated {
                    version: report.version,
                    deleted: report.deleted,
                    claimed: report.claimed,
                });
                Ok(reply)
            }
            ControlMessage::CacheNewAssets { urls, partition } => {
                let reply = self.cache_new_assets(urls, partition).await?;
                Ok(Some(reply))
            }
            ControlMessage::GetCacheSize => {
                let size = self.db().entry_count().await?;
                Ok(Some(ControlReply::CacheSize { size }))
            }
            ControlMessage::ClearCache => {
                let deleted = self.clear_current().await?;
                Ok(Some(ControlReply::CacheCleared { deleted }))
            }
            ControlMessage::Unknown => Ok(None),
        }
    }

    async fn cache_new_assets(&self, urls: Vec<String>, partition: String) -> Result<ControlReply, Error> {
        if partition.trim().is_empty() {
            return Err(Error::InvalidInput("partition cannot be empty".into()));
        }

        let mut failed = Vec::new();
        let mut items = Vec::with_capacity(urls.len());
        for url in urls {
            match self.resolve(&url) {
                Ok(resolved) => items.push((partition.clone(), Request::get(resolved))),
                Err(e) => failed.push(PrecacheFailure { url, reason: e.to_string() }),
            }
        }

        let report = precache(self.context(), items, self.config().precache_concurrency).await;
        failed.extend(report.failed);

        tracing::info!(
            partition = %partition,
            cached = report.cached.len(),
            failed = failed.len(),
            "new assets cached"
        );

        Ok(ControlReply::CacheNewAssetsComplete { partition, cached: report.cached, failed })
    }

    /// Delete the current version's partitions, including ones created by
    /// CACHE_NEW_ASSETS under other names.
    async fn clear_current(&self) -> Result<Vec<String>, Error> {
        let namer = self.namer();
        let mut deleted = Vec::new();

        for name in self.db().partitions().await? {
            let current = in_namespace(&name, namer.prefix()) && carries_version(&name, namer.version());
            if current && self.db().delete_partition(&name).await? {
                deleted.push(name);
            }
        }

        tracing::info!(deleted = deleted.len(), "cache cleared");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::WorkerState;
    use crate::testing::{ScriptedFetcher, config};
    use keepsake_core::{AppConfig, CacheDb};
    use serde_json::json;
    use std::sync::Arc;

    async fn engine(config: AppConfig) -> (CacheEngine, Arc<ScriptedFetcher>) {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond("/a.css", 200, "text/css", "a{}");
        fetcher.respond("/b.js", 200, "text/javascript", "b()");
        let fetcher = Arc::new(fetcher);
        let db = CacheDb::open_in_memory().await.unwrap();
        let config = AppConfig { critical_assets: Vec::new(), ..config };
        (CacheEngine::with_db(config, db, fetcher.clone()).unwrap(), fetcher)
    }

    #[test]
    fn test_parse_messages() {
        assert_eq!(ControlMessage::parse(json!({"type": "SKIP_WAITING"})), Some(ControlMessage::SkipWaiting));
        assert_eq!(ControlMessage::parse(json!({"type": "GET_CACHE_SIZE"})), Some(ControlMessage::GetCacheSize));
        assert_eq!(
            ControlMessage::parse(json!({"type": "CACHE_NEW_ASSETS", "urls": ["/a.css"], "partition": "assets-v2"})),
            Some(ControlMessage::CacheNewAssets { urls: vec!["/a.css".into()], partition: "assets-v2".into() })
        );
    }

    #[test]
    fn test_parse_ignores_unknown_and_malformed() {
        assert_eq!(ControlMessage::parse(json!({"type": "PING"})), None);
        assert_eq!(ControlMessage::parse(json!({"type": "CACHE_NEW_ASSETS"})), None);
        assert_eq!(ControlMessage::parse(json!({"kind": "SKIP_WAITING"})), None);
        assert_eq!(ControlMessage::parse(json!("SKIP_WAITING")), None);
    }

    #[test]
    fn test_reply_serialization() {
        let reply = serde_json::to_value(ControlReply::CacheSize { size: 3 }).unwrap();
        assert_eq!(reply, json!({"type": "CACHE_SIZE", "size": 3}));
    }

    #[tokio::test]
    async fn test_cache_new_assets() {
        let (engine, _) = engine(AppConfig { version: "v2".into(), ..config() }).await;

        let message = json!({"type": "CACHE_NEW_ASSETS", "urls": ["/a.css", "/b.js"], "partition": "assets-v2"});
        let reply = engine.handle_message(message).await.unwrap().unwrap();

        let ControlReply::CacheNewAssetsComplete { partition, cached, failed } = reply else {
            panic!("expected CACHE_NEW_ASSETS_COMPLETE");
        };
        assert_eq!(partition, "assets-v2");
        assert_eq!(cached.len(), 2);
        assert!(failed.is_empty());

        let keys: Vec<String> = engine.db().keys("assets-v2").await.unwrap().into_iter().map(|k| k.url).collect();
        assert_eq!(keys, vec!["https://shop.example/a.css", "https://shop.example/b.js"]);
    }

    #[tokio::test]
    async fn test_cache_new_assets_reports_bad_urls() {
        let (engine, _) = engine(config()).await;

        let message = json!({
            "type": "CACHE_NEW_ASSETS",
            "urls": ["/a.css", "javascript:void(0)"],
            "partition": "assets-v1",
        });
        let reply = engine.handle_message(message).await.unwrap();

        let Some(ControlReply::CacheNewAssetsComplete { cached, failed, .. }) = reply else {
            panic!("expected CACHE_NEW_ASSETS_COMPLETE");
        };
        assert_eq!(cached, vec!["https://shop.example/a.css"]);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].url, "javascript:void(0)");
    }

    #[tokio::test]
    async fn test_cache_new_assets_empty_partition() {
        let (engine, _) = engine(config()).await;
        let result = engine
            .handle_message(json!({"type": "CACHE_NEW_ASSETS", "urls": ["/a.css"], "partition": " "}))
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_get_cache_size() {
        let (engine, _) = engine(config()).await;
        let reply = engine.handle_message(json!({"type": "GET_CACHE_SIZE"})).await.unwrap();
        assert_eq!(reply, Some(ControlReply::CacheSize { size: 0 }));

        engine
            .handle_message(json!({"type": "CACHE_NEW_ASSETS", "urls": ["/a.css", "/b.js"], "partition": "assets-v1"}))
            .await
            .unwrap();
        let reply = engine.handle_message(json!({"type": "GET_CACHE_SIZE"})).await.unwrap();
        assert_eq!(reply, Some(ControlReply::CacheSize { size: 2 }));
    }

    #[tokio::test]
    async fn test_skip_waiting_activates() {
        let (engine, _) = engine(AppConfig { skip_waiting: false, ..config() }).await;
        assert_eq!(engine.handle_message(json!({"type": "SKIP_WAITING"})).await.unwrap(), None);

        engine.start().await.unwrap();
        assert_eq!(engine.state().await, WorkerState::Installed);

        let reply = engine.handle_message(json!({"type": "SKIP_WAITING"})).await.unwrap();
        assert!(matches!(reply, Some(ControlReply::Activated { ref version, .. }) if version == "v1"));
        assert_eq!(engine.state().await, WorkerState::Active);
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let (engine, _) = engine(config()).await;
        engine.db().open_partition("core-v0").await.unwrap();
        engine
            .handle_message(json!({"type": "CACHE_NEW_ASSETS", "urls": ["/a.css"], "partition": "assets-v1"}))
            .await
            .unwrap();

        let reply = engine.handle_message(json!({"type": "CLEAR_CACHE"})).await.unwrap();
        assert_eq!(reply, Some(ControlReply::CacheCleared { deleted: vec!["assets-v1".to_string()] }));
        assert_eq!(engine.db().entry_count().await.unwrap(), 0);
        assert!(engine.db().has_partition("core-v0").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_message_no_reply() {
        let (engine, fetcher) = engine(config()).await;
        assert_eq!(engine.handle_message(json!({"type": "NOTIFY", "body": "hi"})).await.unwrap(), None);
        assert_eq!(fetcher.total_calls(), 0);
    }
}
