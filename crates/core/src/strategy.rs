//! Strategy table types.
//!
//! A deployment decides which fetch strategy serves each resource class
//! through one table rather than per-worker code. The selector in
//! `keepsake-client` reads this table; the defaults reproduce the policy the
//! site has always shipped.

use serde::{Deserialize, Serialize};

/// Fetch strategy for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Network, then cache, then offline page.
    NetworkFirst,
    /// Cache, refresh in background; network on miss.
    CacheFirst,
    /// Cache and network in parallel; network result refreshes the cache.
    StaleWhileRevalidate,
    /// Terminal failure path. Never a primary strategy.
    OfflineFallback,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkFirst => "network-first",
            Self::CacheFirst => "cache-first",
            Self::StaleWhileRevalidate => "stale-while-revalidate",
            Self::OfflineFallback => "offline-fallback",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource class a request falls into for strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    Navigation,
    Image,
    Font,
    Asset,
    Other,
}

/// Resource class → strategy mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyTable {
    #[serde(default = "default_navigation")]
    pub navigation: StrategyKind,

    #[serde(default = "default_image")]
    pub image: StrategyKind,

    #[serde(default = "default_font")]
    pub font: StrategyKind,

    #[serde(default = "default_asset")]
    pub asset: StrategyKind,

    #[serde(default = "default_other")]
    pub other: StrategyKind,
}

fn default_navigation() -> StrategyKind {
    StrategyKind::NetworkFirst
}

fn default_image() -> StrategyKind {
    StrategyKind::StaleWhileRevalidate
}

fn default_font() -> StrategyKind {
    StrategyKind::CacheFirst
}

fn default_asset() -> StrategyKind {
    StrategyKind::CacheFirst
}

fn default_other() -> StrategyKind {
    StrategyKind::NetworkFirst
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self {
            navigation: default_navigation(),
            image: default_image(),
            font: default_font(),
            asset: default_asset(),
            other: default_other(),
        }
    }
}

impl StrategyTable {
    /// Strategy assigned to a resource class.
    pub fn lookup(&self, class: ResourceClass) -> StrategyKind {
        match class {
            ResourceClass::Navigation => self.navigation,
            ResourceClass::Image => self.image,
            ResourceClass::Font => self.font,
            ResourceClass::Asset => self.asset,
            ResourceClass::Other => self.other,
        }
    }

    /// Classes whose entry is not usable as a primary strategy.
    pub fn terminal_entries(&self) -> Vec<ResourceClass> {
        [
            ResourceClass::Navigation,
            ResourceClass::Image,
            ResourceClass::Font,
            ResourceClass::Asset,
            ResourceClass::Other,
        ]
        .into_iter()
        .filter(|class| self.lookup(*class) == StrategyKind::OfflineFallback)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = StrategyTable::default();
        assert_eq!(table.lookup(ResourceClass::Navigation), StrategyKind::NetworkFirst);
        assert_eq!(table.lookup(ResourceClass::Image), StrategyKind::StaleWhileRevalidate);
        assert_eq!(table.lookup(ResourceClass::Font), StrategyKind::CacheFirst);
        assert_eq!(table.lookup(ResourceClass::Asset), StrategyKind::CacheFirst);
        assert_eq!(table.lookup(ResourceClass::Other), StrategyKind::NetworkFirst);
        assert!(table.terminal_entries().is_empty());
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&StrategyKind::StaleWhileRevalidate).unwrap();
        assert_eq!(json, "\"stale-while-revalidate\"");

        let kind: StrategyKind = serde_json::from_str("\"cache-first\"").unwrap();
        assert_eq!(kind, StrategyKind::CacheFirst);
    }

    #[test]
    fn test_partial_table_uses_defaults() {
        let table: StrategyTable = serde_json::from_str(r#"{"image":"cache-first"}"#).unwrap();
        assert_eq!(table.image, StrategyKind::CacheFirst);
        assert_eq!(table.navigation, StrategyKind::NetworkFirst);
    }

    #[test]
    fn test_terminal_entries() {
        let table = StrategyTable { other: StrategyKind::OfflineFallback, ..Default::default() };
        assert_eq!(table.terminal_entries(), vec![ResourceClass::Other]);
    }
}
