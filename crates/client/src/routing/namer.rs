//! Request → partition resolution.
//!
//! First match wins:
//! 1. image extension or `image` destination → images
//! 2. font extension or `font` destination → fonts
//! 3. stylesheet/script extension or `style`/`script` destination → assets
//! 4. everything else → core
//!
//! Extensions are matched case-insensitively on the URL path; the query
//! string never takes part.

use std::sync::LazyLock;

use keepsake_core::{AppConfig, PartitionKind, ResourceClass};
use regex::Regex;

use crate::fetch::{Destination, Request};

static IMAGE_EXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(png|jpe?g|gif|webp|avif|svg|ico|bmp)$").expect("valid image pattern"));

static FONT_EXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(woff2?|ttf|otf|eot)$").expect("valid font pattern"));

static ASSET_EXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(css|m?js)$").expect("valid asset pattern"));

/// Partition kind a request belongs to.
pub fn classify(request: &Request) -> PartitionKind {
    let path = request.url.path();

    if request.destination == Destination::Image || IMAGE_EXT.is_match(path) {
        PartitionKind::Images
    } else if request.destination == Destination::Font || FONT_EXT.is_match(path) {
        PartitionKind::Fonts
    } else if matches!(request.destination, Destination::Style | Destination::Script) || ASSET_EXT.is_match(path) {
        PartitionKind::Assets
    } else {
        PartitionKind::Core
    }
}

/// Resource class used for strategy lookup.
///
/// Navigations win over extensions: a document request is a navigation even
/// when its path ends in `.png`.
pub fn resource_class(request: &Request) -> ResourceClass {
    if request.is_navigation() {
        return ResourceClass::Navigation;
    }
    match classify(request) {
        PartitionKind::Images => ResourceClass::Image,
        PartitionKind::Fonts => ResourceClass::Font,
        PartitionKind::Assets => ResourceClass::Asset,
        PartitionKind::Core => ResourceClass::Other,
    }
}

/// Names partitions for one prefix and version tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNamer {
    prefix: String,
    version: String,
}

impl CacheNamer {
    pub fn new(prefix: impl Into<String>, version: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), version: version.into() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.partition_prefix, &config.version)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Partition name for a kind under the current version.
    pub fn name(&self, kind: PartitionKind) -> String {
        kind.name(&self.prefix, &self.version)
    }

    /// Partition a request is stored in.
    pub fn resolve_partition(&self, request: &Request) -> String {
        self.name(classify(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn get(path: &str) -> Request {
        Request::get(Url::parse("https://shop.example").unwrap().join(path).unwrap())
    }

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(classify(&get("/images/logo.png")), PartitionKind::Images);
        assert_eq!(classify(&get("/images/hero.JPEG")), PartitionKind::Images);
        assert_eq!(classify(&get("/favicon.ico")), PartitionKind::Images);
        assert_eq!(classify(&get("/fonts/inter.woff2")), PartitionKind::Fonts);
        assert_eq!(classify(&get("/fonts/serif.TTF")), PartitionKind::Fonts);
        assert_eq!(classify(&get("/css/styles.css")), PartitionKind::Assets);
        assert_eq!(classify(&get("/js/main.mjs")), PartitionKind::Assets);
        assert_eq!(classify(&get("/index.html")), PartitionKind::Core);
        assert_eq!(classify(&get("/manifest.json")), PartitionKind::Core);
    }

    #[test]
    fn test_classify_ignores_query() {
        assert_eq!(classify(&get("/api/thumb?format=.png")), PartitionKind::Core);
        assert_eq!(classify(&get("/images/logo.png?v=3")), PartitionKind::Images);
    }

    #[test]
    fn test_classify_by_destination() {
        assert_eq!(classify(&get("/avatar").with_destination(Destination::Image)), PartitionKind::Images);
        assert_eq!(classify(&get("/font").with_destination(Destination::Font)), PartitionKind::Fonts);
        assert_eq!(classify(&get("/bundle").with_destination(Destination::Script)), PartitionKind::Assets);
    }

    #[test]
    fn test_image_rule_wins() {
        let request = get("/sprite.svg").with_destination(Destination::Style);
        assert_eq!(classify(&request), PartitionKind::Images);
    }

    #[test]
    fn test_resource_class() {
        let nav = Request::navigate(Url::parse("https://shop.example/books.html").unwrap());
        assert_eq!(resource_class(&nav), ResourceClass::Navigation);
        assert_eq!(resource_class(&get("/images/logo.png")), ResourceClass::Image);
        assert_eq!(resource_class(&get("/api/cart")), ResourceClass::Other);
    }

    #[test]
    fn test_resolve_partition() {
        let namer = CacheNamer::new("", "v3");
        assert_eq!(namer.resolve_partition(&get("/images/logo.png")), "images-v3");
        assert_eq!(namer.resolve_partition(&get("/")), "core-v3");

        let namer = CacheNamer::new("finance", "v3");
        assert_eq!(namer.resolve_partition(&get("/js/app.js")), "finance-assets-v3");
        assert_eq!(namer.name(PartitionKind::Fonts), "finance-fonts-v3");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let namer = CacheNamer::new("mobile", "v1");
        let request = get("/fonts/inter.woff2");
        assert_eq!(namer.resolve_partition(&request), namer.resolve_partition(&request));
    }
}
