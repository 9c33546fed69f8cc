//! Intercepted request descriptor.

use keepsake_core::RequestKey;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

/// What the page intends to do with the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    #[default]
    Empty,
    Document,
    Image,
    Font,
    Style,
    Script,
    Manifest,
}

/// Request mode as reported by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    NoCors,
    #[default]
    Cors,
}

/// A request entering the engine: `{method, url, destination, mode}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub destination: Destination,
    pub mode: RequestMode,
}

impl Request {
    /// Plain GET with no destination metadata.
    pub fn get(url: Url) -> Self {
        Self { method: Method::GET, url, destination: Destination::Empty, mode: RequestMode::Cors }
    }

    /// Top-level document navigation.
    pub fn navigate(url: Url) -> Self {
        Self { method: Method::GET, url, destination: Destination::Document, mode: RequestMode::Navigate }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    /// Navigation or document request.
    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate || self.destination == Destination::Document
    }

    /// Storage key of this request. The fragment is not part of the key.
    pub fn key(&self) -> RequestKey {
        let mut url = self.url.clone();
        url.set_fragment(None);
        RequestKey::new(self.method.as_str(), url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_detection() {
        let url = Url::parse("https://shop.example/index.html").unwrap();
        assert!(Request::navigate(url.clone()).is_navigation());
        assert!(Request::get(url.clone()).with_destination(Destination::Document).is_navigation());
        assert!(!Request::get(url).is_navigation());
    }

    #[test]
    fn test_key_ignores_fragment() {
        let plain = Request::get(Url::parse("https://shop.example/a.png").unwrap());
        let anchored = Request::get(Url::parse("https://shop.example/a.png#x").unwrap());
        assert_eq!(anchored.key(), plain.key());
        assert_eq!(anchored.key().url, "https://shop.example/a.png");
    }

    #[test]
    fn test_key() {
        let url = Url::parse("https://shop.example/api/cart").unwrap();
        let key = Request::get(url).with_method(Method::POST).key();
        assert_eq!(key.method, "POST");
        assert_eq!(key.url, "https://shop.example/api/cart");
        assert!(!key.is_cacheable());
    }

    #[test]
    fn test_mode_serialization() {
        let mode: RequestMode = serde_json::from_str("\"no-cors\"").unwrap();
        assert_eq!(mode, RequestMode::NoCors);
        let destination: Destination = serde_json::from_str("\"style\"").unwrap();
        assert_eq!(destination, Destination::Style);
    }
}
