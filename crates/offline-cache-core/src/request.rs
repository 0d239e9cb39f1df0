//! Requests, request identity, and asset lists.
//!
//! A `RequestKey` is the identity a region stores entries under: the
//! upper-cased method plus the normalized URL with its fragment removed.
//! Headers are carried on `Request` for the network but never take part
//! in identity.

use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CacheError, CacheResult};

/// Parse a URL, mapping failures to `CacheError::InvalidUrl`.
pub fn parse_url(raw: &str) -> CacheResult<Url> {
    Url::parse(raw).map_err(|source| CacheError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

fn parse_method(raw: &str) -> CacheResult<Method> {
    let upper = raw.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return Err(CacheError::InvalidMethod(raw.to_string()));
    }
    Method::from_bytes(upper.as_bytes()).map_err(|_| CacheError::InvalidMethod(raw.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    method: String,
    url: String,
}

impl RequestKey {
    pub fn new(method: &Method, url: &Url) -> Self {
        // Url parsing already lower-cases scheme and host, drops default
        // ports and resolves dot segments; only the fragment is left.
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            method: method.as_str().to_ascii_uppercase(),
            url: url.into(),
        }
    }

    /// Rebuild a key from already-normalized parts read back from a snapshot.
    pub(crate) fn from_parts(method: &str, url: &str) -> Self {
        Self {
            method: method.to_string(),
            url: url.to_string(),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn new(method: &str, url: &str) -> CacheResult<Self> {
        Ok(Self::from_url(parse_method(method)?, parse_url(url)?))
    }

    pub fn get(url: &str) -> CacheResult<Self> {
        Self::new("GET", url)
    }

    pub fn from_url(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Identity this request is stored and looked up under.
    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }
}

/// Ordered, immutable list of URLs to pre-populate a region with.
/// Clone is cheap - the URLs are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetList {
    urls: Arc<[Url]>,
}

impl AssetList {
    pub fn new(urls: Vec<Url>) -> Self {
        Self { urls: urls.into() }
    }

    /// Build an asset list from entries that are either absolute URLs or
    /// paths relative to `origin`.
    pub fn resolve<S: AsRef<str>>(origin: &Url, entries: &[S]) -> CacheResult<Self> {
        let urls = entries
            .iter()
            .map(|entry| {
                let entry = entry.as_ref();
                origin.join(entry).map_err(|source| CacheError::InvalidUrl {
                    url: entry.to_string(),
                    source,
                })
            })
            .collect::<CacheResult<Vec<_>>>()?;
        Ok(Self::new(urls))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Url> {
        self.urls.iter()
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(method: &str, url: &str) -> RequestKey {
        Request::new(method, url).expect("valid request").key()
    }

    #[test]
    fn test_key_ignores_fragment_host_case_and_default_port() {
        let base = key("GET", "http://localhost:8000/elm.js");
        assert_eq!(key("GET", "http://localhost:8000/elm.js#main"), base);
        assert_eq!(key("GET", "http://LOCALHOST:8000/elm.js"), base);
        assert_eq!(key("GET", "http://localhost:8000/./static/../elm.js"), base);

        assert_eq!(
            key("GET", "https://example.com:443/"),
            key("GET", "https://example.com/")
        );
    }

    #[test]
    fn test_key_method_is_case_insensitive_but_significant() {
        assert_eq!(key("get", "http://localhost/elm.js"), key("GET", "http://localhost/elm.js"));
        assert_ne!(key("HEAD", "http://localhost/elm.js"), key("GET", "http://localhost/elm.js"));
        assert_ne!(key("POST", "http://localhost/elm.js"), key("GET", "http://localhost/elm.js"));
    }

    #[test]
    fn test_key_query_is_part_of_identity() {
        assert_ne!(
            key("GET", "http://localhost/elm.js?v=2"),
            key("GET", "http://localhost/elm.js")
        );
    }

    #[test]
    fn test_key_display() {
        assert_eq!(
            key("get", "http://localhost/manifest.json").to_string(),
            "GET http://localhost/manifest.json"
        );
    }

    #[test]
    fn test_invalid_request_parts() {
        assert!(matches!(
            Request::new("", "http://localhost/"),
            Err(CacheError::InvalidMethod(_))
        ));
        assert!(matches!(
            Request::new("GE T", "http://localhost/"),
            Err(CacheError::InvalidMethod(_))
        ));
        assert!(matches!(
            Request::get("/elm.js"),
            Err(CacheError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_asset_list_resolves_relative_entries() {
        let origin = Url::parse("http://localhost:8000/app/").unwrap();
        let assets =
            AssetList::resolve(&origin, &["/", "manifest.json", "https://cdn.example.com/elm.js"])
                .unwrap();

        let urls: Vec<&str> = assets.iter().map(Url::as_str).collect();
        assert_eq!(
            urls,
            vec![
                "http://localhost:8000/",
                "http://localhost:8000/app/manifest.json",
                "https://cdn.example.com/elm.js",
            ]
        );
        assert_eq!(assets.len(), 3);
    }

    #[test]
    fn test_asset_list_keeps_order_and_duplicates() {
        let origin = Url::parse("http://localhost/").unwrap();
        let assets = AssetList::resolve(&origin, &["/elm.js", "/", "/elm.js"]).unwrap();
        let paths: Vec<&str> = assets.iter().map(Url::path).collect();
        assert_eq!(paths, vec!["/elm.js", "/", "/elm.js"]);
    }
}
