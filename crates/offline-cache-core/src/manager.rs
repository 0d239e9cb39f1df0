//! Cache-first resolution over a single region.
//!
//! `OfflineCacheManager::prime` fills a region from an asset list, and
//! `OfflineCacheManager::resolve` answers requests from the region,
//! falling through to the network on a miss. Network responses for
//! misses are returned as-is and never written back to the region.

use std::sync::Arc;

use futures::future::try_join_all;
use reqwest::Method;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::CacheRegion;
use crate::error::{CacheError, CacheResult};
use crate::network::Fetcher;
use crate::request::{AssetList, Request, RequestKey};
use crate::response::CachedResponse;

/// Where a resolved response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
}

#[derive(Debug, Clone)]
pub struct Resolved {
    pub response: Arc<CachedResponse>,
    pub source: ResponseSource,
}

impl Resolved {
    pub fn from_cache(&self) -> bool {
        self.source == ResponseSource::Cache
    }
}

/// Clone is cheap - the fetcher is shared.
#[derive(Clone)]
pub struct OfflineCacheManager {
    fetcher: Arc<dyn Fetcher>,
}

impl OfflineCacheManager {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Fetch every asset and store the responses in `region`.
    ///
    /// All assets are fetched concurrently. The first failure aborts the
    /// whole operation and nothing from this attempt is committed; a non-2xx
    /// status counts as a failure.
    pub async fn prime(&self, region: &CacheRegion, assets: &AssetList) -> CacheResult<()> {
        info!(region = region.name(), assets = assets.len(), "Priming cache region");

        let entries = try_join_all(assets.iter().map(|url| self.fetch_asset(url))).await?;
        region.insert_all(entries).await?;

        info!(region = region.name(), entries = region.len().await, "Cache region primed");
        Ok(())
    }

    async fn fetch_asset(&self, url: &Url) -> CacheResult<(RequestKey, CachedResponse)> {
        let request = Request::from_url(Method::GET, url.clone());

        let response = match self.fetcher.fetch(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to fetch asset");
                return Err(CacheError::Fetch {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        if !response.is_success() {
            warn!(url = %url, status = response.status, "Asset fetch returned error status");
            return Err(CacheError::from_status(url.as_str(), response.status, &response.text()));
        }

        Ok((request.key(), response))
    }

    /// Answer `request` from `region`, or from the network if it is not stored.
    pub async fn resolve(&self, region: &CacheRegion, request: &Request) -> CacheResult<Resolved> {
        let key = request.key();

        if let Some(response) = region.lookup(&key).await {
            debug!(region = region.name(), key = %key, "Cache hit");
            return Ok(Resolved {
                response,
                source: ResponseSource::Cache,
            });
        }

        debug!(region = region.name(), key = %key, "Cache miss, fetching from network");
        self.fetch_network(request).await
    }

    /// Send `request` to the network and return its response unmodified.
    /// Nothing is stored.
    pub async fn fetch_network(&self, request: &Request) -> CacheResult<Resolved> {
        let response = self.fetcher.fetch(request).await?;
        Ok(Resolved {
            response: Arc::new(response),
            source: ResponseSource::Network,
        })
    }
}
