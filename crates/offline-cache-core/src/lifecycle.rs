//! Host-facing entry points.
//!
//! The host runtime owns the lifecycle: it fires one install event before
//! the worker is considered ready, then a fetch event per request. `Worker`
//! maps those onto `prime` and `resolve` against a single named region.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::cache::{CacheRegion, CacheStorage};
use crate::config::Config;
use crate::error::CacheResult;
use crate::manager::{OfflineCacheManager, Resolved};
use crate::network::HttpFetcher;
use crate::request::{AssetList, Request};

/// Name of the region the worker installs into
pub const REGION_NAME: &str = "sudoku";

/// Assets pre-cached on install, relative to the origin
pub const PRECACHE_ASSETS: [&str; 3] = ["/", "/manifest.json", "/elm.js"];

pub struct Worker {
    manager: OfflineCacheManager,
    storage: Arc<CacheStorage>,
    region_name: String,
    assets: AssetList,
}

impl Worker {
    pub fn new(
        manager: OfflineCacheManager,
        storage: Arc<CacheStorage>,
        region_name: impl Into<String>,
        assets: AssetList,
    ) -> Self {
        Self {
            manager,
            storage,
            region_name: region_name.into(),
            assets,
        }
    }

    /// Build a worker from configuration: HTTP fetcher, on-disk storage.
    pub fn from_config(config: &Config) -> CacheResult<Self> {
        let fetcher = HttpFetcher::new(config.request_timeout_secs.map(Duration::from_secs))?;
        let storage = CacheStorage::new(config.cache_dir()?)?;
        Ok(Self::new(
            OfflineCacheManager::new(Arc::new(fetcher)),
            Arc::new(storage),
            config.region_name.clone(),
            config.asset_list()?,
        ))
    }

    pub fn region_name(&self) -> &str {
        &self.region_name
    }

    pub fn assets(&self) -> &AssetList {
        &self.assets
    }

    /// The worker's region, if it has been primed. Never creates it.
    pub async fn region(&self) -> CacheResult<Option<Arc<CacheRegion>>> {
        self.storage.get(&self.region_name).await
    }

    /// Install event: prime the region with the asset list.
    /// An error means the install failed; retrying is up to the host.
    pub async fn on_install(&self) -> CacheResult<Arc<CacheRegion>> {
        info!(region = %self.region_name, "Install event");
        let region = self.storage.open(&self.region_name).await?;
        self.manager.prime(&region, &self.assets).await?;
        Ok(region)
    }

    /// Fetch event: answer from the region, falling back to the network.
    pub async fn on_fetch(&self, request: &Request) -> CacheResult<Resolved> {
        match self.region().await? {
            Some(region) => self.manager.resolve(&region, request).await,
            None => {
                debug!(region = %self.region_name, "Region not primed, fetching from network");
                self.manager.fetch_network(request).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::testing::StubFetcher;
    use crate::network::Fetcher;
    use url::Url;

    fn worker(fetcher: &Arc<StubFetcher>) -> Worker {
        let origin = Url::parse("https://sudoku.example.com/").unwrap();
        Worker::new(
            OfflineCacheManager::new(Arc::clone(fetcher) as Arc<dyn Fetcher>),
            Arc::new(CacheStorage::in_memory()),
            REGION_NAME,
            AssetList::resolve(&origin, &PRECACHE_ASSETS[..]).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_install_then_fetch() {
        let fetcher = Arc::new(
            StubFetcher::new()
                .route("https://sudoku.example.com/", 200, "index")
                .route("https://sudoku.example.com/manifest.json", 200, "manifest")
                .route("https://sudoku.example.com/elm.js", 200, "bundle"),
        );
        let worker = worker(&fetcher);

        let region = worker.on_install().await.unwrap();
        assert_eq!(region.name(), "sudoku");
        assert_eq!(region.len().await, 3);

        let mut seen = fetcher.seen();
        seen.sort();
        assert_eq!(
            seen,
            vec![
                "GET https://sudoku.example.com/",
                "GET https://sudoku.example.com/elm.js",
                "GET https://sudoku.example.com/manifest.json",
            ]
        );

        let resolved = worker
            .on_fetch(&Request::get("https://sudoku.example.com/elm.js").unwrap())
            .await
            .unwrap();
        assert!(resolved.from_cache());
        assert_eq!(resolved.response.text(), "bundle");
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn test_failed_install_leaves_region_unpopulated() {
        // manifest.json is not routed, so it answers 404
        let fetcher = Arc::new(
            StubFetcher::new()
                .route("https://sudoku.example.com/", 200, "index")
                .route("https://sudoku.example.com/elm.js", 200, "bundle"),
        );
        let worker = worker(&fetcher);

        let err = worker.on_install().await.unwrap_err();
        assert!(err.is_fetch());
        assert!(worker.region().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_before_install_goes_to_network() {
        let fetcher =
            Arc::new(StubFetcher::new().route("https://sudoku.example.com/", 200, "index"));
        let worker = worker(&fetcher);

        let resolved = worker
            .on_fetch(&Request::get("https://sudoku.example.com/").unwrap())
            .await
            .unwrap();
        assert!(!resolved.from_cache());
        assert_eq!(resolved.response.text(), "index");
        assert_eq!(fetcher.calls(), 1);

        // Answering from the network does not bring the region into existence
        assert!(worker.region().await.unwrap().is_none());
        assert!(!worker.storage.has(REGION_NAME).await);
    }
}
