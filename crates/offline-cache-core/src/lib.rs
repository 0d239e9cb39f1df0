//! Core library for offline-cache.
//!
//! A static-asset offline cache: a named region is primed with a fixed
//! list of assets on install, and later requests are answered from that
//! region first, falling back to the network on a miss.
//!
//! - `request`: requests, request identity (`RequestKey`), asset lists
//! - `response`: the materialized response stored in regions
//! - `network`: the `Fetcher` seam and its `reqwest` implementation
//! - `cache`: regions and their on-disk snapshots
//! - `manager`: `prime` and `resolve`
//! - `lifecycle`: install/fetch entry points for the host
//! - `config`: configuration file and environment overrides

pub mod cache;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod manager;
pub mod network;
pub mod request;
pub mod response;

pub use cache::{CacheRegion, CacheStorage};
pub use config::Config;
pub use error::{CacheError, CacheResult};
pub use lifecycle::{Worker, PRECACHE_ASSETS, REGION_NAME};
pub use manager::{OfflineCacheManager, Resolved, ResponseSource};
pub use network::{Fetcher, HttpFetcher};
pub use request::{AssetList, Request, RequestKey};
pub use response::CachedResponse;
