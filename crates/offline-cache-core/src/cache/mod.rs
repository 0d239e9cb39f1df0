//! Cache regions and their durable storage.
//!
//! This module provides:
//! - `CacheRegion`: a named request-identity to response mapping
//! - `CacheStorage`: opens regions by name, one live instance per name
//! - `RegionStore`: the on-disk snapshot behind a persistent region
//!
//! A snapshot is an `index.json` holding entry metadata and the time the
//! region was last primed, plus one body file per entry.

pub mod region;
pub mod storage;
pub mod store;

pub use region::CacheRegion;
pub use storage::CacheStorage;
pub use store::{CachedData, RegionStore};
