//! Application configuration management.
//!
//! Configuration covers the origin assets are fetched from, the region
//! name, the asset list, and an optional network timeout. It is stored at
//! `~/.config/offline-cache/config.json`; a missing file means defaults.
//! `OFFLINE_CACHE_ORIGIN` and `OFFLINE_CACHE_DIR` override the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::CacheResult;
use crate::lifecycle::{PRECACHE_ASSETS, REGION_NAME};
use crate::request::{parse_url, AssetList};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "offline-cache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Origin used when none is configured
const DEFAULT_ORIGIN: &str = "http://localhost:8000/";

pub const ORIGIN_ENV: &str = "OFFLINE_CACHE_ORIGIN";
pub const CACHE_DIR_ENV: &str = "OFFLINE_CACHE_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub origin: String,
    pub region_name: String,
    pub assets: Vec<String>,
    /// Per-request network timeout; unset means no timeout
    pub request_timeout_secs: Option<u64>,
    /// Overrides the platform cache directory when set
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            region_name: REGION_NAME.to_string(),
            assets: PRECACHE_ASSETS.iter().map(|s| s.to_string()).collect(),
            request_timeout_secs: None,
            cache_dir: None,
        }
    }
}

impl Config {
    /// Load the config file, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(origin) = lookup(ORIGIN_ENV).filter(|v| !v.trim().is_empty()) {
            self.origin = origin.trim().to_string();
        }
        if let Some(dir) = lookup(CACHE_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.cache_dir = Some(PathBuf::from(dir.trim()));
        }
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn origin_url(&self) -> CacheResult<Url> {
        parse_url(&self.origin)
    }

    pub fn asset_list(&self) -> CacheResult<AssetList> {
        AssetList::resolve(&self.origin_url()?, self.assets.as_slice())
    }
}
