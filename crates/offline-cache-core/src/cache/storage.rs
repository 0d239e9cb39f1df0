use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;
use tracing::debug;

use super::region::CacheRegion;
use super::store::RegionStore;
use crate::error::{CacheError, CacheResult};

/// Opens named cache regions, keeping one live instance per name.
///
/// With a root directory every region is backed by a snapshot under
/// `<root>/<name>/`; `in_memory` storage keeps regions for the life of
/// the process only.
pub struct CacheStorage {
    root: Option<PathBuf>,
    regions: Mutex<HashMap<String, Arc<CacheRegion>>>,
}

impl CacheStorage {
    pub fn new(root: PathBuf) -> CacheResult<Self> {
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create cache directory: {}", root.display()))?;
        Ok(Self {
            root: Some(root),
            regions: Mutex::new(HashMap::new()),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            root: None,
            regions: Mutex::new(HashMap::new()),
        }
    }

    /// Region names become directory names, so they must be a single
    /// plain path component.
    fn validate_name(name: &str) -> CacheResult<()> {
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\'])
            || name.chars().any(char::is_control);
        if invalid {
            return Err(CacheError::InvalidRegionName(name.to_string()));
        }
        Ok(())
    }

    fn create_region(&self, name: &str) -> Arc<CacheRegion> {
        let region = match self.root {
            Some(ref root) => CacheRegion::with_store(name, RegionStore::new(root.join(name))),
            None => CacheRegion::new(name),
        };
        debug!(region = name, persistent = region.is_persistent(), "Opened cache region");
        Arc::new(region)
    }

    /// Return the region called `name`, creating it on first use.
    pub async fn open(&self, name: &str) -> CacheResult<Arc<CacheRegion>> {
        Self::validate_name(name)?;

        let mut regions = self.regions.lock().await;
        if let Some(region) = regions.get(name) {
            return Ok(Arc::clone(region));
        }

        let region = self.create_region(name);
        regions.insert(name.to_string(), Arc::clone(&region));
        Ok(region)
    }

    /// Return the region called `name` if it has been primed, in this
    /// process or in a snapshot on disk. Never creates a region.
    pub async fn get(&self, name: &str) -> CacheResult<Option<Arc<CacheRegion>>> {
        Self::validate_name(name)?;

        let mut regions = self.regions.lock().await;
        let region = match regions.get(name) {
            Some(region) => Arc::clone(region),
            None => {
                let on_disk = match self.root {
                    Some(ref root) => RegionStore::new(root.join(name)).exists(),
                    None => false,
                };
                if !on_disk {
                    return Ok(None);
                }
                let region = self.create_region(name);
                regions.insert(name.to_string(), Arc::clone(&region));
                region
            }
        };

        if region.primed_at().await.is_some() {
            Ok(Some(region))
        } else {
            Ok(None)
        }
    }

    /// Whether a primed region called `name` exists.
    pub async fn has(&self, name: &str) -> bool {
        matches!(self.get(name).await, Ok(Some(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;
    use crate::response::CachedResponse;

    #[tokio::test]
    async fn test_open_returns_same_region() {
        let storage = CacheStorage::in_memory();
        let first = storage.open("sudoku").await.unwrap();
        let second = storage.open("sudoku").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_get_does_not_create_regions() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CacheStorage::new(dir.path().to_path_buf()).unwrap();

        assert!(storage.get("sudoku").await.unwrap().is_none());
        assert!(!storage.has("sudoku").await);
        assert!(!dir.path().join("sudoku").exists());

        // Opened but never primed still counts as absent
        let region = storage.open("sudoku").await.unwrap();
        assert!(!storage.has("sudoku").await);

        region
            .insert_all(vec![(
                Request::get("http://localhost/").unwrap().key(),
                CachedResponse::new("http://localhost/", 200, "index"),
            )])
            .await
            .unwrap();
        let found = storage.get("sudoku").await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&found, &region));
        assert!(storage.has("sudoku").await);
    }

    #[tokio::test]
    async fn test_open_rejects_path_like_names() {
        let storage = CacheStorage::in_memory();
        for name in ["", ".", "..", "a/b", "a\\b", "bad\nname"] {
            assert!(
                matches!(storage.open(name).await, Err(CacheError::InvalidRegionName(_))),
                "expected {:?} to be rejected",
                name
            );
        }
    }

    #[tokio::test]
    async fn test_persistent_region_reloads_in_new_storage() {
        let dir = tempfile::tempdir().unwrap();
        let key = Request::get("http://localhost/manifest.json").unwrap().key();

        {
            let storage = CacheStorage::new(dir.path().to_path_buf()).unwrap();
            let region = storage.open("sudoku").await.unwrap();
            region
                .insert_all(vec![(
                    key.clone(),
                    CachedResponse::new("http://localhost/manifest.json", 200, "{}"),
                )])
                .await
                .unwrap();
        }

        let storage = CacheStorage::new(dir.path().to_path_buf()).unwrap();
        assert!(storage.has("sudoku").await);
        let region = storage.get("sudoku").await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&region, &storage.open("sudoku").await.unwrap()));
        assert!(region.is_persistent());
        assert_eq!(region.lookup(&key).await.unwrap().text(), "{}");
        assert!(region.primed_at().await.is_some());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let region_dir = dir.path().join("sudoku");
        std::fs::create_dir_all(&region_dir).unwrap();
        std::fs::write(region_dir.join("index.json"), "{ nope").unwrap();

        let storage = CacheStorage::new(dir.path().to_path_buf()).unwrap();
        let region = storage.open("sudoku").await.unwrap();
        assert!(region.is_empty().await);
        assert!(!storage.has("sudoku").await);
    }
}
