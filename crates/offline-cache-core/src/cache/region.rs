use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::store::{self, RegionStore};
use crate::error::CacheResult;
use crate::request::RequestKey;
use crate::response::CachedResponse;

#[derive(Debug, Default)]
struct RegionState {
    entries: HashMap<RequestKey, Arc<CachedResponse>>,
    primed_at: Option<DateTime<Utc>>,
}

/// A named mapping from request identity to stored response.
///
/// Entries are immutable once written and handed out as `Arc`s, so any
/// number of lookups can share the read lock. Writes only happen in
/// `insert_all`, which commits a whole batch at once.
#[derive(Debug)]
pub struct CacheRegion {
    name: String,
    state: RwLock<RegionState>,
    store: Option<RegionStore>,
}

impl CacheRegion {
    /// Create an empty region that lives only in memory.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(RegionState::default()),
            store: None,
        }
    }

    /// Create a region backed by `store`, starting from its snapshot if one exists.
    /// An unreadable snapshot is logged and the region starts empty.
    pub(crate) fn with_store(name: impl Into<String>, store: RegionStore) -> Self {
        let name = name.into();
        let state = match store.load() {
            Ok(Some(snapshot)) => RegionState {
                entries: snapshot
                    .data
                    .into_iter()
                    .map(|(key, response)| (key, Arc::new(response)))
                    .collect(),
                primed_at: Some(snapshot.cached_at),
            },
            Ok(None) => RegionState::default(),
            Err(e) => {
                debug!(
                    region = %name,
                    error = %e,
                    "Failed to load region snapshot, starting empty"
                );
                RegionState::default()
            }
        };

        Self {
            name,
            state: RwLock::new(state),
            store: Some(store),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    pub async fn lookup(&self, key: &RequestKey) -> Option<Arc<CachedResponse>> {
        self.state.read().await.entries.get(key).cloned()
    }

    /// Commit a batch of entries, replacing any existing entry with the same
    /// identity, then persist the region if it has a store. If persisting
    /// fails nothing from the batch is kept.
    pub async fn insert_all(&self, batch: Vec<(RequestKey, CachedResponse)>) -> CacheResult<()> {
        let mut state = self.state.write().await;

        let mut entries = state.entries.clone();
        let count = batch.len();
        for (key, response) in batch {
            entries.insert(key, Arc::new(response));
        }
        let primed_at = Utc::now();

        if let Some(ref store) = self.store {
            store.save(
                entries.iter().map(|(key, response)| (key, &**response)),
                primed_at,
            )?;
        }

        state.entries = entries;
        state.primed_at = Some(primed_at);

        info!(
            region = %self.name,
            committed = count,
            total = state.entries.len(),
            "Committed entries to region"
        );
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    /// All stored identities, sorted by method then URL.
    pub async fn keys(&self) -> Vec<RequestKey> {
        let mut keys: Vec<RequestKey> = self.state.read().await.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn primed_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.primed_at
    }

    /// Time since the region was last primed, or `None` if it never was.
    pub async fn age_display(&self) -> Option<String> {
        self.primed_at().await.map(store::age_display)
    }
}
