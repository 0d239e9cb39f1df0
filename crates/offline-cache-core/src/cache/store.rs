use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::request::RequestKey;
use crate::response::CachedResponse;

/// Index file written into each region directory
const INDEX_FILE: &str = "index.json";

/// The index is written here first and renamed over `INDEX_FILE`
const INDEX_TMP_FILE: &str = "index.json.tmp";

/// Extension of the per-entry body files
const BODY_EXTENSION: &str = "body";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

pub fn age_minutes(cached_at: DateTime<Utc>) -> i64 {
    (Utc::now() - cached_at).num_minutes()
}

pub fn age_display(cached_at: DateTime<Utc>) -> String {
    let minutes = age_minutes(cached_at);
    if minutes < 1 {
        // Also covers clock skew
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        let remaining_mins = minutes % 60;
        if remaining_mins >= 30 {
            // Round up: 1h 30m+ becomes 2h
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        let remaining_hours = (minutes % 1440) / 60;
        if remaining_hours >= 12 {
            // Round up: 1d 12h+ becomes 2d
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

/// Metadata for one stored entry. The body lives next to the index in `body_file`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryRecord {
    method: String,
    url: String,
    response_url: String,
    status: u16,
    headers: Vec<(String, String)>,
    body_file: String,
}

pub type StoredEntries = Vec<(RequestKey, CachedResponse)>;

/// On-disk snapshot of a single region.
#[derive(Debug, Clone)]
pub struct RegionStore {
    region_dir: PathBuf,
}

impl RegionStore {
    pub fn new(region_dir: PathBuf) -> Self {
        Self { region_dir }
    }

    fn index_path(&self) -> PathBuf {
        self.region_dir.join(INDEX_FILE)
    }

    pub fn exists(&self) -> bool {
        self.index_path().exists()
    }

    /// Body files are named by key and content, so a save never rewrites
    /// a file the current index points at.
    fn body_file_name(key: &RequestKey, body: &[u8]) -> String {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        body.hash(&mut hasher);
        format!("{:016x}.{}", hasher.finish(), BODY_EXTENSION)
    }

    fn write_body(&self, body_file: &str, body: &[u8]) -> Result<()> {
        let body_path = self.region_dir.join(body_file);
        if let Ok(meta) = std::fs::metadata(&body_path) {
            if meta.is_file() && meta.len() == body.len() as u64 {
                return Ok(());
            }
        }
        let tmp_path = self.region_dir.join(format!("{}.tmp", body_file));
        std::fs::write(&tmp_path, body)
            .with_context(|| format!("Failed to write cached body: {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &body_path)
            .with_context(|| format!("Failed to move cached body: {}", body_path.display()))?;
        Ok(())
    }

    pub fn load(&self) -> Result<Option<CachedData<StoredEntries>>> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read region index: {}", path.display()))?;

        let index: CachedData<Vec<EntryRecord>> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse region index: {}", path.display()))?;

        let mut entries = Vec::with_capacity(index.data.len());
        for record in index.data {
            let body_path = self.region_dir.join(&record.body_file);
            let body = std::fs::read(&body_path)
                .with_context(|| format!("Failed to read cached body: {}", body_path.display()))?;

            let key = RequestKey::from_parts(&record.method, &record.url);
            entries.push((
                key,
                CachedResponse {
                    url: record.response_url,
                    status: record.status,
                    headers: record.headers,
                    body,
                },
            ));
        }

        debug!(dir = %self.region_dir.display(), entries = entries.len(), "Loaded region snapshot");

        Ok(Some(CachedData {
            data: entries,
            cached_at: index.cached_at,
        }))
    }

    /// Write the full region contents, replacing any previous snapshot.
    ///
    /// New bodies are written next to the old ones and the index is swapped
    /// in with a rename, so until that rename the previous snapshot loads
    /// unchanged. Removing bodies the new index no longer uses is best-effort.
    pub fn save<'a, I>(&self, entries: I, cached_at: DateTime<Utc>) -> Result<()>
    where
        I: IntoIterator<Item = (&'a RequestKey, &'a CachedResponse)>,
    {
        std::fs::create_dir_all(&self.region_dir).with_context(|| {
            format!("Failed to create region directory: {}", self.region_dir.display())
        })?;

        let mut records = Vec::new();
        for (key, response) in entries {
            let body_file = Self::body_file_name(key, &response.body);
            self.write_body(&body_file, &response.body)?;

            records.push(EntryRecord {
                method: key.method().to_string(),
                url: key.url().to_string(),
                response_url: response.url.clone(),
                status: response.status,
                headers: response.headers.clone(),
                body_file,
            });
        }
        records.sort_by(|a, b| (&a.url, &a.method).cmp(&(&b.url, &b.method)));

        let index = CachedData {
            data: &records,
            cached_at,
        };
        let contents = serde_json::to_string_pretty(&index)?;
        let tmp_path = self.region_dir.join(INDEX_TMP_FILE);
        std::fs::write(&tmp_path, contents).context("Failed to write region index")?;
        std::fs::rename(&tmp_path, self.index_path()).context("Failed to replace region index")?;

        let live: HashSet<&str> = records.iter().map(|r| r.body_file.as_str()).collect();
        if let Err(e) = self.remove_orphan_bodies(&live) {
            warn!(
                dir = %self.region_dir.display(),
                error = %e,
                "Failed to clean up old body files"
            );
        }

        Ok(())
    }

    fn remove_orphan_bodies(&self, live: &HashSet<&str>) -> Result<()> {
        for entry in std::fs::read_dir(&self.region_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let is_body = path.extension().and_then(|e| e.to_str()) == Some(BODY_EXTENSION);
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if is_body && !live.contains(name) {
                debug!(file = %path.display(), "Removing orphaned body file");
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
