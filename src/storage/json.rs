use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::storage::{CacheStore, FreshnessCache};

/// Keeps the cache as a single JSON object on disk.
pub struct JsonCacheStore {
    path: PathBuf,
}

impl JsonCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CacheStore for JsonCacheStore {
    async fn load(&self) -> Result<FreshnessCache> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No existing cache at {}, starting empty", self.path.display());
                return Ok(FreshnessCache::new());
            }
            Err(e) => return Err(PipelineError::file(&self.path, e)),
        };

        match serde_json::from_str::<FreshnessCache>(&content) {
            Ok(cache) => {
                info!("Loaded {} cache entries from {}", cache.len(), self.path.display());
                Ok(cache)
            }
            Err(e) => {
                warn!("Could not decode cache {}: {}, starting empty", self.path.display(), e);
                Ok(FreshnessCache::new())
            }
        }
    }

    /// Writes to a sibling temp file and renames it over the target.
    async fn save(&self, cache: &FreshnessCache) -> Result<()> {
        let json = serde_json::to_string_pretty(cache)
            .map_err(|e| PipelineError::file(&self.path, e.into()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::file(parent, e))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| PipelineError::file(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| PipelineError::file(&self.path, e))?;

        info!("Saved {} cache entries to {}", cache.len(), self.path.display());
        Ok(())
    }
}
