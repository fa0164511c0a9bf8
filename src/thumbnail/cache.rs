//! Two-tier thumbnail cache
//!
//! Lookup order for a `(asset id, size)` pair:
//! - Tier 1: in-memory LRU bounded by a byte budget
//! - Tier 2: `<cache_dir>/<uuid>_<size>.png` on disk
//! - Tier 3: decode the original, scale it, and fill both tiers
//!
//! The memory lock is only held while touching the table. Decoding and
//! scaling run unlocked, so two callers racing for the same key may both
//! generate it; the result is identical either way.

use parking_lot::Mutex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::decode::{decode_original, read_cached, write_cached};
use super::memory::MemoryTier;
use super::scale::scale_to_fit;
use super::{Thumbnail, ThumbnailKey, MAX_THUMBNAIL_SIZE};
use crate::error::ThumbnailError;
use crate::state::program_config::APP_DIR_NAME;

/// Default memory budget: 64 MiB of decoded pixels
pub const DEFAULT_MEMORY_BUDGET: usize = 64 * 1024 * 1024;

/// Where and how much to cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailCacheConfig {
    /// Directory holding the disk tier
    pub cache_dir: PathBuf,
    /// Upper bound for decoded pixel bytes kept in memory
    pub memory_budget_bytes: usize,
}

impl ThumbnailCacheConfig {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            memory_budget_bytes: DEFAULT_MEMORY_BUDGET,
        }
    }

    pub fn with_memory_budget(mut self, bytes: usize) -> Self {
        self.memory_budget_bytes = bytes;
        self
    }

    /// Get the platform thumbnail cache directory
    /// Returns ~/.cache/asset-browser/thumbnails on Linux
    pub fn default_cache_dir() -> Option<PathBuf> {
        let mut path = dirs_next::cache_dir().or_else(dirs_next::home_dir)?;
        path.push(APP_DIR_NAME);
        path.push("thumbnails");
        Some(path)
    }

    /// Config using the platform cache directory, if one can be determined
    pub fn in_default_dir() -> Option<Self> {
        Self::default_cache_dir().map(Self::new)
    }
}

/// Memory + disk cache of scaled asset previews.
///
/// Shared by reference (usually behind an `Arc`) with everything that
/// displays thumbnails.
#[derive(Debug)]
pub struct ThumbnailCache {
    cache_dir: PathBuf,
    memory: Mutex<MemoryTier>,
}

impl ThumbnailCache {
    pub fn new(config: ThumbnailCacheConfig) -> Self {
        Self {
            cache_dir: config.cache_dir,
            memory: Mutex::new(MemoryTier::new(config.memory_budget_bytes)),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get the disk tier path for a thumbnail (doesn't generate, just
    /// returns the expected path)
    pub fn thumbnail_path(&self, asset_id: Uuid, size: u32) -> PathBuf {
        self.disk_path(&ThumbnailKey::new(asset_id, size))
    }

    /// Check if a thumbnail exists in the disk tier
    pub fn is_cached_on_disk(&self, asset_id: Uuid, size: u32) -> bool {
        self.thumbnail_path(asset_id, size).is_file()
    }

    /// Number of thumbnails held in memory
    pub fn len(&self) -> usize {
        self.memory.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decoded bytes held in memory
    pub fn memory_usage(&self) -> usize {
        self.memory.lock().used_bytes()
    }

    /// Get the thumbnail of an asset scaled to fit a `size` x `size` box,
    /// generating and caching it if needed.
    ///
    /// `size` must be in `1..=MAX_THUMBNAIL_SIZE`. An error means the
    /// caller should show a placeholder.
    pub fn get(
        &self,
        asset_id: Uuid,
        path: &Path,
        size: u32,
    ) -> Result<Arc<Thumbnail>, ThumbnailError> {
        if size == 0 || size > MAX_THUMBNAIL_SIZE {
            return Err(ThumbnailError::InvalidSize(size));
        }

        let key = ThumbnailKey::new(asset_id, size);

        // Tier 1: memory
        if let Some(thumbnail) = self.memory.lock().get(&key) {
            return Ok(thumbnail);
        }

        // Tier 2: disk
        let disk_path = self.disk_path(&key);
        match read_cached(&disk_path) {
            Ok(Some(thumbnail)) => {
                debug!(key = %key, "Thumbnail loaded from disk cache");
                return Ok(self.remember(key, thumbnail));
            }
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "Discarding unreadable cached thumbnail");
                let _ = fs::remove_file(&disk_path);
            }
        }

        // Tier 3: decode the original, which is dropped right after scaling
        let thumbnail = {
            let original = decode_original(path)?;
            scale_to_fit(&original, size)
        };

        match write_cached(&disk_path, &thumbnail) {
            Ok(()) => info!(path = %disk_path.display(), "Generated thumbnail"),
            Err(err) => warn!(error = %err, "Thumbnail generated but not written to disk cache"),
        }

        Ok(self.remember(key, thumbnail))
    }

    /// Run [`ThumbnailCache::get`] on tokio's blocking pool
    pub async fn get_async(
        self: &Arc<Self>,
        asset_id: Uuid,
        path: PathBuf,
        size: u32,
    ) -> Result<Arc<Thumbnail>, ThumbnailError> {
        let cache = Arc::clone(self);
        tokio::task::spawn_blocking(move || cache.get(asset_id, &path, size)).await?
    }

    /// Drop the memory tier and delete the whole disk tier
    pub fn clear(&self) -> Result<(), ThumbnailError> {
        self.memory.lock().clear();

        match fs::remove_dir_all(&self.cache_dir) {
            Ok(()) => {
                info!(dir = %self.cache_dir.display(), "Cleared thumbnail cache");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ThumbnailError::Io {
                path: self.cache_dir.clone(),
                source,
            }),
        }
    }

    fn disk_path(&self, key: &ThumbnailKey) -> PathBuf {
        self.cache_dir.join(format!("{key}.png"))
    }

    fn remember(&self, key: ThumbnailKey, thumbnail: Thumbnail) -> Arc<Thumbnail> {
        let thumbnail = Arc::new(thumbnail);
        self.memory.lock().insert(key, Arc::clone(&thumbnail));
        thumbnail
    }
}
