//! Thumbnail module
//!
//! This module handles:
//! - Decoding original images (decode.rs)
//! - Scaling them to fit a square box (scale.rs)
//! - The in-memory LRU tier (memory.rs)
//! - The two-tier cache in front of all of it (cache.rs)

pub mod cache;
pub mod decode;
mod memory;
pub mod scale;

use std::fmt;
use uuid::Uuid;

pub use cache::{ThumbnailCache, ThumbnailCacheConfig, DEFAULT_MEMORY_BUDGET};

/// Largest accepted thumbnail box edge, in pixels
pub const MAX_THUMBNAIL_SIZE: u32 = 4096;

/// A decoded, scaled preview bitmap
pub type Thumbnail = image::RgbaImage;

/// Cache key: one thumbnail per asset and requested box size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThumbnailKey {
    pub asset_id: Uuid,
    pub size: u32,
}

impl ThumbnailKey {
    pub fn new(asset_id: Uuid, size: u32) -> Self {
        Self { asset_id, size }
    }
}

impl fmt::Display for ThumbnailKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.asset_id, self.size)
    }
}
