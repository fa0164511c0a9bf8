//! Asset directory synchronization and thumbnail cache engine
//!
//! - [`state`]: assets, the directory tree mirror, manifests and program config
//! - [`scan`]: the background queue that loads directory trees off the caller's thread
//! - [`thumbnail`]: the memory + disk cache of scaled previews
//!
//! ```no_run
//! use asset_browser::{ScanOptions, ScanScheduler};
//!
//! let scheduler = ScanScheduler::new(ScanOptions::default())?;
//! scheduler.queue_scan("/home/me/assets");
//!
//! // Later, from the UI loop:
//! if let Some(Ok(mut tree)) = scheduler.poll_result() {
//!     println!("{} assets", tree.asset_count_recursive());
//!     let report = tree.save();
//!     assert!(report.is_ok());
//! }
//! # Ok::<(), std::io::Error>(())
//! ```

pub mod error;
pub mod scan;
pub mod state;
pub mod thumbnail;

pub use error::{ConfigError, ManifestError, SaveFailure, ScanError, ThumbnailError};
pub use scan::{ScanOrder, ScanResult, ScanScheduler};
pub use state::{Asset, AssetDirectory, ProgramConfig, SaveReport, ScanOptions};
pub use thumbnail::{
    Thumbnail, ThumbnailCache, ThumbnailCacheConfig, ThumbnailKey, MAX_THUMBNAIL_SIZE,
};
