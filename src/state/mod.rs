//! State management module
//!
//! This module handles all persistent asset state, including:
//! - Single assets and their tags (asset.rs)
//! - The directory tree mirror and its aggregates (asset_dir.rs)
//! - Per-directory manifest files (manifest.rs)
//! - Merging manifests with live scans (reconcile.rs)
//! - Program configuration (program_config.rs)

pub mod asset;
pub mod asset_dir;
pub mod manifest;
pub mod program_config;
pub mod reconcile;

pub use asset::Asset;
pub use asset_dir::{AssetDirectory, SaveReport};
pub use manifest::{Manifest, ManifestEntry, MANIFEST_FILE_NAME, MANIFEST_VERSION};
pub use program_config::ProgramConfig;
pub use reconcile::{DirectoryReconciler, ReconcileStats, ScanOptions};
