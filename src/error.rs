//! Error types for the asset engine
//!
//! Every error carries the path it is about, so a log line or a status
//! message can name the offending file without extra context.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure reading or writing a directory manifest (`.asset_dir.json`)
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to access manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize manifest {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure loading the root of an asset directory tree.
///
/// Problems below the root (unreadable subdirectories, broken manifests)
/// are logged and skipped, they never surface here.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("scan of {path} panicked: {message}")]
    Panicked { path: PathBuf, message: String },
}

impl ScanError {
    /// The root path the failed scan was started for
    pub fn path(&self) -> &Path {
        match self {
            ScanError::NotADirectory { path }
            | ScanError::ReadDir { path, .. }
            | ScanError::Panicked { path, .. } => path,
        }
    }
}

/// Thumbnail generation or lookup failure.
///
/// Callers are expected to show a placeholder image for any of these.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("thumbnail size {0} is outside 1..={max}", max = crate::thumbnail::MAX_THUMBNAIL_SIZE)]
    InvalidSize(u32),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode thumbnail {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("thumbnail task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Program configuration failure
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the user configuration directory")]
    NoConfigDir,

    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize config file {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("asset directory is already registered: {0}")]
    DuplicateRoot(PathBuf),

    #[error("asset directory {path} overlaps registered directory {existing}")]
    NestedRoot { path: PathBuf, existing: PathBuf },
}

/// One directory whose manifest could not be written during a save
#[derive(Debug, Error)]
#[error("failed to save asset directory {directory}: {source}")]
pub struct SaveFailure {
    pub directory: PathBuf,
    #[source]
    pub source: ManifestError,
}
