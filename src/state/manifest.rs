//! Per-directory manifest (`.asset_dir.json`)
//!
//! The manifest records the identity and tags of every asset directly
//! inside one directory. It is serialized to JSON and kept next to the
//! assets it describes, so the identities travel with the directory.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

use crate::error::ManifestError;

/// Name of the hidden manifest file inside every saved asset directory
pub const MANIFEST_FILE_NAME: &str = ".asset_dir.json";

/// Manifest format version written by this crate.
/// Bumped on breaking changes to the layout.
pub const MANIFEST_VERSION: u32 = 1;

/// On-disk layout of one directory's manifest
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Absent in manifests written by very early versions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,

    /// Path relative to the manifest's directory -> entry
    #[serde(default)]
    pub assets: BTreeMap<String, ManifestEntry>,
}

/// One asset's persisted state
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub uuid: Uuid,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: Some(MANIFEST_VERSION),
            assets: BTreeMap::new(),
        }
    }
}

impl Manifest {
    /// Create an empty manifest at the current version
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the manifest file inside `dir`
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILE_NAME)
    }

    /// Convert to a JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read the manifest stored in `dir`.
    ///
    /// Returns `Ok(None)` when the directory has no manifest yet, which is
    /// the normal state of a directory that was never scanned.
    pub fn read(dir: &Path) -> Result<Option<Self>, ManifestError> {
        let path = Self::path_in(dir);

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ManifestError::Io { path, source }),
        };

        Self::from_json(&contents)
            .map(Some)
            .map_err(|source| ManifestError::Parse { path, source })
    }

    /// Write the manifest into `dir`, creating the directory if needed.
    ///
    /// The document goes to a temporary sibling first and is renamed over
    /// the old manifest, so readers never observe a half-written file.
    pub fn write(&self, dir: &Path) -> Result<PathBuf, ManifestError> {
        let path = Self::path_in(dir);

        let json = self.to_json().map_err(|source| ManifestError::Serialize {
            path: path.clone(),
            source,
        })?;

        let io_err = |source: io::Error| ManifestError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(dir).map_err(io_err)?;

        let tmp_path = dir.join(format!("{MANIFEST_FILE_NAME}.tmp"));
        let mut file = fs::File::create(&tmp_path).map_err(io_err)?;
        file.write_all(json.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        if let Err(source) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(io_err(source));
        }

        Ok(path)
    }

    /// Check whether the stored version is one this crate understands.
    /// A missing version is accepted.
    pub fn is_supported_version(&self) -> bool {
        self.version.map_or(true, |v| v == MANIFEST_VERSION)
    }
}

/// True if a manifest key names a file directly inside the manifest's
/// directory (a single normal path component).
///
/// Nested keys belong to a deeper directory's manifest.
pub fn is_direct_entry(relative: &str) -> bool {
    let mut components = Path::new(relative).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
