//! A single tracked image file
//!
//! These structs represent the data model that flows between the
//! manifest layer and the presentation layer.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Extensions recognised as assets when nothing else is configured
pub const DEFAULT_ASSET_EXTENSIONS: &[&str] = &["png"];

/// Represents a single image file inside an asset directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Durable identity, persisted in the manifest
    id: Uuid,
    /// Absolute path to the backing file
    path: PathBuf,
    /// Lowercase user tags
    tags: BTreeSet<String>,
    /// Persisted state is stale relative to memory
    dirty: bool,
}

impl Asset {
    /// Create an asset for a file that no manifest knows about yet.
    ///
    /// A fresh random id is generated and the asset starts dirty, so the
    /// next save records it.
    pub fn new_discovered(path: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            path: path.into(),
            tags: BTreeSet::new(),
            dirty: true,
        }
    }

    /// Create an asset from a manifest entry. Tags are normalised to lowercase.
    pub fn from_manifest<I, S>(path: impl Into<PathBuf>, id: Uuid, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            id,
            path: path.into(),
            tags: tags
                .into_iter()
                .filter_map(|tag| normalize_tag(tag.as_ref()))
                .collect(),
            dirty: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Filename only (e.g., "sword.png")
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    /// Path of this asset relative to `dir`, or `None` if it lies elsewhere
    pub fn relative_path(&self, dir: &Path) -> Option<PathBuf> {
        self.path.strip_prefix(dir).ok().map(Path::to_path_buf)
    }

    /// Add a tag. Returns `true` if the tag set changed.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let Some(tag) = normalize_tag(tag) else {
            return false;
        };
        let changed = self.tags.insert(tag);
        self.dirty |= changed;
        changed
    }

    /// Remove a tag. Returns `true` if the tag set changed.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let Some(tag) = normalize_tag(tag) else {
            return false;
        };
        let changed = self.tags.remove(&tag);
        self.dirty |= changed;
        changed
    }

    /// Clear the dirty flag after the owning directory was written
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// Force a new identity on this asset, used when a manifest id collides
    /// with one already present in the tree
    pub(crate) fn reassign_id(&mut self) {
        self.id = Uuid::new_v4();
        self.dirty = true;
    }

    /// Check whether `path` is a regular file with an allowed extension.
    ///
    /// `extensions` are compared case-insensitively and without the leading dot.
    pub fn is_asset_file<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
        if !path.is_file() {
            return false;
        }

        let Some(extension) = path.extension() else {
            return false;
        };
        let ext = extension.to_string_lossy().to_lowercase();

        extensions
            .iter()
            .any(|allowed| allowed.as_ref().trim_start_matches('.').eq_ignore_ascii_case(&ext))
    }
}

/// Tags are trimmed and lowercase; blank tags are rejected
fn normalize_tag(tag: &str) -> Option<String> {
    let tag = tag.trim();
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_lowercase())
    }
}
