//! The asset directory tree
//!
//! An `AssetDirectory` mirrors one directory on disk. It owns the assets
//! directly inside it and the child directories whose subtree contains at
//! least one asset. Loading goes through the reconciler, saving writes one
//! manifest per directory that has dirty assets.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use super::asset::Asset;
use super::manifest::{Manifest, ManifestEntry};
use super::reconcile::{DirectoryReconciler, ScanOptions};
use crate::error::{SaveFailure, ScanError};

/// A node in the directory-tree mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDirectory {
    /// Absolute path to this directory
    path: PathBuf,
    /// Assets directly in this directory, keyed by id
    assets: HashMap<Uuid, Asset>,
    /// Child directories containing assets, keyed by their name
    subdirectories: BTreeMap<PathBuf, AssetDirectory>,
}

/// Outcome of a recursive save
#[derive(Debug, Default)]
pub struct SaveReport {
    /// Manifest files that were written
    pub written: Vec<PathBuf>,
    /// Directories whose manifest could not be written
    pub failures: Vec<SaveFailure>,
}

impl SaveReport {
    /// True when every directory that needed saving was saved
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

impl AssetDirectory {
    pub(crate) fn from_parts(
        path: PathBuf,
        assets: HashMap<Uuid, Asset>,
        subdirectories: BTreeMap<PathBuf, AssetDirectory>,
    ) -> Self {
        Self {
            path,
            assets,
            subdirectories,
        }
    }

    /// Load the tree at `path` with the default asset extensions
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        Self::load_with(path, &ScanOptions::default())
    }

    /// Load the tree at `path`, merging each directory's manifest with
    /// what is currently on disk
    pub fn load_with(path: impl AsRef<Path>, options: &ScanOptions) -> Result<Self, ScanError> {
        DirectoryReconciler::new(options)
            .run(path.as_ref())
            .map(|(directory, _)| directory)
    }

    /// The absolute path of this directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Assets directly in this directory, keyed by id
    pub fn assets(&self) -> &HashMap<Uuid, Asset> {
        &self.assets
    }

    pub fn asset(&self, id: &Uuid) -> Option<&Asset> {
        self.assets.get(id)
    }

    pub fn asset_mut(&mut self, id: &Uuid) -> Option<&mut Asset> {
        self.assets.get_mut(id)
    }

    /// Child directories that contain assets somewhere in their tree.
    /// Keys are paths relative to this directory.
    pub fn subdirectories(&self) -> &BTreeMap<PathBuf, AssetDirectory> {
        &self.subdirectories
    }

    pub fn subdirectory(&self, name: impl AsRef<Path>) -> Option<&AssetDirectory> {
        self.subdirectories.get(name.as_ref())
    }

    /// True when neither this directory nor any child holds an asset
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty() && self.subdirectories.is_empty()
    }

    /// Find an asset anywhere in this tree for editing
    pub fn find_asset_mut(&mut self, id: &Uuid) -> Option<&mut Asset> {
        if self.assets.contains_key(id) {
            return self.assets.get_mut(id);
        }
        self.subdirectories
            .values_mut()
            .find_map(|subdir| subdir.find_asset_mut(id))
    }

    /// All assets in this tree, keyed by id
    pub fn assets_recursive(&self) -> HashMap<Uuid, &Asset> {
        let mut all: HashMap<Uuid, &Asset> =
            self.assets.iter().map(|(id, asset)| (*id, asset)).collect();
        for subdir in self.subdirectories.values() {
            all.extend(subdir.assets_recursive());
        }
        all
    }

    pub fn asset_count_recursive(&self) -> usize {
        self.assets.len()
            + self
                .subdirectories
                .values()
                .map(AssetDirectory::asset_count_recursive)
                .sum::<usize>()
    }

    /// Every tag used by any asset in this tree
    pub fn known_tags_recursive(&self) -> BTreeSet<String> {
        let mut tags: BTreeSet<String> = self
            .assets
            .values()
            .flat_map(|asset| asset.tags().iter().cloned())
            .collect();
        for subdir in self.subdirectories.values() {
            tags.extend(subdir.known_tags_recursive());
        }
        tags
    }

    /// True if any asset in this tree has unsaved changes
    pub fn has_dirty_recursive(&self) -> bool {
        self.assets.values().any(Asset::is_dirty)
            || self.subdirectories.values().any(AssetDirectory::has_dirty_recursive)
    }

    /// Recursively write the manifest of every directory that holds a dirty
    /// asset. Clean directories are left untouched, but their children are
    /// still visited.
    ///
    /// A failed write is recorded in the report and the remaining
    /// directories are still saved; the failed directory's assets stay dirty.
    pub fn save(&mut self) -> SaveReport {
        let mut report = SaveReport::default();
        self.save_into(&mut report);
        report
    }

    fn save_into(&mut self, report: &mut SaveReport) {
        if self.assets.values().any(Asset::is_dirty) {
            match self.to_manifest().write(&self.path) {
                Ok(written) => {
                    debug!(path = %written.display(), assets = self.assets.len(), "Saved manifest");
                    self.assets.values_mut().for_each(Asset::mark_saved);
                    report.written.push(written);
                }
                Err(source) => {
                    warn!(error = %source, "Failed to save asset directory");
                    report.failures.push(SaveFailure {
                        directory: self.path.clone(),
                        source,
                    });
                }
            }
        }

        // Always check the subdirectories
        for subdir in self.subdirectories.values_mut() {
            subdir.save_into(report);
        }
    }

    /// Build the manifest describing this directory's direct assets
    pub fn to_manifest(&self) -> Manifest {
        let mut manifest = Manifest::new();

        for asset in self.assets.values() {
            let relative = asset
                .relative_path(&self.path)
                .unwrap_or_else(|| PathBuf::from(asset.file_name()));

            if relative.parent().is_some_and(|p| !p.as_os_str().is_empty()) {
                warn!(
                    path = %asset.path().display(),
                    dir = %self.path.display(),
                    "Asset is not directly in its directory"
                );
            }

            let Some(key) = relative.to_str() else {
                warn!(path = %asset.path().display(), "Asset name is not UTF-8, not persisted");
                continue;
            };

            manifest.assets.insert(
                key.to_string(),
                ManifestEntry {
                    uuid: asset.id(),
                    tags: asset.tags().clone(),
                },
            );
        }

        manifest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::manifest::MANIFEST_FILE_NAME;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"png").unwrap();
    }

    #[test]
    fn test_returns_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = AssetDirectory::load(dir.path()).unwrap();
        assert!(loaded.path().is_absolute());
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_aggregates() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("top.png"));
        touch(&dir.path().join("a").join("one.png"));
        touch(&dir.path().join("a").join("b").join("two.png"));
        touch(&dir.path().join("a").join("b").join("three.png"));

        let mut root = AssetDirectory::load(dir.path()).unwrap();
        assert_eq!(root.asset_count_recursive(), 4);
        assert_eq!(root.assets_recursive().len(), 4);

        let nested = root.subdirectory("a").unwrap().subdirectory("b").unwrap();
        let nested_id = *nested.assets().keys().next().unwrap();
        let asset = root.find_asset_mut(&nested_id).unwrap();
        asset.add_tag("Deep");

        let top_id = *root.assets().keys().next().unwrap();
        root.asset_mut(&top_id).unwrap().add_tag("top");

        let tags: Vec<String> = root.known_tags_recursive().into_iter().collect();
        assert_eq!(tags, vec!["deep".to_string(), "top".to_string()]);
    }

    #[test]
    fn test_save_skips_clean_directories_but_visits_children() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("top.png"));
        touch(&dir.path().join("child").join("inner.png"));

        let mut root = AssetDirectory::load(dir.path()).unwrap();
        let report = root.save();
        assert!(report.is_ok());
        assert_eq!(report.written.len(), 2);
        assert!(!root.has_dirty_recursive());

        // Nothing dirty: nothing written
        let report = root.save();
        assert!(report.written.is_empty());

        // Dirty only in the child: only the child is written
        fs::remove_file(dir.path().join(MANIFEST_FILE_NAME)).unwrap();
        let child_id = *root.subdirectory("child").unwrap().assets().keys().next().unwrap();
        root.find_asset_mut(&child_id).unwrap().add_tag("edited");

        let report = root.save();
        assert_eq!(report.written, vec![dir.path().join("child").join(MANIFEST_FILE_NAME)]);
        assert!(!dir.path().join(MANIFEST_FILE_NAME).exists());
    }

    #[test]
    fn test_manifest_uses_relative_keys() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("sword.png"));

        let root = AssetDirectory::load(dir.path()).unwrap();
        let manifest = root.to_manifest();
        let keys: Vec<&String> = manifest.assets.keys().collect();
        assert_eq!(keys, vec!["sword.png"]);
    }

    #[test]
    fn test_save_failure_is_reported_per_directory() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("locked").join("a.png"));
        touch(&dir.path().join("open").join("b.png"));

        let mut root = AssetDirectory::load(dir.path()).unwrap();

        // A directory where the temp manifest goes makes the write fail,
        // whatever the permissions of the current user
        let locked = dir.path().join("locked");
        fs::create_dir(locked.join(format!("{MANIFEST_FILE_NAME}.tmp"))).unwrap();

        let report = root.save();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].directory, root.subdirectory("locked").unwrap().path());
        let open = root.subdirectory("open").unwrap();
        assert_eq!(report.written, vec![open.path().join(MANIFEST_FILE_NAME)]);
        assert!(!locked.join(MANIFEST_FILE_NAME).exists());
        assert!(root.subdirectory("locked").unwrap().has_dirty_recursive());
        assert!(!open.has_dirty_recursive());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("sword.png"));
        let odd = dir.path().join(OsStr::from_bytes(b"sw\xffrd.png"));
        if fs::write(&odd, b"png").is_err() {
            // Filesystem refuses non UTF-8 names
            return;
        }

        let mut first = AssetDirectory::load(dir.path()).unwrap();
        assert_eq!(first.assets().len(), 1);
        assert!(first.save().is_ok());

        let second = AssetDirectory::load(dir.path()).unwrap();
        let first_ids: Vec<Uuid> = first.assets().keys().copied().collect();
        let second_ids: Vec<Uuid> = second.assets().keys().copied().collect();
        assert_eq!(first_ids, second_ids);
        assert!(!second.has_dirty_recursive());
        assert_eq!(second.to_manifest().assets.len(), 1);
    }
}
