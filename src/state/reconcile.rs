//! Reconciliation of a directory tree against its manifests
//!
//! The manifest is the source of truth for identity, the live filesystem
//! is the source of truth for existence. For every directory:
//! - manifest entries naming a file directly inside it keep their ids
//! - files on disk that no manifest knows get a fresh id and start dirty
//! - manifest entries whose file is gone are dropped from the loaded tree
//! - subdirectories are loaded depth-first and pruned when asset-free

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use super::asset::{Asset, DEFAULT_ASSET_EXTENSIONS};
use super::asset_dir::AssetDirectory;
use super::manifest::{is_direct_entry, Manifest, MANIFEST_VERSION};
use crate::error::ScanError;

/// Options controlling which files count as assets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Lowercase extensions without the leading dot (e.g. "png")
    pub extensions: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_ASSET_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl ScanOptions {
    /// Options accepting the given extensions (case and leading dots ignored)
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }
}

/// Counters gathered during one reconciliation
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Directories kept in the resulting tree
    pub directories: usize,
    /// Assets restored from manifests
    pub restored: usize,
    /// Assets seen for the first time
    pub discovered: usize,
    /// Manifest entries whose file no longer exists
    pub missing: usize,
    /// Manifest assets that got a new id because theirs was already taken
    pub reassigned: usize,
    /// Manifests that existed but could not be read or parsed
    pub unreadable_manifests: usize,
    /// Asset files left out because their name is not valid UTF-8
    pub skipped: usize,
}

/// Merges persisted manifests with a live scan of a directory tree
#[derive(Debug)]
pub struct DirectoryReconciler<'a> {
    options: &'a ScanOptions,
    /// Every id handed out so far in this load
    seen_ids: HashSet<Uuid>,
    stats: ReconcileStats,
}

impl<'a> DirectoryReconciler<'a> {
    pub fn new(options: &'a ScanOptions) -> Self {
        Self {
            options,
            seen_ids: HashSet::new(),
            stats: ReconcileStats::default(),
        }
    }

    /// Load the tree rooted at `path`.
    ///
    /// Only a root that is missing, not a directory, or unreadable fails the
    /// load. Anything wrong below the root is logged and skipped.
    pub fn run(mut self, path: &Path) -> Result<(AssetDirectory, ReconcileStats), ScanError> {
        let root = std::path::absolute(path).map_err(|source| ScanError::ReadDir {
            path: path.to_path_buf(),
            source,
        })?;

        if !root.is_dir() {
            return Err(ScanError::NotADirectory { path: root });
        }

        debug!(root = %root.display(), "Reconciling asset directory");

        // The root is returned even when empty, only children are pruned
        let directory = self.load_dir(&root)?;
        self.stats.directories += 1;

        info!(
            root = %root.display(),
            assets = self.stats.restored + self.stats.discovered,
            discovered = self.stats.discovered,
            missing = self.stats.missing,
            directories = self.stats.directories,
            "Scan complete"
        );

        Ok((directory, self.stats))
    }

    fn load_dir(&mut self, dir: &Path) -> Result<AssetDirectory, ScanError> {
        let mut known = self.manifest_assets(dir);
        let children = read_children(dir)?;

        let mut assets = HashMap::new();
        let mut subdirectories = BTreeMap::new();

        for entry in children {
            let path = entry.path();

            if entry.file_type().is_dir() {
                match self.load_dir(path) {
                    Ok(child) if child.is_empty() => {}
                    Ok(child) => {
                        self.stats.directories += 1;
                        subdirectories.insert(PathBuf::from(entry.file_name()), child);
                    }
                    Err(err) => warn!(error = %err, "Skipping unreadable directory"),
                }
            } else if Asset::is_asset_file(path, &self.options.extensions) {
                // Manifest keys are UTF-8, such a file could never keep its id
                if entry.file_name().to_str().is_none() {
                    warn!(path = %path.display(), "Skipping asset with a non UTF-8 file name");
                    self.stats.skipped += 1;
                    continue;
                }

                let asset = match known.remove(path) {
                    Some(mut asset) => {
                        self.claim_id(&mut asset);
                        self.stats.restored += 1;
                        asset
                    }
                    None => {
                        let mut asset = Asset::new_discovered(path);
                        self.claim_id(&mut asset);
                        self.stats.discovered += 1;
                        asset
                    }
                };
                assets.insert(asset.id(), asset);
            }
        }

        for missing in known.keys() {
            debug!(path = %missing.display(), "Manifest entry has no file on disk, dropping it");
        }
        self.stats.missing += known.len();

        Ok(AssetDirectory::from_parts(dir.to_path_buf(), assets, subdirectories))
    }

    /// Assets listed in `dir`'s manifest, keyed by absolute path
    fn manifest_assets(&mut self, dir: &Path) -> HashMap<PathBuf, Asset> {
        let manifest = match Manifest::read(dir) {
            Ok(Some(manifest)) => manifest,
            Ok(None) => return HashMap::new(),
            Err(err) => {
                warn!(error = %err, "Ignoring unreadable manifest");
                self.stats.unreadable_manifests += 1;
                return HashMap::new();
            }
        };

        if !manifest.is_supported_version() {
            warn!(
                dir = %dir.display(),
                found = ?manifest.version,
                expected = MANIFEST_VERSION,
                "Unknown manifest version, will attempt to load anyway"
            );
        }

        let mut known = HashMap::with_capacity(manifest.assets.len());
        for (relative, entry) in manifest.assets {
            if !is_direct_entry(&relative) {
                debug!(
                    entry = %relative,
                    dir = %dir.display(),
                    "Manifest entry is not directly in this directory, ignoring it"
                );
                continue;
            }

            let path = dir.join(&relative);
            known.insert(path.clone(), Asset::from_manifest(path, entry.uuid, entry.tags));
        }
        known
    }

    /// Record the asset's id, replacing it if another asset already owns it
    fn claim_id(&mut self, asset: &mut Asset) {
        if self.seen_ids.insert(asset.id()) {
            return;
        }

        let old = asset.id();
        asset.reassign_id();
        self.seen_ids.insert(asset.id());
        self.stats.reassigned += 1;
        warn!(
            path = %asset.path().display(),
            %old,
            new = %asset.id(),
            "Duplicate asset id in manifest, assigned a new one"
        );
    }
}

/// Direct children of `dir`, sorted by file name.
///
/// Symbolic links are not followed, so linked directories are never
/// descended into. Failing to open `dir` itself is an error; a single
/// unreadable entry is logged and skipped.
fn read_children(dir: &Path) -> Result<Vec<walkdir::DirEntry>, ScanError> {
    let mut children = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        match entry {
            Ok(entry) => children.push(entry),
            Err(err) if err.depth() == 0 => {
                let message = err.to_string();
                let source = err
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other(message));
                return Err(ScanError::ReadDir {
                    path: dir.to_path_buf(),
                    source,
                });
            }
            Err(err) => warn!(error = %err, "Skipping unreadable directory entry"),
        }
    }

    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::manifest::{ManifestEntry, MANIFEST_FILE_NAME};
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"png").unwrap();
    }

    #[test]
    fn test_scan_options_normalize_extensions() {
        let options = ScanOptions::with_extensions([".PNG", "jpg"]);
        assert_eq!(options.extensions, vec!["png", "jpg"]);
    }

    #[test]
    fn test_missing_files_are_dropped_and_counted() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("kept.png"));

        let kept_id = Uuid::new_v4();
        let mut manifest = Manifest::new();
        manifest.assets.insert(
            "kept.png".into(),
            ManifestEntry { uuid: kept_id, tags: Default::default() },
        );
        manifest.assets.insert(
            "gone.png".into(),
            ManifestEntry { uuid: Uuid::new_v4(), tags: Default::default() },
        );
        manifest.write(dir.path()).unwrap();

        let options = ScanOptions::default();
        let (root, stats) = DirectoryReconciler::new(&options).run(dir.path()).unwrap();

        assert_eq!(root.assets().len(), 1);
        assert!(root.assets().contains_key(&kept_id));
        assert_eq!(stats.restored, 1);
        assert_eq!(stats.missing, 1);
        assert_eq!(stats.discovered, 0);
    }

    #[test]
    fn test_duplicate_ids_are_reassigned() {
        let dir = tempfile::tempdir().unwrap();
        let shared = Uuid::new_v4();

        for name in ["a", "b"] {
            let sub = dir.path().join(name);
            touch(&sub.join("x.png"));
            let mut manifest = Manifest::new();
            manifest.assets.insert(
                "x.png".into(),
                ManifestEntry { uuid: shared, tags: Default::default() },
            );
            manifest.write(&sub).unwrap();
        }

        let options = ScanOptions::default();
        let (root, stats) = DirectoryReconciler::new(&options).run(dir.path()).unwrap();

        assert_eq!(stats.reassigned, 1);
        let all = root.assets_recursive();
        assert_eq!(all.len(), 2);
        assert!(all.contains_key(&shared));
        // The copy that lost the id must be saved again
        assert_eq!(all.values().filter(|a| a.is_dirty()).count(), 1);
    }

    #[test]
    fn test_unreadable_manifest_is_counted() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.png"));
        fs::write(dir.path().join(MANIFEST_FILE_NAME), "[1, 2").unwrap();

        let options = ScanOptions::default();
        let (root, stats) = DirectoryReconciler::new(&options).run(dir.path()).unwrap();

        assert_eq!(stats.unreadable_manifests, 1);
        assert_eq!(root.assets().len(), 1);
        assert!(root.assets().values().all(Asset::is_dirty));
    }

    #[test]
    fn test_root_must_be_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.png");
        touch(&file);

        let options = ScanOptions::default();
        let err = DirectoryReconciler::new(&options).run(&file).unwrap_err();
        assert!(matches!(err, ScanError::NotADirectory { .. }));

        let err = DirectoryReconciler::new(&options)
            .run(&dir.path().join("missing"))
            .unwrap_err();
        assert!(matches!(err, ScanError::NotADirectory { .. }));
    }

    #[test]
    fn test_custom_extensions() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.png"));
        touch(&dir.path().join("b.JPG"));

        let options = ScanOptions::with_extensions(["jpg"]);
        let (root, _) = DirectoryReconciler::new(&options).run(dir.path()).unwrap();

        assert_eq!(root.assets().len(), 1);
        assert!(root.assets().values().all(|a| a.file_name() == "b.JPG"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directories_are_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("real").join("a.png"));
        std::os::unix::fs::symlink(dir.path(), dir.path().join("real").join("loop")).unwrap();

        let options = ScanOptions::default();
        let (root, _) = DirectoryReconciler::new(&options).run(dir.path()).unwrap();

        assert_eq!(root.asset_count_recursive(), 1);
        let real = &root.subdirectories()[Path::new("real")];
        assert!(real.subdirectories().is_empty());
    }
}
