//! Process-level program configuration
//!
//! Stores the registered root asset directories and the last directory the
//! user browsed to, as a small versioned JSON file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::ConfigError;

/// Name of the program config file inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Version number to keep track of breaking changes in config files
pub const CONFIG_VERSION: u32 = 1;

/// Directory name used under the platform config and cache directories
pub const APP_DIR_NAME: &str = "asset-browser";

/// Registered asset directories and browsing state
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProgramConfig {
    pub version: u32,
    /// Root asset directories, scanned at startup
    #[serde(default)]
    asset_dirs: Vec<PathBuf>,
    /// Directory the explorer was last showing
    #[serde(default)]
    last_directory: PathBuf,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            asset_dirs: Vec::new(),
            last_directory: PathBuf::new(),
        }
    }
}

impl ProgramConfig {
    /// Create a config with the given roots, skipping duplicates and
    /// overlapping directories
    pub fn new<I, P>(asset_dirs: I, last_directory: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut config = Self {
            last_directory: last_directory.into(),
            ..Self::default()
        };
        for dir in asset_dirs {
            if let Err(err) = config.add_asset_dir(dir) {
                warn!(error = %err, "Skipping asset directory");
            }
        }
        config
    }

    /// Get the directory where the config file should be stored
    ///
    /// - Linux: ~/.config/asset-browser
    /// - macOS: ~/Library/Application Support/asset-browser
    /// - Windows: %APPDATA%\asset-browser
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        let mut path = dirs::config_dir()
            .or_else(dirs::home_dir)
            .ok_or(ConfigError::NoConfigDir)?;
        path.push(APP_DIR_NAME);
        Ok(path)
    }

    pub fn asset_dirs(&self) -> &[PathBuf] {
        &self.asset_dirs
    }

    /// Register a root asset directory.
    ///
    /// Rejects a directory that is already registered, or that lies inside
    /// or contains a registered one, since its assets would be scanned twice.
    pub fn add_asset_dir(&mut self, dir: impl Into<PathBuf>) -> Result<(), ConfigError> {
        let dir = normalize(dir.into());

        for existing in &self.asset_dirs {
            if *existing == dir {
                return Err(ConfigError::DuplicateRoot(dir));
            }
            if dir.starts_with(existing) || existing.starts_with(&dir) {
                return Err(ConfigError::NestedRoot {
                    path: dir,
                    existing: existing.clone(),
                });
            }
        }

        self.asset_dirs.push(dir);
        Ok(())
    }

    /// Unregister a root. Returns `true` if it was registered.
    pub fn remove_asset_dir(&mut self, dir: impl AsRef<Path>) -> bool {
        let dir = normalize(dir.as_ref().to_path_buf());
        let before = self.asset_dirs.len();
        self.asset_dirs.retain(|existing| *existing != dir);
        self.asset_dirs.len() != before
    }

    pub fn last_directory(&self) -> &Path {
        &self.last_directory
    }

    pub fn set_last_directory(&mut self, dir: impl Into<PathBuf>) {
        self.last_directory = dir.into();
    }

    /// Load the config file from `dir`.
    ///
    /// Returns `Ok(None)` when no config has been saved yet. A version
    /// mismatch is logged and the file is loaded anyway.
    pub fn load(dir: &Path) -> Result<Option<Self>, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        info!(path = %path.display(), "Loading config");

        let config: Self = serde_json::from_str(&contents)
            .map_err(|source| ConfigError::Parse { path: path.clone(), source })?;

        if config.version != CONFIG_VERSION {
            warn!(
                found = config.version,
                expected = CONFIG_VERSION,
                "Unknown config version found, will attempt to load anyway"
            );
        }

        Ok(Some(config))
    }

    /// Load the config from `dir`, falling back to defaults when it is
    /// missing or unreadable
    pub fn load_or_default(dir: &Path) -> Self {
        match Self::load(dir) {
            Ok(Some(config)) => config,
            Ok(None) => Self::default(),
            Err(err) => {
                warn!(error = %err, "Could not load config file, using defaults");
                Self::default()
            }
        }
    }

    /// Save the config into `dir`, creating it if needed
    pub fn save(&self, dir: &Path) -> Result<PathBuf, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        info!(path = %path.display(), "Saving config");

        fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut to_write = self.clone();
        to_write.version = CONFIG_VERSION;
        let json = serde_json::to_string_pretty(&to_write)
            .map_err(|source| ConfigError::Serialize { path: path.clone(), source })?;

        fs::write(&path, json).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }
}

/// Absolute form of a root path; relative paths resolve against the
/// current directory
fn normalize(dir: PathBuf) -> PathBuf {
    std::path::absolute(&dir).unwrap_or(dir)
}
