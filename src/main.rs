//! Headless host for the asset engine.
//!
//! Loads the program config, scans every registered asset directory in the
//! background, optionally warms the thumbnail cache, and saves manifests for
//! any directory with new or changed assets.

use asset_browser::{
    AssetDirectory, ProgramConfig, ScanOptions, ScanScheduler, ThumbnailCache, ThumbnailCacheConfig,
};
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "asset_browser=info";

/// How often the scheduler is polled for finished scans
const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(
    name = "asset-browser",
    version,
    about = "Scan asset directories and maintain their manifests"
)]
struct Cli {
    /// Directory holding config.json (defaults to the platform config directory)
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Register an asset directory and save the config
    #[arg(long = "add", value_name = "DIR")]
    add: Vec<PathBuf>,

    /// Generate thumbnails of this size for every asset found
    #[arg(long, value_name = "PIXELS")]
    thumbnail_size: Option<u32>,

    /// Directory for the thumbnail disk cache (defaults to the platform cache directory)
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

/// Result of processing one root asset directory
#[derive(Debug, Clone)]
struct RootSummary {
    path: PathBuf,
    assets: usize,
    tags: usize,
    manifests_written: usize,
    save_failures: usize,
    thumbnails: usize,
    placeholders: usize,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("asset_browser=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(summaries) => {
            for summary in &summaries {
                println!(
                    "{}: {} assets, {} tags, {} manifests written, {} save failures, \
                     {} thumbnails, {} placeholders",
                    summary.path.display(),
                    summary.assets,
                    summary.tags,
                    summary.manifests_written,
                    summary.save_failures,
                    summary.thumbnails,
                    summary.placeholders,
                );
            }
            if summaries.iter().any(|s| s.save_failures > 0) {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            error!(error = %err, "asset-browser failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<Vec<RootSummary>, Box<dyn Error>> {
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => ProgramConfig::default_dir()?,
    };
    let mut config = ProgramConfig::load_or_default(&config_dir);

    let mut changed = false;
    for dir in cli.add {
        match config.add_asset_dir(dir) {
            Ok(()) => changed = true,
            Err(err) => warn!(error = %err, "Not registering asset directory"),
        }
    }
    if changed {
        config.save(&config_dir)?;
    }

    if config.asset_dirs().is_empty() {
        info!("No asset directories registered, use --add <DIR>");
        return Ok(Vec::new());
    }

    let cache = match cli.thumbnail_size {
        Some(_) => {
            let cache_config = match cli.cache_dir {
                Some(dir) => ThumbnailCacheConfig::new(dir),
                None => ThumbnailCacheConfig::in_default_dir()
                    .ok_or("could not determine the thumbnail cache directory")?,
            };
            Some(ThumbnailCache::new(cache_config))
        }
        None => None,
    };

    let trees = scan_all(config.asset_dirs())?;

    let mut summaries = Vec::with_capacity(trees.len());
    for mut tree in trees {
        let (thumbnails, placeholders) = match (&cache, cli.thumbnail_size) {
            (Some(cache), Some(size)) => warm_thumbnails(cache, &tree, size),
            _ => (0, 0),
        };

        let report = tree.save();
        for failure in &report.failures {
            error!(error = %failure, "Manifest not saved");
        }

        summaries.push(RootSummary {
            path: tree.path().to_path_buf(),
            assets: tree.asset_count_recursive(),
            tags: tree.known_tags_recursive().len(),
            manifests_written: report.written.len(),
            save_failures: report.failures.len(),
            thumbnails,
            placeholders,
        });
    }

    Ok(summaries)
}

/// Queue every root and collect the trees as the worker finishes them
fn scan_all(roots: &[PathBuf]) -> Result<Vec<AssetDirectory>, Box<dyn Error>> {
    let scheduler = ScanScheduler::new(ScanOptions::default())?;
    for root in roots {
        scheduler.queue_scan(root);
    }

    let mut trees = Vec::with_capacity(roots.len());
    while !scheduler.is_idle() {
        if let Some(path) = scheduler.currently_scanning() {
            info!(
                path = %path.display(),
                queued = scheduler.pending_count(),
                "Scanning"
            );
        }

        match scheduler.wait_result(POLL_INTERVAL) {
            Some(Ok(tree)) => trees.push(tree),
            Some(Err(err)) => warn!(error = %err, "Skipping asset directory"),
            None if scheduler.is_stalled() => {
                error!(
                    queued = scheduler.pending_count(),
                    "Scan worker stopped, remaining directories were not scanned"
                );
                break;
            }
            None => {}
        }
    }

    Ok(trees)
}

/// Generate thumbnails for every asset in `tree`.
/// Returns (generated or cached, failed) counts.
fn warm_thumbnails(cache: &ThumbnailCache, tree: &AssetDirectory, size: u32) -> (usize, usize) {
    let mut ok = 0;
    let mut failed = 0;

    for (id, asset) in tree.assets_recursive() {
        match cache.get(id, asset.path(), size) {
            Ok(_) => ok += 1,
            Err(err) => {
                // A GUI would show a placeholder here
                warn!(error = %err, "Thumbnail unavailable");
                failed += 1;
            }
        }
    }

    (ok, failed)
}
