//! Headless floor map viewer
//!
//! Polls the location service and renders to the log. Usage:
//! `floormap-viewer [CONFIG_PATH]`; without a path the config next to the
//! executable is used.

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, info};

use floormap_viewer::client::config::ConfigError;
use floormap_viewer::client::logging::init_logging;
use floormap_viewer::client::{FetchDispatcher, HttpSnapshotFetcher, LogSurface, Viewer, ViewerConfig};

/// Pause between loop iterations
const FRAME_INTERVAL: Duration = Duration::from_millis(50);

fn load_config(path: Option<&PathBuf>) -> Result<(ViewerConfig, PathBuf), ConfigError> {
    match path {
        Some(path) => {
            let base_dir = path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default();
            Ok((ViewerConfig::load(path)?, base_dir))
        }
        None => {
            let base_dir = ViewerConfig::get_exe_directory().ok_or(ConfigError::PathError)?;
            Ok((ViewerConfig::load_default()?, base_dir))
        }
    }
}

fn main() -> ExitCode {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);

    let (config, base_dir) = match load_config(config_path.as_ref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            init_logging(true, None);
            error!(error = %e, "[MAIN] Failed to load config");
            return ExitCode::FAILURE;
        }
    };

    init_logging(config.logging.console, config.log_file_path(&base_dir));
    info!(version = env!("CARGO_PKG_VERSION"), "[MAIN] Floor map viewer starting");

    let fetcher = match HttpSnapshotFetcher::new(&config.service.base_url) {
        Ok(f) => f,
        Err(e) => {
            error!(error = %e, "[MAIN] Failed to create HTTP client");
            return ExitCode::FAILURE;
        }
    };

    let mut viewer = Viewer::new(&config, FetchDispatcher::new(fetcher), LogSurface::new());

    loop {
        viewer.update(Instant::now());
        thread::sleep(FRAME_INTERVAL);
    }
}
