// Configuration module for the floor map viewer

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::constants::{
    DEFAULT_UTC_OFFSET_MINUTES, EMPHASIS_DURATION, ENTITY_UPDATE_INTERVAL, MAP_RETRY_INTERVAL,
    MARKER_COLOR, MARKER_OPACITY, MARKER_RADIUS, MARKER_SLIDE_DURATION, SEARCH_DEBOUNCE,
    SEARCH_PAGE_SIZE, ZONE_NAME_MAX_CHARS, ZONE_UPDATE_INTERVAL,
};
use crate::core::session::SessionSettings;
use crate::core::traits::MarkerStyle;

// =============================================================================
// CONFIGURATION STRUCTURES
// =============================================================================

/// Location service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Base address the endpoint paths are appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Polling cadence and interaction timing, all in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshSettings {
    #[serde(default = "default_entity_interval_ms")]
    pub entity_interval_ms: u64,
    #[serde(default = "default_zone_interval_ms")]
    pub zone_interval_ms: u64,
    /// How long a changed zone count stays highlighted
    #[serde(default = "default_emphasis_ms")]
    pub emphasis_ms: u64,
    #[serde(default = "default_marker_slide_ms")]
    pub marker_slide_ms: u64,
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
    /// Search results per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Delay before retrying a failed map list load
    #[serde(default = "default_map_retry_ms")]
    pub map_retry_ms: u64,
}

fn default_entity_interval_ms() -> u64 {
    ENTITY_UPDATE_INTERVAL.as_millis() as u64
}
fn default_zone_interval_ms() -> u64 {
    ZONE_UPDATE_INTERVAL.as_millis() as u64
}
fn default_emphasis_ms() -> u64 {
    EMPHASIS_DURATION.as_millis() as u64
}
fn default_marker_slide_ms() -> u64 {
    MARKER_SLIDE_DURATION.as_millis() as u64
}
fn default_search_debounce_ms() -> u64 {
    SEARCH_DEBOUNCE.as_millis() as u64
}
fn default_page_size() -> usize {
    SEARCH_PAGE_SIZE
}
fn default_map_retry_ms() -> u64 {
    MAP_RETRY_INTERVAL.as_millis() as u64
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            entity_interval_ms: default_entity_interval_ms(),
            zone_interval_ms: default_zone_interval_ms(),
            emphasis_ms: default_emphasis_ms(),
            marker_slide_ms: default_marker_slide_ms(),
            search_debounce_ms: default_search_debounce_ms(),
            page_size: default_page_size(),
            map_retry_ms: default_map_retry_ms(),
        }
    }
}

/// Display settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplaySettings {
    /// Offset from UTC used for every displayed timestamp
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    /// Zone names longer than this are cut and suffixed with "..."
    #[serde(default = "default_zone_name_max_chars")]
    pub zone_name_max_chars: usize,
    /// Marker color as hex string "#RRGGBB"
    #[serde(default = "default_marker_color")]
    pub marker_color: String,
    /// Marker diameter in pixels
    #[serde(default = "default_marker_radius")]
    pub marker_radius: u32,
    /// Marker opacity (0.0 = transparent, 1.0 = opaque)
    #[serde(default = "default_marker_opacity")]
    pub marker_opacity: f32,
}

fn default_utc_offset_minutes() -> i32 {
    DEFAULT_UTC_OFFSET_MINUTES
}
fn default_zone_name_max_chars() -> usize {
    ZONE_NAME_MAX_CHARS
}
fn default_marker_color() -> String {
    MARKER_COLOR.to_string()
}
fn default_marker_radius() -> u32 {
    MARKER_RADIUS
}
fn default_marker_opacity() -> f32 {
    MARKER_OPACITY
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            utc_offset_minutes: default_utc_offset_minutes(),
            zone_name_max_chars: default_zone_name_max_chars(),
            marker_color: default_marker_color(),
            marker_radius: default_marker_radius(),
            marker_opacity: default_marker_opacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Write logs to stdout
    #[serde(default = "default_console")]
    pub console: bool,
    /// Log file path (relative to the config directory or absolute). Empty = no file logging.
    #[serde(default)]
    pub log_file: String,
}

fn default_console() -> bool {
    true
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            console: default_console(),
            log_file: String::new(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ViewerConfig {
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub refresh: RefreshSettings,
    #[serde(default)]
    pub display: DisplaySettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

// =============================================================================
// CONFIG LOADING
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine config file path")]
    PathError,
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
}

impl ViewerConfig {
    pub const CONFIG_FILENAME: &'static str = "floormap_viewer.toml";

    /// Directory of the running executable
    pub fn get_exe_directory() -> Option<PathBuf> {
        std::env::current_exe()
            .ok()?
            .parent()
            .map(|p| p.to_path_buf())
    }

    /// Load configuration from `floormap_viewer.toml` next to the executable
    pub fn load_default() -> Result<Self, ConfigError> {
        let dir = Self::get_exe_directory().ok_or(ConfigError::PathError)?;
        Self::load(&dir.join(Self::CONFIG_FILENAME))
    }

    /// Load configuration from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "[config] Looking for config");

        if !path.exists() {
            debug!("[config] No config found, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: ViewerConfig = toml::from_str(&contents)?;
        info!(path = %path.display(), "[config] Loaded config");
        Ok(config)
    }

    /// Log file location, resolved against `base_dir` when relative
    pub fn log_file_path(&self, base_dir: &Path) -> Option<PathBuf> {
        if self.logging.log_file.is_empty() {
            return None;
        }
        let path = PathBuf::from(&self.logging.log_file);
        if path.is_absolute() {
            Some(path)
        } else {
            Some(base_dir.join(path))
        }
    }

    /// Session tunables derived from this configuration
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            entity_interval: Duration::from_millis(self.refresh.entity_interval_ms),
            zone_interval: Duration::from_millis(self.refresh.zone_interval_ms),
            map_retry_interval: Duration::from_millis(self.refresh.map_retry_ms),
            emphasis: Duration::from_millis(self.refresh.emphasis_ms),
            marker_slide: Duration::from_millis(self.refresh.marker_slide_ms),
            utc_offset_minutes: self.display.utc_offset_minutes,
            zone_name_max_chars: self.display.zone_name_max_chars,
            marker_style: MarkerStyle::new(
                &self.display.marker_color,
                self.display.marker_opacity,
                self.display.marker_radius,
            ),
        }
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.refresh.search_debounce_ms)
    }
}

// =============================================================================
// TESTS
// =============================================================================
