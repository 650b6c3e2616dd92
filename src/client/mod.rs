//! Client module - location service access, headless surface, and the
//! viewer that ties them to the core session
//!
//! This module contains:
//! - Viewer: main orchestrator for session, overlay, source and surface
//! - HTTP fetcher and the background fetch dispatcher
//! - Headless logging surface
//! - Configuration loading
//! - Logging setup

pub mod config;
pub mod fetch_worker;
pub mod http;
pub mod log_surface;
pub mod logging;
pub mod viewer;

pub use config::ViewerConfig;
pub use fetch_worker::FetchDispatcher;
pub use http::HttpSnapshotFetcher;
pub use log_surface::LogSurface;
pub use viewer::Viewer;
