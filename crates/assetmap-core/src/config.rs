//! Centralized configuration constants.
//!
//! Runtime-adjustable preferences (export path, default platform, theme) live
//! in [`crate::settings`]; this module only holds fixed parameters.

use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    /// Directory name under the platform config dir.
    pub const CONFIG_DIR_NAME: &'static str = "asset-mapping";
}

/// Export job parameters.
pub struct ExportConfig;

impl ExportConfig {
    /// Page size used when replaying a history record as an export.
    pub const HISTORY_PAGE_SIZE: u32 = 100;
    /// Page count sent for a "current results" export from the query view.
    pub const CURRENT_VIEW_PAGES: u32 = 1;
    /// Date format used for custom export ranges.
    pub const DATE_FORMAT: &'static str = "%Y-%m-%d";
}

/// Progress tracking parameters.
pub struct ProgressConfig;

impl ProgressConfig {
    /// Name of the process-wide progress channel.
    pub const EVENT_CHANNEL: &'static str = "export-progress";
    /// Delay before an auto-dismissing tracker closes after a terminal status.
    pub const AUTO_DISMISS_DELAY: Duration = Duration::from_secs(3);
    /// Percent shown while a search request is being prepared.
    pub const SEARCH_PREPARE_PERCENT: f64 = 30.0;
    /// Percent shown while a search request is in flight.
    pub const SEARCH_IN_FLIGHT_PERCENT: f64 = 60.0;
    /// Log timestamp format (local time of receipt).
    pub const LOG_TIME_FORMAT: &'static str = "%H:%M:%S";
}

/// Local IPC transport parameters.
pub struct IpcConfig;

impl IpcConfig {
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
    /// Frames larger than this are rejected (16 MiB).
    pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;
    pub const JSONRPC_VERSION: &'static str = "2.0";
}

/// Shared file names.
pub struct PathsConfig;

impl PathsConfig {
    pub const THEME_FILENAME: &'static str = "ui-theme.json";
}
