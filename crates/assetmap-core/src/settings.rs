//! Operator settings and the theme preference.
//!
//! Settings are persisted by the backend. The theme is kept locally by a
//! [`ThemeStore`], the single owner of that preference: views read it with
//! `get`, change it with `set`, and observe it through a `watch` channel.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::SharedBackend;
use crate::config::{AppConfig, PathsConfig};
use crate::dialect::Platform;
use crate::error::{AssetMapError, Result};

/// Color theme preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    #[default]
    Dark,
    /// Follow the operating system.
    System,
}

impl ThemeMode {
    /// Light and dark swap; system becomes light.
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark | ThemeMode::System => ThemeMode::Light,
        }
    }

    /// Resolve `System` against the OS preference.
    pub fn effective(self, prefers_dark: bool) -> ThemeMode {
        match self {
            ThemeMode::System if prefers_dark => ThemeMode::Dark,
            ThemeMode::System => ThemeMode::Light,
            other => other,
        }
    }
}

/// Persisted operator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Directory exports are written to. Empty means the backend's default.
    pub export_path: String,
    pub default_platform: Platform,
    pub page_size: u32,
    pub auto_validate_api_keys: bool,
    pub theme: ThemeMode,
    /// `zh_CN` or `en_US`.
    pub language: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            export_path: String::new(),
            default_platform: Platform::Hunter,
            page_size: 20,
            auto_validate_api_keys: false,
            theme: ThemeMode::Dark,
            language: "zh_CN".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ThemeFile {
    theme: ThemeMode,
}

/// Default location of the theme file.
pub fn default_theme_path() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| AssetMapError::Config {
        message: "Could not determine the user config directory".to_string(),
    })?;
    Ok(base
        .join(AppConfig::CONFIG_DIR_NAME)
        .join(PathsConfig::THEME_FILENAME))
}

fn write_theme_file(path: &Path, theme: ThemeMode) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| AssetMapError::io_with_path(e, parent))?;
    }
    let serialized = serde_json::to_string_pretty(&ThemeFile { theme })?;
    let temp_path = path.with_extension(format!("json.{}.tmp", std::process::id()));
    {
        let mut file = File::create(&temp_path).map_err(|e| AssetMapError::io_with_path(e, &temp_path))?;
        file.write_all(serialized.as_bytes())
            .map_err(|e| AssetMapError::io_with_path(e, &temp_path))?;
        file.sync_all()
            .map_err(|e| AssetMapError::io_with_path(e, &temp_path))?;
    }
    fs::rename(&temp_path, path).map_err(|e| AssetMapError::io_with_path(e, path))?;
    Ok(())
}

/// Process-wide owner of the theme preference.
///
/// Shared through `Arc`; every clone of the `Arc` sees the same value.
#[derive(Debug)]
pub struct ThemeStore {
    path: Option<PathBuf>,
    current: Mutex<ThemeMode>,
    updates: watch::Sender<ThemeMode>,
}

impl ThemeStore {
    /// Load from `path`, falling back to the default theme when the file is
    /// missing or unreadable.
    pub fn load(path: impl Into<PathBuf>) -> Arc<Self> {
        let path = path.into();
        let theme = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<ThemeFile>(&contents) {
                Ok(file) => file.theme,
                Err(e) => {
                    warn!("Ignoring unreadable theme file {}: {}", path.display(), e);
                    ThemeMode::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ThemeMode::default(),
            Err(e) => {
                warn!("Could not read theme file {}: {}", path.display(), e);
                ThemeMode::default()
            }
        };
        debug!("Theme loaded: {:?}", theme);
        Self::build(Some(path), theme)
    }

    /// Load from the default location under the user config directory.
    pub fn load_default() -> Result<Arc<Self>> {
        Ok(Self::load(default_theme_path()?))
    }

    /// A store that never touches disk.
    pub fn in_memory(theme: ThemeMode) -> Arc<Self> {
        Self::build(None, theme)
    }

    fn build(path: Option<PathBuf>, theme: ThemeMode) -> Arc<Self> {
        let (updates, _) = watch::channel(theme);
        Arc::new(Self {
            path,
            current: Mutex::new(theme),
            updates,
        })
    }

    pub fn get(&self) -> ThemeMode {
        *self.current.lock().expect("theme lock poisoned")
    }

    /// Change the theme, persist it and notify subscribers.
    ///
    /// The in-memory value changes even if persisting fails; the error is
    /// still returned.
    pub fn set(&self, theme: ThemeMode) -> Result<()> {
        let mut current = self.current.lock().expect("theme lock poisoned");
        let previous = *current;
        *current = theme;
        if previous != theme {
            info!("Theme changed: {:?} -> {:?}", previous, theme);
            self.updates.send_replace(theme);
        }
        match &self.path {
            Some(path) => write_theme_file(path, theme),
            None => Ok(()),
        }
    }

    /// Swap light and dark. Returns the new theme.
    pub fn toggle(&self) -> Result<ThemeMode> {
        let next = self.get().toggled();
        self.set(next)?;
        Ok(next)
    }

    pub fn effective(&self, prefers_dark: bool) -> ThemeMode {
        self.get().effective(prefers_dark)
    }

    pub fn subscribe(&self) -> watch::Receiver<ThemeMode> {
        self.updates.subscribe()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Loads and saves settings through the backend.
#[derive(Clone)]
pub struct SettingsService {
    backend: SharedBackend,
    theme: Arc<ThemeStore>,
}

impl std::fmt::Debug for SettingsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsService")
            .field("theme", &self.theme.get())
            .finish_non_exhaustive()
    }
}

impl SettingsService {
    pub fn new(backend: SharedBackend, theme: Arc<ThemeStore>) -> Self {
        Self { backend, theme }
    }

    pub async fn load(&self) -> Result<Settings> {
        self.backend.get_settings().await
    }

    /// Save `settings` with the theme replaced by the store's current value.
    pub async fn save(&self, settings: &Settings) -> Result<Settings> {
        if settings.page_size == 0 {
            return Err(AssetMapError::Validation {
                field: "page_size".into(),
                message: "page size must be positive".into(),
            });
        }
        let stamped = Settings {
            theme: self.theme.get(),
            ..settings.clone()
        };
        self.backend.save_settings(&stamped).await?;
        info!("Settings saved");
        Ok(stamped)
    }

    /// Values for a form reset.
    pub fn defaults(&self) -> Settings {
        Settings {
            theme: self.theme.get(),
            ..Settings::default()
        }
    }

    pub fn theme(&self) -> &Arc<ThemeStore> {
        &self.theme
    }
}
