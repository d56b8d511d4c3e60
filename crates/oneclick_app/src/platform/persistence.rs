use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use engine_logging::{engine_info, engine_warn};
use oneclick_core::{BackendEndpoints, Settings, Theme};
use oneclick_engine::AtomicFileWriter;
use serde::{Deserialize, Serialize};

/// Where user preferences live. Loaded once at start, saved on every change.
pub trait SettingsStore {
    /// Never fails: unreadable or malformed settings fall back to defaults.
    fn load(&self) -> Settings;
    fn save(&self, settings: &Settings) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
enum PersistedTheme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedSettings {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    theme: PersistedTheme,
    #[serde(default)]
    backend_url: Option<String>,
}

impl From<&Settings> for PersistedSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            username: settings.username.clone(),
            theme: match settings.theme {
                Theme::Light => PersistedTheme::Light,
                Theme::Dark => PersistedTheme::Dark,
            },
            backend_url: Some(settings.backend.base().to_string()),
        }
    }
}

impl PersistedSettings {
    fn into_settings(self, origin: &Path) -> Settings {
        let backend = match self.backend_url.as_deref().map(BackendEndpoints::parse) {
            Some(Ok(backend)) => backend,
            Some(Err(err)) => {
                engine_warn!("Ignoring backend url in {:?}: {}", origin, err);
                BackendEndpoints::default()
            }
            None => BackendEndpoints::default(),
        };
        Settings {
            username: self.username.filter(|name| !name.trim().is_empty()),
            theme: match self.theme {
                PersistedTheme::Light => Theme::Light,
                PersistedTheme::Dark => Theme::Dark,
            },
            backend,
        }
    }
}

/// Settings kept as a RON file.
pub struct RonSettingsStore {
    path: PathBuf,
}

impl RonSettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SettingsStore for RonSettingsStore {
    fn load(&self) -> Settings {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Settings::default();
            }
            Err(err) => {
                engine_warn!("Failed to read settings from {:?}: {}", self.path, err);
                return Settings::default();
            }
        };

        let persisted: PersistedSettings = match ron::from_str(&content) {
            Ok(persisted) => persisted,
            Err(err) => {
                engine_warn!("Failed to parse settings from {:?}: {}", self.path, err);
                return Settings::default();
            }
        };

        engine_info!("Loaded settings from {:?}", self.path);
        persisted.into_settings(&self.path)
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        let file_name = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("settings path {:?} has no file name", self.path))?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(&PersistedSettings::from(settings), pretty)
            .context("serialize settings")?;
        AtomicFileWriter::new(dir)
            .write(file_name, content.as_bytes())
            .with_context(|| format!("write settings to {:?}", self.path))?;
        engine_info!("Saved settings to {:?}", self.path);
        Ok(())
    }
}
