//! Application settings and persistence management
//!
//! This module handles loading, saving, and managing user preferences that
//! persist between runs. Settings are read once at startup, merged with the
//! command line and then passed around by reference.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::data_structures::LanguageSelector;
use crate::error::ConfigError;

/// Whether written subtitle names embed the language code
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SuffixPolicy {
    Off,
    On,
    /// Only when more than one language produced results
    Auto,
}

/// How one candidate is picked among several
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    Manual,
    Auto,
}

/// Visibility of an optional column in the selection window
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColumnToggle {
    #[default]
    Off,
    On,
    /// Revealed when the candidate batch makes it relevant
    Auto,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ColumnSettings {
    pub language: ColumnToggle,
    pub hearing_impaired: ColumnToggle,
    pub rating: ColumnToggle,
    pub downloads: ColumnToggle,
}

/// Account used to log in; empty username and password mean anonymous
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Locale of the server messages
    pub locale: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            locale: "en".to_string(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<hidden>")
            .field("locale", &self.locale)
            .finish()
    }
}

/// Application settings that persist between runs
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub languages: Vec<String>,
    pub language_suffix: SuffixPolicy,
    pub language_separator: String,
    pub selection_mode: SelectionMode,
    pub search_by_name: bool,
    pub overwrite_existing: bool,
    pub columns: ColumnSettings,
    pub credentials: Credentials,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            languages: vec!["eng".to_string()],
            language_suffix: SuffixPolicy::Auto,
            language_separator: "_".to_string(),
            selection_mode: SelectionMode::Manual,
            search_by_name: true,
            overwrite_existing: true,
            columns: ColumnSettings::default(),
            credentials: Credentials::default(),
        }
    }
}

impl Settings {
    /// Get the path where settings are stored
    pub fn get_path() -> std::io::Result<PathBuf> {
        #[cfg(windows)]
        {
            let exe_path = std::env::current_exe()?;
            let exe_dir = exe_path.parent().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "Failed to get executable directory")
            })?;
            Ok(exe_dir.join("subfetch_settings.json"))
        }

        #[cfg(target_os = "macos")]
        {
            let home_dir = dirs::home_dir().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "Failed to get home directory")
            })?;
            let app_support = home_dir.join("Library/Application Support/subfetch");
            std::fs::create_dir_all(&app_support)?;
            Ok(app_support.join("settings.json"))
        }

        #[cfg(not(any(windows, target_os = "macos")))]
        {
            if let Ok(xdg_dirs) = xdg::BaseDirectories::new() {
                let app_dir = xdg_dirs.get_config_home().join("subfetch");
                std::fs::create_dir_all(&app_dir)?;
                Ok(app_dir.join("settings.json"))
            } else {
                let home_dir = dirs::home_dir().ok_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::NotFound, "Failed to get home directory")
                })?;
                let app_dir = home_dir.join(".subfetch");
                std::fs::create_dir_all(&app_dir)?;
                Ok(app_dir.join("settings.json"))
            }
        }
    }

    /// No settings file has been written yet
    pub fn is_first_run() -> bool {
        match Self::get_path() {
            Ok(path) => !path.exists(),
            Err(_) => false,
        }
    }

    /// Load settings from disk, writing the defaults on first run
    pub fn load() -> Self {
        let path = match Self::get_path() {
            Ok(path) => path,
            Err(e) => {
                log::warn!("Failed to get settings path: {}. Using defaults.", e);
                return Settings::default();
            }
        };

        match std::fs::read_to_string(&path) {
            Ok(content) => match Self::from_json(&content) {
                Ok(settings) => {
                    log::info!("Settings loaded from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Failed to parse settings file: {}. Using defaults.", e);
                    Settings::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let settings = Settings::default();
                match settings.save_to(&path) {
                    Ok(()) => log::info!("Default settings written to {}", path.display()),
                    Err(e) => log::warn!("Failed to write default settings: {}", e),
                }
                settings
            }
            Err(e) => {
                log::warn!("Settings file unreadable: {}. Using defaults.", e);
                Settings::default()
            }
        }
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Save settings to their default location
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::get_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::debug!("Settings saved to {}", path.display());
        Ok(())
    }

    /// The validated language priority list
    pub fn language_selector(&self) -> Result<LanguageSelector, ConfigError> {
        LanguageSelector::new(&self.languages)
    }

    /// Whether any language entry searches `code`
    pub fn uses_language(&self, code: &str) -> bool {
        self.languages.iter().any(|entry| entry.split(',').any(|c| c.trim() == code))
    }

    /// Add `code` as the lowest priority entry, or remove it from every entry
    ///
    /// Entries left without a code are dropped; the order of the others is kept.
    pub fn set_language(&mut self, code: &str, enabled: bool) {
        if enabled {
            if !self.uses_language(code) {
                self.languages.push(code.to_string());
            }
            return;
        }
        self.languages = self
            .languages
            .iter()
            .map(|entry| {
                entry
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty() && *c != code)
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .filter(|entry| !entry.is_empty())
            .collect();
    }
}
