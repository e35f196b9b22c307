//! Application settings and configuration types.
//!
//! Settings are read from `settings.json` in the user's config directory
//! (`~/.config/mailrules/` or the platform equivalent) unless a path is given
//! explicitly. Every field has a default, so a partial file is valid.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::providers::email::GMAIL_API_BASE;
use crate::services::{DEFAULT_MAILBOX, DEFAULT_PAGE_SIZE};

/// File name looked up in the config directory.
pub const SETTINGS_FILE: &str = "settings.json";

/// Errors that can occur while loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level application settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Record database location.
    pub storage: StorageSettings,
    /// Gmail access configuration.
    pub gmail: GmailSettings,
    /// Rule file location.
    pub rules: RulesSettings,
}

impl Settings {
    /// Reads settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let settings = serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(path = %path.display(), "Settings loaded");
        Ok(settings)
    }

    /// Loads from `explicit` if given, otherwise from [`default_path`].
    ///
    /// A missing file at the default location yields [`Settings::default`];
    /// a missing explicit file is an error.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }
}

/// Default settings file location, if the platform has a config directory.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("io", "mailrules", "mailrules")
        .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
}

/// Record database configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite database file.
    pub database_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("mailrules.db"),
        }
    }
}

/// Gmail access configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GmailSettings {
    /// OAuth token file.
    pub token_path: PathBuf,
    /// Label whose messages are fetched.
    pub mailbox: String,
    /// Number of message ids requested per fetch.
    pub page_size: u32,
    /// Gmail API base URL.
    pub api_base: String,
    /// Overrides the token file's `token_uri` for refreshes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
}

impl Default for GmailSettings {
    fn default() -> Self {
        Self {
            token_path: PathBuf::from("token.json"),
            mailbox: DEFAULT_MAILBOX.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            api_base: GMAIL_API_BASE.to_string(),
            token_url: None,
        }
    }
}

/// Rule file configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesSettings {
    /// JSON rule file.
    pub path: PathBuf,
}

impl Default for RulesSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("action_rules").join("rules.json"),
        }
    }
}
