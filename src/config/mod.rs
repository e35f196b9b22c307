//! Configuration and settings management.
//!
//! Settings are stored in the user's config directory as JSON; command-line
//! flags override individual values.

mod settings;

pub use settings::{
    default_path, GmailSettings, RulesSettings, Settings, SettingsError, StorageSettings,
    SETTINGS_FILE,
};
