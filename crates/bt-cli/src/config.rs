//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use bt_core::{DayBoundary, ValidationError};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// IANA name of the zone reporting days are anchored in.
    pub timezone: String,
    /// Local hour at which a reporting day starts.
    pub day_start_hour: u32,
    /// Username commands act as when `--user` is not given.
    pub user: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("timezone", &self.timezone)
            .field("day_start_hour", &self.day_start_hour)
            .field("user", &self.user)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let boundary = DayBoundary::default();
        Self {
            database_path: data_dir.join("bt.db"),
            timezone: boundary.timezone().name().to_string(),
            day_start_hour: boundary.hour(),
            user: None,
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // BT_DATABASE_PATH, BT_TIMEZONE, BT_DAY_START_HOUR, BT_USER
        figment = figment.merge(Env::prefixed("BT_"));

        figment.extract()
    }

    /// The reporting-day boundary described by `timezone` and `day_start_hour`.
    pub fn boundary(&self) -> Result<DayBoundary, ValidationError> {
        DayBoundary::from_name(&self.timezone, self.day_start_hour)
    }
}

/// Returns the platform-specific config directory for bt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("bt"))
}

/// Returns the platform-specific data directory for bt.
///
/// On Linux: `~/.local/share/bt`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("bt"))
}
