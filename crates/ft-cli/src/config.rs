//! Configuration loading and management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use ft_core::TrackerConfig;
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database snapshot file.
    pub database_path: PathBuf,
    /// Seconds without activity before the open session is closed.
    pub idle_timeout_secs: u64,
    /// Seconds between idle checks.
    pub heartbeat_interval_secs: u64,
    /// Quiet period before a snapshot is written, in milliseconds.
    pub save_delay_ms: u64,
    /// Workspace roots used to resolve a file's project.
    pub workspace_roots: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let tracker = TrackerConfig::default();
        Self {
            database_path: data_dir.join("ft.db"),
            idle_timeout_secs: tracker.idle_timeout.as_secs(),
            heartbeat_interval_secs: tracker.heartbeat_interval.as_secs(),
            save_delay_ms: u64::try_from(ft_db::SAVE_DELAY.as_millis()).unwrap_or(1_000),
            workspace_roots: Vec::new(),
        }
    }
}

impl Config {
    /// Loads configuration from default locations, optionally merging a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (FT_*)
        figment = figment.merge(Env::prefixed("FT_"));

        figment.extract()
    }

    /// Timing parameters for the session tracker.
    pub const fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs),
        }
    }

    pub const fn save_delay(&self) -> Duration {
        Duration::from_millis(self.save_delay_ms)
    }
}

/// Returns the platform-specific config directory for ft.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ft"))
}

/// Returns the platform-specific data directory for ft.
///
/// On Linux: `~/.local/share/ft`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("ft"))
}
