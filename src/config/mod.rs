//! Configuration for the Stratus CLI.
//!
//! Settings live in `~/.stratus/config.toml`. A missing file means
//! defaults; environment variables override the file so CI jobs can point
//! the CLI at another API host without touching user state.

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::logging::LogConfig;

/// Default upstream API base URL.
pub const DEFAULT_API_URL: &str = "https://api.stratus.sh";

/// Environment variable overriding the API base URL.
pub const API_URL_OVERRIDE_ENV: &str = "STRATUS_API_URL";

/// Environment variable overriding the selected team.
pub const TEAM_OVERRIDE_ENV: &str = "STRATUS_TEAM";

/// Configuration load errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// CLI configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream API base URL.
    pub api_url: String,

    /// Currently selected team, if any. Only requests issued under the
    /// current-team scope carry it; extension traffic never does.
    pub team: Option<String>,

    /// Logging settings.
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            team: None,
            log: LogConfig::default(),
        }
    }
}

/// Returns the Stratus state directory (`~/.stratus`).
#[must_use]
pub fn stratus_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".stratus"))
}

/// Returns the config file path (`~/.stratus/config.toml`).
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    stratus_dir().map(|d| d.join("config.toml"))
}

impl Config {
    /// Loads configuration from disk and applies environment overrides.
    ///
    /// A missing file yields defaults. A file that exists but cannot be
    /// read or parsed is an error: silently ignoring a broken config would
    /// send requests to the wrong host.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_path() {
            Some(path) if path.exists() => {
                let raw = fs::read_to_string(&path)?;
                toml::from_str(&raw)?
            }
            _ => Self::default(),
        };

        if let Ok(url) = std::env::var(API_URL_OVERRIDE_ENV) {
            if !url.is_empty() {
                config.api_url = url;
            }
        }
        if let Ok(team) = std::env::var(TEAM_OVERRIDE_ENV) {
            if !team.is_empty() {
                config.team = Some(team);
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_production_api() {
        let config = Config::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(config.team.is_none());
    }

    #[test]
    fn test_parses_full_config() {
        let config: Config = toml::from_str(
            r#"
            api_url = "https://api.staging.stratus.sh"
            team = "team_xyz"

            [log]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_url, "https://api.staging.stratus.sh");
        assert_eq!(config.team.as_deref(), Some("team_xyz"));
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let config: Config = toml::from_str("team = \"team_abc\"").unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.team.as_deref(), Some("team_abc"));
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(config.team.is_none());
    }
}
