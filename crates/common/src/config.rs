//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Connection-watcher timing parameters.
    pub watcher: WatcherDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default timing parameters for the connection watcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherDefaults {
    /// Settle delay after adapter attach, in milliseconds. The platform
    /// enumerates freshly attached outputs asynchronously, so the first
    /// re-evaluation waits this long.
    pub settle_delay_ms: u64,

    /// Poll interval while an adapter is attached but no external output
    /// is visible yet, in milliseconds.
    pub poll_interval_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "mirrorlink=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            watcher: WatcherDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatcherDefaults {
    fn default() -> Self {
        Self {
            settle_delay_ms: 1000,
            poll_interval_ms: 2000,
        }
    }
}

impl WatcherDefaults {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("mirrorlink").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timings_match_documented_targets() {
        let defaults = WatcherDefaults::default();
        assert_eq!(defaults.settle_delay(), Duration::from_secs(1));
        assert_eq!(defaults.poll_interval(), Duration::from_secs(2));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.watcher.poll_interval_ms, config.watcher.poll_interval_ms);
        assert_eq!(parsed.logging.level, config.logging.level);
    }
}
