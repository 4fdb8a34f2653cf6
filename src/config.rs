//! Configuration management for catalyst.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::Args;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inventory configuration.
    pub inventory: InventorySection,
    /// SSH configuration.
    pub ssh: SshSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Inventory configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventorySection {
    /// Path to the inventory YAML file.
    pub path: PathBuf,
}

impl Default for InventorySection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("inventory.yaml"),
        }
    }
}

/// SSH configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshSection {
    /// Seconds allowed for establishing a session.
    pub connect_timeout_secs: u64,
}

impl Default for SshSection {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
    /// Optional file that receives a copy of every log line.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(path) = std::env::var("CATALYST_INVENTORY") {
            if !path.is_empty() {
                self.inventory.path = PathBuf::from(path);
            }
        }

        if let Ok(secs) = std::env::var("CATALYST_CONNECT_TIMEOUT") {
            self.ssh.connect_timeout_secs = secs
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(secs))?;
        }

        if let Ok(level) = std::env::var("CATALYST_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }

        if let Ok(file) = std::env::var("CATALYST_LOG_FILE") {
            if !file.is_empty() {
                self.logging.file = Some(PathBuf::from(file));
            }
        }

        Ok(())
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref path) = args.inventory {
            self.inventory.path = path.clone();
        }

        if let Some(secs) = args.timeout {
            self.ssh.connect_timeout_secs = secs;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }

        if let Some(ref file) = args.log_file {
            self.logging.file = Some(file.clone());
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut config = Config::default();

        // Load from config file if specified
        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        // Apply environment variable overrides
        config.apply_env()?;

        // Apply CLI argument overrides (highest priority)
        config.apply_args(args);

        Ok(config)
    }

    /// Connect timeout as a duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.ssh.connect_timeout_secs)
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Connect timeout is not a whole number of seconds.
    InvalidTimeout(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidTimeout(value) => write!(f, "invalid connect timeout: {}", value),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ENV_VARS: [&str; 5] = [
        "CATALYST_INVENTORY",
        "CATALYST_CONNECT_TIMEOUT",
        "CATALYST_LOG_LEVEL",
        "CATALYST_LOG_FILE",
        "RUST_LOG",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.inventory.path, PathBuf::from("inventory.yaml"));
        assert_eq!(config.connect_timeout(), Duration::from_secs(30));
        assert_eq!(config.log_filter(), "info");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "inventory": { "path": "/etc/catalyst/hosts.yaml" },
            "ssh": { "connect_timeout_secs": 5 },
            "logging": { "level": "debug", "file": "/var/log/catalyst.log" }
        }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.inventory.path, PathBuf::from("/etc/catalyst/hosts.yaml"));
        assert_eq!(config.ssh.connect_timeout_secs, 5);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.logging.file,
            Some(PathBuf::from("/var/log/catalyst.log"))
        );
    }

    #[test]
    fn test_config_partial_json() {
        let json = r#"{ "ssh": { "connect_timeout_secs": 9 } }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.inventory.path, PathBuf::from("inventory.yaml")); // Default
        assert_eq!(config.ssh.connect_timeout_secs, 9);
    }

    #[test]
    fn test_config_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        let args = Args {
            inventory: Some(PathBuf::from("staging.yaml")),
            timeout: Some(3),
            log_level: Some("warn".to_string()),
            log_file: Some(PathBuf::from("run.log")),
            ..Args::default()
        };

        config.apply_args(&args);

        assert_eq!(config.inventory.path, PathBuf::from("staging.yaml"));
        assert_eq!(config.connect_timeout(), Duration::from_secs(3));
        assert_eq!(config.log_filter(), "warn");
        assert_eq!(config.logging.file, Some(PathBuf::from("run.log")));
    }

    #[test]
    #[serial]
    fn test_apply_env() {
        clear_env();
        std::env::set_var("CATALYST_INVENTORY", "env.yaml");
        std::env::set_var("CATALYST_CONNECT_TIMEOUT", "12");
        std::env::set_var("RUST_LOG", "trace");

        let mut config = Config::default();
        config.apply_env().unwrap();
        clear_env();

        assert_eq!(config.inventory.path, PathBuf::from("env.yaml"));
        assert_eq!(config.ssh.connect_timeout_secs, 12);
        assert_eq!(config.log_filter(), "trace");
    }

    #[test]
    #[serial]
    fn test_invalid_env_timeout() {
        clear_env();
        std::env::set_var("CATALYST_CONNECT_TIMEOUT", "soon");
        let result = Config::default().apply_env();
        clear_env();
        assert!(matches!(result, Err(ConfigError::InvalidTimeout(_))));
    }

    #[test]
    #[serial]
    fn test_load_priority() {
        clear_env();
        let json = r#"{ "inventory": { "path": "file.yaml" }, "logging": { "level": "error" } }"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        std::env::set_var("CATALYST_LOG_LEVEL", "warn");
        let args = Args {
            config: Some(file.path().to_path_buf()),
            inventory: Some(PathBuf::from("cli.yaml")),
            ..Args::default()
        };
        let config = Config::load(&args).unwrap();
        clear_env();

        assert_eq!(config.inventory.path, PathBuf::from("cli.yaml"));
        assert_eq!(config.log_filter(), "warn");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"connect_timeout_secs\""));
        assert!(json.contains("\"level\""));
    }
}
