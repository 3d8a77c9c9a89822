// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 authwatch contributors

//! Configuration loading and serialization.
//!
//! TOML schema with one section per subsystem. All sections use
//! `#[serde(default)]` so a partial (or absent) config file falls back to
//! sensible defaults; the pipeline must come up even with no config at all.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration struct, deserialized from TOML.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub allowlist: AllowlistConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// General configuration: where the auth log lives.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_path")]
    pub log_path: String,
}

fn default_log_path() -> String {
    "/var/log/auth.log".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { log_path: default_log_path() }
    }
}

/// Session-history allowlist configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AllowlistConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// External command producing one session record per line.
    #[serde(default = "default_allowlist_command")]
    pub command: String,
}

fn default_true() -> bool {
    true
}

fn default_allowlist_command() -> String {
    "last -i".to_string()
}

impl Default for AllowlistConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: default_allowlist_command(),
        }
    }
}

/// Periodic snapshot broadcast configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PublishConfig {
    /// Seconds between broadcast cycles.
    #[serde(default = "default_publish_interval")]
    pub interval_secs: u64,
}

fn default_publish_interval() -> u64 {
    3
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self { interval_secs: default_publish_interval() }
    }
}

/// HTTP API server configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_bind")]
    pub bind: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

fn default_api_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8791
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_api_bind(),
            port: default_api_port(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| "Failed to parse config")?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    /// A present-but-broken config is still an error; silently ignoring a
    /// typo'd file would be worse than refusing to start.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            eprintln!("Config {} not found, using defaults", path.display());
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.general.log_path, "/var/log/auth.log");
        assert_eq!(config.allowlist.command, "last -i");
        assert!(config.allowlist.enabled);
        assert_eq!(config.publish.interval_secs, 3);
        assert!(config.api.enabled);
        assert_eq!(config.api.bind, "127.0.0.1");
        assert_eq!(config.api.port, 8791);
    }

    #[test]
    fn test_partial_section_overrides() {
        let toml_str = r#"
            [general]
            log_path = "/tmp/auth.log"

            [api]
            port = 9000
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_path, "/tmp/auth.log");
        assert_eq!(config.api.port, 9000);
        // untouched fields keep their defaults
        assert_eq!(config.api.bind, "127.0.0.1");
        assert_eq!(config.publish.interval_secs, 3);
    }

    #[test]
    fn test_allowlist_can_be_disabled() {
        let config: Config = toml::from_str("[allowlist]\nenabled = false\n").unwrap();
        assert!(!config.allowlist.enabled);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = Config::load_or_default(Path::new("/nonexistent/authwatch/config.toml")).unwrap();
        assert_eq!(config.general.log_path, "/var/log/auth.log");
    }

    #[test]
    fn test_broken_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[general\nlog_path = ").unwrap();
        assert!(Config::load_or_default(file.path()).is_err());
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let reparsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(reparsed.general.log_path, config.general.log_path);
        assert_eq!(reparsed.api.port, config.api.port);
    }
}
