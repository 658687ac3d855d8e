//! Chime configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ChimeError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChimeConfig {
    /// Where the key-value store lives. `~` is expanded.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Users that satisfy the bot-admin role bit of a rule.
    #[serde(default)]
    pub bot_admins: Vec<i64>,
    /// Prefix that introduces a command, e.g. `/` in `/weather paris`.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_data_dir() -> String { "~/.chime/data".into() }
fn default_command_prefix() -> String { "/".into() }
fn default_log_format() -> String { "pretty".into() }

impl Default for ChimeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            bot_admins: Vec::new(),
            command_prefix: default_command_prefix(),
            log_format: default_log_format(),
            scheduler: SchedulerConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl ChimeConfig {
    /// Load config from the default path (~/.chime/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ChimeError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ChimeError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Chime home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".chime")
    }

    /// Data directory with `~` expanded.
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.data_dir).to_string())
    }
}

/// Job timer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    /// How often the timer loop checks for due jobs.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
}

fn bool_true() -> bool { true }
fn default_tick_secs() -> u64 { 1 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_secs: default_tick_secs(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 { 8610 }
fn default_host() -> String { "127.0.0.1".into() }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ChimeConfig = toml::from_str(
            r#"
            bot_admins = [10001, 10002]

            [gateway]
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(config.bot_admins, vec![10001, 10002]);
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert_eq!(config.command_prefix, "/");
        assert!(config.scheduler.enabled);
        assert_eq!(config.scheduler.tick_secs, 1);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "command_prefix = \"!\"\n[gateway]\nport = 9000\n").unwrap();

        let loaded = ChimeConfig::load_from(&path).unwrap();
        assert_eq!(loaded.command_prefix, "!");
        assert_eq!(loaded.gateway.port, 9000);
        assert!(loaded.scheduler.enabled);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "bot_admins = \"nope\"").unwrap();
        assert!(matches!(
            ChimeConfig::load_from(&path),
            Err(ChimeError::Config(_))
        ));
    }
}
