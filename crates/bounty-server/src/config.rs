use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use bounty_types::{Amount, BoardRules, Principal};

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Starting balance credited to an account when a fresh board is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAllocation {
    pub account: Principal,
    pub amount: Amount,
}

/// Top-level configuration for the bounty server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BountyConfig {
    /// Address the HTTP server listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// State directory path.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Save a snapshot after every committed mutation and load it at boot.
    #[serde(default)]
    pub persist: bool,

    /// Default log filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    #[serde(default)]
    pub rules: BoardRules,

    /// Balances credited when no snapshot exists.
    #[serde(default)]
    pub genesis: Vec<GenesisAllocation>,
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

/// `$BOUNTY_STATE_DIR`, or `.bounty` under the working directory.
pub fn default_state_dir() -> PathBuf {
    std::env::var("BOUNTY_STATE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".bounty"))
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

impl Default for BountyConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            state_dir: default_state_dir(),
            persist: false,
            log_level: default_log_level(),
            log_format: default_log_format(),
            rules: BoardRules::default(),
            genesis: Vec::new(),
        }
    }
}

impl BountyConfig {
    /// Config file path within the state directory.
    pub fn config_path(state_dir: &Path) -> PathBuf {
        state_dir.join("config.toml")
    }

    /// Load config from `<state_dir>/config.toml`. Returns default if not found.
    pub fn load(state_dir: &Path) -> Result<Self> {
        let path = Self::config_path(state_dir);
        if !path.exists() {
            return Ok(Self {
                state_dir: state_dir.to_path_buf(),
                ..Self::default()
            });
        }
        Self::load_file(&path)
    }

    /// Load config from an explicit file.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to disk.
    pub fn save(&self, state_dir: &Path) -> Result<()> {
        let path = Self::config_path(state_dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = self.to_toml()?;
        std::fs::write(&path, content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = BountyConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert!(!config.persist);
        assert_eq!(config.rules.max_score, 5);
        assert!(!config.rules.allow_self_claim);
    }

    #[test]
    fn test_missing_file_uses_defaults_in_dir() {
        let dir = tempdir().unwrap();
        let config = BountyConfig::load(dir.path()).unwrap();
        assert_eq!(config.state_dir, dir.path());
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let config = BountyConfig {
            persist: true,
            genesis: vec![GenesisAllocation {
                account: Principal::from("deployer"),
                amount: 1_000_000,
            }],
            ..BountyConfig::default()
        };
        config.save(dir.path()).unwrap();
        let loaded = BountyConfig::load(dir.path()).unwrap();
        assert!(loaded.persist);
        assert_eq!(loaded.genesis, config.genesis);
        assert_eq!(loaded.rules, config.rules);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: BountyConfig = toml::from_str(
            r#"
            log_format = "json"

            [rules]
            max_score = 10

            [[genesis]]
            account = "alice"
            amount = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.rules.max_score, 10);
        assert_eq!(config.rules.min_score, 1);
        assert_eq!(config.rules.max_description_chars, 256);
        assert_eq!(config.genesis[0].account, Principal::from("alice"));
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
    }
}
