//! CLI configuration file handling

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

fn default_sweep_interval_minutes() -> u64 {
    60
}

/// Configuration stored at `~/.config/cropflow/config.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Path to the JSON store file
    pub store_path: PathBuf,
    /// Minutes between sweep runs in `sweep --watch`
    #[serde(default = "default_sweep_interval_minutes")]
    pub sweep_interval_minutes: u64,
    /// Reject approvals with unconfirmed manual tasks
    #[serde(default)]
    pub enforce_manual_tasks: bool,
    /// Identity recorded as actor on starts and approvals
    pub operator_id: Uuid,
}

impl CliConfig {
    fn config_file() -> Result<PathBuf> {
        let base = dirs::config_dir().context("Could not determine config directory")?;
        Ok(base.join("cropflow").join("config.toml"))
    }

    fn default_store_path() -> Result<PathBuf> {
        let base = dirs::data_dir().context("Could not determine data directory")?;
        Ok(base.join("cropflow").join("farm.json"))
    }

    /// Load the config file, creating it with defaults on first run
    pub fn load_or_init() -> Result<Self> {
        let path = Self::config_file()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            return toml::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()));
        }

        let config = Self {
            store_path: Self::default_store_path()?,
            sweep_interval_minutes: default_sweep_interval_minutes(),
            enforce_manual_tasks: false,
            operator_id: Uuid::new_v4(),
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let contents = toml::to_string_pretty(&config).context("Failed to serialize config")?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_round_trip() {
        let config = CliConfig {
            store_path: PathBuf::from("/tmp/farm.json"),
            sweep_interval_minutes: 30,
            enforce_manual_tasks: true,
            operator_id: Uuid::new_v4(),
        };

        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: CliConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.store_path, config.store_path);
        assert_eq!(parsed.sweep_interval_minutes, 30);
        assert!(parsed.enforce_manual_tasks);
        assert_eq!(parsed.operator_id, config.operator_id);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let parsed: CliConfig = toml::from_str(
            "store_path = \"/tmp/farm.json\"\noperator_id = \"9f6b2a9e-8f7b-4f9a-b6e4-1c2d3e4f5a6b\"\n",
        )
        .unwrap();
        assert_eq!(parsed.sweep_interval_minutes, 60);
        assert!(!parsed.enforce_manual_tasks);
    }
}
