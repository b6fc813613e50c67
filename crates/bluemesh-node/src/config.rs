//! TOML-based configuration for mesh nodes.

use std::path::Path;

use serde::Deserialize;

use crate::error::NodeError;

/// Top-level node configuration loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub node: NodeSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("failed to read config file: {e}")))?;
        toml::from_str(&content)
            .map_err(|e| NodeError::Config(format!("failed to parse config: {e}")))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(format!("failed to parse config: {e}")))
    }
}

/// The `[node]` section.
#[derive(Debug, Deserialize)]
pub struct NodeSection {
    /// Custom storage directory path. Defaults to `~/.bluemesh/storage`.
    pub storage_path: Option<String>,
    /// Whether to enable persistent storage. Default: true.
    #[serde(default = "default_enable_storage")]
    pub enable_storage: bool,
    /// Fixed device UUID as 32 hex characters. Generated at runtime if unset.
    pub device_uuid: Option<String>,
    /// OOB information field advertised while unprovisioned. Default: 0.
    #[serde(default)]
    pub oob_info: u16,
}

fn default_enable_storage() -> bool {
    true
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            storage_path: None,
            enable_storage: default_enable_storage(),
            device_uuid: None,
            oob_info: 0,
        }
    }
}

/// The `[logging]` section.
#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
