use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Looked up at the scan root.
pub const CONFIG_FILE: &str = "metagen.toml";

/// Configuration stored in metagen.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetagenConfig {
    #[serde(default)]
    pub generate: GenerateSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateSettings {
    /// Appended to a source file's stem to name its output file
    #[serde(default = "default_suffix")]
    pub suffix: String,
    /// Directory names never descended into
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    /// Comment written at the top of every output file
    #[serde(default = "default_header")]
    pub header: String,
}

impl Default for GenerateSettings {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
            exclude: default_exclude(),
            header: default_header(),
        }
    }
}

fn default_suffix() -> String {
    "_meta".to_string()
}

fn default_exclude() -> Vec<String> {
    vec!["target".to_string()]
}

fn default_header() -> String {
    "Code generated by metagen. DO NOT EDIT.".to_string()
}

impl MetagenConfig {
    /// Load `metagen.toml` from `root`, falling back to defaults when it does not exist.
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", config_path.display()))
    }
}
