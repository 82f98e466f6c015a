//! Configuration for vectorstore

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the vector store directory
    #[serde(rename = "store-path")]
    pub store_path: PathBuf,

    /// Default number of records shown by `vs list`
    #[serde(rename = "list-limit")]
    pub list_limit: usize,
}

/// Same location `vt` writes its semantic cache to by default
pub fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vetted")
        .join("vectors")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            list_limit: 50,
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            return Self::load_from_file(config_path);
        }

        let default_paths = [
            Some(PathBuf::from("vectorstore.yml")),
            dirs::config_dir().map(|p| p.join("vectorstore").join("config.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::load_from_file(path);
            }
        }

        Ok(Config::default())
    }

    fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).context(format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content).context(format!("Failed to parse config file: {}", path.display()))
    }
}
