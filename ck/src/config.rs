//! Configuration for checkpointstore

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the checkpoint store directory
    #[serde(rename = "store-path")]
    pub store_path: PathBuf,
}

/// Shared with the `vt` default so both tools see the same threads
pub fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vetted")
        .join("checkpoints")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
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
            Some(PathBuf::from("checkpointstore.yml")),
            dirs::config_dir().map(|p| p.join("checkpointstore").join("config.yml")),
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

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_explicit_path() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("ck.yml");
        std::fs::write(&path, "store-path: /tmp/somewhere\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.store_path, PathBuf::from("/tmp/somewhere"));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("ck.yml");
        std::fs::write(&path, "{}\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.store_path, default_store_path());
    }

    #[test]
    fn test_missing_explicit_path_fails() {
        let missing = PathBuf::from("/nonexistent/ck.yml");
        assert!(Config::load(Some(&missing)).is_err());
    }
}
