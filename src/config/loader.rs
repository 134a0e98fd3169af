//! Configuration Loader
//!
//! Builds a [`ClientConfig`] from a `.env` file, an optional JSON config file
//! and environment overrides, later sources winning.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::timeout::parse_duration;
use crate::config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_PATH};
use crate::error::{DeepseekError, Result};

pub const API_KEY_ENV: &str = "DEEPSEEK_API_KEY";
pub const BASE_URL_ENV: &str = "DEEPSEEK_BASE_URL";
pub const CONFIG_PATH_ENV: &str = "DEEPSEEK_CONFIG_PATH";

/// On-disk configuration. Every field is optional so files can be partial.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Duration string, e.g. "90s"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

/// Configuration loader with support for multiple sources
pub struct ConfigLoader {
    config: FileConfig,
}

impl ConfigLoader {
    /// Load `.env`, the first config file found, then environment overrides
    pub fn new() -> Result<Self> {
        load_dotenv(None)?;

        let mut loader = Self {
            config: FileConfig::default(),
        };

        if let Some(path) = Self::get_config_paths().into_iter().find(|p| p.exists()) {
            loader.load_from_file(&path)?;
        }

        loader.apply_env();
        Ok(loader)
    }

    /// Load a specific config file, then environment overrides
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let mut loader = Self {
            config: FileConfig::default(),
        };

        loader.load_from_file(path)?;
        loader.apply_env();

        Ok(loader)
    }

    /// Config paths to check, in order
    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(custom_path) = std::env::var(CONFIG_PATH_ENV) {
            paths.push(PathBuf::from(custom_path));
        }

        paths.push(PathBuf::from("deepseek.json"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("deepseek").join("config.json"));
        }

        paths
    }

    fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DeepseekError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: FileConfig = serde_json::from_str(&content).map_err(|e| {
            DeepseekError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), "loaded client config file");
        self.merge_config(config);
        Ok(())
    }

    fn apply_env(&mut self) {
        self.merge_config(FileConfig {
            api_key: std::env::var(API_KEY_ENV).ok(),
            base_url: std::env::var(BASE_URL_ENV).ok(),
            path: None,
            timeout: None,
        });
    }

    /// Fields set in `other` replace ours; empty strings count as unset
    fn merge_config(&mut self, other: FileConfig) {
        fn pick(current: &mut Option<String>, new: Option<String>) {
            if let Some(value) = new.filter(|v| !v.trim().is_empty()) {
                *current = Some(value);
            }
        }

        pick(&mut self.config.api_key, other.api_key);
        pick(&mut self.config.base_url, other.base_url);
        pick(&mut self.config.path, other.path);
        pick(&mut self.config.timeout, other.timeout);
    }

    /// Get the merged sources
    pub fn config(&self) -> &FileConfig {
        &self.config
    }

    /// Resolve into a client configuration
    pub fn into_config(self) -> Result<ClientConfig> {
        let api_key = self.config.api_key.ok_or_else(|| {
            DeepseekError::Config(format!(
                "no API key found. Set {} or add \"api_key\" to deepseek.json",
                API_KEY_ENV
            ))
        })?;

        let timeout = self
            .config
            .timeout
            .as_deref()
            .map(parse_duration)
            .transpose()?;

        Ok(ClientConfig {
            api_key,
            base_url: self
                .config
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            path: self.config.path.unwrap_or_else(|| DEFAULT_PATH.to_string()),
            timeout,
        })
    }
}

/// Load a `.env` file into the environment. The working directory's file is
/// used when `path` is `None`; a missing file is not an error.
fn load_dotenv(path: Option<&Path>) -> Result<()> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };

    match loaded {
        Ok(()) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(DeepseekError::Config(format!("Failed to load .env: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn empty() -> ConfigLoader {
        ConfigLoader {
            config: FileConfig::default(),
        }
    }

    #[test]
    fn test_load_from_custom_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{
                "api_key": "sk-file",
                "base_url": "https://api.deepseek.com/beta/",
                "timeout": "90s"
            }}"#
        )
        .unwrap();

        let mut loader = empty();
        loader.load_from_file(file.path()).unwrap();

        let config = loader.into_config().unwrap();
        assert_eq!(config.api_key, "sk-file");
        assert_eq!(config.base_url, "https://api.deepseek.com/beta/");
        assert_eq!(config.path, DEFAULT_PATH);
        assert_eq!(config.timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_unreadable_file() {
        let mut loader = empty();
        let err = loader
            .load_from_file("/definitely/not/here/deepseek.json")
            .unwrap_err();
        assert!(matches!(err, DeepseekError::Config(_)));
    }

    #[test]
    fn test_malformed_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let mut loader = empty();
        assert!(loader.load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_merge_configs() {
        let mut loader = empty();
        loader.merge_config(FileConfig {
            api_key: Some("sk-first".to_string()),
            path: Some("v1/chat/completions".to_string()),
            ..Default::default()
        });
        loader.merge_config(FileConfig {
            api_key: Some("sk-second".to_string()),
            path: Some(String::new()),
            ..Default::default()
        });

        assert_eq!(loader.config().api_key.as_deref(), Some("sk-second"));
        assert_eq!(loader.config().path.as_deref(), Some("v1/chat/completions"));
    }

    #[test]
    fn test_missing_api_key() {
        let err = empty().into_config().unwrap_err();
        assert!(err.to_string().contains(API_KEY_ENV));
    }

    #[test]
    fn test_bad_timeout_in_file() {
        let mut loader = empty();
        loader.merge_config(FileConfig {
            api_key: Some("sk".to_string()),
            timeout: Some("forever".to_string()),
            ..Default::default()
        });
        assert!(loader.into_config().is_err());
    }

    #[test]
    fn test_missing_dotenv_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_dotenv(Some(dir.path().join(".env").as_path())).is_ok());
    }

    #[test]
    fn test_malformed_dotenv_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "DEEPSEEK_LOADER_TEST_BAD=\"unterminated").unwrap();

        let err = load_dotenv(Some(file.path())).unwrap_err();
        assert!(matches!(err, DeepseekError::Config(_)));
    }
}
