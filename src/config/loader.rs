//! Configuration Loader
//!
//! Resolves a [`GatewayConfig`] from JSON files and environment variables.
//! The client itself only consumes the resolved value.

use crate::config::gateway::{GatewayConfig, DEFAULT_BASE_URL};
use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "AI_GATEWAY_API_KEY";

/// Environment variable overriding the base URL
pub const BASE_URL_ENV: &str = "AI_GATEWAY_BASE_URL";

/// Environment variable pointing at an explicit config file
pub const CONFIG_PATH_ENV: &str = "CHATGATE_CONFIG";

/// On-disk configuration file shape
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    /// Raw API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Name of an environment variable holding the API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Gateway base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Configuration loader with support for multiple sources
pub struct ConfigLoader {
    config: GatewayConfig,
}

impl ConfigLoader {
    /// Load from default file locations, then apply environment overrides
    pub fn new() -> Result<Self> {
        let mut loader = Self::empty();
        loader.load_from_default_paths()?;
        loader.apply_overrides(|name| std::env::var(name).ok());
        Ok(loader)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut loader = Self::empty();
        loader.apply_overrides(|name| std::env::var(name).ok());
        loader
    }

    /// Load a specific config file, then apply environment overrides
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let mut loader = Self::empty();
        loader.load_from_file(path)?;
        loader.apply_overrides(|name| std::env::var(name).ok());
        Ok(loader)
    }

    fn empty() -> Self {
        Self {
            config: GatewayConfig::default(),
        }
    }

    /// Load configuration from default paths
    fn load_from_default_paths(&mut self) -> Result<()> {
        for path in Self::get_config_paths() {
            if path.exists() {
                self.load_from_file(&path)?;
            }
        }

        Ok(())
    }

    /// Get list of config paths to check, lowest precedence first
    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".chatgate").join("config.json"));
        }

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("chatgate").join("config.json"));
        }

        paths.push(PathBuf::from("chatgate.json"));

        if let Ok(custom_path) = std::env::var(CONFIG_PATH_ENV) {
            paths.push(PathBuf::from(custom_path));
        }

        paths
    }

    /// Load configuration from a specific file
    fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let file: FileConfig = serde_json::from_str(&content).map_err(|e| {
            GatewayError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        tracing::debug!(path = %path.display(), "loaded gateway config file");
        self.merge_file(file, |name| std::env::var(name).ok());
        Ok(())
    }

    /// Merge a file config into this one (later files override earlier)
    fn merge_file(&mut self, file: FileConfig, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = file.api_key {
            self.config.api_key = key;
        }

        if let Some(key) = file.api_key_env.as_deref().and_then(&lookup) {
            self.config.api_key = key;
        }

        if let Some(url) = file.base_url {
            self.config.base_url = url;
        }
    }

    /// Apply environment overrides on top of file values
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.config.api_key = key;
        }

        if let Some(url) = lookup(BASE_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.config.base_url = url;
        }

        if self.config.base_url.trim().is_empty() {
            self.config.base_url = DEFAULT_BASE_URL.to_string();
        }
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Take ownership of the configuration
    pub fn into_config(self) -> GatewayConfig {
        self.config
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self::from_env())
    }
}
