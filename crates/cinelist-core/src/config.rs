//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the backend address, request timeout, which credential
//! store to use, and the last used username.
//!
//! Configuration is stored at `~/.config/cinelist/config.json`. The backend
//! address can be overridden with the `CINELIST_BACKEND_URL` environment
//! variable.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "cinelist";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable that overrides the backend address
pub const BACKEND_URL_ENV: &str = "CINELIST_BACKEND_URL";

/// Backend used when neither the environment nor the config file names one
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Which backend holds the access/refresh token pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenStoreKind {
    #[default]
    Keyring,
    File,
}

impl std::str::FromStr for TokenStoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "keyring" => Ok(Self::Keyring),
            "file" => Ok(Self::File),
            other => Err(anyhow::anyhow!("Unknown token store: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub backend_url: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub token_store: TokenStoreKind,
    #[serde(default)]
    pub last_username: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the file-backed token store.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Backend address: environment first, then config file, then the local default.
    pub fn backend_url(&self) -> String {
        let env_value = std::env::var(BACKEND_URL_ENV).ok();
        Self::resolve_backend_url(env_value.as_deref(), self.backend_url.as_deref())
    }

    fn resolve_backend_url(env_value: Option<&str>, file_value: Option<&str>) -> String {
        env_value
            .filter(|v| !v.trim().is_empty())
            .or(file_value.filter(|v| !v.trim().is_empty()))
            .unwrap_or(DEFAULT_BACKEND_URL)
            .trim()
            .trim_end_matches('/')
            .to_string()
    }

    /// Base address every API path is relative to (`<backend>/api`).
    pub fn api_base_url(&self) -> String {
        format!("{}/api", self.backend_url())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }
}
