//! Application configuration management.
//!
//! Holds the auth service location, the request timeout, the active profile
//! and which storage backend keeps the session between runs.
//!
//! Configuration is stored at `~/.config/taskpad/config.json`.
//! `TASKPAD_AUTH_URL` and `TASKPAD_PROFILE` override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::store::{FileStore, KeyValueStore, KeyringStore};

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "taskpad";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_AUTH_BASE_URL: &str = "http://localhost:8000/auth";

/// HTTP request timeout in seconds.
/// Long enough for a slow auth server, short enough that sign-in never hangs.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

const DEFAULT_PROFILE: &str = "default";

const AUTH_URL_ENV: &str = "TASKPAD_AUTH_URL";
const PROFILE_ENV: &str = "TASKPAD_PROFILE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// JSON file in the profile's data directory
    #[default]
    File,
    /// OS keychain
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    pub auth_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub profile: Option<String>,
    #[serde(default)]
    pub storage: StorageBackend,
}

impl Config {
    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(AUTH_URL_ENV) {
            if !url.trim().is_empty() {
                self.auth_base_url = Some(url);
            }
        }
        if let Ok(profile) = std::env::var(PROFILE_ENV) {
            if !profile.trim().is_empty() {
                self.profile = Some(profile);
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn auth_base_url(&self) -> &str {
        self.auth_base_url.as_deref().unwrap_or(DEFAULT_AUTH_BASE_URL)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn profile(&self) -> &str {
        self.profile.as_deref().unwrap_or(DEFAULT_PROFILE)
    }

    /// Per-profile directory for durable session data.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME).join(self.profile()))
    }

    /// Build the storage backend selected by `storage`.
    pub fn open_store(&self) -> Result<Box<dyn KeyValueStore>> {
        let store: Box<dyn KeyValueStore> = match self.storage {
            StorageBackend::File => Box::new(FileStore::new(self.data_dir()?)),
            StorageBackend::Keyring => Box::new(KeyringStore::new(self.profile())),
        };
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.auth_base_url(), "http://localhost:8000/auth");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.profile(), "default");
        assert_eq!(config.storage, StorageBackend::File);
    }

    #[test]
    fn test_save_and_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let config = Config {
            auth_base_url: Some("https://auth.example.com".to_string()),
            request_timeout_secs: Some(3),
            profile: Some("work".to_string()),
            storage: StorageBackend::Keyring,
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.request_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_storage_parses_lowercase() {
        let config: Config = serde_json::from_str(r#"{"storage": "keyring"}"#).unwrap();
        assert_eq!(config.storage, StorageBackend::Keyring);
    }
}
