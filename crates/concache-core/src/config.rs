//! Application configuration management.
//!
//! Configuration is stored at `<config_dir>/concache/config.json`. The
//! convention id and API base URL can be overridden from the environment
//! (`CONCACHE_CID`, `CONCACHE_API_URL`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheOptions, DEFAULT_REMINDER_LEAD_MINUTES};
use crate::storage::{validate_key, StorageKind};

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "concache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_CONVENTION_ID: &str = "CONCACHE_CID";
pub const ENV_API_URL: &str = "CONCACHE_API_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub convention_id: Option<String>,
    pub api_base_url: Option<String>,
    pub storage: StorageKind,
    pub reminder_lead_minutes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            convention_id: None,
            api_base_url: None,
            storage: StorageKind::default(),
            reminder_lead_minutes: DEFAULT_REMINDER_LEAD_MINUTES,
            cache_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Invalid config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply `CONCACHE_CID` / `CONCACHE_API_URL` when set
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_CONVENTION_ID).ok(),
            std::env::var(ENV_API_URL).ok(),
        );
    }

    pub fn apply_overrides(&mut self, convention_id: Option<String>, api_base_url: Option<String>) {
        if let Some(cid) = convention_id.filter(|s| !s.trim().is_empty()) {
            self.convention_id = Some(cid);
        }
        if let Some(url) = api_base_url.filter(|s| !s.trim().is_empty()) {
            self.api_base_url = Some(url);
        }
    }

    /// The configured convention id. It names the cache directory, so it
    /// must be a plain path segment.
    pub fn convention_id(&self) -> Result<&str> {
        let cid = self
            .convention_id
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No convention configured (set convention_id or {})", ENV_CONVENTION_ID))?;
        validate_key(cid).with_context(|| format!("Invalid convention id {cid:?}"))?;
        Ok(cid)
    }

    pub fn api_base_url(&self) -> Result<&str> {
        self.api_base_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No API base URL configured (set api_base_url or {})", ENV_API_URL))
    }

    /// Per-convention cache directory
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME).join(self.convention_id()?))
    }

    pub fn cache_options(&self) -> Result<CacheOptions> {
        let mut options = CacheOptions::new(self.convention_id()?);
        options.reminder_lead = Duration::minutes(self.reminder_lead_minutes.max(0));
        Ok(options)
    }
}
