//! Configuration Management
//!
//! Handles persistent client configuration. The default location is
//! `<config_dir>/jazz-client/config.yaml`; JSON files are accepted as well.

use crate::logging::LogLevel;
use crate::query::DEFAULT_REPORT_PATH;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server root, e.g. `https://jazz.example.com/`
    pub base_url: String,
    /// Login user
    pub user: String,
    /// Number of concurrent fetch workers
    pub workers: usize,
    /// Page size of list responses; a shorter page ends a listing
    pub page_size: usize,
    /// Path of the reportable REST service below the server root
    pub report_path: String,
    /// Global configuration URL sent as `Configuration-Context`
    pub configuration_context: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub log_level: LogLevel,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            user: String::new(),
            workers: 4,
            page_size: 100,
            report_path: DEFAULT_REPORT_PATH.to_string(),
            configuration_context: None,
            timeout_secs: 30,
            log_level: LogLevel::Off,
        }
    }
}

impl ClientConfig {
    /// Create a configuration for a server and user, other settings default.
    pub fn new(base_url: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user: user.into(),
            ..Self::default()
        }
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("jazz-client").join("config.yaml"))
    }

    /// Load configuration from the default location. A missing or unreadable
    /// file yields the defaults.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config file {:?}: {:#}", path, e);
                Self::default()
            }
        }
    }

    /// Load configuration from a YAML or JSON file (chosen by extension).
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config = if is_json(path) {
            serde_json::from_str(&content).context("Failed to parse JSON config")?
        } else {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?
        };
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    /// Save configuration to a YAML or JSON file (chosen by extension)
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = if is_json(path) {
            serde_json::to_string_pretty(self)?
        } else {
            serde_yaml::to_string(self)?
        };
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;

        Ok(())
    }

    /// Worker count used by the fetch pipeline (at least one).
    pub fn effective_workers(&self) -> usize {
        self.workers.max(1)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}
