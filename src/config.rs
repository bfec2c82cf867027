//! Client configuration
//!
//! Values come from built-in defaults, an optional TOML file and the
//! `VIDLINGO_API_URL` environment variable, in that order.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the service base URL
pub const API_URL_ENV: &str = "VIDLINGO_API_URL";

/// Log filter used when `RUST_LOG` is unset. Progress goes to stdout, so only warnings are logged.
pub const DEFAULT_LOG_FILTER: &str = "vidlingo=warn";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the translation service
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Request timeout in seconds, none by default since translations run long
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Target language used when none is given on the command line
    #[serde(default = "default_target_language")]
    pub default_target_language: String,
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_target_language() -> String {
    "zh-CN".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: None,
            default_target_language: default_target_language(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Write this configuration as a fresh config file, creating parent directories.
    /// An existing file is only replaced when `force` is set.
    pub fn init_file(&self, path: &Path, force: bool) -> anyhow::Result<()> {
        if path.exists() && !force {
            anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        self.to_file(path)
    }

    /// Default config location: `<config dir>/vidlingo/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("vidlingo").join("config.toml"))
    }

    /// Resolve the effective configuration.
    ///
    /// An explicit path must exist; the default location is only read if present.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(path)?,
                None => Self::default(),
            },
        };

        config.apply_env_override(std::env::var(API_URL_ENV).ok());
        Ok(config)
    }

    fn apply_env_override(&mut self, api_url: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_url = url;
        }
    }

    /// Base URL without trailing slashes
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
