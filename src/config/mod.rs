use crate::package::installer::{DEFAULT_CONCURRENCY, DEFAULT_DESTINATION};
use component_core::core::path::{config_file, ensure_dir};
use component_core::{ComponentError, ComponentResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory packages are installed into, as `<root>/<name>/<release>`
    #[serde(default = "default_destination_root")]
    pub destination_root: PathBuf,

    /// How many files of one package are transferred at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// GitHub remote settings
    #[serde(default)]
    pub github: GitHubConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL raw file contents are streamed from
    #[serde(default = "default_raw_url")]
    pub raw_url: String,

    /// Access token. `GITHUB_TOKEN` takes precedence when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

fn default_destination_root() -> PathBuf {
    PathBuf::from(DEFAULT_DESTINATION)
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_raw_url() -> String {
    "https://raw.githubusercontent.com".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            destination_root: default_destination_root(),
            concurrency: default_concurrency(),
            github: GitHubConfig::default(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            raw_url: default_raw_url(),
            token: None,
        }
    }
}

impl Config {
    /// Load config from the platform-specific config directory, creating the
    /// default if it doesn't exist
    ///
    /// Config locations:
    /// - Windows: %APPDATA%\component\config.yaml
    /// - Linux: ~/.config/component/config.yaml
    /// - macOS: ~/Library/Application Support/component/config.yaml
    pub fn load() -> ComponentResult<Self> {
        let config_path = config_file()?;

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            config
        };

        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            if !token.is_empty() {
                config.github.token = Some(token);
            }
        }

        Ok(config)
    }

    /// Read a config file
    pub fn load_from(path: &Path) -> ComponentResult<Self> {
        let content = fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| ComponentError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Write this config to `path`, creating its directory
    pub fn save_to(&self, path: &Path) -> ComponentResult<()> {
        let config_dir = path
            .parent()
            .ok_or_else(|| ComponentError::Path("Invalid config path".to_string()))?;
        ensure_dir(config_dir)?;

        let content = serde_yaml::to_string(self)
            .map_err(|e| ComponentError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)?;
        Ok(())
    }
}
