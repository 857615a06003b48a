use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_BASE_URL: &str = "https://api.caiyunapp.com";
pub const DEFAULT_LANG: &str = "zh_CN";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Token baked in at build time, used when the config file has none.
pub const BUILD_TIME_TOKEN: Option<&str> = option_env!("SUNNY_WEATHER_TOKEN");

/// Upstream API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    /// Language passed to place search.
    pub lang: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            lang: DEFAULT_LANG.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Overrides the platform data directory for the saved place.
    pub data_dir: Option<PathBuf>,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [api]
/// token = "..."
/// base_url = "https://api.caiyunapp.com"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Load config from the platform location, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform location, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Where the last selected place is persisted.
    pub fn place_store_path(&self) -> Result<PathBuf> {
        let dir = match &self.storage.data_dir {
            Some(dir) => dir.clone(),
            None => project_dirs()?.data_dir().to_path_buf(),
        };

        Ok(dir.join("sunny_weather.json"))
    }

    pub fn set_api_token(&mut self, token: String) {
        self.api.token = Some(token);
    }

    /// Configured token, falling back to the build-time one.
    pub fn api_token(&self) -> Result<String> {
        self.api
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or(BUILD_TIME_TOKEN)
            .map(str::to_owned)
            .ok_or_else(|| {
                anyhow!(
                    "No API token configured.\n\
                     Hint: run `sunny configure` and enter your Caiyun API token."
                )
            })
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "sunny-weather", "sunny")
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))
}
