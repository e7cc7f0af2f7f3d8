//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Blogsearch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub search: SearchConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub debounce_ms: u64,
    pub cache_ttl_secs: u64,
    pub max_results_per_category: usize,
    pub max_recent_searches: usize,
    pub max_query_length: usize,
    /// Let user `contains` matches hit the email address as well as the name
    pub match_user_email: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            cache_ttl_secs: 5 * 60,
            max_results_per_category: 5,
            max_recent_searches: 5,
            max_query_length: 100,
            match_user_email: false,
        }
    }
}

impl ApiConfig {
    /// Base URL with the `BLOGSEARCH_API_URL` override applied
    pub fn resolved_base_url(&self) -> String {
        env::var("BLOGSEARCH_API_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.base_url.clone())
            .trim_end_matches('/')
            .to_string()
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl StorageConfig {
    /// Directory holding durable client state (recent searches)
    pub fn resolved_data_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(dirs::data_dir()
                .ok_or_else(|| anyhow!("Could not determine data directory"))?
                .join("blogsearch")),
        }
    }
}

const KEYS: &[&str] = &[
    "api.base_url",
    "api.timeout_secs",
    "search.debounce_ms",
    "search.cache_ttl_secs",
    "search.max_results_per_category",
    "search.max_recent_searches",
    "search.max_query_length",
    "search.match_user_email",
    "storage.data_dir",
];

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("BLOGSEARCH_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("blogsearch")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file, or defaults if absent
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(anyhow!("api.base_url must not be empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(anyhow!("api.timeout_secs must be positive"));
        }
        if self.search.debounce_ms > 10_000 {
            return Err(anyhow!("search.debounce_ms must be at most 10000"));
        }
        if self.search.cache_ttl_secs == 0 {
            return Err(anyhow!("search.cache_ttl_secs must be positive"));
        }
        if !(1..=50).contains(&self.search.max_results_per_category) {
            return Err(anyhow!("search.max_results_per_category must be between 1 and 50"));
        }
        if !(1..=50).contains(&self.search.max_recent_searches) {
            return Err(anyhow!("search.max_recent_searches must be between 1 and 50"));
        }
        if !(1..=1000).contains(&self.search.max_query_length) {
            return Err(anyhow!("search.max_query_length must be between 1 and 1000"));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "api.base_url" => Ok(self.api.base_url.clone()),
            "api.timeout_secs" => Ok(self.api.timeout_secs.to_string()),

            "search.debounce_ms" => Ok(self.search.debounce_ms.to_string()),
            "search.cache_ttl_secs" => Ok(self.search.cache_ttl_secs.to_string()),
            "search.max_results_per_category" => {
                Ok(self.search.max_results_per_category.to_string())
            }
            "search.max_recent_searches" => Ok(self.search.max_recent_searches.to_string()),
            "search.max_query_length" => Ok(self.search.max_query_length.to_string()),
            "search.match_user_email" => Ok(self.search.match_user_email.to_string()),

            "storage.data_dir" => Ok(self
                .storage
                .data_dir
                .as_ref()
                .map(|dir| dir.display().to_string())
                .unwrap_or_else(|| "(default)".to_string())),

            _ => Err(anyhow!("Unknown configuration key: {}", key)),
        }
    }

    /// Set a configuration value by key
    ///
    /// The value is applied to a copy and validated first; on error `self`
    /// is unchanged.
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut updated = self.clone();
        updated.apply(key, value)?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    fn apply(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "api.base_url" => {
                self.api.base_url = value.trim().to_string();
            }
            "api.timeout_secs" => {
                self.api.timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {}", value))?;
            }
            "search.debounce_ms" => {
                self.search.debounce_ms = value
                    .parse()
                    .with_context(|| format!("Invalid debounce_ms value: {}", value))?;
            }
            "search.cache_ttl_secs" => {
                self.search.cache_ttl_secs = value
                    .parse()
                    .with_context(|| format!("Invalid cache_ttl_secs value: {}", value))?;
            }
            "search.max_results_per_category" => {
                self.search.max_results_per_category = value
                    .parse()
                    .with_context(|| format!("Invalid max_results_per_category value: {}", value))?;
            }
            "search.max_recent_searches" => {
                self.search.max_recent_searches = value
                    .parse()
                    .with_context(|| format!("Invalid max_recent_searches value: {}", value))?;
            }
            "search.max_query_length" => {
                self.search.max_query_length = value
                    .parse()
                    .with_context(|| format!("Invalid max_query_length value: {}", value))?;
            }
            "search.match_user_email" => {
                self.search.match_user_email = value
                    .parse()
                    .with_context(|| format!("Invalid match_user_email value: {}", value))?;
            }
            "storage.data_dir" => {
                let value = value.trim();
                self.storage.data_dir = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            _ => {
                return Err(anyhow!("Unknown configuration key: {}", key));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        KEYS.iter()
            .map(|key| Ok((key.to_string(), self.get(key)?)))
            .collect()
    }
}
