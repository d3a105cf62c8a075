use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub model: String,
    pub api_base: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub web_search: bool,
    pub conversation_cache_capacity: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig {
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            temperature: 0.4,
            top_k: 10,
            top_p: 0.9,
            web_search: true,
            conversation_cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl AiConfig {
    /// Fills an empty key from `GEMINI_API_KEY`, then `API_KEY`.
    fn apply_env(&mut self) {
        if self.api_key.as_ref().map_or(true, |key| key.is_empty()) {
            self.api_key = std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("API_KEY"))
                .ok()
                .filter(|key| !key.is_empty());
        }
    }
}

impl Config {
    pub fn default_data_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calmly")
    }

    /// Loads `config.json` from the data directory, writing defaults when it is
    /// missing, empty or unreadable.
    pub fn new(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.unwrap_or_else(Self::default_data_dir);

        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        let config_path = Self::config_path(&data_dir);

        if config_path.exists() {
            let config_str =
                std::fs::read_to_string(&config_path).context("Failed to read config.json")?;

            if config_str.trim().is_empty() {
                warn!("Config file is empty, recreating defaults");
            } else {
                match serde_json::from_str::<Config>(&config_str) {
                    Ok(mut config) => {
                        config.data_dir = data_dir;
                        config.ai.apply_env();
                        return Ok(config);
                    }
                    Err(e) => {
                        warn!("Failed to parse existing config.json, recreating defaults: {}", e);
                    }
                }
            }
        }

        // Saved before the env lookup so keys from the environment never hit disk.
        let mut config = Self::default_config(data_dir);
        config.save()?;
        info!("Wrote default config to {}", config_path.display());

        config.ai.apply_env();
        Ok(config)
    }

    /// Defaults with no file behind them.
    pub fn ephemeral(data_dir: PathBuf) -> Self {
        let mut config = Self::default_config(data_dir);
        config.ai.apply_env();
        config
    }

    fn default_config(data_dir: PathBuf) -> Self {
        Config {
            data_dir,
            ai: AiConfig::default(),
        }
    }

    fn config_path(data_dir: &Path) -> PathBuf {
        data_dir.join("config.json")
    }

    pub fn save(&self) -> Result<()> {
        let json_str = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(Self::config_path(&self.data_dir), json_str)
            .context("Failed to write config.json")?;
        Ok(())
    }

    pub fn store_file(&self) -> PathBuf {
        self.data_dir.join("store.json")
    }
}
