use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_poll_interval_secs() -> u64 {
    1
}

fn default_poll_timeout_secs() -> u64 {
    120
}

fn default_document_url() -> String {
    "https://www.fda.gov/regulatory-information/search-fda-guidance-documents".to_string()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub assistant: AssistantConfig,
    pub document: DocumentConfig,
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistantConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub assistant_id: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocumentConfig {
    #[serde(default = "default_document_url")]
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            assistant: AssistantConfig {
                base_url: default_base_url(),
                assistant_id: String::new(),
                poll_interval_secs: default_poll_interval_secs(),
                poll_timeout_secs: default_poll_timeout_secs(),
            },
            document: DocumentConfig {
                url: default_document_url(),
            },
            window: WindowConfig {
                width: 800,
                height: 600,
                min_width: 400,
                min_height: 300,
            },
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let config_path = Self::get_config_path();

        if config_path.exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => {
                    match toml::from_str(&contents) {
                        Ok(config) => return config,
                        Err(e) => eprintln!("Error parsing config.toml: {}. Using defaults.", e),
                    }
                }
                Err(e) => eprintln!("Error reading config.toml: {}. Using defaults.", e),
            }
        } else {
            // Create config directory if it doesn't exist
            if let Some(parent) = config_path.parent() {
                let _ = fs::create_dir_all(parent);
            }
        }

        Config::default()
    }

    /// API key lookup: the environment wins, then api_keys.toml in the config
    /// directory. The key never lives in config.toml.
    pub fn load_api_key() -> Option<String> {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.trim().is_empty() {
                return Some(key);
            }
        }

        let path = Self::get_config_dir().join("api_keys.toml");
        let contents = fs::read_to_string(path).ok()?;
        let keys: HashMap<String, String> = match toml::from_str(&contents) {
            Ok(keys) => keys,
            Err(e) => {
                eprintln!("Error parsing api_keys.toml: {}", e);
                return None;
            }
        };
        keys.get("openai").cloned().filter(|k| !k.trim().is_empty())
    }

    pub fn get_config_path() -> PathBuf {
        if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home).join(".config/guidance-bar/config.toml")
        } else {
            PathBuf::from("config.toml")
        }
    }

    pub fn get_config_dir() -> PathBuf {
        if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home).join(".config/guidance-bar")
        } else {
            PathBuf::from(".")
        }
    }
}
