//! Paths and settings.
//!
//! `AppPaths` discovers the data directory (env override first) and creates
//! the subdirectories the stores expect. `Settings` is the typed view of
//! `config.json` in the data dir, with defaults for every field so a missing
//! or partial file always yields a usable configuration.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::ChatError;

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub chat_history_dir: PathBuf,
    pub log_dir: PathBuf,
    pub users_path: PathBuf,
    pub config_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let data_dir = discover_data_dir();
        Self::at(data_dir)
    }

    /// Root all storage under an explicit directory. Tests use this with a
    /// temp dir; `new` uses the discovered data dir.
    pub fn at(data_dir: PathBuf) -> Self {
        let chat_history_dir = data_dir.join("chat_histories");
        let log_dir = data_dir.join("logs");
        let users_path = data_dir.join("users.json");
        let config_path = data_dir.join("config.json");

        for dir in [&data_dir, &chat_history_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            data_dir,
            chat_history_dir,
            log_dir,
            users_path,
            config_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_data_dir() -> PathBuf {
    if let Ok(dir) = env::var("LEGALEASE_DATA_DIR") {
        return PathBuf::from(dir);
    }

    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub llm: LlmSettings,
    pub rag: RagSettings,
    pub search: SearchSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm: LlmSettings::default(),
            rag: RagSettings::default(),
            search: SearchSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub api_key: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "gemma2-9b-it".to_string(),
            temperature: 0.2,
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retrieval_top_k: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            retrieval_top_k: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub provider: String,
    pub result_count: usize,
    pub google_api_key: String,
    pub google_engine_id: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            provider: "duckduckgo".to_string(),
            result_count: 3,
            google_api_key: String::new(),
            google_engine_id: String::new(),
        }
    }
}

impl Settings {
    pub fn load(paths: &AppPaths) -> Result<Self, ChatError> {
        Self::load_from(&paths.config_path)
    }

    fn load_from(path: &Path) -> Result<Self, ChatError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(ChatError::internal)?;
        serde_json::from_str(&contents)
            .map_err(|e| ChatError::BadRequest(format!("invalid config.json: {}", e)))
    }

    /// API key for the chat model; the environment wins over the config file.
    pub fn api_key(&self) -> String {
        env::var("GROQ_API_KEY").unwrap_or_else(|_| self.llm.api_key.clone())
    }
}
