use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::validation::validate_settings;
use crate::core::errors::RecommenderError;

const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Runtime configuration.
///
/// Resolution order: built-in defaults, then the YAML file (`config.yml` or
/// `ANIME_CONFIG_PATH`), then process environment (after `.env` is loaded).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub environment: String,
    pub enable_file_logging: bool,
    pub log_dir: PathBuf,

    pub model_name: String,
    pub embedding_model: String,
    pub embedding_batch_size: usize,

    pub chroma_dir: PathBuf,
    pub chroma_collection: String,
    pub top_k: usize,
    pub raw_csv_path: PathBuf,
    pub processed_csv_path: PathBuf,

    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub request_timeout_secs: u64,

    pub rag_mode: String,
    pub agent_max_steps: usize,

    pub cors_allow_origins: String,
    pub host: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: "local".to_string(),
            enable_file_logging: true,
            log_dir: PathBuf::from("logs"),
            model_name: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-large".to_string(),
            embedding_batch_size: 256,
            chroma_dir: PathBuf::from("chroma_db"),
            chroma_collection: "anime_collection".to_string(),
            top_k: 3,
            raw_csv_path: Path::new("data").join("anime_raw.csv"),
            processed_csv_path: Path::new("data").join("anime_processed.csv"),
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            request_timeout_secs: 120,
            rag_mode: "AGENT".to_string(),
            agent_max_steps: 25,
            cors_allow_origins: "http://localhost,http://localhost:3000,http://127.0.0.1:3000"
                .to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Settings {
    /// Loads settings for the running process.
    pub fn load() -> Result<Self, RecommenderError> {
        let _ = dotenvy::dotenv();

        let config_path = env::var("ANIME_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut settings = Self::from_yaml_file(&config_path)?;
        settings.apply_env(|key| env::var(key).ok())?;
        validate_settings(&settings)?;
        Ok(settings)
    }

    /// Reads a YAML settings file. A missing file yields the defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, RecommenderError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|e| {
            RecommenderError::Validation(format!(
                "Invalid config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Overrides fields from environment-style variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), RecommenderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = var("ENVIRONMENT") {
            self.environment = v;
        }
        if let Some(v) = var("ENABLE_FILE_LOGGING") {
            self.enable_file_logging = parse_bool("ENABLE_FILE_LOGGING", &v)?;
        }
        if let Some(v) = var("LOG_DIR") {
            self.log_dir = PathBuf::from(v);
        }
        if let Some(v) = var("MODEL_NAME") {
            self.model_name = v;
        }
        if let Some(v) = var("EMBEDDING_MODEL") {
            self.embedding_model = v;
        }
        if let Some(v) = var("EMBEDDING_BATCH_SIZE") {
            self.embedding_batch_size = parse_number("EMBEDDING_BATCH_SIZE", &v)?;
        }
        if let Some(v) = var("CHROMA_DIR") {
            self.chroma_dir = PathBuf::from(v);
        }
        if let Some(v) = var("CHROMA_COLLECTION") {
            self.chroma_collection = v;
        }
        if let Some(v) = var("TOP_K") {
            self.top_k = parse_number("TOP_K", &v)?;
        }
        if let Some(v) = var("RAW_CSV_PATH") {
            self.raw_csv_path = PathBuf::from(v);
        }
        if let Some(v) = var("PROCESSED_CSV_PATH") {
            self.processed_csv_path = PathBuf::from(v);
        }
        if let Some(v) = var("OPENAI_API_KEY") {
            self.openai_api_key = Some(v);
        }
        if let Some(v) = var("OPENAI_BASE_URL") {
            self.openai_base_url = v;
        }
        if let Some(v) = var("REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_number("REQUEST_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = var("RAG_MODE") {
            self.rag_mode = v.to_uppercase();
        }
        if let Some(v) = var("AGENT_MAX_STEPS") {
            self.agent_max_steps = parse_number("AGENT_MAX_STEPS", &v)?;
        }
        if let Some(v) = var("CORS_ALLOW_ORIGINS") {
            self.cors_allow_origins = v;
        }
        if let Some(v) = var("HOST") {
            self.host = v;
        }
        if let Some(v) = var("PORT") {
            self.port = parse_number("PORT", &v)?;
        }

        Ok(())
    }

    /// File logging only applies to local runs.
    pub fn file_logging_enabled(&self) -> bool {
        self.enable_file_logging && self.environment.eq_ignore_ascii_case("local")
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allow_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| origin.to_string())
            .collect()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, RecommenderError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(RecommenderError::Validation(format!(
            "Invalid config at '{}': expected boolean, got '{}'",
            key, raw
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, RecommenderError> {
    raw.parse::<T>().map_err(|_| {
        RecommenderError::Validation(format!(
            "Invalid config at '{}': expected integer, got '{}'",
            key, raw
        ))
    })
}
