//! Configuration settings for Studyflow.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub llm: LlmSettings,
    pub search: SearchSettings,
    pub youtube: YoutubeSettings,
    pub orchestrator: OrchestratorSettings,
    pub questions: QuestionSettings,
    pub books: BookSettings,
    pub storage: StorageSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Language the agents answer in.
    pub language: String,
    /// Education level used when a request does not name one.
    pub default_education_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.studyflow".to_string(),
            log_level: "info".to_string(),
            language: "Turkish".to_string(),
            default_education_level: "high school".to_string(),
        }
    }
}

/// Chat-completion provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Base URL of the OpenAI-compatible endpoint.
    pub api_base: String,
    /// API key (falls back to `api_key_env`).
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Model name.
    pub model: String,
    /// Sampling temperature for structured calls.
    pub temperature: f32,
    /// HTTP timeout for a single completion.
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            api_key: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.4,
            timeout_secs: 120,
        }
    }
}

/// Web search (Tavily) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub api_base: String,
    /// API key (falls back to `TAVILY_API_KEY`).
    pub api_key: Option<String>,
    /// Maximum results per query.
    pub max_results: usize,
    /// Search depth (basic, advanced).
    pub search_depth: String,
    /// Domains the book agent restricts its search to.
    pub book_domains: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.tavily.com".to_string(),
            api_key: None,
            max_results: 8,
            search_depth: "basic".to_string(),
            book_domains: vec![
                "trendyol.com".to_string(),
                "kitapyurdu.com".to_string(),
                "dr.com.tr".to_string(),
                "idefix.com".to_string(),
            ],
            timeout_secs: 30,
        }
    }
}

/// YouTube Data API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeSettings {
    /// YouTube Data API key (falls back to `YOUTUBE_API_KEY`).
    pub api_key: Option<String>,
    pub api_base: String,
    /// Default number of videos to recommend.
    pub max_results: usize,
    pub region_code: String,
    pub relevance_language: String,
    /// Appended to the topic phrase when searching for lessons.
    pub query_suffix: String,
    pub timeout_secs: u64,
}

impl Default for YoutubeSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://www.googleapis.com/youtube/v3".to_string(),
            max_results: 5,
            region_code: "TR".to_string(),
            relevance_language: "tr".to_string(),
            query_suffix: "konu anlatımı".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSettings {
    /// Per-agent timeout in seconds. 0 disables the timeout.
    pub agent_timeout_secs: u64,
    /// How many weak topics are joined into a recommendation query.
    pub max_query_topics: usize,
    /// Topics answered below this accuracy count as weak.
    pub weak_topic_threshold: f64,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            agent_timeout_secs: 90,
            max_query_topics: 3,
            weak_topic_threshold: 0.6,
        }
    }
}

impl OrchestratorSettings {
    /// The per-agent timeout, if enabled.
    pub fn agent_timeout(&self) -> Option<std::time::Duration> {
        (self.agent_timeout_secs > 0)
            .then(|| std::time::Duration::from_secs(self.agent_timeout_secs))
    }
}

/// Question generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionSettings {
    pub default_count: usize,
    pub max_count: usize,
    /// Maximum generation rounds when topping up after duplicates.
    pub max_rounds: usize,
}

impl Default for QuestionSettings {
    fn default() -> Self {
        Self {
            default_count: 5,
            max_count: 20,
            max_rounds: 3,
        }
    }
}

/// Book recommendation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookSettings {
    pub max_recommendations: usize,
    /// Prices below this are rejected as noise.
    pub min_price: f64,
    /// Prices above this are rejected as noise.
    pub max_price: f64,
    /// Appended to the topic phrase when searching bookstores.
    pub query_suffix: String,
}

impl Default for BookSettings {
    fn default() -> Self {
        Self {
            max_recommendations: 5,
            min_price: 5.0,
            max_price: 5000.0,
            query_suffix: "soru bankası kitap".to_string(),
        }
    }
}

/// Recommendation storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Persist learning-cycle recommendations.
    pub enabled: bool,
    pub sqlite_path: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sqlite_path: "~/.studyflow/learning.db".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::StudyflowError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("studyflow")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.storage.sqlite_path)
    }

    /// LLM API key from config or the configured environment variable.
    pub fn llm_api_key(&self) -> Option<String> {
        key_or_env(&self.llm.api_key, &self.llm.api_key_env)
    }

    /// Tavily API key from config or `TAVILY_API_KEY`.
    pub fn search_api_key(&self) -> Option<String> {
        key_or_env(&self.search.api_key, "TAVILY_API_KEY")
    }

    /// YouTube API key from config or `YOUTUBE_API_KEY`.
    pub fn youtube_api_key(&self) -> Option<String> {
        key_or_env(&self.youtube.api_key, "YOUTUBE_API_KEY")
    }
}

fn key_or_env(configured: &Option<String>, env_var: &str) -> Option<String> {
    configured
        .clone()
        .filter(|k| !k.trim().is_empty())
        .or_else(|| std::env::var(env_var).ok().filter(|k| !k.trim().is_empty()))
}
