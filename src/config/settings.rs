use anyhow::Result;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub llm: LLMSettings,
    pub game: GameSettings,
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub search: SearchSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMSettings {
    pub max_tokens: u32,
    pub temperature: f32,
    /// Temperature for generated questions; kept low for determinism
    pub question_temperature: f32,
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSettings {
    pub max_questions: u32,
    pub max_hints: u32,
    pub turn_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite path, or ":memory:" for the in-process store
    pub database_path: String,
    pub purge_after_mins: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    pub enabled: bool,
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());

        let config = Self::defaults()?
            .add_source(File::with_name(&format!("config/{}", config_env)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("llm.max_tokens", 256)?
            .set_default("llm.temperature", 0.3)?
            .set_default("llm.question_temperature", 0.05)?
            .set_default("llm.request_timeout_secs", 8)?
            .set_default("llm.max_attempts", 3)?
            .set_default("llm.base_delay_ms", 1000)?
            .set_default("game.max_questions", 20)?
            .set_default("game.max_hints", 3)?
            .set_default("game.turn_timeout_secs", 45)?
            .set_default("server.bind_addr", "127.0.0.1:8080")?
            .set_default("storage.database_path", "twentyq.db")?
            .set_default("storage.purge_after_mins", 60 * 24)?
            .set_default("search.enabled", true)?
            .set_default("search.endpoint", "https://api.search.brave.com/res/v1/web/search")?
            .set_default("logging.level", "info")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.request_timeout_secs)
    }

    pub fn turn_timeout(&self) -> Duration {
        Duration::from_secs(self.game.turn_timeout_secs)
    }

    /// Search credential, independent of any LLM credential.
    pub fn search_api_key() -> Option<String> {
        env::var("SEARCH_API_KEY").ok().filter(|k| !k.trim().is_empty())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm: LLMSettings {
                max_tokens: 256,
                temperature: 0.3,
                question_temperature: 0.05,
                request_timeout_secs: 8,
                max_attempts: 3,
                base_delay_ms: 1000,
            },
            game: GameSettings {
                max_questions: 20,
                max_hints: 3,
                turn_timeout_secs: 45,
            },
            server: ServerSettings {
                bind_addr: "127.0.0.1:8080".to_string(),
            },
            storage: StorageSettings {
                database_path: "twentyq.db".to_string(),
                purge_after_mins: 60 * 24,
            },
            search: SearchSettings {
                enabled: true,
                endpoint: "https://api.search.brave.com/res/v1/web/search".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}
