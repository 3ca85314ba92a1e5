use std::env;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const SHARED_SECRET: &str = "ORTY_SHARED_SECRET";
    pub const PORT: &str = "PORT";
    pub const SQLITE_PATH: &str = "SQLITE_PATH";
    pub const LLM_PROVIDER: &str = "LLM_PROVIDER";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const OPENAI_MODEL: &str = "OPENAI_MODEL";
    pub const OLLAMA_BASE_URL: &str = "OLLAMA_BASE_URL";
    pub const OLLAMA_MODEL: &str = "OLLAMA_MODEL";
    pub const BOT_HEARTBEAT_DEFAULT_SECONDS: &str = "BOT_HEARTBEAT_DEFAULT_SECONDS";
    pub const BOT_RUNNER_MAX_BOTS: &str = "BOT_RUNNER_MAX_BOTS";
}

/// Default values
pub mod defaults {
    pub const SHARED_SECRET: &str = "dev-secret";
    pub const PORT: u16 = 8080;
    pub const SQLITE_PATH: &str = "data/orty.db";
    pub const LLM_PROVIDER: &str = "openai";
    pub const OPENAI_MODEL: &str = "gpt-4o-mini";
    pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";
    pub const OLLAMA_MODEL: &str = "llama3.2";
    pub const BOT_HEARTBEAT_DEFAULT_SECONDS: u64 = 30;
    pub const BOT_RUNNER_MAX_BOTS: usize = 5;
}

#[derive(Clone)]
pub struct Config {
    pub shared_secret: String,
    pub port: u16,
    pub sqlite_path: String,
    pub llm_provider: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub ollama_base_url: String,
    pub ollama_model: String,
    /// Default heartbeat interval when a heartbeat bot config omits one
    pub bot_heartbeat_default_seconds: u64,
    /// System-wide cap on concurrently running bot tasks
    pub bot_runner_max_bots: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            shared_secret: env::var(env_vars::SHARED_SECRET)
                .unwrap_or_else(|_| defaults::SHARED_SECRET.to_string()),
            port: env::var(env_vars::PORT)
                .unwrap_or_else(|_| defaults::PORT.to_string())
                .parse()
                .expect("PORT must be a valid number"),
            sqlite_path: env::var(env_vars::SQLITE_PATH)
                .unwrap_or_else(|_| defaults::SQLITE_PATH.to_string()),
            llm_provider: env::var(env_vars::LLM_PROVIDER)
                .unwrap_or_else(|_| defaults::LLM_PROVIDER.to_string())
                .to_lowercase(),
            openai_api_key: env::var(env_vars::OPENAI_API_KEY).ok(),
            openai_model: env::var(env_vars::OPENAI_MODEL)
                .unwrap_or_else(|_| defaults::OPENAI_MODEL.to_string()),
            ollama_base_url: env::var(env_vars::OLLAMA_BASE_URL)
                .unwrap_or_else(|_| defaults::OLLAMA_BASE_URL.to_string()),
            ollama_model: env::var(env_vars::OLLAMA_MODEL)
                .unwrap_or_else(|_| defaults::OLLAMA_MODEL.to_string()),
            bot_heartbeat_default_seconds: env::var(env_vars::BOT_HEARTBEAT_DEFAULT_SECONDS)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults::BOT_HEARTBEAT_DEFAULT_SECONDS),
            bot_runner_max_bots: env::var(env_vars::BOT_RUNNER_MAX_BOTS)
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n| n >= 1)
                .unwrap_or(defaults::BOT_RUNNER_MAX_BOTS),
        }
    }
}
