//! Typed startup settings (§6.4). Read once at process start after [`crate::load_and_apply`].

use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("missing required environment variable: {0}")]
    MissingRequired(&'static str),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Ollama,
}

impl FromStr for LlmProvider {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            _ => Err(SettingsError::InvalidValue {
                key: "LLM_PROVIDER",
                value: s.to_string(),
            }),
        }
    }
}

/// Process-wide configuration resolved from environment variables (§6.4).
#[derive(Clone, Debug)]
pub struct Settings {
    pub llm_provider: LlmProvider,
    pub small_model: String,
    pub large_model: String,
    pub embedding_model: String,
    pub image_provider: Option<String>,
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub corpus_dir: String,
    pub max_parallel_agents: usize,
    pub request_timeout_secs: u64,
    pub embedding_batch_size: usize,
}

fn env_var(key: &'static str) -> Result<String, SettingsError> {
    std::env::var(key).map_err(|_| SettingsError::MissingRequired(key))
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed_or<T: FromStr>(key: &'static str, default: T) -> Result<T, SettingsError> {
    match std::env::var(key) {
        Ok(v) => v.parse().map_err(|_| SettingsError::InvalidValue {
            key,
            value: v,
        }),
        Err(_) => Ok(default),
    }
}

impl Settings {
    /// Reads settings from the current process environment. Fails fast if a
    /// required key (`LLM_PROVIDER`, the matching model names) is absent.
    pub fn from_env() -> Result<Self, SettingsError> {
        let llm_provider = env_var("LLM_PROVIDER")?.parse()?;
        let small_model = env_var("SMALL_MODEL")?;
        let large_model = env_var("LARGE_MODEL")?;
        let embedding_model = env_var_or("EMBEDDING_MODEL", &small_model);

        Ok(Settings {
            llm_provider,
            small_model,
            large_model,
            embedding_model,
            image_provider: std::env::var("IMAGE_PROVIDER").ok(),
            host: env_var_or("HOST", "127.0.0.1"),
            port: env_parsed_or("PORT", 8080u16)?,
            database_url: std::env::var("DATABASE_URL").ok(),
            corpus_dir: env_var_or("CORPUS_DIR", "./corpora"),
            max_parallel_agents: env_parsed_or("MAX_PARALLEL_AGENTS", 1usize)?,
            request_timeout_secs: env_parsed_or("REQUEST_TIMEOUT_SECS", 300u64)?,
            embedding_batch_size: env_parsed_or("EMBEDDING_BATCH_SIZE", 16usize)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear() {
        for k in [
            "LLM_PROVIDER",
            "SMALL_MODEL",
            "LARGE_MODEL",
            "EMBEDDING_MODEL",
            "PORT",
            "MAX_PARALLEL_AGENTS",
        ] {
            env::remove_var(k);
        }
    }

    #[test]
    fn missing_llm_provider_is_an_error() {
        let _g = ENV_LOCK.lock().unwrap();
        clear();
        let err = Settings::from_env().unwrap_err();
        assert!(matches!(err, SettingsError::MissingRequired("LLM_PROVIDER")));
    }

    #[test]
    fn defaults_are_applied_when_optional_keys_absent() {
        let _g = ENV_LOCK.lock().unwrap();
        clear();
        env::set_var("LLM_PROVIDER", "openai");
        env::set_var("SMALL_MODEL", "gpt-4o-mini");
        env::set_var("LARGE_MODEL", "gpt-4o");
        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.max_parallel_agents, 1);
        assert_eq!(settings.embedding_model, "gpt-4o-mini");
        clear();
    }

    #[test]
    fn unknown_provider_is_invalid() {
        let _g = ENV_LOCK.lock().unwrap();
        clear();
        env::set_var("LLM_PROVIDER", "bogus");
        env::set_var("SMALL_MODEL", "x");
        env::set_var("LARGE_MODEL", "y");
        let err = Settings::from_env().unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { .. }));
        clear();
    }
}
