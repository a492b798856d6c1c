//! Configuration for the benchmark harness.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.

use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// LLM configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL for the LLM API (e.g., "https://api.openai.com")
    pub api_base: String,

    /// API key for authentication
    pub api_key: String,

    /// Model used to answer questions.
    pub answer_model: String,

    /// Model used to judge answers. Falls back to the answer model.
    #[serde(default)]
    pub judge_model: Option<String>,

    /// Maximum tokens for response (optional)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature for answer generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.5
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            api_key: String::new(),
            answer_model: "Qwen/Qwen3-14B".to_string(),
            judge_model: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// The model used for judge calls.
    pub fn judge_model(&self) -> &str {
        self.judge_model.as_deref().unwrap_or(&self.answer_model)
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM settings
    pub llm: LlmConfig,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    llm: Option<LlmFileSection>,
}

#[derive(Debug, Deserialize)]
struct LlmFileSection {
    api_base: Option<String>,
    api_key: Option<String>,
    answer_model: Option<String>,
    judge_model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (LLM_API_BASE, LLM_API_KEY, ANSWER_MODEL, JUDGE_MODEL)
    /// 2. Config file (~/.config/prospectus-bench/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        // Try to load from config file first
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        // Override with environment variables
        if let Ok(api_base) = env::var("LLM_API_BASE") {
            config.llm.api_base = api_base;
        }

        if let Ok(api_key) = env::var("LLM_API_KEY") {
            config.llm.api_key = api_key;
        }

        if let Ok(model) = env::var("ANSWER_MODEL") {
            config.llm.answer_model = model;
        }

        if let Ok(model) = env::var("JUDGE_MODEL") {
            config.llm.judge_model = Some(model);
        }

        if let Ok(max_tokens) = env::var("LLM_MAX_TOKENS") {
            if let Ok(tokens) = max_tokens.parse() {
                config.llm.max_tokens = tokens;
            }
        }

        if let Ok(temperature) = env::var("LLM_TEMPERATURE") {
            if let Ok(temp) = temperature.parse() {
                config.llm.temperature = temp;
            }
        }

        if let Ok(timeout) = env::var("LLM_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                config.llm.timeout_secs = secs;
            }
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;

        let file_config: ConfigFile = serde_yaml::from_str(&content)
            .map_err(|e| BenchError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(llm) = file_config.llm {
            if let Some(api_base) = llm.api_base {
                config.llm.api_base = api_base;
            }
            if let Some(api_key) = llm.api_key {
                config.llm.api_key = api_key;
            }
            if let Some(model) = llm.answer_model {
                config.llm.answer_model = model;
            }
            if llm.judge_model.is_some() {
                config.llm.judge_model = llm.judge_model;
            }
            if let Some(max_tokens) = llm.max_tokens {
                config.llm.max_tokens = max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                config.llm.temperature = temperature;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                config.llm.timeout_secs = timeout_secs;
            }
        }

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "prospectus-bench")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that required configuration is present.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_base.is_empty() {
            return Err(BenchError::Config(
                "LLM API base URL is required. Set LLM_API_BASE environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.api_key.is_empty() {
            return Err(BenchError::Config(
                "LLM API key is required. Set LLM_API_KEY environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.answer_model.is_empty() {
            return Err(BenchError::Config(
                "Answer model is required. Set ANSWER_MODEL environment variable or add to config file."
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Create a config from explicit values (useful for testing).
    pub fn with_llm(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        answer_model: impl Into<String>,
    ) -> Self {
        Self {
            llm: LlmConfig {
                api_base: api_base.into(),
                api_key: api_key.into(),
                answer_model: answer_model.into(),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.llm.api_base.is_empty());
        assert!(config.llm.api_key.is_empty());
        assert_eq!(config.llm.answer_model, "Qwen/Qwen3-14B");
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.llm.temperature, 0.5);
    }

    #[test]
    fn test_judge_model_falls_back_to_answer_model() {
        let mut config = Config::with_llm("https://api.example.com", "key", "answer-model");
        assert_eq!(config.llm.judge_model(), "answer-model");

        config.llm.judge_model = Some("judge-model".to_string());
        assert_eq!(config.llm.judge_model(), "judge-model");
    }

    #[test]
    fn test_validate_fails_without_required_fields() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_llm() {
        let config = Config::with_llm("https://api.example.com", "test-key", "gpt-4");
        assert_eq!(config.llm.api_base, "https://api.example.com");
        assert_eq!(config.llm.api_key, "test-key");
        assert_eq!(config.llm.answer_model, "gpt-4");
    }
}
