//! Configuration file support

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use procura_agent::{CompletionConfig, RetryConfig};
use procura_ai::{Model, Provider};
use serde::{Deserialize, Serialize};

/// Configuration for procura
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default provider
    pub provider: Option<String>,
    /// Default model to use
    pub model: Option<String>,
    /// API base URL, overriding the provider default (required for `custom`)
    pub base_url: Option<String>,
    /// Maximum tokens per completion
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Where session files are kept (defaults to the local data dir)
    pub sessions_dir: Option<PathBuf>,
    /// Retry settings for transient provider errors
    pub retry: Option<RetrySettings>,
    /// API keys (alternative to environment variables)
    pub api_keys: ApiKeys,
}

/// Retry configuration from config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

/// API key configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub google: Option<String>,
    pub openai: Option<String>,
    pub groq: Option<String>,
    pub openrouter: Option<String>,
    pub custom: Option<String>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("procura")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("PROCURA_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default path
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from a file, falling back to defaults on any problem
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to a file
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            provider: Some("google".to_string()),
            model: Some(procura_ai::models::DEFAULT_MODEL_ID.to_string()),
            max_tokens: Some(2048),
            ..Default::default()
        };

        default_config.save_to(&path)?;
        Ok(path)
    }

    /// Get API key for a provider, checking config then env
    pub fn get_api_key(&self, provider: Provider) -> Option<String> {
        let from_config = match provider {
            Provider::Google => self.api_keys.google.clone(),
            Provider::OpenAI => self.api_keys.openai.clone(),
            Provider::Groq => self.api_keys.groq.clone(),
            Provider::OpenRouter => self.api_keys.openrouter.clone(),
            Provider::Custom => self.api_keys.custom.clone(),
            Provider::Ollama => None,
        };
        if from_config.is_some() {
            return from_config;
        }

        match provider {
            // Gemini keys are often exported under either name
            Provider::Google => std::env::var("GOOGLE_API_KEY")
                .or_else(|_| std::env::var("GEMINI_API_KEY"))
                .ok(),
            _ => std::env::var(provider.api_key_env_var()?).ok(),
        }
    }

    /// Retry policy with config overrides applied
    pub fn retry_config(&self) -> RetryConfig {
        let mut retry = RetryConfig::default();
        if let Some(ref settings) = self.retry {
            if let Some(max) = settings.max_retries {
                retry.max_retries = max;
            }
            if let Some(ms) = settings.initial_delay_ms {
                retry.initial_delay = Duration::from_millis(ms);
            }
            if let Some(ms) = settings.max_delay_ms {
                retry.max_delay = Duration::from_millis(ms);
            }
        }
        retry
    }

    /// Resolve a model id, applying a base URL from flags or config
    pub fn resolve_model(
        &self,
        provider: Provider,
        model_id: &str,
        base_url: Option<&str>,
    ) -> Model {
        let mut model = procura_ai::models::resolve(provider, model_id);
        if let Some(url) = base_url.or(self.base_url.as_deref()) {
            model.base_url = url.trim().trim_end_matches('/').to_string();
        }
        model
    }

    /// Per-request timeout, if configured
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Completion settings for `model`
    pub fn completion_config(&self, model: Model, system_prompt: &str) -> CompletionConfig {
        let mut config = CompletionConfig::new(model);
        config.system_prompt = Some(system_prompt.to_string());
        if self.max_tokens.is_some() {
            config.max_tokens = self.max_tokens;
        }
        config.temperature = self.temperature;
        config.retry = self.retry_config();
        config
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# procura configuration file
# Place at ~/.config/procura/config.toml (Linux), ~/Library/Application Support/procura/config.toml (Mac)
# or %APPDATA%\procura\config.toml (Windows). PROCURA_CONFIG_PATH overrides the location.

# Default provider (google, openai, groq, openrouter, ollama, custom)
provider = "google"

# API base URL (optional; required for the custom provider, which speaks the
# OpenAI chat completions protocol)
# base_url = "http://localhost:8080/v1"

# Default model to use
model = "gemini-2.5-pro"

# Maximum tokens per completion
max_tokens = 2048

# Sampling temperature (optional)
# temperature = 0.2

# Per-request timeout in seconds (optional)
# timeout_secs = 60

# Session file directory (optional)
# sessions_dir = "/var/lib/procura/sessions"

# Retry settings for rate limits and server errors (optional)
[retry]
# max_retries = 3
# initial_delay_ms = 1000
# max_delay_ms = 30000

# API keys (optional - can also use environment variables)
# It's recommended to use environment variables instead for security
[api_keys]
# google = "..."
# openai = "sk-..."
# groq = "gsk_..."
# openrouter = "sk-or-..."
# custom = "..."
"#
}
