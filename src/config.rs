//! Configuration types for reminder resolution and logging.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ReminderError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemindersConfig {
    /// Time expression resolver settings.
    pub resolver: ResolverConfig,
    /// Logging defaults for the bundled binary.
    pub logging: LoggingConfig,
}

/// Time expression resolver configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// IANA timezone used when a caller supplies none (e.g. `"Europe/London"`).
    ///
    /// `None` means untagged wall-clock values are read as UTC.
    pub default_timezone: Option<String>,
    /// Move clock times and day-part aliases that already passed today
    /// (e.g. "at 9am" asked at 14:30) to the next day.
    ///
    /// Off by default: such inputs resolve to the past instant and the
    /// caller decides what to tell the user.
    pub roll_past_times_forward: bool,
    /// Language-model fallback for text no local stage understands.
    pub fallback: FallbackConfig,
}

/// Language-model fallback configuration (OpenAI-compatible chat endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Whether the fallback is consulted at all.
    pub enabled: bool,
    /// Base URL of the endpoint (`/v1/chat/completions` is appended).
    pub api_url: String,
    /// Model identifier sent with each request.
    pub api_model: String,
    /// Name of the environment variable holding the API key, if any.
    pub api_key_env: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Upper bound on completion tokens; a timestamp needs very few.
    pub max_tokens: u32,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: "http://localhost:11434".to_owned(),
            api_model: "qwen3:4b".to_owned(),
            api_key_env: None,
            timeout_secs: 10,
            max_tokens: 32,
        }
    }
}

impl FallbackConfig {
    /// Resolve the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        let var = self.api_key_env.as_deref()?;
        std::env::var(var)
            .ok()
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "fae_reminders=info".to_owned(),
        }
    }
}

impl RemindersConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| ReminderError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ReminderError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/fae/reminders.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("fae").join("reminders.toml")
        } else if let Some(config) = dirs::config_dir() {
            config.join("fae").join("reminders.toml")
        } else {
            PathBuf::from("/tmp/fae-config/reminders.toml")
        }
    }

    /// Check values serde cannot check.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderError::Config`] for an unknown default timezone or an
    /// enabled fallback without an endpoint or model.
    pub fn validate(&self) -> Result<()> {
        if let Some(tz) = self.resolver.default_timezone.as_deref()
            && tz.trim().parse::<chrono_tz::Tz>().is_err()
        {
            return Err(ReminderError::Config(format!(
                "resolver.default_timezone is not a known IANA timezone: {tz}"
            )));
        }

        let fallback = &self.resolver.fallback;
        if fallback.enabled {
            if fallback.api_url.trim().is_empty() {
                return Err(ReminderError::Config(
                    "resolver.fallback.api_url is empty".to_owned(),
                ));
            }
            if fallback.api_model.trim().is_empty() {
                return Err(ReminderError::Config(
                    "resolver.fallback.api_model is empty".to_owned(),
                ));
            }
        }
        Ok(())
    }
}
