//! BiteMatch configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main BiteMatch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// AI provider configuration
    pub provider: ProviderConfig,

    /// Freemium limit constants
    pub limits: LimitsConfig,

    /// Local storage configuration
    pub storage: StorageConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.provider.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "AI provider API key not found. Set the {} environment variable.",
                self.provider.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .bitematch.yml
        let local_config = PathBuf::from(".bitematch.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/bitematch/bitematch.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("bitematch").join("bitematch.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// AI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider name (currently only "gemini" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-output-tokens")]
    pub max_output_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            max_output_tokens: 2048,
            timeout_ms: 120_000,
        }
    }
}

/// Freemium limit constants
///
/// The trial length is fixed at account creation; the remaining values
/// are the ceilings that apply once the trial is over.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Trial length in days from first launch
    #[serde(rename = "trial-days")]
    pub trial_days: u32,

    /// Requests per day after the trial ends
    #[serde(rename = "daily-limit")]
    pub post_trial_daily_limit: u32,

    /// History entries visible after the trial ends
    #[serde(rename = "history-limit")]
    pub free_history_limit: u32,

    /// Follow-ups per recommendation after the trial ends
    #[serde(rename = "follow-up-limit")]
    pub free_follow_up_limit: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            trial_days: 14,
            post_trial_daily_limit: 3,
            free_history_limit: 5,
            free_follow_up_limit: 1,
        }
    }
}

/// Local storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the key/value store
    #[serde(rename = "data-dir")]
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/bitematch on Linux)
        let data_dir = dirs::data_dir()
            .map(|d| d.join("bitematch"))
            .unwrap_or_else(|| PathBuf::from(".bitematch"))
            .to_string_lossy()
            .into_owned();

        Self { data_dir }
    }
}
