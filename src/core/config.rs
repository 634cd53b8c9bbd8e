//! Configuration management for Specflow.
//!
//! Handles loading and saving configuration from TOML files.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Name of the project-local config file.
pub const LOCAL_CONFIG_FILE: &str = ".specflow.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Text generation settings
    pub generation: GenerationConfig,

    /// Retry policy for transient provider failures
    pub retry: RetryPolicyConfig,

    /// Where the CLI keeps session state
    pub session: SessionConfig,

    /// Document export settings
    pub export: ExportConfig,
}

/// Which text generation backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Anthropic Messages API
    #[default]
    Claude,
    /// Local Ollama server
    Ollama,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Claude => write!(f, "claude"),
            Provider::Ollama => write!(f, "ollama"),
        }
    }
}

/// Text generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Backend (claude, ollama)
    pub provider: Provider,

    /// Model override for the Claude backend
    pub model: Option<String>,

    /// Maximum tokens per generated document
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Seconds before a generation call is abandoned
    pub timeout_secs: u64,

    /// Ollama-specific settings
    pub ollama: OllamaConfig,
}

/// Ollama configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama server URL, falls back to `OLLAMA_HOST`
    pub base_url: Option<String>,

    /// Model to use, falls back to `OLLAMA_MODEL`
    pub model: Option<String>,
}

/// Retry policy for transient provider failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicyConfig {
    /// Retries after the first attempt (0 disables retrying)
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay
    pub max_delay_ms: u64,

    /// Randomize delays slightly
    pub jitter: bool,
}

/// Session storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory holding `session.json`
    pub dir: PathBuf,
}

/// Document export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Output directory
    pub dir: PathBuf,

    /// Render JSON task lists as Markdown
    pub render_tasks: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Claude,
            model: None,
            max_tokens: 4000,
            temperature: 0.7,
            timeout_secs: 60,
            ollama: OllamaConfig::default(),
        }
    }
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self { max_attempts: 3, initial_delay_ms: 1000, max_delay_ms: 30_000, jitter: true }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from(".specflow") }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("spec"), render_tasks: true }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.specflow.toml` in current directory
    /// 2. `~/.config/specflow/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        match Self::locate() {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Path of the config file [`Config::load`] would read, if any exists.
    pub fn locate() -> Option<PathBuf> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        Self::global_path().filter(|path| path.exists())
    }

    /// Location of the global config file.
    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("specflow").join("config.toml"))
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Save configuration to the global config file.
    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let path = Self::global_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, self.to_toml()?)?;

        Ok(path)
    }

    /// Serialize as pretty TOML.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
