//! Text generation clients.
//!
//! The workflow engine only sees the [`TextGenerator`] trait. Concrete HTTP
//! clients for Claude and Ollama live behind the `ai` feature, and
//! [`RetryingGenerator`] adds backoff for transient provider failures.
//!
//! ## Error mapping
//!
//! | Provider response | [`GenerationError`] |
//! |---|---|
//! | 429 | `RateLimited` |
//! | 400, 401, 403, 404, 413, 422 | `InvalidRequest` |
//! | 5xx, connection failures | `Unavailable` |
//! | anything else | `Unknown` |

#[cfg(feature = "ai")]
mod claude;
#[cfg(feature = "ai")]
mod ollama;
mod retrying;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(feature = "ai")]
pub use claude::ClaudeGenerator;
#[cfg(feature = "ai")]
pub use ollama::OllamaGenerator;
pub use retrying::RetryingGenerator;

use crate::core::Config;

/// A text generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a prompt under the given system instructions.
    async fn generate(&self, prompt: &str, system: &str) -> Result<String, GenerationError>;

    /// Get the provider name.
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    async fn generate(&self, prompt: &str, system: &str) -> Result<String, GenerationError> {
        (**self).generate(prompt, system).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Stand-in used when no backend could be built.
///
/// Every call fails with [`GenerationError::Unavailable`], so operations that
/// need no generation still work.
#[derive(Debug, Clone)]
pub struct UnavailableGenerator {
    reason: String,
}

impl UnavailableGenerator {
    /// Create with the reason reported on every call.
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl TextGenerator for UnavailableGenerator {
    async fn generate(&self, _prompt: &str, _system: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Unavailable(self.reason.clone()))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// Failure of a single generation call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("rate limited{}", .retry_after.map(|s| format!(", retry after {s}s")).unwrap_or_default())]
    RateLimited { retry_after: Option<u64> },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("generation timed out after {0}s")]
    Timeout(u64),

    #[error("unexpected provider error: {0}")]
    Unknown(String),
}

impl GenerationError {
    /// Whether the same call may succeed if simply repeated.
    pub fn is_transient(&self) -> bool {
        matches!(self, GenerationError::Unavailable(_) | GenerationError::RateLimited { .. })
    }

    /// Map an unsuccessful HTTP response to an error.
    pub fn from_status(status: u16, body: &str, retry_after: Option<u64>) -> Self {
        let detail = format!("HTTP {status}: {}", body.trim());
        match status {
            429 => GenerationError::RateLimited { retry_after },
            400 | 401 | 403 | 404 | 413 | 422 => GenerationError::InvalidRequest(detail),
            500..=599 => GenerationError::Unavailable(detail),
            _ => GenerationError::Unknown(detail),
        }
    }
}

#[cfg(feature = "ai")]
impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            GenerationError::Unavailable(err.to_string())
        } else {
            GenerationError::Unknown(err.to_string())
        }
    }
}

/// Build the configured generator, wrapped with the configured retry policy.
#[cfg(feature = "ai")]
pub fn build_generator(config: &Config) -> anyhow::Result<Arc<dyn TextGenerator>> {
    use crate::core::{Provider, RetryConfig};

    let settings = &config.generation;
    let retry = RetryConfig::from(&config.retry);

    let generator: Arc<dyn TextGenerator> = match settings.provider {
        Provider::Claude => {
            let mut claude = ClaudeGenerator::new()?
                .with_max_tokens(settings.max_tokens)
                .with_temperature(settings.temperature);
            if let Some(model) = &settings.model {
                claude = claude.with_model(model);
            }
            Arc::new(RetryingGenerator::new(claude, retry))
        }
        Provider::Ollama => {
            let mut ollama = OllamaGenerator::new()
                .with_max_tokens(settings.max_tokens)
                .with_temperature(settings.temperature);
            if let Some(url) = &settings.ollama.base_url {
                ollama = ollama.with_base_url(url);
            }
            if let Some(model) = &settings.ollama.model {
                ollama = ollama.with_model(model);
            }
            Arc::new(RetryingGenerator::new(ollama, retry))
        }
    };

    tracing::debug!(provider = generator.name(), "Using text generator");
    Ok(generator)
}

/// Without the `ai` feature there is no backend to build.
#[cfg(not(feature = "ai"))]
pub fn build_generator(_config: &Config) -> anyhow::Result<Arc<dyn TextGenerator>> {
    anyhow::bail!("specflow was built without the `ai` feature; no text generator is available")
}
