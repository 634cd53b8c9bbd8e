//! Retry wrapper for text generators.

use std::time::Duration;

use async_trait::async_trait;

use super::{GenerationError, TextGenerator};
use crate::core::{retry_async, RetryConfig};

/// Retries transient failures of an inner generator with exponential backoff.
///
/// Rate limit responses that carry a `Retry-After` hint wait for that long
/// instead, capped at the configured maximum delay.
pub struct RetryingGenerator<G> {
    inner: G,
    config: RetryConfig,
}

impl<G: TextGenerator> RetryingGenerator<G> {
    /// Wrap a generator.
    pub fn new(inner: G, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl<G: TextGenerator> TextGenerator for RetryingGenerator<G> {
    async fn generate(&self, prompt: &str, system: &str) -> Result<String, GenerationError> {
        let outcome = retry_async(
            &self.config,
            || self.inner.generate(prompt, system),
            GenerationError::is_transient,
            |err| match err {
                GenerationError::RateLimited { retry_after: Some(secs) } => {
                    Some(Duration::from_secs(*secs))
                }
                _ => None,
            },
        )
        .await;

        if outcome.was_retried() {
            tracing::info!(
                provider = self.inner.name(),
                attempts = outcome.attempts,
                ok = outcome.is_ok(),
                "Generation retried"
            );
        }
        outcome.into_result()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Flaky {
        calls: AtomicUsize,
        failures: Mutex<Vec<GenerationError>>,
    }

    impl Flaky {
        fn new(failures: Vec<GenerationError>) -> Self {
            Self { calls: AtomicUsize::new(0), failures: Mutex::new(failures) }
        }
    }

    #[async_trait]
    impl TextGenerator for Flaky {
        async fn generate(&self, _prompt: &str, _system: &str) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.failures.lock().unwrap().pop();
            match next {
                Some(err) => Err(err),
                None => Ok("# Requirements Document".to_string()),
            }
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn fast() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let flaky = Flaky::new(vec![
            GenerationError::RateLimited { retry_after: Some(1) },
            GenerationError::Unavailable("502".to_string()),
        ]);
        let generator = RetryingGenerator::new(flaky, fast());

        let text = generator.generate("prompt", "system").await.unwrap();

        assert_eq!(text, "# Requirements Document");
        assert_eq!(generator.inner.calls.load(Ordering::SeqCst), 3);
        assert_eq!(generator.name(), "flaky");
    }

    #[tokio::test]
    async fn test_does_not_retry_invalid_requests() {
        let flaky = Flaky::new(vec![GenerationError::InvalidRequest("400".to_string())]);
        let generator = RetryingGenerator::new(flaky, fast());

        let err = generator.generate("prompt", "system").await.unwrap_err();

        assert!(matches!(err, GenerationError::InvalidRequest(_)));
        assert_eq!(generator.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let failures = (0..10).map(|_| GenerationError::Unavailable("down".to_string())).collect();
        let generator = RetryingGenerator::new(Flaky::new(failures), fast());

        let err = generator.generate("prompt", "system").await.unwrap_err();

        assert!(err.is_transient());
        assert_eq!(generator.inner.calls.load(Ordering::SeqCst), 4);
    }
}
