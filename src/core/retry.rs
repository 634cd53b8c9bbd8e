//! Retry logic with exponential backoff and jitter.
//!
//! Used by the generation clients for transient provider failures. The workflow
//! engine itself never retries.

use std::future::Future;
use std::time::{Duration, Instant};

use super::config::RetryPolicyConfig;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries).
    pub max_attempts: u32,

    /// Initial delay before first retry.
    pub initial_delay: Duration,

    /// Maximum delay between retries.
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (e.g., 2.0 = double each time).
    pub backoff_multiplier: f64,

    /// Whether to add jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::api()
    }
}

impl RetryConfig {
    /// Create a config with no retries (fail fast).
    pub fn no_retry() -> Self {
        Self { max_attempts: 0, ..Self::api() }
    }

    /// Create a config for generation API calls.
    pub fn api() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// Calculate delay for the given attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32 - 1);
        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.jitter {
            // Up to 25% jitter
            capped_delay * (1.0 + rand_jitter() * 0.25)
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}

impl From<&RetryPolicyConfig> for RetryConfig {
    fn from(policy: &RetryPolicyConfig) -> Self {
        Self {
            max_attempts: policy.max_attempts,
            initial_delay: Duration::from_millis(policy.initial_delay_ms),
            max_delay: Duration::from_millis(policy.max_delay_ms),
            backoff_multiplier: 2.0,
            jitter: policy.jitter,
        }
    }
}

/// Pseudo-random jitter in `0.0..1.0` taken from the clock.
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as f64 / 1000.0
}

/// Result of a retry operation.
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// The final result (success or last error).
    pub result: Result<T, E>,

    /// Number of attempts made.
    pub attempts: u32,

    /// Total time spent (including delays).
    pub total_time: Duration,
}

impl<T, E> RetryResult<T, E> {
    /// Check if the operation succeeded.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Whether more than one attempt was made.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Get the result.
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Retry an async operation while `should_retry` accepts the error.
///
/// `delay_hint` may override the backoff delay for a given error, e.g. a
/// server-provided `Retry-After`.
pub async fn retry_async<T, E, F, Fut, R, H>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: R,
    delay_hint: H,
) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    H: Fn(&E) -> Option<Duration>,
{
    let start = Instant::now();
    let mut attempts = 0;
    let max_attempts = config.max_attempts + 1;

    loop {
        attempts += 1;
        let result = operation().await;

        let delay = match &result {
            Err(err) if attempts < max_attempts && should_retry(err) => match delay_hint(err) {
                Some(hint) => hint.min(config.max_delay),
                None => config.delay_for_attempt(attempts),
            },
            _ => return RetryResult { result, attempts, total_time: start.elapsed() },
        };

        tracing::debug!(attempt = attempts, delay_ms = delay.as_millis() as u64, "Retrying after failure");
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert!(config.jitter);
    }

    #[test]
    fn test_retry_config_no_retry() {
        assert_eq!(RetryConfig::no_retry().max_attempts, 0);
    }

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: false,
        };

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = RetryConfig {
            max_attempts: 10,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 10.0,
            jitter: false,
        };

        assert!(config.delay_for_attempt(5) <= config.max_delay);
    }

    #[test]
    fn test_from_policy() {
        let policy = RetryPolicyConfig {
            max_attempts: 1,
            initial_delay_ms: 250,
            max_delay_ms: 1000,
            jitter: false,
        };
        let config = RetryConfig::from(&policy);
        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let calls = Cell::new(0);
        let result = retry_async(
            &fast(3),
            || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move { if n < 3 { Err("transient") } else { Ok("done") } }
            },
            |_| true,
            |_| None,
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(result.attempts, 3);
        assert!(result.was_retried());
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let result =
            retry_async(&fast(2), || async { Err::<(), _>("persistent") }, |_| true, |_| None).await;

        assert!(!result.is_ok());
        assert_eq!(result.attempts, 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_fails_fast() {
        let result =
            retry_async(&fast(5), || async { Err::<(), _>("fatal") }, |e| *e != "fatal", |_| None).await;

        assert_eq!(result.attempts, 1);
        assert_eq!(result.into_result(), Err("fatal"));
    }
}
