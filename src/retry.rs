//! Fixed-delay retry for fallible asynchronous operations.

use crate::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Configuration for retry behavior.
///
/// The inter-attempt delay is fixed, not exponential, and every failure is
/// retried; the executor never inspects the error type. Callers that need
/// adaptive pacing attach a [`RetryHook`].
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Number of retries after the initial attempt
    pub max_retries: u32,
    /// Fixed delay between attempts
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Retry executor that re-attempts a fallible asynchronous operation.
///
/// Runs the operation up to `max_retries + 1` times. The first success
/// returns immediately; every failure but the last is discarded, and after
/// the final attempt the *last* error is the one returned.
pub struct RetryExecutor {
    config: RetryConfig,
    retry_hook: Option<Arc<dyn RetryHook>>,
}

impl RetryExecutor {
    /// Create a new retry executor with the given configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            retry_hook: None,
        }
    }

    /// Add a retry hook that observes attempts and can override the delay
    /// or abort the sequence.
    pub fn with_hook(mut self, hook: Arc<dyn RetryHook>) -> Self {
        self.retry_hook = Some(hook);
        self
    }

    /// Execute the given operation with retry logic.
    pub async fn execute<F, Fut, T, E>(&self, operation: &str, f: F) -> Result<T, E>
    where
        F: Fn() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: Send,
    {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.config.max_retries {
            attempt += 1;

            match f().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => {
                    last_error = Some(e);

                    if attempt > self.config.max_retries {
                        break;
                    }

                    let mut delay = self.config.delay;

                    if let Some(hook) = &self.retry_hook {
                        match hook
                            .on_retry(RetryContext {
                                attempt,
                                delay,
                                operation: operation.to_string(),
                            })
                            .await
                        {
                            RetryDecision::Abort => break,
                            RetryDecision::Retry(custom_delay) => delay = custom_delay,
                            RetryDecision::Default => {}
                        }
                    }

                    debug!(operation, attempt, ?delay, "attempt failed; retrying");
                    sleep(delay).await;
                }
            }
        }

        Err(last_error.expect("retry loop always runs at least one attempt"))
    }
}

/// Re-attempt `f` up to `retries` times after an initial failure, waiting
/// `delay` between attempts. The operation takes no arguments; callers
/// needing arguments close over them.
pub async fn retry<F, Fut, T, E>(f: F, retries: u32, delay: Duration) -> Result<T, E>
where
    F: Fn() -> Fut + Send,
    Fut: Future<Output = Result<T, E>> + Send,
    T: Send,
    E: Send,
{
    RetryExecutor::new(RetryConfig {
        max_retries: retries,
        delay,
    })
    .execute("retry", f)
    .await
}

/// Hook for custom retry behavior.
#[async_trait]
pub trait RetryHook: Send + Sync {
    /// Called before each sleep between attempts.
    async fn on_retry(&self, context: RetryContext) -> RetryDecision;
}

/// Context information for a retry attempt.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// The attempt that just failed (1-based)
    pub attempt: u32,
    /// The delay the executor is about to sleep
    pub delay: Duration,
    /// The operation label passed to `execute`
    pub operation: String,
}

/// Decision on how to proceed with a retry.
#[derive(Debug)]
pub enum RetryDecision {
    /// Use the default fixed delay
    Default,
    /// Retry after a custom delay instead
    Retry(Duration),
    /// Abort the sequence and return the last error
    Abort,
}
