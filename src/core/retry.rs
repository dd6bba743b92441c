//! Retry Policy with Exponential Backoff
//!
//! Information Hiding:
//! - Backoff schedule hidden behind `delay_for`
//! - Sleeping abstracted so tests can run on a fake clock
//! - Error classification decided by the caller per attempt

use super::llm::LlmError;
use async_trait::async_trait;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Something that can wait. Production code uses tokio's timer.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested delays without waiting.
#[derive(Default, Clone)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut delays) = self.delays.lock() {
            delays.push(duration);
        }
    }
}

/// Outcome of a single failed attempt.
#[derive(Debug)]
pub enum AttemptError {
    /// 429, 5xx or network failure
    Retryable(String),
    /// Anything else: surfaced immediately
    Fatal(LlmError),
}

#[derive(Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Delay to wait after attempt `n` (1-based) fails: base * 2^(n-1)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay * 2_u32.pow(exp)
    }

    /// Run `op` until it succeeds, fails fatally, or attempts run out.
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, provider: &str, mut op: F) -> Result<T, LlmError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=self.max_attempts {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Fatal(err)) => return Err(err),
                Err(AttemptError::Retryable(message)) => {
                    last_error = message;
                    if attempt < self.max_attempts {
                        let delay = self.delay_for(attempt);
                        tracing::warn!(
                            "[RetryPolicy] {} attempt {}/{} failed: {}; retrying in {:?}",
                            provider,
                            attempt,
                            self.max_attempts,
                            last_error,
                            delay
                        );
                        self.sleeper.sleep(delay).await;
                    }
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            provider: provider.to_string(),
            attempts: self.max_attempts,
            last_error,
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(sleeper: &RecordingSleeper) -> RetryPolicy {
        RetryPolicy::default().with_sleeper(Arc::new(sleeper.clone()))
    }

    #[test]
    fn test_backoff_doubles() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay_for(1), Duration::from_secs(1));
        assert_eq!(p.delay_for(2), Duration::from_secs(2));
        assert_eq!(p.delay_for(3), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_two_rate_limits_then_success() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);

        let result = policy(&sleeper)
            .run("openai", |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n <= 2 {
                        Err(AttemptError::Retryable("429 Too Many Requests".into()))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn test_exhausted_names_provider_and_attempts() {
        let sleeper = RecordingSleeper::new();
        let result: Result<(), _> = policy(&sleeper)
            .run("anthropic", |_| async {
                Err(AttemptError::Retryable("500 Internal Server Error".into()))
            })
            .await;

        match result {
            Err(LlmError::RetriesExhausted {
                provider, attempts, ..
            }) => {
                assert_eq!(provider, "anthropic");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(sleeper.delays().len(), 2);
    }

    #[tokio::test]
    async fn test_fatal_error_stops_immediately() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy(&sleeper)
            .run("openai", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(AttemptError::Fatal(LlmError::Http {
                        provider: "openai".into(),
                        status: 401,
                        body: "bad key".into(),
                    }))
                }
            })
            .await;

        assert!(matches!(result, Err(LlmError::Http { status: 401, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.delays().is_empty());
    }
}
