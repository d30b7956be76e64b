use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::types::{AggregatorError, Result};

pub type RetryPredicate = Arc<dyn Fn(&AggregatorError) -> bool + Send + Sync>;

/// How many times to retry, how long to wait between attempts, and which
/// errors are worth retrying at all.
#[derive(Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub should_retry: RetryPredicate,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            backoff_factor: 2.0,
            should_retry: Arc::new(|_: &AggregatorError| true),
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("initial_delay", &self.initial_delay)
            .field("backoff_factor", &self.backoff_factor)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_retries,
            initial_delay,
            backoff_factor,
            ..Default::default()
        }
    }

    /// Retry only on HTTP 429 / rate-limit errors.
    pub fn rate_limit_only(max_retries: u32, initial_delay: Duration, backoff_factor: f64) -> Self {
        Self::new(max_retries, initial_delay, backoff_factor).with_predicate(|err| err.is_rate_limit())
    }

    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&AggregatorError) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Arc::new(predicate);
        self
    }

    /// `initial_delay * backoff_factor^attempt`, attempt counted from 0.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.max(0.0).powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    pub fn backoff(&self) -> PolicyBackoff {
        PolicyBackoff {
            policy: self.clone(),
            attempt: 0,
        }
    }
}

/// Deterministic schedule for a [`RetryPolicy`]: exactly `max_retries`
/// delays, then `None`.
#[derive(Debug, Clone)]
pub struct PolicyBackoff {
    policy: RetryPolicy,
    attempt: u32,
}

impl Backoff for PolicyBackoff {
    fn reset(&mut self) {
        self.attempt = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.attempt >= self.policy.max_retries {
            return None;
        }
        let delay = self.policy.delay_for(self.attempt);
        self.attempt += 1;
        Some(delay)
    }
}

/// Runs a fallible async operation under a [`RetryPolicy`]. All backoff timing
/// for the provider clients goes through here.
pub struct RetryExecutor;

impl RetryExecutor {
    pub async fn execute<T, F, Fut>(operation: F, policy: &RetryPolicy) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        Self::execute_until(operation, policy, &CancelToken::never()).await
    }

    /// Like [`RetryExecutor::execute`], but backoff sleeps stop early with
    /// [`AggregatorError::Cancelled`] once `cancel` fires.
    pub async fn execute_until<T, F, Fut>(mut operation: F, policy: &RetryPolicy, cancel: &CancelToken) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut backoff = policy.backoff();
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(AggregatorError::Cancelled);
            }

            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !(policy.should_retry)(&err) {
                debug!("Attempt {} failed with non-retryable error: {}", attempt + 1, err);
                return Err(err);
            }

            let Some(delay) = backoff.next_backoff() else {
                warn!("Giving up after {} attempts: {}", attempt + 1, err);
                return Err(err);
            };

            warn!("Attempt {} failed ({}), retrying in {:?}", attempt + 1, err, delay);
            cancel.sleep(delay).await?;
            attempt += 1;
        }
    }
}
