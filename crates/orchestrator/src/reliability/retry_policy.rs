//! Whole-operation retry
//!
//! [`run_with_retry`] re-runs an entire async operation from the top when it
//! fails with a retryable error. Count and delay come from [`RetryPolicy`],
//! so the pipeline's state machine never has to know about them.

use common::BackoffKind;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff strategies for retry delays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed { delay: Duration },

    /// Linear backoff: initial_delay + increment * attempt
    Linear {
        initial_delay: Duration,
        increment: Duration,
    },

    /// Exponential backoff: initial_delay * base^attempt
    Exponential {
        initial_delay: Duration,
        base: f64,
        max_delay: Duration,
        jitter: bool,
    },
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Fixed {
            delay: Duration::from_secs(1),
        }
    }
}

impl BackoffStrategy {
    /// Calculate delay before retry number `attempt` (0-based)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => *delay,

            Self::Linear {
                initial_delay,
                increment,
            } => *initial_delay + *increment * attempt,

            Self::Exponential {
                initial_delay,
                base,
                max_delay,
                jitter,
            } => {
                let base_delay = initial_delay.as_millis() as f64 * base.powf(attempt as f64);
                let delay = Duration::from_millis(base_delay as u64).min(*max_delay);

                if *jitter {
                    Self::add_jitter(delay)
                } else {
                    delay
                }
            }
        }
    }

    /// Add jitter to delay (±25% random variation)
    fn add_jitter(delay: Duration) -> Duration {
        let jitter_factor = rand::thread_rng().gen_range(0.75..=1.25);
        Duration::from_millis((delay.as_millis() as f64 * jitter_factor) as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub backoff: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: BackoffStrategy::default(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: BackoffStrategy) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self::new(max_retries, BackoffStrategy::Fixed { delay })
    }

    pub fn no_retry() -> Self {
        Self::fixed(0, Duration::ZERO)
    }
}

/// Ceiling for exponential backoff, as a multiple of the base delay
const EXPONENTIAL_CAP_FACTOR: u32 = 8;

impl From<&common::RetrySettings> for RetryPolicy {
    fn from(settings: &common::RetrySettings) -> Self {
        let delay = settings.delay;
        let backoff = match settings.backoff {
            BackoffKind::Fixed => BackoffStrategy::Fixed { delay },
            BackoffKind::Linear => BackoffStrategy::Linear {
                initial_delay: delay,
                increment: delay,
            },
            BackoffKind::Exponential => BackoffStrategy::Exponential {
                initial_delay: delay,
                base: 2.0,
                max_delay: delay * EXPONENTIAL_CAP_FACTOR,
                jitter: true,
            },
        };
        Self::new(settings.max_retries, backoff)
    }
}

/// Whether a failure may be recovered by running the operation again
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Run `operation` until it succeeds, fails permanently, or the retry budget
/// is spent.
///
/// `already_retried` counts retries consumed before this call. Before each
/// retry `on_retry` receives the new retry number and the error; an error
/// from `on_retry` stops the loop and is returned as is. The delay is
/// applied after `on_retry`.
pub async fn run_with_retry<T, E, Op, Fut, OnRetry>(
    policy: &RetryPolicy,
    already_retried: u32,
    mut operation: Op,
    mut on_retry: OnRetry,
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
    OnRetry: FnMut(u32, &E) -> Result<(), E>,
{
    let mut retried = already_retried;

    loop {
        debug!(retried, "Executing operation with retry policy");

        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !error.is_retryable() {
            debug!(error = %error, "Operation failed permanently, not retrying");
            return Err(error);
        }
        if retried >= policy.max_retries {
            warn!(
                max_retries = policy.max_retries,
                error = %error,
                "Maximum retry attempts exceeded"
            );
            return Err(error);
        }

        let delay = policy.backoff.calculate_delay(retried);
        retried += 1;
        on_retry(retried, &error)?;

        debug!(
            retry = retried,
            delay_ms = delay.as_millis() as u64,
            "Operation failed, retrying after delay"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Permanent,
        Cancelled,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            matches!(self, TestError::Transient)
        }
    }

    #[tokio::test]
    async fn test_successful_operation_no_retries() {
        let mut retries = Vec::new();
        let result = run_with_retry(
            &RetryPolicy::default(),
            0,
            || async { Ok::<i32, TestError>(42) },
            |n, _| {
                retries.push(n);
                Ok(())
            },
        )
        .await;

        assert_eq!(result, Ok(42));
        assert!(retries.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_success() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let started = tokio::time::Instant::now();

        let result = run_with_retry(
            &RetryPolicy::default(),
            0,
            move || {
                let count = counter_clone.fetch_add(1, Ordering::SeqCst);
                async move {
                    if count < 2 {
                        Err(TestError::Transient)
                    } else {
                        Ok(count)
                    }
                }
            },
            |_, _| Ok(()),
        )
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_retries_exceeded() {
        let counter = AtomicU32::new(0);
        let mut retries = Vec::new();

        let result: Result<(), _> = run_with_retry(
            &RetryPolicy::default(),
            0,
            || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Transient) }
            },
            |n, _| {
                retries.push(n);
                Ok(())
            },
        )
        .await;

        assert_eq!(result, Err(TestError::Transient));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(retries, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_already_spent() {
        let counter = AtomicU32::new(0);

        let result: Result<(), _> = run_with_retry(
            &RetryPolicy::default(),
            2,
            || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Transient) }
            },
            |_, _| Ok(()),
        )
        .await;

        assert_eq!(result, Err(TestError::Transient));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let counter = AtomicU32::new(0);

        let result: Result<(), _> = run_with_retry(
            &RetryPolicy::default(),
            0,
            || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Permanent) }
            },
            |_, _| Ok(()),
        )
        .await;

        assert_eq!(result, Err(TestError::Permanent));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_on_retry_error_stops_the_loop() {
        let counter = AtomicU32::new(0);

        let result: Result<(), _> = run_with_retry(
            &RetryPolicy::default(),
            0,
            || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Transient) }
            },
            |_, _| Err(TestError::Cancelled),
        )
        .await;

        assert_eq!(result, Err(TestError::Cancelled));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_exponential_backoff_calculation() {
        let strategy = BackoffStrategy::Exponential {
            initial_delay: Duration::from_millis(100),
            base: 2.0,
            max_delay: Duration::from_secs(10),
            jitter: false,
        };

        assert_eq!(strategy.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(strategy.calculate_delay(1), Duration::from_millis(200));
        assert_eq!(strategy.calculate_delay(2), Duration::from_millis(400));
        assert_eq!(strategy.calculate_delay(10), Duration::from_secs(10));
    }

    #[test]
    fn test_linear_backoff_calculation() {
        let strategy = BackoffStrategy::Linear {
            initial_delay: Duration::from_millis(100),
            increment: Duration::from_millis(50),
        };

        assert_eq!(strategy.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(strategy.calculate_delay(2), Duration::from_millis(200));
    }

    #[test]
    fn test_policy_from_settings() {
        let settings = common::RetrySettings {
            max_retries: 4,
            delay: Duration::from_millis(250),
            backoff: BackoffKind::Fixed,
        };
        let policy = RetryPolicy::from(&settings);

        assert_eq!(policy.max_retries, 4);
        assert_eq!(policy.backoff.calculate_delay(3), Duration::from_millis(250));
        assert_eq!(RetryPolicy::default().backoff.calculate_delay(0), Duration::from_secs(1));
        assert_eq!(
            RetryPolicy::from(&common::RetrySettings::default()),
            RetryPolicy::default()
        );
    }

    #[test]
    fn test_policy_from_growing_settings() {
        let linear = RetryPolicy::from(&common::RetrySettings {
            max_retries: 3,
            delay: Duration::from_millis(100),
            backoff: BackoffKind::Linear,
        });
        assert_eq!(linear.backoff.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(linear.backoff.calculate_delay(2), Duration::from_millis(300));

        let exponential = RetryPolicy::from(&common::RetrySettings {
            max_retries: 6,
            delay: Duration::from_millis(100),
            backoff: BackoffKind::Exponential,
        });
        // ±25% jitter around 100ms * 2^2
        let third = exponential.backoff.calculate_delay(2);
        assert!(third >= Duration::from_millis(300) && third <= Duration::from_millis(500));
        // capped at 8x before jitter
        assert!(exponential.backoff.calculate_delay(10) <= Duration::from_millis(1000));
    }
}
