use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

/// Upper bound on a server-provided `Retry-After`.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(300);

/// How a failure should be treated by a [`RetryPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transient,
    RateLimited { retry_after: Option<Duration> },
    Fatal,
}

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn class(&self) -> ErrorClass;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    Exponential {
        initial: Duration,
        factor: u32,
        max: Duration,
    },
}

impl Backoff {
    /// Delay to wait after the `failed_attempt`-th failure (1-based).
    pub fn delay(&self, failed_attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential {
                initial,
                factor,
                max,
            } => {
                let exponent = failed_attempt.saturating_sub(1);
                initial
                    .saturating_mul(factor.saturating_pow(exponent))
                    .min(max)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    #[error("non-retryable failure: {0}")]
    Aborted(E),
}

/// Bounded retry with separate backoff for rate-limited responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub rate_limit_backoff: Backoff,
}

impl RetryPolicy {
    /// Run `op` until it succeeds, fails fatally, or `max_attempts` is spent.
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let delay = match err.class() {
                ErrorClass::Fatal => return Err(RetryError::Aborted(err)),
                ErrorClass::RateLimited { retry_after } => retry_after
                    .map(|d| d.min(MAX_RETRY_AFTER))
                    .unwrap_or_else(|| self.rate_limit_backoff.delay(attempt)),
                ErrorClass::Transient => self.backoff.delay(attempt),
            };

            if attempt >= max_attempts {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: err,
                });
            }

            warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying after failed attempt"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[derive(Debug, Clone, PartialEq)]
    struct FakeError(ErrorClass);

    impl Display for FakeError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self.0)
        }
    }

    impl Retryable for FakeError {
        fn class(&self) -> ErrorClass {
            self.0
        }
    }

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Backoff::Fixed(Duration::ZERO),
            rate_limit_backoff: Backoff::Fixed(Duration::ZERO),
        }
    }

    #[test]
    fn test_fixed_backoff() {
        let backoff = Backoff::Fixed(Duration::from_millis(250));
        assert_eq!(backoff.delay(1), Duration::from_millis(250));
        assert_eq!(backoff.delay(7), Duration::from_millis(250));
    }

    #[test]
    fn test_exponential_backoff_caps() {
        let backoff = Backoff::Exponential {
            initial: Duration::from_secs(1),
            factor: 2,
            max: Duration::from_secs(5),
        };
        assert_eq!(backoff.delay(1), Duration::from_secs(1));
        assert_eq!(backoff.delay(2), Duration::from_secs(2));
        assert_eq!(backoff.delay(3), Duration::from_secs(4));
        assert_eq!(backoff.delay(4), Duration::from_secs(5));
        assert_eq!(backoff.delay(60), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Cell::new(0);
        let result = instant_policy(3)
            .run(|attempt| {
                calls.set(calls.get() + 1);
                let outcome = if attempt < 3 {
                    Err(FakeError(ErrorClass::Transient))
                } else {
                    Ok("done")
                };
                async move { outcome }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_exhausts_on_repeated_rate_limit() {
        let calls = Cell::new(0);
        let result: Result<(), _> = instant_policy(3)
            .run(|_| {
                calls.set(calls.get() + 1);
                async { Err(FakeError(ErrorClass::RateLimited { retry_after: None })) }
            })
            .await;
        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 3, .. })));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_fatal_stops_immediately() {
        let calls = Cell::new(0);
        let result: Result<(), _> = instant_policy(5)
            .run(|_| {
                calls.set(calls.get() + 1);
                async { Err(FakeError(ErrorClass::Fatal)) }
            })
            .await;
        assert!(matches!(result, Err(RetryError::Aborted(_))));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = Cell::new(0);
        let result: Result<(), _> = instant_policy(0)
            .run(|_| {
                calls.set(calls.get() + 1);
                async { Err(FakeError(ErrorClass::Transient)) }
            })
            .await;
        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 1, .. })));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_attempt_numbers_are_sequential() {
        let seen = RefCell::new(Vec::new());
        let _: Result<(), _> = instant_policy(4)
            .run(|attempt| {
                seen.borrow_mut().push(attempt);
                async { Err(FakeError(ErrorClass::Transient)) }
            })
            .await;
        assert_eq!(*seen.borrow(), vec![1, 2, 3, 4]);
    }
}
