//! Bounded polling.
//!
//! Auto-waiting assertions are built on [`poll_until`]: evaluate a check,
//! sleep, repeat until it passes or the budget runs out. The outcome records
//! attempts, elapsed time and the last observation so callers can say what the
//! page actually looked like when time ran out.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};

use crate::result::PagecheckResult;

/// Default timeout for auto-waiting assertions (5 seconds)
pub const DEFAULT_ASSERT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Configuration for polling behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Total budget
    pub timeout: Duration,
    /// Sleep between attempts
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_ASSERT_TIMEOUT_MS),
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl PollConfig {
    /// Create a poll config with the given budget
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Single attempt, no waiting
    #[must_use]
    pub const fn snapshot() -> Self {
        Self {
            timeout: Duration::ZERO,
            interval: Duration::ZERO,
        }
    }

    /// Budget in whole milliseconds
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Result of one check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check<T, O> {
    /// Condition holds; stop polling
    Pass(T),
    /// Condition does not hold yet; keep the observation
    Retry(O),
}

/// Final outcome of a polling loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T, O> {
    /// The check passed
    Satisfied {
        /// Value returned by the passing check
        value: T,
        /// Number of checks run
        attempts: usize,
        /// Time spent
        elapsed: Duration,
    },
    /// Budget exhausted
    TimedOut {
        /// Observation from the last check
        last: O,
        /// Number of checks run
        attempts: usize,
        /// Time spent
        elapsed: Duration,
    },
}

impl<T, O> PollOutcome<T, O> {
    /// Whether the check eventually passed
    #[must_use]
    pub const fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied { .. })
    }

    /// Number of checks run
    #[must_use]
    pub const fn attempts(&self) -> usize {
        match self {
            Self::Satisfied { attempts, .. } | Self::TimedOut { attempts, .. } => *attempts,
        }
    }
}

/// Poll `check` until it passes or `config.timeout` elapses.
///
/// The check always runs at least once. Errors from the check abort polling
/// immediately: they are infrastructure faults, not "not yet".
///
/// # Errors
///
/// Returns the first error the check produces
pub async fn poll_until<T, O, F, Fut>(
    mut check: F,
    config: PollConfig,
) -> PagecheckResult<PollOutcome<T, O>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PagecheckResult<Check<T, O>>>,
{
    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;
        match check().await? {
            Check::Pass(value) => {
                return Ok(PollOutcome::Satisfied {
                    value,
                    attempts,
                    elapsed: start.elapsed(),
                });
            }
            Check::Retry(last) => {
                let elapsed = start.elapsed();
                if elapsed + config.interval >= config.timeout {
                    return Ok(PollOutcome::TimedOut {
                        last,
                        attempts,
                        elapsed,
                    });
                }
            }
        }
        tokio::time::sleep(config.interval).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::result::PagecheckError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_default_config() {
        let config = PollConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.interval, Duration::from_millis(100));
        assert_eq!(config.timeout_ms(), 5000);
    }

    #[test]
    fn test_snapshot_config() {
        let config = PollConfig::snapshot();
        assert_eq!(config.timeout, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_passes_first_attempt() {
        let outcome = poll_until(
            || async { Ok(Check::<_, ()>::Pass(42)) },
            PollConfig::default(),
        )
        .await
        .unwrap();
        match outcome {
            PollOutcome::Satisfied {
                value, attempts, ..
            } => {
                assert_eq!(value, 42);
                assert_eq!(attempts, 1);
            }
            PollOutcome::TimedOut { .. } => panic!("should pass"),
        }
    }

    #[tokio::test]
    async fn test_passes_after_retries() {
        let calls = &AtomicUsize::new(0);
        let outcome = poll_until(
            move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(if n >= 3 { Check::Pass(n) } else { Check::Retry(n) })
            },
            PollConfig::new(Duration::from_secs(2)).with_interval(Duration::from_millis(5)),
        )
        .await
        .unwrap();
        assert!(outcome.is_satisfied());
        assert_eq!(outcome.attempts(), 3);
    }

    #[tokio::test]
    async fn test_times_out_with_last_observation() {
        let calls = &AtomicUsize::new(0);
        let outcome = poll_until(
            move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(Check::<(), _>::Retry(format!("attempt {n}")))
            },
            PollConfig::new(Duration::from_millis(50)).with_interval(Duration::from_millis(10)),
        )
        .await
        .unwrap();
        match outcome {
            PollOutcome::TimedOut { last, attempts, .. } => {
                assert!(attempts >= 2);
                assert_eq!(last, format!("attempt {attempts}"));
            }
            PollOutcome::Satisfied { .. } => panic!("should time out"),
        }
    }

    #[tokio::test]
    async fn test_snapshot_runs_once() {
        let calls = &AtomicUsize::new(0);
        let outcome = poll_until(
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Check::<(), _>::Retry(()))
            },
            PollConfig::snapshot(),
        )
        .await
        .unwrap();
        assert!(!outcome.is_satisfied());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_check_error_aborts() {
        let calls = &AtomicUsize::new(0);
        let result = poll_until(
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<Check<(), ()>, _>(PagecheckError::session("tab crashed"))
            },
            PollConfig::default(),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
