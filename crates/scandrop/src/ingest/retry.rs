//! Bounded fixed-delay retry for operations on shared files.

use super::error::{IngestError, Result};
use std::time::Duration;
use tracing::{debug, warn};

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }
}

/// Run `op` until it succeeds, fails with an error `is_retryable` rejects,
/// or `policy.attempts` are used up. Exhaustion is reported as
/// [`IngestError::Locked`] wrapping the last error.
pub fn with_retry<T, F, P>(operation: &str, policy: &RetryPolicy, is_retryable: P, mut op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
    P: Fn(&IngestError) -> bool,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op() {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if !is_retryable(&err) => return Err(err),
            Err(err) if attempt >= attempts => {
                warn!(operation, attempts, error = %err, "Giving up after retries");
                return Err(IngestError::Locked {
                    operation: operation.to_string(),
                    attempts,
                    source: Box::new(err),
                });
            }
            Err(err) => {
                warn!(
                    operation,
                    attempt,
                    attempts,
                    delay_secs = policy.delay.as_secs_f64(),
                    error = %err,
                    "Resource is locked, retrying"
                );
                std::thread::sleep(policy.delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn locked() -> IngestError {
        io::Error::new(io::ErrorKind::PermissionDenied, "file is open elsewhere").into()
    }

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::ZERO)
    }

    #[test]
    fn succeeds_after_transient_lock() {
        let mut calls = 0;
        let value = with_retry("write log", &policy(3), IngestError::is_lock_contention, || {
            calls += 1;
            if calls < 3 {
                Err(locked())
            } else {
                Ok(calls)
            }
        })
        .unwrap();
        assert_eq!(value, 3);
    }

    #[test]
    fn exhaustion_propagates_locked_error() {
        let mut calls = 0;
        let err = with_retry("write log", &policy(2), IngestError::is_lock_contention, || {
            calls += 1;
            Err::<(), _>(locked())
        })
        .unwrap_err();

        assert_eq!(calls, 2);
        match err {
            IngestError::Locked { attempts, source, .. } => {
                assert_eq!(attempts, 2);
                assert!(source.is_lock_contention());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_retryable_errors_fail_immediately() {
        let mut calls = 0;
        let err = with_retry("write log", &policy(5), IngestError::is_lock_contention, || {
            calls += 1;
            Err::<(), _>(IngestError::Config("broken".into()))
        })
        .unwrap_err();

        assert_eq!(calls, 1);
        assert!(matches!(err, IngestError::Config(_)));
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        let mut calls = 0;
        let _ = with_retry("write log", &policy(0), IngestError::is_lock_contention, || {
            calls += 1;
            Err::<(), _>(locked())
        });
        assert_eq!(calls, 1);
    }
}
