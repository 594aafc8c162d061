//! Polling retry combinator.
//!
//! [`wait_for`] repeatedly invokes a probe until it yields a truthy value,
//! composing with the debug sink's buffering to suppress noise from
//! expected transient failures: every attempt runs inside a fresh event
//! buffer that is flushed on success and discarded when the attempt failed
//! for an expected, retryable reason.
//!
//! The retryable set is fixed: `NoSuchElement`, `ElementNotVisible`,
//! `ElementIsNotSelectable`, `NoAlertOpenError`, and assertion failures.
//! Any other error flushes the buffer and propagates immediately.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde_json::Value;
use tokio::time::{Instant, sleep};
use tracing::trace;

use crate::error::Result;
use crate::observe::CallLog;

// ============================================================================
// Constants
// ============================================================================

/// Default polling timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Per-iteration backoff step; iteration `i` sleeps `i * 20` ms.
const POLL_DELAY_STEP: Duration = Duration::from_millis(20);

// ============================================================================
// Truthy
// ============================================================================

/// The probe-result convention: a value that is `null`, `false`, or `None`
/// keeps the poll going; anything else ends it.
pub trait Truthy {
    /// Returns `true` if this value ends the poll.
    fn is_truthy(&self) -> bool;
}

impl Truthy for Value {
    #[inline]
    fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Bool(false))
    }
}

impl Truthy for bool {
    #[inline]
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl<T> Truthy for Option<T> {
    #[inline]
    fn is_truthy(&self) -> bool {
        self.is_some()
    }
}

// ============================================================================
// wait_for
// ============================================================================

/// Polls a probe with the default 5000 ms timeout.
///
/// # Errors
///
/// See [`wait_for`].
pub async fn wait_for_default<T, F, Fut>(log: &CallLog, probe: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    T: Truthy,
{
    wait_for(log, probe, DEFAULT_TIMEOUT).await
}

/// Polls a probe until it yields a truthy value or the timeout elapses.
///
/// Each attempt runs inside a fresh event buffer: a truthy result flushes
/// the buffer and returns; a falsy result or an error from the fixed
/// retryable set discards the buffer, sleeps `iteration * 20` ms, and
/// continues. Any other error flushes the buffer and propagates
/// immediately with no further attempts.
///
/// When the timeout elapses without success, one final unbuffered
/// invocation of the probe returns or fails directly; this last attempt is
/// not itself time-bounded or retried.
///
/// # Errors
///
/// Whatever the probe's non-retryable or final-attempt error is.
pub async fn wait_for<T, F, Fut>(log: &CallLog, mut probe: F, timeout: Duration) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    T: Truthy,
{
    let start = Instant::now();
    let mut iteration: u32 = 0;

    while start.elapsed() < timeout {
        log.push_buffer();

        match probe().await {
            Ok(value) if value.is_truthy() => {
                log.flush_buffer();
                return Ok(value);
            }
            Ok(_) => {
                log.discard_buffer();
            }
            Err(error) if error.is_wait_retryable() => {
                trace!(iteration, error = %error, "probe failed with retryable error");
                log.discard_buffer();
            }
            Err(error) => {
                log.flush_buffer();
                return Err(error);
            }
        }

        sleep(POLL_DELAY_STEP * iteration).await;
        iteration += 1;
    }

    // Final unbuffered attempt after timeout expiry.
    probe().await
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use crate::error::{Error, SemanticErrorKind};
    use crate::observe::CallEvent;
    use crate::options::Options;

    fn collecting_log() -> (CallLog, Arc<Mutex<Vec<CallEvent>>>) {
        let collected: Arc<Mutex<Vec<CallEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&collected);
        let options = Options::new().with_on_call(move |event| sink.lock().push(event.clone()));
        (CallLog::new(&options), collected)
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_failures_then_success() {
        let (log, collected) = collecting_log();
        let attempts = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&attempts);
        let probe_log = log.clone();
        let result = wait_for(
            &log,
            move || {
                let counter = Arc::clone(&counter);
                let log = probe_log.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    log.call("Probe", "check", Value::Null, async move {
                        if n < 2 {
                            Err(Error::semantic(SemanticErrorKind::NoSuchElement, "not yet"))
                        } else {
                            Ok(Value::from(42))
                        }
                    })
                    .await
                }
            },
            DEFAULT_TIMEOUT,
        )
        .await
        .expect("value");

        assert_eq!(result, Value::from(42));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);

        // The two discarded attempts emitted nothing; the flushed third
        // attempt emitted its event.
        let events = collected.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].operation, "check");
    }

    #[tokio::test]
    async fn test_non_retryable_error_propagates_immediately() {
        let (log, collected) = collecting_log();
        let attempts = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&attempts);
        let probe_log = log.clone();
        let err = wait_for(
            &log,
            move || {
                let counter = Arc::clone(&counter);
                let log = probe_log.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    log.call("Probe", "check", Value::Null, async {
                        Err::<Value, _>(Error::semantic(
                            SemanticErrorKind::StaleElementReference,
                            "gone",
                        ))
                    })
                    .await
                }
            },
            DEFAULT_TIMEOUT,
        )
        .await
        .expect_err("error");

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(!err.is_wait_retryable());

        // The failed attempt's events were flushed, not discarded.
        assert_eq!(collected.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_makes_one_final_unbuffered_attempt() {
        let (log, collected) = collecting_log();
        let attempts = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&attempts);
        let probe_log = log.clone();
        let err = wait_for(
            &log,
            move || {
                let counter = Arc::clone(&counter);
                let log = probe_log.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    log.call("Probe", "check", Value::Null, async {
                        Err::<Value, _>(Error::semantic(SemanticErrorKind::NoSuchElement, "never"))
                    })
                    .await
                }
            },
            Duration::from_millis(100),
        )
        .await
        .expect_err("exhausted");

        assert!(err.is_wait_retryable());
        assert!(attempts.load(Ordering::SeqCst) >= 2);

        // Buffered attempts were discarded; only the final unbuffered
        // attempt emitted its event.
        assert_eq!(collected.lock().len(), 1);
        assert_eq!(log.buffer_depth(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_falsy_results_keep_polling() {
        let log = CallLog::disabled();
        let attempts = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&attempts);
        let value = wait_for(
            &log,
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    Ok(if n < 3 { Value::Bool(false) } else { Value::from("ready") })
                }
            },
            DEFAULT_TIMEOUT,
        )
        .await
        .expect("value");

        assert_eq!(value, Value::from("ready"));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_option_probe_resolves_on_some() {
        let log = CallLog::disabled();
        let attempts = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&attempts);
        let value = wait_for_default(&log, move || {
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Ok(if n == 0 { None } else { Some(7) })
            }
        })
        .await
        .expect("value");

        assert_eq!(value, Some(7));
    }

    #[test]
    fn test_truthiness_convention() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::from(0).is_truthy());
        assert!(Value::from("").is_truthy());
        assert!(!false.is_truthy());
        assert!(true.is_truthy());
        assert!(!None::<u32>.is_truthy());
        assert!(Some(0).is_truthy());
    }
}
