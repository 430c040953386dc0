//! Bounded retry with exponential backoff for remote calls.

use log::warn;
use std::fmt::Display;
use std::time::Duration;

/// Default number of attempts for remote calls
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Default base delay before the first retry
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Run `op` up to `attempts` times, sleeping `base_delay * 2^(n-1)` after
/// the n-th failure. The last failure propagates to the caller.
///
/// This is a policy over a single fallible call, not a resilience
/// framework: the attempt count is fixed and small, and the caller decides
/// per call site whether a final failure is fatal or degrades.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use sizegate::remote::with_retry;
///
/// let mut calls = 0;
/// let result: Result<u32, &str> = with_retry(3, Duration::from_millis(1), || {
///     calls += 1;
///     if calls < 2 { Err("flaky") } else { Ok(7) }
/// });
/// assert_eq!(result, Ok(7));
/// assert_eq!(calls, 2);
/// ```
pub fn with_retry<T, E, F>(attempts: u32, base_delay: Duration, mut op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Result<T, E>,
{
    let attempts = attempts.max(1);
    let mut delay = base_delay;

    for attempt in 1..=attempts {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts => {
                warn!(
                    "Remote call failed (attempt {}/{}), retrying in {:?}: {}",
                    attempt, attempts, delay, err
                );
                std::thread::sleep(delay);
                delay *= 2;
            }
            Err(err) => return Err(err),
        }
    }

    unreachable!("loop returns on the final attempt")
}
