//! Bounded polling
//!
//! Rendering on the dashboard is asynchronous, so most queries are retried
//! on a short fixed interval until they produce a value or a deadline
//! passes. Stale element references are retried the same way.

use std::future::Future;
use std::time::{Duration, Instant};

use log::debug;

use crate::clock::Clock;
use crate::error::Result;

/// Smallest poll interval; keeps a zero interval from spinning
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Short wait tolerating asynchronous rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settle {
    /// How long a probe may keep retrying
    pub window: Duration,
    /// Sleep between attempts
    pub interval: Duration,
}

impl Default for Settle {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(2),
            interval: Duration::from_millis(100),
        }
    }
}

impl Settle {
    pub fn new(window: Duration, interval: Duration) -> Self {
        Self { window, interval }
    }

    /// Deadline for a settle window starting now, never later than `cap`
    pub fn deadline(&self, clock: &dyn Clock, cap: Instant) -> Instant {
        (clock.now() + self.window).min(cap)
    }
}

/// Run `probe` until it yields a value or `deadline` passes.
///
/// The probe always runs at least once. `Ok(None)` and stale-reference
/// errors are retried after `interval`; any other error is returned.
pub async fn poll_until<T, F, Fut>(
    clock: &dyn Clock,
    deadline: Instant,
    interval: Duration,
    mut probe: F,
) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let interval = interval.max(MIN_INTERVAL);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match probe().await {
            Ok(Some(value)) => return Ok(Some(value)),
            Ok(None) => {}
            Err(e) if e.is_stale() => {
                debug!("Stale reference on attempt {}, re-querying", attempt);
            }
            Err(e) => return Err(e),
        }

        let remaining = clock.remaining(deadline);
        if remaining.is_zero() {
            return Ok(None);
        }
        clock.sleep(interval.min(remaining)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::WatchError;
    use std::cell::Cell;

    #[tokio::test]
    async fn test_returns_first_value() {
        let clock = ManualClock::new();
        let deadline = clock.now() + Duration::from_secs(1);
        let calls = Cell::new(0);
        let found = poll_until(&clock, deadline, Duration::from_millis(100), || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move { Ok(if n == 3 { Some(n) } else { None }) }
        })
        .await
        .unwrap();
        assert_eq!(found, Some(3));
        assert_eq!(clock.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_gives_up_at_deadline() {
        let clock = ManualClock::new();
        let deadline = clock.now() + Duration::from_millis(250);
        let found: Option<u32> = poll_until(&clock, deadline, Duration::from_millis(100), || async {
            Ok(None)
        })
        .await
        .unwrap();
        assert!(found.is_none());
        assert_eq!(clock.elapsed(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_runs_once_past_deadline() {
        let clock = ManualClock::new();
        let deadline = clock.now();
        clock.advance(Duration::from_secs(1));
        let calls = Cell::new(0);
        let found = poll_until(&clock, deadline, Duration::from_millis(100), || {
            calls.set(calls.get() + 1);
            async { Ok(Some("late")) }
        })
        .await
        .unwrap();
        assert_eq!(found, Some("late"));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_stale_is_retried() {
        let clock = ManualClock::new();
        let deadline = clock.now() + Duration::from_secs(1);
        let calls = Cell::new(0);
        let found = poll_until(&clock, deadline, Duration::from_millis(100), || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Err(WatchError::StaleReference)
                } else {
                    Ok(Some(n))
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(found, Some(3));
    }

    #[tokio::test]
    async fn test_other_errors_propagate() {
        let clock = ManualClock::new();
        let deadline = clock.now() + Duration::from_secs(1);
        let result: Result<Option<u32>> =
            poll_until(&clock, deadline, Duration::from_millis(100), || async {
                Err(WatchError::Document("backend gone".into()))
            })
            .await;
        assert!(matches!(result, Err(WatchError::Document(_))));
    }

    #[test]
    fn test_settle_deadline_capped() {
        let clock = ManualClock::new();
        let settle = Settle::default();
        let cap = clock.now() + Duration::from_millis(500);
        assert_eq!(settle.deadline(&clock, cap), cap);
        let far = clock.now() + Duration::from_secs(30);
        assert_eq!(settle.deadline(&clock, far), clock.now() + Duration::from_secs(2));
    }
}
