use crate::Result;
use crate::error::SecurityError;
use crate::function::clock::{Clock, SystemClock};
use crate::storage::config::RateLimitConfig;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Sliding-window call gate.
///
/// At most `max_calls` acquisitions succeed within any `window`. Slots free
/// themselves as their timestamps age out; dropping a permit releases nothing.
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_calls", &self.max_calls)
            .field("window", &self.window)
            .finish()
    }
}

impl Default for RateLimiter {
    /// 100 calls per 60 seconds
    fn default() -> Self {
        Self::new(100, Duration::from_secs(60))
    }
}

/// Proof of a successful acquisition
#[derive(Debug)]
#[must_use = "a permit does nothing unless the guarded work runs"]
pub struct RatePermit<'a> {
    limiter: &'a RateLimiter,
    acquired_at: Instant,
}

impl RatePermit<'_> {
    pub fn acquired_at(&self) -> Instant {
        self.acquired_at
    }

    /// Slots left in the window right after this acquisition
    pub fn remaining(&self) -> usize {
        self.limiter.remaining()
    }
}

impl RateLimiter {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self::with_clock(max_calls, window, Arc::new(SystemClock))
    }

    pub fn with_clock(max_calls: usize, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_calls,
            window,
            calls: Mutex::new(VecDeque::with_capacity(max_calls)),
            clock,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_calls, config.window())
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn prune(&self, calls: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = calls.front() {
            if now.saturating_duration_since(oldest) < self.window {
                break;
            }
            calls.pop_front();
        }
    }

    /// Prune, check and record as one critical section
    pub fn acquire(&self) -> Result<RatePermit<'_>> {
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        let now = self.clock.now();
        self.prune(&mut calls, now);

        if calls.len() >= self.max_calls {
            log::warn!(
                "Rate limit exceeded: {} call(s) already recorded in the last {:?}",
                calls.len(),
                self.window
            );
            return Err(SecurityError::RateLimitExceeded {
                max_calls: self.max_calls,
                window_secs: self.window.as_secs_f64(),
            }
            .into());
        }

        calls.push_back(now);
        Ok(RatePermit {
            limiter: self,
            acquired_at: now,
        })
    }

    /// Run `body` only if a permit can be acquired
    pub fn scope<T>(&self, body: impl FnOnce() -> T) -> Result<T> {
        let _permit = self.acquire()?;
        Ok(body())
    }

    /// Like `scope`, for bodies that can fail themselves
    pub fn try_scope<T>(&self, body: impl FnOnce() -> Result<T>) -> Result<T> {
        let _permit = self.acquire()?;
        body()
    }

    /// Acquisitions that would succeed right now
    pub fn remaining(&self) -> usize {
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        let now = self.clock.now();
        self.prune(&mut calls, now);
        self.max_calls.saturating_sub(calls.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::function::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn limiter(max_calls: usize, window_ms: u64) -> (Arc<ManualClock>, RateLimiter) {
        let clock = Arc::new(ManualClock::new());
        let limiter = RateLimiter::with_clock(max_calls, Duration::from_millis(window_ms), clock.clone());
        (clock, limiter)
    }

    #[test]
    fn test_allows_up_to_max_calls_then_rejects() {
        let (clock, limiter) = limiter(2, 1000);
        assert!(limiter.acquire().is_ok());
        clock.advance(Duration::from_millis(100));
        assert!(limiter.acquire().is_ok());

        let err = limiter.acquire().unwrap_err();
        assert!(err.is_rate_limited());
        assert!(matches!(
            err,
            AppError::Security(SecurityError::RateLimitExceeded { max_calls: 2, .. })
        ));

        // first slot ages out at exactly one window
        clock.advance(Duration::from_millis(900));
        assert_eq!(limiter.remaining(), 1);
        assert!(limiter.acquire().is_ok());
        assert!(limiter.acquire().is_err());
    }

    #[test]
    fn test_scope_does_not_run_body_when_limited() {
        let (_clock, limiter) = limiter(1, 1000);
        let runs = AtomicUsize::new(0);

        assert_eq!(limiter.scope(|| runs.fetch_add(1, Ordering::SeqCst)).unwrap(), 0);
        assert!(limiter.scope(|| runs.fetch_add(1, Ordering::SeqCst)).is_err());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failing_body_still_consumes_slot() {
        let (_clock, limiter) = limiter(2, 1000);
        let result: Result<()> = limiter.try_scope(|| {
            Err(SecurityError::Authorization {
                message: "denied".to_string(),
            }
            .into())
        });
        assert!(result.is_err());
        assert_eq!(limiter.remaining(), 1);
    }

    #[test]
    fn test_concurrent_acquisitions_never_exceed_limit() {
        let limiter = Arc::new(RateLimiter::new(10, Duration::from_secs(60)));
        let granted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let granted = Arc::clone(&granted);
                thread::spawn(move || {
                    for _ in 0..5 {
                        if limiter.acquire().is_ok() {
                            granted.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(granted.load(Ordering::SeqCst), 10);
        assert_eq!(limiter.remaining(), 0);
    }

    #[test]
    fn test_from_config() {
        let config = RateLimitConfig {
            max_calls: 3,
            time_window_secs: 1.5,
        };
        let limiter = RateLimiter::from_config(&config);
        assert_eq!(limiter.max_calls(), 3);
        assert_eq!(limiter.window(), Duration::from_millis(1500));
        let permit = limiter.acquire().unwrap();
        assert_eq!(permit.remaining(), 2);
    }
}
