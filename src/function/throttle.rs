use crate::function::clock::{Clock, SystemClock};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Leading-edge throttle.
///
/// The first call runs immediately; calls within `wait` of the last actual
/// invocation are dropped, not queued.
pub struct Throttled<F> {
    func: F,
    wait: Duration,
    last: Mutex<Option<Instant>>,
    clock: Arc<dyn Clock>,
}

impl<F> fmt::Debug for Throttled<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throttled")
            .field("wait", &self.wait)
            .field("clock", &self.clock)
            .finish()
    }
}

impl<F> Throttled<F> {
    pub fn new(func: F, wait: Duration) -> Self {
        Self::with_clock(func, wait, Arc::new(SystemClock))
    }

    pub fn with_clock(func: F, wait: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            func,
            wait,
            last: Mutex::new(None),
            clock,
        }
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Record an invocation at `now` if the window allows one
    fn admit(&self) -> bool {
        let now = self.clock.now();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        match *last {
            Some(previous) if now.saturating_duration_since(previous) < self.wait => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// `Some(result)` when the function ran, `None` when the call was dropped
    pub fn call<A, R>(&self, args: A) -> Option<R>
    where
        F: Fn(A) -> R,
    {
        if self.admit() {
            Some((self.func)(args))
        } else {
            log::debug!("Throttled call dropped");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_leading_edge_drops_calls_inside_window() {
        let clock = Arc::new(ManualClock::new());
        let throttled = Throttled::with_clock(|x: i32| x * 10, Duration::from_millis(100), clock.clone());

        assert_eq!(throttled.call(1), Some(10));
        clock.advance(Duration::from_millis(50));
        assert_eq!(throttled.call(2), None);
        clock.advance(Duration::from_millis(49));
        assert_eq!(throttled.call(3), None);
        clock.advance(Duration::from_millis(1));
        // exactly `wait` after the last invocation
        assert_eq!(throttled.call(4), Some(40));
        assert_eq!(throttled.call(5), None);
    }

    #[test]
    fn test_dropped_calls_do_not_extend_window() {
        let clock = Arc::new(ManualClock::new());
        let counter = AtomicUsize::new(0);
        let throttled = Throttled::with_clock(
            |_: ()| counter.fetch_add(1, Ordering::SeqCst),
            Duration::from_millis(100),
            clock.clone(),
        );
        for _ in 0..10 {
            throttled.call(());
            clock.advance(Duration::from_millis(30));
        }
        // invocations at 0, 120, 240
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_steady_calls_over_long_window() {
        let clock = Arc::new(ManualClock::new());
        let counter = AtomicUsize::new(0);
        let throttled = Throttled::with_clock(
            |_: ()| counter.fetch_add(1, Ordering::SeqCst),
            Duration::from_millis(1000),
            clock.clone(),
        );
        let mut ran_at = Vec::new();
        for i in 0..26u64 {
            if throttled.call(()).is_some() {
                ran_at.push(i * 100);
            }
            clock.advance(Duration::from_millis(100));
        }
        assert!(counter.load(Ordering::SeqCst) <= 3);
        assert_eq!(ran_at, vec![0, 1000, 2000]);
    }

    #[test]
    fn test_zero_wait_never_drops() {
        let throttled = Throttled::new(|()| (), Duration::ZERO);
        assert!((0..5).all(|_| throttled.call(()).is_some()));
    }
}
