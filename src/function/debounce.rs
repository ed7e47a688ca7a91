use crate::Result;
use crate::error::FunctionError;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Default)]
struct State {
    pending: Option<JoinHandle<()>>,
    burst_start: Option<Instant>,
    generation: u64,
    fired: u64,
}

/// Trailing-edge debounce on the tokio runtime.
///
/// Every call supersedes the pending firing; the function runs once, `wait`
/// after the last call of a burst, with that call's arguments. With a
/// `max_wait`, a continuous burst still fires no later than `max_wait` after
/// its first call. The firing happens on a runtime task, never inline.
pub struct Debounced<A> {
    func: Arc<dyn Fn(A) + Send + Sync>,
    wait: Duration,
    max_wait: Option<Duration>,
    runtime: Handle,
    state: Arc<Mutex<State>>,
}

impl<A> Clone for Debounced<A> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
            wait: self.wait,
            max_wait: self.max_wait,
            runtime: self.runtime.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<A> fmt::Debug for Debounced<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debounced")
            .field("wait", &self.wait)
            .field("max_wait", &self.max_wait)
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl<A: Send + 'static> Debounced<A> {
    /// Must be called from within a tokio runtime
    pub fn new<F>(wait: Duration, func: F) -> Result<Self>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::with_max_wait(wait, None, func)
    }

    pub fn with_max_wait<F>(wait: Duration, max_wait: Option<Duration>, func: F) -> Result<Self>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| FunctionError::NoRuntime {
            primitive: "debounce".to_string(),
        })?;
        Ok(Self {
            func: Arc::new(func),
            wait,
            max_wait,
            runtime,
            state: Arc::new(Mutex::new(State::default())),
        })
    }

    /// Schedule a firing with `args`, cancelling any pending one
    pub fn call(&self, args: A) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = state.pending.take() {
            previous.abort();
        }

        let now = Instant::now();
        let burst_start = *state.burst_start.get_or_insert(now);
        let mut deadline = now + self.wait;
        if let Some(max_wait) = self.max_wait {
            deadline = deadline.min(burst_start + max_wait);
        }

        log::debug!("Debounce rescheduled, firing in {:?}", deadline - now);
        state.generation += 1;
        let generation = state.generation;
        let func = Arc::clone(&self.func);
        let shared = Arc::clone(&self.state);

        state.pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            {
                let mut state = shared.lock().unwrap_or_else(|e| e.into_inner());
                if state.generation != generation {
                    return;
                }
                state.pending = None;
                state.burst_start = None;
                state.fired += 1;
            }
            func(args);
        }));
    }
}

impl<A> Debounced<A> {
    pub fn is_pending(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Number of firings so far
    pub fn fired(&self) -> u64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).fired
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }
}
