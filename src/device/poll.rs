use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Shared cancellation flag for polling loops.
///
/// Clones observe the same flag. `sleep` wakes early once `cancel` is called
/// from any clone.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (lock, cvar) = &*self.inner;
        match lock.lock() {
            Ok(mut cancelled) => *cancelled = true,
            Err(poisoned) => *poisoned.into_inner() = true,
        }
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        let (lock, _) = &*self.inner;
        match lock.lock() {
            Ok(cancelled) => *cancelled,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns `false` if the token was (or became) cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let guard = match lock.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if duration.is_zero() {
            return !*guard;
        }
        let result = cvar.wait_timeout_while(guard, duration, |cancelled| !*cancelled);
        match result {
            Ok((cancelled, _)) => !*cancelled,
            Err(poisoned) => !*poisoned.into_inner().0,
        }
    }
}

/// Result of a polling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Found { value: T, attempts: usize },
    TimedOut { attempts: usize },
    Cancelled { attempts: usize },
}

impl<T> PollOutcome<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, PollOutcome::Found { .. })
    }

    pub fn attempts(&self) -> usize {
        match self {
            PollOutcome::Found { attempts, .. }
            | PollOutcome::TimedOut { attempts }
            | PollOutcome::Cancelled { attempts } => *attempts,
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            PollOutcome::Found { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Fixed-interval retry loop with a wall-clock deadline.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Poller {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Poller { interval, timeout }
    }

    /// Run `check` until it yields a value, the deadline passes, or the
    /// token is cancelled.
    ///
    /// At least one check always runs. After a miss, the loop gives up
    /// without sleeping when the next check would land at or past the
    /// deadline. The deadline is only inspected between checks, so one slow
    /// check can overrun it.
    pub fn poll<T, F>(&self, token: &CancelToken, mut check: F) -> PollOutcome<T>
    where
        F: FnMut(usize) -> Option<T>,
    {
        let start = Instant::now();
        let mut attempts = 0;

        loop {
            if token.is_cancelled() {
                return PollOutcome::Cancelled { attempts };
            }

            attempts += 1;
            if let Some(value) = check(attempts) {
                return PollOutcome::Found { value, attempts };
            }

            if start.elapsed() + self.interval >= self.timeout {
                return PollOutcome::TimedOut { attempts };
            }

            if !token.sleep(self.interval) {
                return PollOutcome::Cancelled { attempts };
            }
        }
    }
}
