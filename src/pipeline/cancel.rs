//! Cooperative cancellation shared between a running trainer and its caller

use std::{
    sync::{Arc, Condvar, Mutex, MutexGuard},
    time::{Duration, Instant},
};

#[derive(Debug, Default)]
struct CancelState {
    cancelled: Mutex<bool>,
    signal: Condvar,
}

impl CancelState {
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Cloneable cancellation flag. Safe to signal from any thread.
///
/// The trainer polls it at every episode and step boundary; [`wait_timeout`] lets the
/// per-step delay end early once cancellation is requested.
///
/// [`wait_timeout`]: CancelToken::wait_timeout
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<CancelState>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake any pending wait.
    pub fn cancel(&self) {
        *self.state.lock() = true;
        self.state.signal.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.state.lock()
    }

    /// Sleep for `duration` unless cancelled first. Returns whether cancellation was seen.
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut cancelled = self.state.lock();
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            cancelled = match self.state.signal.wait_timeout(cancelled, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_wait_times_out_without_cancel() {
        let token = CancelToken::new();
        assert!(!token.wait_timeout(Duration::from_millis(5)));
    }

    #[test]
    fn test_wait_wakes_on_cancel() {
        let token = CancelToken::new();
        let remote = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });
        let started = Instant::now();
        assert!(token.wait_timeout(Duration::from_secs(30)));
        assert!(started.elapsed() < Duration::from_secs(10));
        handle.join().unwrap();
    }
}
