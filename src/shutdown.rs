use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// A one-shot, process-wide cancellation signal.
///
/// Clones share state; triggering any clone wakes every task sleeping in
/// [`Shutdown::wait_timeout`].
#[derive(Clone, Default)]
pub struct Shutdown {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        let (lock, cvar) = &*self.inner;
        let mut triggered = lock.lock().unwrap_or_else(|e| e.into_inner());
        *triggered = true;
        cvar.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sleep for `timeout` or until triggered, whichever comes first.
    /// Returns true if the signal fired. A timeout too large to represent as
    /// an `Instant` waits for the trigger alone.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let mut triggered = lock.lock().unwrap_or_else(|e| e.into_inner());

        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            None => {
                while !*triggered {
                    triggered = cvar.wait(triggered).unwrap_or_else(|e| e.into_inner());
                }
                return true;
            }
        };

        while !*triggered {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            triggered = match cvar.wait_timeout(triggered, deadline - now) {
                Ok((guard, _)) => guard,
                Err(e) => e.into_inner().0,
            };
        }

        true
    }
}
