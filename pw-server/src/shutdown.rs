//! Process-wide stop signal
//!
//! Set exactly once. The sampler thread waits on it between iterations
//! (blocking, with timeout) and async tasks await its cancellation token,
//! so every loop wakes up promptly instead of polling.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Default)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    token: CancellationToken,
    stopped: Mutex<bool>,
    cvar: Condvar,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag. Returns false if it was already set.
    pub fn trigger(&self) -> bool {
        let mut stopped = self
            .inner
            .stopped
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *stopped {
            return false;
        }
        *stopped = true;
        self.inner.cvar.notify_all();
        self.inner.token.cancel();
        true
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Block for up to `timeout`. Returns true if shutdown was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let stopped = self
            .inner
            .stopped
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (stopped, _) = self
            .inner
            .cvar
            .wait_timeout_while(stopped, timeout, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *stopped
    }

    /// Resolves once shutdown is requested
    pub async fn cancelled(&self) {
        self.inner.token.cancelled().await
    }

    pub fn token(&self) -> CancellationToken {
        self.inner.token.clone()
    }
}
