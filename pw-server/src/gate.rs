//! Single-consumer gate for the telemetry stream
//!
//! At most one stream consumer holds the slot. A new consumer is turned
//! away unless it asks for a takeover, in which case the current stream is
//! cancelled and the newcomer waits (bounded) for the slot to be released.
//! The slot is released when the [`ConsumerLease`] drops, which covers
//! normal ends, client disconnects and error paths alike.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    #[error("another consumer is already streaming")]
    Busy,

    #[error("current consumer did not release the stream in time")]
    TakeoverTimedOut,
}

/// Held by the active stream for its whole lifetime
#[derive(Debug)]
pub struct ConsumerLease {
    _permit: OwnedSemaphorePermit,
    cancel: CancellationToken,
}

impl ConsumerLease {
    /// Cancelled when another consumer takes over
    pub fn cancelled_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

pub struct ConsumerGate {
    slot: Arc<Semaphore>,
    active: Mutex<Option<CancellationToken>>,
}

impl ConsumerGate {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Semaphore::new(1)),
            active: Mutex::new(None),
        }
    }

    /// Acquire-or-fail; with `takeover`, evict the current consumer first
    pub async fn acquire(&self, takeover: bool, wait: Duration) -> Result<ConsumerLease, GateError> {
        if let Ok(permit) = self.slot.clone().try_acquire_owned() {
            return Ok(self.grant(permit));
        }
        if !takeover {
            return Err(GateError::Busy);
        }

        if let Some(current) = self.lock_active().take() {
            info!("Stream takeover requested, stopping current consumer");
            current.cancel();
        }

        match tokio::time::timeout(wait, self.slot.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Ok(self.grant(permit)),
            // The semaphore is never closed
            Ok(Err(_)) => Err(GateError::Busy),
            Err(_) => Err(GateError::TakeoverTimedOut),
        }
    }

    fn grant(&self, permit: OwnedSemaphorePermit) -> ConsumerLease {
        let cancel = CancellationToken::new();
        *self.lock_active() = Some(cancel.clone());
        ConsumerLease {
            _permit: permit,
            cancel,
        }
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a consumer currently holds the slot
    pub fn is_active(&self) -> bool {
        self.slot.available_permits() == 0
    }
}

impl Default for ConsumerGate {
    fn default() -> Self {
        Self::new()
    }
}
