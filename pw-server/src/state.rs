//! Application state management

use crate::gate::ConsumerGate;
use crate::publisher::FrameQueue;
use crate::shutdown::Shutdown;
use pw_core::MonitorConfig;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

/// Shared context handed to the sampler and every server task
#[derive(Clone)]
pub struct AppState {
    /// Validated configuration
    pub config: Arc<MonitorConfig>,

    /// Frame backlog; the sampler is the only producer
    pub queue: Arc<FrameQueue>,

    /// Single stream consumer slot
    pub gate: Arc<ConsumerGate>,

    /// Stop flag for every loop
    pub shutdown: Shutdown,

    /// Distribution counters
    pub stats: Arc<StreamStats>,
}

/// Counters touched by stream workers
#[derive(Debug, Default)]
pub struct StreamStats {
    next_batch_id: AtomicU64,
    batches_sent: AtomicU64,
    last_served_unix_ms: AtomicI64,
}

impl StreamStats {
    /// Allocate the next batch id, starting at 1
    pub fn next_batch_id(&self) -> u64 {
        self.next_batch_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_sent(&self, served_at_unix_ms: i64) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.last_served_unix_ms
            .store(served_at_unix_ms, Ordering::Relaxed);
    }

    pub fn batches_sent(&self) -> u64 {
        self.batches_sent.load(Ordering::Relaxed)
    }

    /// 0 until the first batch goes out
    pub fn last_served_unix_ms(&self) -> i64 {
        self.last_served_unix_ms.load(Ordering::Relaxed)
    }
}

impl AppState {
    pub fn new(config: MonitorConfig) -> Self {
        let queue = FrameQueue::new(config.server.queue_capacity);
        Self {
            config: Arc::new(config),
            queue: Arc::new(queue),
            gate: Arc::new(ConsumerGate::new()),
            shutdown: Shutdown::new(),
            stats: Arc::new(StreamStats::default()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}
