//! Telemetry publisher: bounded, non-blocking frame backlog
//!
//! The sampling thread is the only producer. `publish` never blocks and
//! never fails: when the backlog is full the oldest frame is evicted and
//! counted. The stream consumer drains front to back and sleeps on a
//! notification between batches.

use chrono::Utc;
use crossbeam::queue::ArrayQueue;
use pw_core::Frame;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

/// Default backlog size
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

pub struct FrameQueue {
    frames: ArrayQueue<Arc<Frame>>,
    notify: Notify,
    last_sequence: AtomicU64,
    dropped: AtomicU64,
}

impl FrameQueue {
    /// # Panics
    ///
    /// Panics if capacity is 0.
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: ArrayQueue::new(capacity),
            notify: Notify::new(),
            last_sequence: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Stamp and enqueue a frame, evicting the oldest one when full.
    ///
    /// Returns the sequence number assigned to the frame.
    pub fn publish(&self, mut frame: Frame) -> u64 {
        let sequence = self.last_sequence.fetch_add(1, Ordering::AcqRel) + 1;
        frame.sequence = sequence;
        frame.timing.enqueued_at_unix_ms = Utc::now().timestamp_millis();

        if self.frames.force_push(Arc::new(frame)).is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.notify.notify_one();
        sequence
    }

    /// Take every frame queued right now, oldest first
    pub fn drain(&self) -> Vec<Arc<Frame>> {
        let available = self.frames.len();
        let mut frames = Vec::with_capacity(available);
        // Bounded so a fast producer can't keep us here
        for _ in 0..available {
            match self.frames.pop() {
                Some(frame) => frames.push(frame),
                None => break,
            }
        }
        frames
    }

    /// Completes after the next publish (or immediately if one happened
    /// since the last wait)
    pub fn notified(&self) -> Notified<'_> {
        self.notify.notified()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.frames.capacity()
    }

    /// Frames evicted since startup
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Sequence of the most recent publish, 0 before the first
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence.load(Ordering::Acquire)
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
