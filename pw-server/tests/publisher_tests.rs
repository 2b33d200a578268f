//! Tests for the drop-oldest frame queue

use pw_core::axis::PedalThresholds;
use pw_core::clutch::ClutchState;
use pw_core::gas::{GasMonitor, GasSettings};
use pw_core::model::{
    AxisState, ConfigSnapshot, EstimatorSnapshot, EventFlags, Frame, FrameTiming, PedalReading,
    RuntimeState,
};
use pw_core::MonitorConfig;
use pw_server::publisher::FrameQueue;
use std::sync::Arc;
use std::time::Duration;

fn frame() -> Frame {
    let config = MonitorConfig::default();
    let gas = GasMonitor::new(GasSettings::from(&config.gas), 65535, 0);
    let reading = PedalReading::new(0, 0, 65535, &PedalThresholds::from_percent(65535, 5, 93));
    Frame {
        sequence: 0,
        source: "Test".to_string(),
        device_id: 0,
        config: ConfigSnapshot::capture(&config, gas.deadzone_out()),
        axes: AxisState {
            axis_max: 65535,
            gas: reading,
            clutch: reading,
            brake: reading,
        },
        runtime: RuntimeState::capture(gas.state(), gas.idle_max(), gas.full_min(), ClutchState::default()),
        estimator: EstimatorSnapshot::from(gas.estimator()),
        events: EventFlags::default(),
        timing: FrameTiming::default(),
    }
}

#[test]
fn test_sequence_starts_at_one_without_gaps() {
    let queue = FrameQueue::new(16);
    assert_eq!(queue.last_sequence(), 0);

    let assigned: Vec<u64> = (0..5).map(|_| queue.publish(frame())).collect();
    assert_eq!(assigned, vec![1, 2, 3, 4, 5]);
    assert_eq!(queue.last_sequence(), 5);

    let drained: Vec<u64> = queue.drain().iter().map(|f| f.sequence).collect();
    assert_eq!(drained, vec![1, 2, 3, 4, 5]);
    assert!(queue.is_empty());
}

#[test]
fn test_publish_stamps_enqueue_time() {
    let queue = FrameQueue::new(4);
    queue.publish(frame());
    let frames = queue.drain();
    assert!(frames[0].timing.enqueued_at_unix_ms > 0);
}

#[test]
fn test_overflow_drops_oldest() {
    let queue = FrameQueue::new(4);
    for _ in 0..10 {
        queue.publish(frame());
    }

    assert_eq!(queue.len(), 4);
    assert_eq!(queue.dropped_frames(), 6);

    let drained: Vec<u64> = queue.drain().iter().map(|f| f.sequence).collect();
    assert_eq!(drained, vec![7, 8, 9, 10]);
}

#[test]
fn test_consumer_sees_contiguous_suffix() {
    let queue = FrameQueue::new(8);
    let mut seen = Vec::new();
    for round in 0..5 {
        for _ in 0..(round * 4) {
            queue.publish(frame());
        }
        seen.extend(queue.drain().iter().map(|f| f.sequence));
    }

    // Every drop is counted, everything else arrives in order
    let published = queue.last_sequence();
    assert_eq!(seen.len() as u64 + queue.dropped_frames(), published);
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_empty_drain() {
    let queue = FrameQueue::default();
    assert!(queue.drain().is_empty());
    assert_eq!(queue.capacity(), 1024);
}

#[test]
fn test_publish_never_blocks_on_slow_consumer() {
    let queue = Arc::new(FrameQueue::new(2));
    let producer = {
        let queue = queue.clone();
        std::thread::spawn(move || {
            for _ in 0..1000 {
                queue.publish(frame());
            }
        })
    };
    producer.join().unwrap();

    assert_eq!(queue.last_sequence(), 1000);
    assert_eq!(queue.dropped_frames(), 998);
}

#[tokio::test]
async fn test_publish_wakes_waiting_consumer() {
    let queue = Arc::new(FrameQueue::new(8));
    let consumer = {
        let queue = queue.clone();
        tokio::spawn(async move {
            queue.notified().await;
            queue.drain()
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    queue.publish(frame());

    let frames = tokio::time::timeout(Duration::from_secs(2), consumer)
        .await
        .expect("consumer should wake")
        .unwrap();
    assert_eq!(frames.len(), 1);
}
