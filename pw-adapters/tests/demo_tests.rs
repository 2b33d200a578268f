//! Integration tests for the DemoPedals source

use pw_adapters::demo::{DEMO_PRODUCT_ID, DEMO_VENDOR_ID};
use pw_adapters::DemoPedals;
use pw_core::axis::{normalize, threshold, AxisChannel, RAW_AXIS_MAX};
use pw_core::source::{find_device, AxisSource, SampleFlags, SourceError};

const RAW: SampleFlags = SampleFlags { raw_data: true };

#[test]
fn test_demo_source_name() {
    let source = DemoPedals::new();
    assert_eq!(source.name(), "Demo");
}

#[test]
fn test_demo_source_exposes_single_device() {
    let source = DemoPedals::new();
    assert_eq!(source.device_count(), 1);

    let caps = source.capabilities(0).unwrap();
    assert_eq!(caps.vendor_id, DEMO_VENDOR_ID);
    assert_eq!(caps.product_id, DEMO_PRODUCT_ID);

    assert_eq!(source.capabilities(1), Err(SourceError::InvalidDevice(1)));
}

#[test]
fn test_demo_source_found_by_vendor_and_product() {
    let source = DemoPedals::new();
    assert_eq!(find_device(&source, DEMO_VENDOR_ID, DEMO_PRODUCT_ID), Some(0));
    assert_eq!(find_device(&source, DEMO_VENDOR_ID, 0x0001), None);
}

#[test]
fn test_demo_source_rejects_other_device_ids() {
    let mut source = DemoPedals::new();
    assert_eq!(source.sample(3, RAW), Err(SourceError::InvalidDevice(3)));
}

#[test]
fn test_straight_is_flat_out() {
    let source = DemoPedals::new();
    let positions = source.positions_at(2.0);
    assert_eq!(positions.throttle, 1.0);
    assert_eq!(positions.brake, 0.0);
    assert_eq!(positions.clutch, 0.0);
}

#[test]
fn test_braking_zone_starts_with_clutch_blip() {
    let source = DemoPedals::new();
    // First braking zone begins 8s into the lap
    let positions = source.positions_at(8.0);
    assert_eq!(positions.throttle, 0.0);
    assert!(positions.brake > 0.9, "brake was {}", positions.brake);
    assert!(positions.clutch > 0.9, "clutch was {}", positions.clutch);

    let later = source.positions_at(9.5);
    assert_eq!(later.clutch, 0.0);
}

#[test]
fn test_positions_repeat_every_lap() {
    let source = DemoPedals::new();
    let lap = 40.0;
    assert_eq!(source.positions_at(11.0), source.positions_at(11.0 + lap));
}

#[test]
fn test_snapshot_is_inverted_by_default() {
    let mut source = DemoPedals::new();
    let snapshot = source.snapshot_at(2.0, RAW);

    // Idle channels read axis max, the pressed throttle reads near 0
    assert_eq!(snapshot.x, RAW_AXIS_MAX);
    assert_eq!(snapshot.u, RAW_AXIS_MAX);
    assert_eq!(snapshot.v, RAW_AXIS_MAX);
    assert_eq!(snapshot.channel(AxisChannel::R), RAW_AXIS_MAX);
    assert!(snapshot.channel(AxisChannel::Y) < 10);

    let gas = normalize(snapshot.channel(AxisChannel::Y), RAW_AXIS_MAX, true);
    assert!(gas >= threshold(RAW_AXIS_MAX, 99));
}

#[test]
fn test_non_inverted_snapshot_rests_at_zero() {
    let mut source = DemoPedals::new().non_inverted();
    let snapshot = source.snapshot_at(2.0, RAW);

    assert_eq!(snapshot.x, 0);
    assert_eq!(snapshot.channel(AxisChannel::R), 0);
    assert!(snapshot.channel(AxisChannel::Y) > threshold(RAW_AXIS_MAX, 99));
}

#[test]
fn test_full_range_without_raw_flag() {
    let mut source = DemoPedals::new();
    let snapshot = source.snapshot_at(20.0, SampleFlags { raw_data: false });
    // Idle channels at the 16-bit maximum
    assert_eq!(snapshot.x, 65535);
}

#[test]
fn test_throttle_ceiling_limits_travel() {
    let mut source = DemoPedals::new().with_throttle_ceiling(0.85);
    assert!((source.positions_at(2.0).throttle - 0.85).abs() < f32::EPSILON);

    for step in 0..200 {
        let lap_time = step as f32 * 0.2;
        let snapshot = source.snapshot_at(lap_time, RAW);
        let gas = normalize(snapshot.channel(AxisChannel::Y), RAW_AXIS_MAX, true);
        assert!(gas <= 870, "gas {} at t={} exceeds the ceiling", gas, lap_time);
    }
}

#[test]
fn test_live_sample_stays_in_range() {
    let mut source = DemoPedals::new();
    for _ in 0..50 {
        let snapshot = source.sample(0, RAW).unwrap();
        for channel in [
            AxisChannel::X,
            AxisChannel::Y,
            AxisChannel::Z,
            AxisChannel::R,
            AxisChannel::U,
            AxisChannel::V,
        ] {
            assert!(snapshot.channel(channel) <= RAW_AXIS_MAX);
        }
    }
}
