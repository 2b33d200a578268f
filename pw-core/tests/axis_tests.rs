//! Tests for axis normalization and travel percentages

use pw_core::axis::{
    axis_max, normalize, percent_of, physical_percent, threshold, AxisChannel, AxisSnapshot,
    PedalThresholds, FULL_AXIS_MAX, RAW_AXIS_MAX,
};

#[test]
fn test_axis_max_depends_on_raw_mode() {
    assert_eq!(axis_max(true), RAW_AXIS_MAX);
    assert_eq!(axis_max(false), FULL_AXIS_MAX);
}

#[test]
fn test_normalize_inverts_when_requested() {
    assert_eq!(normalize(1023, 1023, true), 0);
    assert_eq!(normalize(0, 1023, true), 1023);
    assert_eq!(normalize(300, 1023, true), 723);
}

#[test]
fn test_normalize_passthrough() {
    assert_eq!(normalize(300, 1023, false), 300);
    assert_eq!(normalize(65535, 65535, false), 65535);
}

#[test]
fn test_normalize_out_of_range_raw_saturates() {
    assert_eq!(normalize(2000, 1023, true), 0);
}

#[test]
fn test_threshold_uses_integer_math() {
    assert_eq!(threshold(1023, 5), 51);
    assert_eq!(threshold(1023, 93), 951);
    assert_eq!(threshold(65535, 93), 60947);
    assert_eq!(threshold(65535, 100), 65535);
}

#[test]
fn test_percent_of_truncates() {
    assert_eq!(percent_of(500, 1023), 48);
    assert_eq!(percent_of(1023, 1023), 100);
    assert_eq!(percent_of(0, 1023), 0);
    assert_eq!(percent_of(10, 0), 0);
}

#[test]
fn test_physical_percent() {
    assert_eq!(physical_percent(0, 1023), 0.0);
    assert_eq!(physical_percent(1023, 1023), 100.0);
    assert!((physical_percent(32767, 65535) - 50.0).abs() < 0.01);
}

#[test]
fn test_logical_percent_interpolates_between_thresholds() {
    let thresholds = PedalThresholds::from_percent(1023, 5, 93);
    assert_eq!(thresholds.idle_max, 51);
    assert_eq!(thresholds.full_min, 951);

    assert_eq!(thresholds.logical_percent(0), 0.0);
    assert_eq!(thresholds.logical_percent(51), 0.0);
    assert_eq!(thresholds.logical_percent(951), 100.0);
    assert_eq!(thresholds.logical_percent(1023), 100.0);
    assert!((thresholds.logical_percent(501) - 50.0).abs() < 0.01);
}

#[test]
fn test_logical_percent_with_inverted_limits_is_zero() {
    let thresholds = PedalThresholds::from_percent(1023, 90, 10);
    assert_eq!(thresholds.logical_percent(500), 0.0);
    assert_eq!(thresholds.logical_percent(1023), 0.0);
}

#[test]
fn test_snapshot_channel_access() {
    let mut snapshot = AxisSnapshot::default();
    snapshot.set_channel(AxisChannel::R, 77);
    snapshot.set_channel(AxisChannel::V, 3);

    assert_eq!(snapshot.r, 77);
    assert_eq!(snapshot.channel(AxisChannel::R), 77);
    assert_eq!(snapshot.channel(AxisChannel::V), 3);
    assert_eq!(snapshot.channel(AxisChannel::X), 0);
}
