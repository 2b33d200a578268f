//! Tests for gas drift detection and the deadzone estimator
//!
//! Times are in ms, sampled once per second unless noted.

use pw_core::axis::threshold;
use pw_core::config::GasConfig;
use pw_core::gas::{GasActivity, GasEvents, GasMonitor, GasSettings};

const AXIS_MAX: u32 = 1023;
const STEP_MS: usize = 1000;

fn settings() -> GasSettings {
    GasSettings::from(&GasConfig::default())
}

fn estimating(auto_adjust_minimum: Option<u32>) -> GasSettings {
    GasSettings {
        estimate: true,
        auto_adjust_minimum,
        ..settings()
    }
}

/// Hold `value` from `from_ms` to `to_ms` inclusive, keep non-empty events
fn hold(gas: &mut GasMonitor, value: u32, from_ms: u64, to_ms: u64) -> Vec<(u64, GasEvents)> {
    (from_ms..=to_ms)
        .step_by(STEP_MS)
        .filter_map(|now| {
            let events = gas.update(value, now);
            (events != GasEvents::default()).then_some((now, events))
        })
        .collect()
}

fn drift_alerts(events: &[(u64, GasEvents)]) -> Vec<(u64, u32)> {
    events
        .iter()
        .filter_map(|(now, e)| e.drift_alert.map(|pct| (*now, pct)))
        .collect()
}

#[test]
fn test_thresholds_from_default_deadzones() {
    let gas = GasMonitor::new(settings(), AXIS_MAX, 0);
    assert_eq!(gas.idle_max(), 51);
    assert_eq!(gas.full_min(), 951);
    assert_eq!(gas.deadzone_out(), 93);
    assert_eq!(gas.state().activity, GasActivity::Idle);
}

#[test]
fn test_partial_throttle_raises_one_alert_at_48_percent() {
    let mut gas = GasMonitor::new(settings(), AXIS_MAX, 0);
    let events = hold(&mut gas, 500, 0, 90_000);

    // Window of 30s is exceeded at 31s; cooldown keeps it to one alert
    assert_eq!(drift_alerts(&events), vec![(31_000, 48)]);
    assert_eq!(gas.state().last_alert_ms, Some(31_000));
}

#[test]
fn test_alert_repeats_after_cooldown() {
    let mut gas = GasMonitor::new(settings(), AXIS_MAX, 0);
    let events = hold(&mut gas, 500, 0, 160_000);

    assert_eq!(
        drift_alerts(&events),
        vec![(31_000, 48), (92_000, 48), (153_000, 48)]
    );
}

#[test]
fn test_full_throttle_restarts_window() {
    let mut gas = GasMonitor::new(settings(), AXIS_MAX, 0);
    let mut events = hold(&mut gas, 500, 0, 19_000);
    events.extend(hold(&mut gas, 1000, 20_000, 20_000));
    assert_eq!(gas.state().peak_in_window, 0);
    assert_eq!(gas.state().last_full_throttle_ms, 20_000);

    events.extend(hold(&mut gas, 500, 21_000, 50_000));
    assert!(drift_alerts(&events).is_empty());

    events.extend(hold(&mut gas, 500, 51_000, 51_000));
    assert_eq!(drift_alerts(&events), vec![(51_000, 48)]);
}

#[test]
fn test_usage_at_minimum_does_not_alert() {
    let mut gas = GasMonitor::new(settings(), AXIS_MAX, 0);
    // 210 is exactly 20% of travel
    let events = hold(&mut gas, 210, 0, 120_000);
    assert!(drift_alerts(&events).is_empty());

    let mut gas = GasMonitor::new(settings(), AXIS_MAX, 0);
    let events = hold(&mut gas, 215, 0, 40_000);
    assert_eq!(drift_alerts(&events), vec![(31_000, 21)]);
}

#[test]
fn test_idle_gas_never_races() {
    let mut gas = GasMonitor::new(settings(), AXIS_MAX, 0);
    let events = hold(&mut gas, 51, 0, 100_000);
    assert!(events.is_empty());
    assert_eq!(gas.state().activity, GasActivity::Idle);
}

#[test]
fn test_racing_pauses_after_timeout() {
    let mut gas = GasMonitor::new(settings(), AXIS_MAX, 0);
    gas.update(500, 0);
    assert_eq!(gas.state().activity, GasActivity::Racing);

    gas.update(0, 5_000);
    gas.update(0, 10_000);
    assert_eq!(gas.state().activity, GasActivity::Racing);

    gas.update(0, 10_001);
    assert_eq!(gas.state().activity, GasActivity::Idle);

    // Resuming restarts the window from the resume time
    gas.update(500, 50_000);
    assert_eq!(gas.state().activity, GasActivity::Racing);
    assert_eq!(gas.state().last_full_throttle_ms, 50_000);
}

#[test]
fn test_estimator_accepts_window_at_minimum_usage() {
    let mut gas = GasMonitor::new(estimating(None), AXIS_MAX, 0);
    let events = hold(&mut gas, 210, 0, 60_000);

    assert!(drift_alerts(&events).is_empty());
    let estimates: Vec<_> = events
        .iter()
        .filter_map(|(now, e)| e.estimate_decreased.map(|pct| (*now, pct)))
        .collect();
    assert_eq!(estimates, vec![(60_000, 20)]);
    assert_eq!(gas.estimator().best_estimate_percent, 20);
}

#[test]
fn test_estimator_disabled_by_default() {
    let mut gas = GasMonitor::new(settings(), AXIS_MAX, 0);
    let events = hold(&mut gas, 800, 0, 120_000);
    assert!(events.iter().all(|(_, e)| e.estimate_decreased.is_none()));
    assert_eq!(gas.estimator().best_estimate_percent, 100);
}

#[test]
fn test_best_estimate_never_increases() {
    let mut gas = GasMonitor::new(estimating(None), AXIS_MAX, 0);

    let first = hold(&mut gas, 800, 0, 60_000);
    assert_eq!(first.last().and_then(|(_, e)| e.estimate_decreased), Some(78));
    assert_eq!(gas.estimator().last_print_ms, Some(60_000));

    let second = hold(&mut gas, 900, 61_000, 120_000);
    assert!(second.iter().all(|(_, e)| e.estimate_decreased.is_none()));
    assert_eq!(gas.estimator().best_estimate_percent, 78);

    let third = hold(&mut gas, 700, 121_000, 180_000);
    let estimates: Vec<_> = third
        .iter()
        .filter_map(|(now, e)| e.estimate_decreased.map(|pct| (*now, pct)))
        .collect();
    assert_eq!(estimates, vec![(180_000, 68)]);
    assert_eq!(gas.estimator().best_estimate_percent, 68);
    assert_eq!(gas.estimator().last_printed_estimate, 68);
}

#[test]
fn test_auto_adjust_lowers_full_threshold() {
    let mut gas = GasMonitor::new(estimating(Some(60)), AXIS_MAX, 0);
    let events = hold(&mut gas, 800, 0, 60_000);

    let (now, last) = events.last().copied().unwrap();
    assert_eq!(now, 60_000);
    assert_eq!(last.auto_adjusted, Some(78));
    assert_eq!(gas.deadzone_out(), 78);
    assert_eq!(gas.full_min(), threshold(AXIS_MAX, 78));

    // 800 now counts as full throttle
    gas.update(800, 61_000);
    assert_eq!(gas.state().last_full_throttle_ms, 61_000);
    assert_eq!(gas.state().peak_in_window, 0);
}

#[test]
fn test_auto_adjust_respects_minimum() {
    let mut gas = GasMonitor::new(estimating(Some(60)), AXIS_MAX, 0);
    let events = hold(&mut gas, 500, 0, 60_000);

    let (_, last) = events.last().copied().unwrap();
    assert_eq!(last.estimate_decreased, Some(48));
    assert_eq!(last.auto_adjusted, None);
    assert_eq!(gas.deadzone_out(), 93);
    assert_eq!(gas.full_min(), 951);
}

#[test]
fn test_auto_adjust_ignores_estimate_above_deadzone_out() {
    let mut gas = GasMonitor::new(estimating(Some(60)), AXIS_MAX, 0);
    // 980 is 95% of travel, above the 93% deadzone-out
    let events = hold(&mut gas, 980, 0, 60_000);

    assert!(events.iter().all(|(_, e)| e.auto_adjusted.is_none()));
    assert_eq!(gas.estimator().best_estimate_percent, 95);
    assert_eq!(gas.deadzone_out(), 93);
}

#[test]
fn test_reset_keeps_adjusted_deadzone_out() {
    let mut gas = GasMonitor::new(estimating(Some(60)), AXIS_MAX, 0);
    hold(&mut gas, 800, 0, 60_000);
    assert_eq!(gas.deadzone_out(), 78);

    gas.reset(65535, 70_000);
    assert_eq!(gas.deadzone_out(), 78);
    assert_eq!(gas.idle_max(), threshold(65535, 5));
    assert_eq!(gas.full_min(), threshold(65535, 78));
    assert_eq!(gas.state().activity, GasActivity::Idle);
    assert_eq!(gas.state().last_full_throttle_ms, 70_000);
    assert_eq!(gas.state().last_alert_ms, None);
    assert_eq!(gas.estimator().best_estimate_percent, 100);
    assert_eq!(gas.estimator().window_start_ms, 70_000);
}
