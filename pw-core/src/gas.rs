//! Gas pedal drift detection and deadzone-out estimation
//!
//! A worn throttle potentiometer stops reaching full travel. While the
//! driver is racing we expect to see full throttle at least once per
//! `window`; if we don't, and the pedal was clearly in use, a drift alert is
//! raised (rate-limited by `cooldown`).
//!
//! Alongside the alert, an optional estimator watches the deepest press over
//! windows of `cooldown` length and proposes a lower deadzone-out. The best
//! estimate only ever goes down for one device attachment. With auto-adjust
//! the proposal is applied to the live full-throttle threshold, bounded
//! below by a configured minimum.
//!
//! The estimator accepts windows whose peak equals `min_usage_percent`
//! (`>=`) while the alert requires strictly more (`>`): borderline windows
//! are informative for the estimate but too weak to alert on.

use crate::axis::{percent_of, threshold};
use crate::config::GasConfig;
use serde::Serialize;
use tracing::{debug, info};

/// Racing/idle activity state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GasActivity {
    Idle,
    Racing,
}

/// Static tuning, percentages and milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasSettings {
    pub deadzone_in: u32,
    pub deadzone_out: u32,
    pub window_ms: u64,
    pub cooldown_ms: u64,
    pub timeout_ms: u64,
    pub min_usage_percent: u32,
    pub estimate: bool,
    pub auto_adjust_minimum: Option<u32>,
}

impl From<&GasConfig> for GasSettings {
    fn from(config: &GasConfig) -> Self {
        Self {
            deadzone_in: config.deadzone_in,
            deadzone_out: config.deadzone_out,
            window_ms: config.window_ms(),
            cooldown_ms: config.cooldown_ms(),
            timeout_ms: config.timeout_ms(),
            min_usage_percent: config.min_usage_percent,
            estimate: config.estimate_deadzone,
            auto_adjust_minimum: config.auto_adjust_minimum,
        }
    }
}

/// Drift detector runtime state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GasState {
    pub activity: GasActivity,

    /// Deepest press since the last full-throttle event
    pub peak_in_window: u32,

    pub last_full_throttle_ms: u64,
    pub last_activity_ms: u64,

    /// None until the first alert
    pub last_alert_ms: Option<u64>,
}

impl GasState {
    fn new(now_ms: u64) -> Self {
        Self {
            activity: GasActivity::Idle,
            peak_in_window: 0,
            last_full_throttle_ms: now_ms,
            last_activity_ms: now_ms,
            last_alert_ms: None,
        }
    }
}

/// Deadzone-out estimator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EstimatorState {
    /// Lowest estimate seen for this attachment, starts at 100
    pub best_estimate_percent: u32,
    pub last_printed_estimate: u32,
    pub window_peak_percent: u32,
    pub window_start_ms: u64,
    pub last_print_ms: Option<u64>,
}

impl EstimatorState {
    fn new(now_ms: u64) -> Self {
        Self {
            best_estimate_percent: 100,
            last_printed_estimate: 100,
            window_peak_percent: 0,
            window_start_ms: now_ms,
            last_print_ms: None,
        }
    }

    fn start_window(&mut self, now_ms: u64) {
        self.window_start_ms = now_ms;
        self.window_peak_percent = 0;
    }
}

/// What happened during one update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GasEvents {
    /// Drift alert with the percent of travel reached
    pub drift_alert: Option<u32>,

    /// New, lower best estimate that should be announced
    pub estimate_decreased: Option<u32>,

    /// New deadzone-out applied by auto-adjust
    pub auto_adjusted: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct GasMonitor {
    settings: GasSettings,
    axis_max: u32,
    deadzone_out: u32,
    idle_max: u32,
    full_min: u32,
    state: GasState,
    estimator: EstimatorState,
}

impl GasMonitor {
    pub fn new(settings: GasSettings, axis_max: u32, now_ms: u64) -> Self {
        Self {
            settings,
            axis_max,
            deadzone_out: settings.deadzone_out,
            idle_max: threshold(axis_max, settings.deadzone_in),
            full_min: threshold(axis_max, settings.deadzone_out),
            state: GasState::new(now_ms),
            estimator: EstimatorState::new(now_ms),
        }
    }

    /// Feed one normalized gas sample
    pub fn update(&mut self, gas: u32, now_ms: u64) -> GasEvents {
        let mut events = GasEvents::default();

        if gas > self.idle_max {
            if self.state.activity == GasActivity::Idle {
                self.state.last_full_throttle_ms = now_ms;
                self.state.peak_in_window = 0;
                if self.settings.estimate {
                    self.estimator.start_window(now_ms);
                }
                debug!("Gas: activity resumed");
            }
            self.state.activity = GasActivity::Racing;
            self.state.last_activity_ms = now_ms;
        } else if self.state.activity == GasActivity::Racing
            && now_ms.saturating_sub(self.state.last_activity_ms) > self.settings.timeout_ms
        {
            debug!(
                "Gas: auto-pause (idle for {} ms)",
                self.settings.timeout_ms
            );
            self.state.activity = GasActivity::Idle;
            if self.settings.estimate {
                self.estimator.start_window(now_ms);
            }
        }

        if self.state.activity != GasActivity::Racing {
            return events;
        }

        self.state.peak_in_window = self.state.peak_in_window.max(gas);

        if gas >= self.full_min {
            self.state.last_full_throttle_ms = now_ms;
            self.state.peak_in_window = 0;
        } else if now_ms.saturating_sub(self.state.last_full_throttle_ms) > self.settings.window_ms {
            let cooled_down = self
                .state
                .last_alert_ms
                .map_or(true, |last| now_ms.saturating_sub(last) > self.settings.cooldown_ms);

            if cooled_down {
                let percent_reached = percent_of(self.state.peak_in_window, self.axis_max);
                if percent_reached > self.settings.min_usage_percent {
                    events.drift_alert = Some(percent_reached);
                    self.state.last_alert_ms = Some(now_ms);
                }
            }
        }

        if self.settings.estimate {
            self.update_estimator(gas, now_ms, &mut events);
        }

        events
    }

    fn update_estimator(&mut self, gas: u32, now_ms: u64, events: &mut GasEvents) {
        if gas > self.idle_max {
            let current_percent = percent_of(gas, self.axis_max);
            self.estimator.window_peak_percent =
                self.estimator.window_peak_percent.max(current_percent);
        }

        if now_ms.saturating_sub(self.estimator.window_start_ms) < self.settings.cooldown_ms {
            return;
        }

        let candidate = self.estimator.window_peak_percent;
        if candidate >= self.settings.min_usage_percent
            && candidate < self.estimator.best_estimate_percent
        {
            self.estimator.best_estimate_percent = candidate;

            let print_due = self
                .estimator
                .last_print_ms
                .map_or(true, |last| now_ms.saturating_sub(last) >= self.settings.cooldown_ms);
            if candidate < self.estimator.last_printed_estimate && print_due {
                events.estimate_decreased = Some(candidate);
                self.estimator.last_printed_estimate = candidate;
                self.estimator.last_print_ms = Some(now_ms);
            }

            if let Some(minimum) = self.settings.auto_adjust_minimum {
                if candidate < self.deadzone_out && candidate >= minimum {
                    self.deadzone_out = candidate;
                    self.full_min = threshold(self.axis_max, candidate);
                    events.auto_adjusted = Some(candidate);
                    info!(
                        "Gas deadzone-out auto-adjusted to {} (min={})",
                        candidate, minimum
                    );
                }
            }
        }

        self.estimator.start_window(now_ms);
    }

    /// Back to initial runtime state for a (re)attached device.
    ///
    /// Thresholds are recomputed for `axis_max`; an auto-adjusted
    /// deadzone-out is kept.
    pub fn reset(&mut self, axis_max: u32, now_ms: u64) {
        self.axis_max = axis_max;
        self.idle_max = threshold(axis_max, self.settings.deadzone_in);
        self.full_min = threshold(axis_max, self.deadzone_out);
        self.state = GasState::new(now_ms);
        self.estimator = EstimatorState::new(now_ms);
    }

    pub fn idle_max(&self) -> u32 {
        self.idle_max
    }

    pub fn full_min(&self) -> u32 {
        self.full_min
    }

    /// Current deadzone-out percent, possibly auto-adjusted
    pub fn deadzone_out(&self) -> u32 {
        self.deadzone_out
    }

    pub fn state(&self) -> &GasState {
        &self.state
    }

    pub fn estimator(&self) -> &EstimatorState {
        &self.estimator
    }

    pub fn settings(&self) -> &GasSettings {
        &self.settings
    }
}
