//! Telemetry frame model
//!
//! A [`Frame`] is assembled once per sampling iteration from the monitor's
//! loop-local state and is immutable once published. Boolean flags are
//! serialized as `0`/`1` so stream consumers can treat them as counters.
//!
//! Event flags come in two kinds, see [`EventFlags`]:
//! - one-shot flags are cleared at the start of every sampling iteration
//! - the latched `controller_disconnected` flag only changes on a
//!   disconnect or confirmed reconnect transition

use crate::axis::PedalThresholds;
use crate::clutch::ClutchState;
use crate::config::MonitorConfig;
use crate::gas::{EstimatorState, GasActivity, GasState};
use serde::Serialize;

/// Version of the streamed batch envelope
pub const SCHEMA_VERSION: u32 = 1;

/// Serialize a bool as 0/1
fn flag<S: serde::Serializer>(val: &bool, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u8(u8::from(*val))
}

/// Round f32 to 2 decimal places for compact JSON serialization
fn round2<S: serde::Serializer>(val: &f32, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f32((*val * 100.0).round() / 100.0)
}

/// One processed sample, or a connection state transition
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    /// Assigned by the publisher; strictly increasing, first publish is 1
    pub sequence: u64,

    /// Name of the device source
    pub source: String,

    /// Device slot being monitored
    pub device_id: u32,

    pub config: ConfigSnapshot,
    pub axes: AxisState,
    pub runtime: RuntimeState,
    pub estimator: EstimatorSnapshot,
    pub events: EventFlags,
    pub timing: FrameTiming,
}

/// Effective configuration at the time of the sample
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSnapshot {
    #[serde(serialize_with = "flag")]
    pub monitor_gas: bool,
    #[serde(serialize_with = "flag")]
    pub monitor_clutch: bool,
    #[serde(serialize_with = "flag")]
    pub axis_normalization: bool,

    pub gas_deadzone_in: u32,
    /// Live value, reflects auto-adjust
    pub gas_deadzone_out: u32,
    pub brake_deadzone_in: u32,
    pub brake_deadzone_out: u32,
    pub clutch_deadzone_in: u32,
    pub clutch_deadzone_out: u32,

    pub gas_window_s: u32,
    pub gas_cooldown_s: u32,
    pub gas_timeout_s: u32,
    pub gas_window_ms: u64,
    pub gas_cooldown_ms: u64,
    pub gas_timeout_ms: u64,
    pub gas_min_usage_percent: u32,

    pub clutch_margin_percent: u32,
    pub clutch_repeat_required: u32,

    #[serde(serialize_with = "flag")]
    pub estimate_gas_deadzone_enabled: bool,
    #[serde(serialize_with = "flag")]
    pub auto_gas_deadzone_enabled: bool,
    pub auto_gas_deadzone_minimum: u32,

    pub sleep_ms: u64,
}

impl ConfigSnapshot {
    /// Snapshot of `config` with the live (possibly adjusted) deadzone-out
    pub fn capture(config: &MonitorConfig, gas_deadzone_out: u32) -> Self {
        Self {
            monitor_gas: config.gas.enabled,
            monitor_clutch: config.clutch.enabled,
            axis_normalization: config.device.axis_normalization,
            gas_deadzone_in: config.gas.deadzone_in,
            gas_deadzone_out,
            brake_deadzone_in: config.brake.deadzone_in,
            brake_deadzone_out: config.brake.deadzone_out,
            clutch_deadzone_in: config.clutch.deadzone_in,
            clutch_deadzone_out: config.clutch.deadzone_out,
            gas_window_s: config.gas.window_s,
            gas_cooldown_s: config.gas.cooldown_s,
            gas_timeout_s: config.gas.timeout_s,
            gas_window_ms: config.gas.window_ms(),
            gas_cooldown_ms: config.gas.cooldown_ms(),
            gas_timeout_ms: config.gas.timeout_ms(),
            gas_min_usage_percent: config.gas.min_usage_percent,
            clutch_margin_percent: config.clutch.margin_percent,
            clutch_repeat_required: config.clutch.repeat_required,
            estimate_gas_deadzone_enabled: config.gas.estimate_deadzone,
            auto_gas_deadzone_enabled: config.gas.auto_adjust_minimum.is_some(),
            auto_gas_deadzone_minimum: config.gas.auto_adjust_minimum.unwrap_or(0),
            sleep_ms: config.sampling.sleep_ms,
        }
    }
}

/// All pedals for one sample
#[derive(Debug, Clone, Serialize)]
pub struct AxisState {
    /// 1023 in raw-data mode, 65535 otherwise
    pub axis_max: u32,
    pub gas: PedalReading,
    pub clutch: PedalReading,
    pub brake: PedalReading,
}

/// One pedal's reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PedalReading {
    /// Value as reported by the device
    pub raw: u32,

    /// Travel space value, 0 = idle
    pub value: u32,

    /// raw / axis_max, 0-100
    #[serde(serialize_with = "round2")]
    pub physical_pct: f32,

    /// Interpolated between idle and full thresholds, 0-100
    #[serde(serialize_with = "round2")]
    pub logical_pct: f32,
}

impl PedalReading {
    pub fn new(raw: u32, value: u32, axis_max: u32, thresholds: &PedalThresholds) -> Self {
        Self {
            raw,
            value,
            physical_pct: crate::axis::physical_percent(raw, axis_max),
            logical_pct: thresholds.logical_percent(value),
        }
    }
}

/// Drift and clutch state machine internals
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeState {
    #[serde(serialize_with = "flag")]
    pub racing: bool,
    pub peak_gas_in_window: u32,
    pub last_full_throttle_ms: u64,
    pub last_gas_activity_ms: u64,
    pub last_gas_alert_ms: Option<u64>,
    pub gas_idle_max: u32,
    pub gas_full_min: u32,
    pub clutch_repeat_count: u32,
    pub last_clutch_value: u32,
}

impl RuntimeState {
    pub fn capture(gas: &GasState, gas_idle_max: u32, gas_full_min: u32, clutch: ClutchState) -> Self {
        Self {
            racing: gas.activity == GasActivity::Racing,
            peak_gas_in_window: gas.peak_in_window,
            last_full_throttle_ms: gas.last_full_throttle_ms,
            last_gas_activity_ms: gas.last_activity_ms,
            last_gas_alert_ms: gas.last_alert_ms,
            gas_idle_max,
            gas_full_min,
            clutch_repeat_count: clutch.repeat_count,
            last_clutch_value: clutch.last_value,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EstimatorSnapshot {
    pub best_estimate_percent: u32,
    pub last_printed_estimate: u32,
    pub window_peak_percent: u32,
    pub window_start_ms: u64,
    pub last_print_ms: Option<u64>,
}

impl From<&EstimatorState> for EstimatorSnapshot {
    fn from(state: &EstimatorState) -> Self {
        Self {
            best_estimate_percent: state.best_estimate_percent,
            last_printed_estimate: state.last_printed_estimate,
            window_peak_percent: state.window_peak_percent,
            window_start_ms: state.window_start_ms,
            last_print_ms: state.last_print_ms,
        }
    }
}

/// Events raised during the iteration that produced the frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventFlags {
    // One-shot: cleared by `clear_one_shots` at every iteration start
    #[serde(serialize_with = "flag")]
    pub gas_alert_triggered: bool,
    /// Travel reached for the drift alert, 0 when none fired
    pub gas_alert_percent: u32,
    #[serde(serialize_with = "flag")]
    pub clutch_alert_triggered: bool,
    #[serde(serialize_with = "flag")]
    pub gas_estimate_decreased: bool,
    #[serde(serialize_with = "flag")]
    pub gas_auto_adjust_applied: bool,
    #[serde(serialize_with = "flag")]
    pub controller_reconnected: bool,

    // Latched: owned by the reconnect path
    #[serde(serialize_with = "flag")]
    pub controller_disconnected: bool,
    pub last_disconnect_time_ms: Option<u64>,
}

impl EventFlags {
    /// Reset every one-shot flag; latched state is untouched
    pub fn clear_one_shots(&mut self) {
        self.gas_alert_triggered = false;
        self.gas_alert_percent = 0;
        self.clutch_alert_triggered = false;
        self.gas_estimate_decreased = false;
        self.gas_auto_adjust_applied = false;
        self.controller_reconnected = false;
    }
}

/// Latency accounting across the pipeline.
///
/// There is no per-frame send stamp. A frame's send time is the enclosing
/// batch's `bridgeInfo.servedAtUnixMs`, taken when the batch is serialized.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FrameTiming {
    /// Monotonic ms since monitor start when the iteration began
    pub loop_start_ms: u64,

    /// Monotonic ms since monitor start when the frame was handed to the
    /// queue, after reading and processing. Never earlier than `loop_start_ms`
    pub notify_ms: u64,

    /// Duration of the previous iteration, excluding sleep
    pub prev_loop_duration_us: u64,

    /// Wall clock when the device was sampled
    pub sampled_at_unix_ms: i64,

    /// Wall clock when the frame entered the queue, set by the publisher
    pub enqueued_at_unix_ms: i64,
}

/// Wire envelope for one stream message
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryBatch<'a> {
    pub schema_version: u32,
    pub bridge_info: BridgeInfo,
    pub frames: Vec<&'a Frame>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeInfo {
    pub batch_id: u64,
    pub served_at_unix_ms: i64,
    /// Frames drained into this batch
    pub pending_frame_count: usize,
    /// Frames evicted from the backlog since startup
    pub dropped_frame_count: u64,
}

impl<'a> TelemetryBatch<'a> {
    pub fn new(bridge_info: BridgeInfo, frames: Vec<&'a Frame>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            bridge_info,
            frames,
        }
    }
}
