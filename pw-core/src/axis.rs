//! Axis channels, normalization and travel percentages
//!
//! All pedal logic works in "travel space":
//! - 0 = pedal at rest
//! - axis_max = pedal fully pressed
//!
//! Hardware that reports the opposite polarity (idle near axis_max) is
//! mirrored by [`normalize`].

use serde::{Deserialize, Serialize};

/// Axis range in raw-data mode
pub const RAW_AXIS_MAX: u32 = 1023;

/// Axis range for standard 16-bit reporting
pub const FULL_AXIS_MAX: u32 = 65535;

/// One of the six channels a joystick-style device exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisChannel {
    X,
    Y,
    Z,
    R,
    U,
    V,
}

/// Raw values of all six channels from one poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisSnapshot {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub r: u32,
    pub u: u32,
    pub v: u32,
}

impl AxisSnapshot {
    pub fn channel(&self, channel: AxisChannel) -> u32 {
        match channel {
            AxisChannel::X => self.x,
            AxisChannel::Y => self.y,
            AxisChannel::Z => self.z,
            AxisChannel::R => self.r,
            AxisChannel::U => self.u,
            AxisChannel::V => self.v,
        }
    }

    pub fn set_channel(&mut self, channel: AxisChannel, value: u32) {
        match channel {
            AxisChannel::X => self.x = value,
            AxisChannel::Y => self.y = value,
            AxisChannel::Z => self.z = value,
            AxisChannel::R => self.r = value,
            AxisChannel::U => self.u = value,
            AxisChannel::V => self.v = value,
        }
    }
}

/// Axis range for the given reporting mode
pub fn axis_max(raw_data: bool) -> u32 {
    if raw_data {
        RAW_AXIS_MAX
    } else {
        FULL_AXIS_MAX
    }
}

/// Map a raw reading into travel space
#[inline]
pub fn normalize(raw: u32, axis_max: u32, invert: bool) -> u32 {
    if invert {
        axis_max.saturating_sub(raw)
    } else {
        raw
    }
}

/// `axis_max * percent / 100` in integer math
#[inline]
pub fn threshold(axis_max: u32, percent: u32) -> u32 {
    (u64::from(axis_max) * u64::from(percent) / 100) as u32
}

/// Integer percentage of travel, truncated
#[inline]
pub fn percent_of(value: u32, axis_max: u32) -> u32 {
    if axis_max == 0 {
        return 0;
    }
    (u64::from(value) * 100 / u64::from(axis_max)) as u32
}

/// Raw position as a fraction of the axis range (0-100)
pub fn physical_percent(raw: u32, axis_max: u32) -> f32 {
    if axis_max == 0 {
        return 0.0;
    }
    (raw as f32 * 100.0 / axis_max as f32).clamp(0.0, 100.0)
}

/// Idle and full-press limits for one pedal, in axis units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PedalThresholds {
    pub idle_max: u32,
    pub full_min: u32,
}

impl PedalThresholds {
    pub fn from_percent(axis_max: u32, deadzone_in: u32, deadzone_out: u32) -> Self {
        Self {
            idle_max: threshold(axis_max, deadzone_in),
            full_min: threshold(axis_max, deadzone_out),
        }
    }

    /// Travel between the idle and full limits, 0-100.
    ///
    /// Misconfigured limits (`full_min <= idle_max`) always read 0.
    pub fn logical_percent(&self, value: u32) -> f32 {
        if self.full_min <= self.idle_max || value <= self.idle_max {
            return 0.0;
        }
        if value >= self.full_min {
            return 100.0;
        }
        let span = (self.full_min - self.idle_max) as f32;
        ((value - self.idle_max) as f32 * 100.0 / span).clamp(0.0, 100.0)
    }
}
