//! Clutch noise debounce
//!
//! A Hall sensor that is stuck (or noisy) at a non-idle position shows up as
//! the clutch axis sitting nearly still away from zero while the driver is
//! not on the gas. Single samples like that are common, so an alert needs
//! `repeat_required` consecutive near-static samples.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClutchState {
    /// Consecutive qualifying samples so far
    pub repeat_count: u32,

    /// Normalized clutch value from the previous sample
    pub last_value: u32,
}

#[derive(Debug, Clone)]
pub struct ClutchMonitor {
    margin: u32,
    repeat_required: u32,
    state: ClutchState,
}

impl ClutchMonitor {
    /// `margin` is in axis units
    pub fn new(margin: u32, repeat_required: u32) -> Self {
        Self {
            margin,
            repeat_required: repeat_required.max(1),
            state: ClutchState::default(),
        }
    }

    /// Feed one sample. Returns true exactly when an alert fires.
    pub fn update(&mut self, gas: u32, clutch: u32, gas_idle_max: u32) -> bool {
        if gas <= gas_idle_max && clutch > 0 {
            let closure = clutch.abs_diff(self.state.last_value);
            if closure <= self.margin {
                self.state.repeat_count += 1;
            } else {
                self.state.repeat_count = 0;
            }
        } else {
            self.state.repeat_count = 0;
        }

        self.state.last_value = clutch;

        if self.state.repeat_count >= self.repeat_required {
            self.state.repeat_count = 0;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.state = ClutchState::default();
    }

    pub fn set_margin(&mut self, margin: u32) {
        self.margin = margin;
    }

    pub fn state(&self) -> ClutchState {
        self.state
    }
}
