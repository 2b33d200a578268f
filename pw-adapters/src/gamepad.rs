//! Real pedal devices through gilrs
//!
//! gilrs exposes every axis as -1.0..1.0; values are rescaled into the
//! 0..axis_max range the monitor expects, so polarity is whatever the
//! device reports. Device slots are gilrs gamepad ids.

use anyhow::{anyhow, Result};
use gilrs::{Axis, GamepadId, Gilrs};
use pw_core::axis::{self, AxisChannel, AxisSnapshot};
use pw_core::source::{AxisSource, DeviceCaps, DeviceId, SampleFlags, SourceError};
use std::cell::RefCell;
use tracing::{debug, info};

const CHANNELS: [(AxisChannel, Axis); 6] = [
    (AxisChannel::X, Axis::LeftStickX),
    (AxisChannel::Y, Axis::LeftStickY),
    (AxisChannel::Z, Axis::LeftZ),
    (AxisChannel::R, Axis::RightStickX),
    (AxisChannel::U, Axis::RightStickY),
    (AxisChannel::V, Axis::RightZ),
];

pub struct GamepadSource {
    // Event pumping needs &mut; discovery calls only get &self
    gilrs: RefCell<Gilrs>,
}

impl GamepadSource {
    pub fn new() -> Result<Self> {
        let gilrs = Gilrs::new().map_err(|e| anyhow!("failed to initialize gilrs: {}", e))?;
        for (id, gamepad) in gilrs.gamepads() {
            info!(
                "Found device {} \"{}\" VID={:04X?} PID={:04X?}",
                usize::from(id),
                gamepad.name(),
                gamepad.vendor_id(),
                gamepad.product_id()
            );
        }
        Ok(Self {
            gilrs: RefCell::new(gilrs),
        })
    }

    /// Drain pending events so cached axis and connection state is current
    fn pump(&self) {
        let mut gilrs = self.gilrs.borrow_mut();
        while let Some(event) = gilrs.next_event() {
            debug!("gilrs event: {:?}", event.event);
        }
    }

    fn gamepad_id(gilrs: &Gilrs, device: DeviceId) -> Option<GamepadId> {
        gilrs
            .gamepads()
            .map(|(id, _)| id)
            .find(|id| usize::from(*id) == device as usize)
    }
}

fn scale(value: f32, axis_max: u32) -> u32 {
    let unit = ((value.clamp(-1.0, 1.0) + 1.0) / 2.0) * axis_max as f32;
    unit.round() as u32
}

impl AxisSource for GamepadSource {
    fn name(&self) -> &str {
        "gilrs"
    }

    fn sample(&mut self, device: DeviceId, flags: SampleFlags) -> Result<AxisSnapshot, SourceError> {
        self.pump();
        let gilrs = self.gilrs.borrow();
        let id = Self::gamepad_id(&gilrs, device).ok_or(SourceError::InvalidDevice(device))?;
        let gamepad = gilrs
            .connected_gamepad(id)
            .ok_or(SourceError::Unplugged(device))?;

        let axis_max = axis::axis_max(flags.raw_data);
        let mut snapshot = AxisSnapshot::default();
        for (channel, gilrs_axis) in CHANNELS {
            let value = gamepad.axis_data(gilrs_axis).map_or(-1.0, |data| data.value());
            snapshot.set_channel(channel, scale(value, axis_max));
        }
        Ok(snapshot)
    }

    fn device_count(&self) -> u32 {
        self.pump();
        self.gilrs
            .borrow()
            .gamepads()
            .map(|(id, _)| usize::from(id) as u32 + 1)
            .max()
            .unwrap_or(0)
    }

    fn capabilities(&self, device: DeviceId) -> Result<DeviceCaps, SourceError> {
        let gilrs = self.gilrs.borrow();
        let id = Self::gamepad_id(&gilrs, device).ok_or(SourceError::InvalidDevice(device))?;
        let gamepad = gilrs
            .connected_gamepad(id)
            .ok_or(SourceError::Unplugged(device))?;
        Ok(DeviceCaps {
            vendor_id: gamepad.vendor_id().unwrap_or(0),
            product_id: gamepad.product_id().unwrap_or(0),
        })
    }
}
