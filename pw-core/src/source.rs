//! Pedal device source trait definition

use crate::axis::AxisSnapshot;
use serde::Serialize;
use thiserror::Error;

/// Index of a device slot
pub type DeviceId = u32;

/// Identification reported by a device slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceCaps {
    pub vendor_id: u16,
    pub product_id: u16,
}

/// Options passed along with every poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleFlags {
    /// Report 0..1023 instead of 0..65535
    pub raw_data: bool,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SourceError {
    #[error("device {0} does not exist")]
    InvalidDevice(DeviceId),

    #[error("device {0} is unplugged")]
    Unplugged(DeviceId),

    #[error("device read failed (code {0})")]
    ReadFailed(u32),
}

/// Joystick-style polling primitive plus device discovery
///
/// Implementations:
/// - poll a device slot for a snapshot of its six axes
/// - enumerate device slots and report their vendor/product ids
pub trait AxisSource {
    /// Human readable name (e.g. "Demo", "gilrs")
    fn name(&self) -> &str;

    /// Poll one device; any error means the read failed
    fn sample(&mut self, device: DeviceId, flags: SampleFlags) -> Result<AxisSnapshot, SourceError>;

    /// Number of device slots to scan
    fn device_count(&self) -> u32;

    /// Vendor/product ids of a slot
    fn capabilities(&self, device: DeviceId) -> Result<DeviceCaps, SourceError>;
}

/// Scan every slot for a vendor/product match
pub fn find_device<S: AxisSource + ?Sized>(
    source: &S,
    vendor_id: u16,
    product_id: u16,
) -> Option<DeviceId> {
    (0..source.device_count()).find(|&id| {
        matches!(
            source.capabilities(id),
            Ok(caps) if caps.vendor_id == vendor_id && caps.product_id == product_id
        )
    })
}
