//! PedalWatch Core Library
//!
//! This crate provides the pedal travel model, the clutch noise and gas
//! drift state machines, the device source trait and the telemetry frame
//! that the monitor publishes.

pub mod alert;
pub mod axis;
pub mod clutch;
pub mod config;
pub mod gas;
pub mod model;
pub mod source;

pub use alert::AlertSink;
pub use axis::{AxisChannel, AxisSnapshot, PedalThresholds};
pub use config::MonitorConfig;
pub use model::Frame;
pub use source::{AxisSource, DeviceCaps, DeviceId, SampleFlags, SourceError};
