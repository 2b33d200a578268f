//! Pedal device sources and alert sinks for PedalWatch

pub mod alerts;
pub mod demo;
#[cfg(feature = "gamepad")]
pub mod gamepad;
pub mod scripted;

pub use alerts::{CommandAlertSink, LogAlertSink};
pub use demo::DemoPedals;
#[cfg(feature = "gamepad")]
pub use gamepad::GamepadSource;
pub use scripted::ScriptedSource;
