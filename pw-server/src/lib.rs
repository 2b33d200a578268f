//! PedalWatch Server Library
//!
//! Exposes the sampler, publisher and stream components for integration
//! testing.

pub mod api;
pub mod gate;
pub mod monitor;
pub mod publisher;
pub mod shutdown;
pub mod state;
