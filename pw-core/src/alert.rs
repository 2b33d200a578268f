//! Alert sink trait definition

use std::sync::Arc;

/// Renders a short text alert (usually spoken)
///
/// `speak` is fire-and-forget: it must return as soon as the request has
/// been issued and must never fail the caller.
pub trait AlertSink: Send + Sync {
    fn speak(&self, text: &str);
}

impl<T: AlertSink + ?Sized> AlertSink for Arc<T> {
    fn speak(&self, text: &str) {
        (**self).speak(text)
    }
}
