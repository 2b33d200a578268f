//! Scripted pedal source
//!
//! Replays a queue of prepared samples and read failures. Clones share the
//! same script, so a test can keep a handle and keep feeding (or unplug and
//! replug devices) after the source has been moved into the monitor.

use pw_core::axis::AxisSnapshot;
use pw_core::source::{AxisSource, DeviceCaps, DeviceId, SampleFlags, SourceError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug)]
enum Step {
    Sample(AxisSnapshot),
    Fail(u32),
}

#[derive(Debug, Default)]
struct Script {
    steps: VecDeque<Step>,
    /// None marks an empty (unplugged) slot
    devices: Vec<Option<DeviceCaps>>,
    /// Returned once the script runs dry
    hold: Option<AxisSnapshot>,
    /// Simulated device latency per read
    read_delay: Duration,
    reads: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    script: Arc<Mutex<Script>>,
}

impl ScriptedSource {
    /// Source with one slot holding `caps`
    pub fn new(caps: DeviceCaps) -> Self {
        Self::with_devices(vec![Some(caps)])
    }

    pub fn with_devices(devices: Vec<Option<DeviceCaps>>) -> Self {
        let source = Self::default();
        source.lock().devices = devices;
        source
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_sample(&self, snapshot: AxisSnapshot) {
        self.lock().steps.push_back(Step::Sample(snapshot));
    }

    /// Queue the same snapshot `count` times
    pub fn push_repeated(&self, snapshot: AxisSnapshot, count: usize) {
        let mut script = self.lock();
        for _ in 0..count {
            script.steps.push_back(Step::Sample(snapshot));
        }
    }

    pub fn push_failure(&self, code: u32) {
        self.lock().steps.push_back(Step::Fail(code));
    }

    /// Keep returning `snapshot` once the queued steps are used up
    pub fn hold(&self, snapshot: AxisSnapshot) {
        self.lock().hold = Some(snapshot);
    }

    /// Make every read block for `delay`, like a slow device
    pub fn set_read_delay(&self, delay: Duration) {
        self.lock().read_delay = delay;
    }

    pub fn set_devices(&self, devices: Vec<Option<DeviceCaps>>) {
        self.lock().devices = devices;
    }

    pub fn unplug(&self, device: DeviceId) {
        if let Some(slot) = self.lock().devices.get_mut(device as usize) {
            *slot = None;
        }
    }

    pub fn reads(&self) -> u64 {
        self.lock().reads
    }

    pub fn remaining(&self) -> usize {
        self.lock().steps.len()
    }
}

impl AxisSource for ScriptedSource {
    fn name(&self) -> &str {
        "Scripted"
    }

    fn sample(&mut self, device: DeviceId, _flags: SampleFlags) -> Result<AxisSnapshot, SourceError> {
        let delay = self.lock().read_delay;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let mut script = self.lock();
        script.reads += 1;

        match script.devices.get(device as usize) {
            None => return Err(SourceError::InvalidDevice(device)),
            Some(None) => return Err(SourceError::Unplugged(device)),
            Some(Some(_)) => {}
        }

        match script.steps.pop_front() {
            Some(Step::Sample(snapshot)) => Ok(snapshot),
            Some(Step::Fail(code)) => Err(SourceError::ReadFailed(code)),
            None => script.hold.ok_or(SourceError::ReadFailed(0)),
        }
    }

    fn device_count(&self) -> u32 {
        self.lock().devices.len() as u32
    }

    fn capabilities(&self, device: DeviceId) -> Result<DeviceCaps, SourceError> {
        match self.lock().devices.get(device as usize) {
            None => Err(SourceError::InvalidDevice(device)),
            Some(None) => Err(SourceError::Unplugged(device)),
            Some(Some(caps)) => Ok(*caps),
        }
    }
}
