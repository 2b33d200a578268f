//! Pedal sampling loop
//!
//! This module handles:
//! - Polling the pedal device at a fixed interval on a dedicated thread
//! - Normalizing axes and feeding the clutch and gas state machines
//! - Assembling one frame per iteration and publishing it
//! - Detecting disconnects and rescanning by vendor/product id

use crate::publisher::FrameQueue;
use crate::shutdown::Shutdown;
use crate::state::AppState;
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use pw_core::axis::{normalize, AxisSnapshot, PedalThresholds};
use pw_core::clutch::ClutchMonitor;
use pw_core::gas::{GasMonitor, GasSettings};
use pw_core::model::{
    AxisState, ConfigSnapshot, EventFlags, Frame, FrameTiming, PedalReading, RuntimeState,
};
use pw_core::source::{find_device, AxisSource, DeviceId, SampleFlags};
use pw_core::{AlertSink, MonitorConfig};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Result of one sampling attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Device read and a frame published
    Sampled,

    /// Read failed, no reconnect target configured; retry next iteration
    Skipped,

    /// Read failed with a reconnect target; the monitor is disconnected
    Disconnected,
}

pub struct Monitor<S: AxisSource> {
    source: S,
    config: Arc<MonitorConfig>,
    queue: Arc<FrameQueue>,
    alerts: Arc<dyn AlertSink>,

    device: DeviceId,
    flags: SampleFlags,
    axis_max: u32,
    clutch_thresholds: PedalThresholds,
    brake_thresholds: PedalThresholds,

    clutch: ClutchMonitor,
    gas: GasMonitor,
    events: EventFlags,

    last_snapshot: AxisSnapshot,
    sampled_at_unix_ms: i64,
    epoch: Instant,
    loop_started: Instant,
    loop_start_ms: u64,
    prev_loop_duration_us: u64,
}

/// Snapshot of a device at rest, in the device's own polarity
fn idle_snapshot(axis_max: u32, inverted: bool) -> AxisSnapshot {
    let idle = if inverted { axis_max } else { 0 };
    AxisSnapshot {
        x: idle,
        y: idle,
        z: idle,
        r: idle,
        u: idle,
        v: idle,
    }
}

impl<S: AxisSource> Monitor<S> {
    pub fn new(
        source: S,
        config: Arc<MonitorConfig>,
        queue: Arc<FrameQueue>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        let mut device = config.device.joystick_id;
        if let Some((vid, pid)) = config.device.reconnect_target() {
            info!("Looking for controller VID:{:04X} PID:{:04X}", vid, pid);
            match find_device(&source, vid, pid) {
                Some(found) => {
                    info!("Found at ID {}", found);
                    device = found;
                }
                None => info!("Not found at startup, using ID {} until error", device),
            }
        }

        let axis_max = config.device.axis_max();
        let gas = GasMonitor::new(GasSettings::from(&config.gas), axis_max, 0);
        let clutch = ClutchMonitor::new(
            config.clutch.margin_units(axis_max),
            config.clutch.repeat_required,
        );

        Self {
            flags: SampleFlags {
                raw_data: config.device.raw_data,
            },
            axis_max,
            clutch_thresholds: PedalThresholds::from_percent(
                axis_max,
                config.clutch.deadzone_in,
                config.clutch.deadzone_out,
            ),
            brake_thresholds: config.brake.thresholds(axis_max),
            last_snapshot: idle_snapshot(axis_max, config.device.axis_normalization),
            source,
            queue,
            alerts,
            device,
            clutch,
            gas,
            events: EventFlags::default(),
            sampled_at_unix_ms: 0,
            epoch: Instant::now(),
            loop_started: Instant::now(),
            loop_start_ms: 0,
            prev_loop_duration_us: 0,
            config,
        }
    }

    /// Milliseconds since the monitor was created
    pub fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// One sampling iteration at `now_ms`
    pub fn tick(&mut self, now_ms: u64) -> TickOutcome {
        self.begin_iteration(now_ms);

        match self.source.sample(self.device, self.flags) {
            Ok(snapshot) => {
                self.process(snapshot, now_ms);
                self.publish();
                TickOutcome::Sampled
            }
            Err(e) => {
                debug!("Error reading device {}: {}", self.device, e);
                if self.config.device.reconnect_target().is_none() {
                    return TickOutcome::Skipped;
                }
                if !self.events.controller_disconnected {
                    self.mark_disconnected(now_ms);
                }
                TickOutcome::Disconnected
            }
        }
    }

    fn begin_iteration(&mut self, now_ms: u64) {
        self.loop_start_ms = now_ms;
        self.loop_started = Instant::now();
        self.events.clear_one_shots();
    }

    fn process(&mut self, snapshot: AxisSnapshot, now_ms: u64) {
        self.last_snapshot = snapshot;
        self.sampled_at_unix_ms = Utc::now().timestamp_millis();

        let device = &self.config.device;
        let invert = device.axis_normalization;
        let raw_gas = snapshot.channel(device.gas_axis);
        let raw_clutch = snapshot.channel(device.clutch_axis);
        let gas = normalize(raw_gas, self.axis_max, invert);
        let clutch = normalize(raw_clutch, self.axis_max, invert);

        if device.debug_raw {
            trace!(now_ms, raw_gas, gas, raw_clutch, clutch, "sample");
        } else {
            trace!(now_ms, gas, clutch, "sample");
        }

        if self.config.clutch.enabled && self.clutch.update(gas, clutch, self.gas.idle_max()) {
            self.events.clutch_alert_triggered = true;
            self.alerts.speak("Clutch noise detected.");
        }

        if self.config.gas.enabled {
            let gas_events = self.gas.update(gas, now_ms);

            if let Some(percent) = gas_events.drift_alert {
                self.events.gas_alert_triggered = true;
                self.events.gas_alert_percent = percent;
                self.alerts
                    .speak(&format!("Gas pedal drift. Reached {} percent.", percent));
            }
            if let Some(estimate) = gas_events.estimate_decreased {
                self.events.gas_estimate_decreased = true;
                self.alerts
                    .speak(&format!("New deadzone estimation: {}", estimate));
            }
            if gas_events.auto_adjusted.is_some() {
                self.events.gas_auto_adjust_applied = true;
            }
        }
    }

    fn mark_disconnected(&mut self, now_ms: u64) {
        warn!("Controller {} disconnected, entering reconnection mode", self.device);
        self.events.controller_disconnected = true;
        self.events.last_disconnect_time_ms = Some(now_ms);
        self.alerts.speak(&format!(
            "Controller disconnected. Waiting {} seconds.",
            self.config.sampling.reconnect_backoff().as_secs()
        ));
        self.publish();
    }

    /// Rescan for the configured vendor/product id.
    ///
    /// On a match the monitor switches to the found slot, resets all
    /// runtime state and publishes the reconnect frame.
    pub fn try_reconnect(&mut self, now_ms: u64) -> bool {
        let Some((vid, pid)) = self.config.device.reconnect_target() else {
            return false;
        };

        let Some(found) = find_device(&self.source, vid, pid) else {
            debug!("Scan failed, retrying");
            self.alerts.speak("Controller not found. Retrying.");
            return false;
        };

        self.device = found;
        self.begin_iteration(now_ms);
        self.events.controller_disconnected = false;
        self.events.controller_reconnected = true;
        self.reset_runtime(now_ms);

        info!("Reconnected at ID {}", found);
        self.alerts.speak("Controller found. Resuming monitoring.");
        self.publish();
        true
    }

    /// Recompute axis range and thresholds, reset every state machine
    fn reset_runtime(&mut self, now_ms: u64) {
        let config = &self.config;
        self.axis_max = config.device.axis_max();
        self.clutch_thresholds = PedalThresholds::from_percent(
            self.axis_max,
            config.clutch.deadzone_in,
            config.clutch.deadzone_out,
        );
        self.brake_thresholds = config.brake.thresholds(self.axis_max);
        self.gas.reset(self.axis_max, now_ms);
        self.clutch.reset();
        self.clutch
            .set_margin(config.clutch.margin_units(self.axis_max));
        self.last_snapshot = idle_snapshot(self.axis_max, config.device.axis_normalization);
    }

    /// Build the frame for the current iteration, notified at `notify_ms`
    pub fn assemble(&self, notify_ms: u64) -> Frame {
        let device = &self.config.device;
        let invert = device.axis_normalization;
        let reading = |raw: u32, thresholds: &PedalThresholds| {
            PedalReading::new(raw, normalize(raw, self.axis_max, invert), self.axis_max, thresholds)
        };
        let gas_thresholds = PedalThresholds {
            idle_max: self.gas.idle_max(),
            full_min: self.gas.full_min(),
        };

        Frame {
            sequence: 0,
            source: self.source.name().to_string(),
            device_id: self.device,
            config: ConfigSnapshot::capture(&self.config, self.gas.deadzone_out()),
            axes: AxisState {
                axis_max: self.axis_max,
                gas: reading(self.last_snapshot.channel(device.gas_axis), &gas_thresholds),
                clutch: reading(
                    self.last_snapshot.channel(device.clutch_axis),
                    &self.clutch_thresholds,
                ),
                brake: reading(
                    self.last_snapshot.channel(device.brake_axis),
                    &self.brake_thresholds,
                ),
            },
            runtime: RuntimeState::capture(
                self.gas.state(),
                gas_thresholds.idle_max,
                gas_thresholds.full_min,
                self.clutch.state(),
            ),
            estimator: self.gas.estimator().into(),
            events: self.events.clone(),
            timing: FrameTiming {
                loop_start_ms: self.loop_start_ms,
                notify_ms,
                prev_loop_duration_us: self.prev_loop_duration_us,
                sampled_at_unix_ms: self.sampled_at_unix_ms,
                enqueued_at_unix_ms: 0,
            },
        }
    }

    /// Loop time at handoff: the iteration start plus the time spent
    /// reading and processing since then
    fn handoff_ms(&self) -> u64 {
        self.loop_start_ms + self.loop_started.elapsed().as_millis() as u64
    }

    fn publish(&mut self) {
        let sequence = self.queue.publish(self.assemble(self.handoff_ms()));
        trace!(sequence, "frame published");
    }

    /// Run until shutdown or the configured iteration count
    pub fn run(mut self, shutdown: &Shutdown) {
        info!(
            "Pedal monitor started on device {} ({})",
            self.device,
            self.source.name()
        );
        let sampling = self.config.sampling.clone();
        let mut iteration: u64 = 0;

        while !shutdown.is_triggered() {
            if sampling.iterations != 0 && iteration >= sampling.iterations {
                break;
            }
            iteration += 1;

            let started = Instant::now();
            if self.tick(self.now_ms()) == TickOutcome::Disconnected {
                if !self.wait_for_reconnect(shutdown) {
                    break;
                }
                // Read again right away
                continue;
            }
            self.prev_loop_duration_us = started.elapsed().as_micros() as u64;

            if shutdown.wait_timeout(sampling.sleep()) {
                break;
            }
        }

        info!("Pedal monitor stopped");
    }

    /// Back off and rescan until the device returns. False on shutdown.
    fn wait_for_reconnect(&mut self, shutdown: &Shutdown) -> bool {
        let backoff = self.config.sampling.reconnect_backoff();
        loop {
            if shutdown.wait_timeout(backoff) {
                return false;
            }
            if self.try_reconnect(self.now_ms()) {
                return true;
            }
        }
    }

    pub fn device(&self) -> DeviceId {
        self.device
    }

    pub fn axis_max(&self) -> u32 {
        self.axis_max
    }

    pub fn is_disconnected(&self) -> bool {
        self.events.controller_disconnected
    }

    pub fn gas(&self) -> &GasMonitor {
        &self.gas
    }

    pub fn clutch(&self) -> &ClutchMonitor {
        &self.clutch
    }
}

/// Start the sampler on its own thread.
///
/// The source is built on that thread (some device backends are not
/// `Send`); construction errors are returned here as startup failures.
pub fn spawn<S, F>(state: &AppState, alerts: Arc<dyn AlertSink>, make_source: F) -> Result<JoinHandle<()>>
where
    S: AxisSource + 'static,
    F: FnOnce() -> Result<S> + Send + 'static,
{
    let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
    let config = state.config.clone();
    let queue = state.queue.clone();
    let shutdown = state.shutdown.clone();

    let handle = std::thread::Builder::new()
        .name("sampler".into())
        .spawn(move || {
            let source = match make_source() {
                Ok(source) => source,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let monitor = Monitor::new(source, config, queue, alerts);
            let _ = ready_tx.send(Ok(()));
            monitor.run(&shutdown);
        })
        .context("failed to spawn sampler thread")?;

    ready_rx
        .recv()
        .map_err(|_| anyhow!("sampler thread exited during startup"))??;
    Ok(handle)
}
