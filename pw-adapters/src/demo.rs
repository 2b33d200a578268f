//! Demo pedal set that generates synthetic axis readings
//!
//! Simulates laps around a circuit with straights, braking zones, corners
//! and acceleration phases, and turns them into gas/brake/clutch travel.
//! Readings are inverted like Fanatec raw data (idle near axis max), so the
//! default normalization applies. A throttle ceiling below 1.0 simulates a
//! worn potentiometer that no longer reaches full travel.

use pw_core::axis::{self, AxisChannel, AxisSnapshot};
use pw_core::source::{AxisSource, DeviceCaps, DeviceId, SampleFlags, SourceError};
use std::time::Instant;

/// Fanatec vendor id
pub const DEMO_VENDOR_ID: u16 = 0x0EB7;

/// ClubSport Pedals V2 product id
pub const DEMO_PRODUCT_ID: u16 = 0x1839;

// =============================================================================
// Track definition: a sequence of segments that form a lap
// =============================================================================

#[derive(Clone, Copy)]
enum SegmentKind {
    Straight, // Flat out
    Braking,  // Heavy braking with a downshift
    Corner,   // Maintenance throttle
    Accel,    // Progressive throttle on exit
}

#[derive(Clone, Copy)]
struct TrackSegment {
    kind: SegmentKind,
    duration: f32, // seconds
}

/// A short circuit: ~40s lap
fn demo_track() -> Vec<TrackSegment> {
    use SegmentKind::*;
    vec![
        TrackSegment { kind: Straight, duration: 8.0 },
        TrackSegment { kind: Braking,  duration: 2.5 },
        TrackSegment { kind: Corner,   duration: 4.0 },
        TrackSegment { kind: Accel,    duration: 3.5 },
        TrackSegment { kind: Straight, duration: 5.0 },
        TrackSegment { kind: Braking,  duration: 2.0 },
        TrackSegment { kind: Corner,   duration: 3.0 },
        TrackSegment { kind: Accel,    duration: 3.0 },
        TrackSegment { kind: Straight, duration: 9.0 },
    ]
}

/// Pedal positions, each 0.0 (idle) to 1.0 (fully pressed)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PedalPositions {
    pub throttle: f32,
    pub brake: f32,
    pub clutch: f32,
}

fn pedals_at(track: &[TrackSegment], lap_time: f32) -> PedalPositions {
    let lap_duration: f32 = track.iter().map(|s| s.duration).sum();
    let t = lap_time % lap_duration;

    let mut elapsed = 0.0_f32;
    let mut seg_idx = track.len() - 1;
    for (i, seg) in track.iter().enumerate() {
        if elapsed + seg.duration > t {
            seg_idx = i;
            break;
        }
        elapsed += seg.duration;
    }

    let seg = track[seg_idx];
    let seg_t = ((t - elapsed) / seg.duration).clamp(0.0, 1.0);
    let smooth_t = smoothstep(seg_t);

    match seg.kind {
        SegmentKind::Straight => PedalPositions {
            throttle: 1.0,
            brake: 0.0,
            clutch: 0.0,
        },
        SegmentKind::Braking => PedalPositions {
            throttle: 0.0,
            brake: (1.0 - smooth_t * 0.3).clamp(0.0, 1.0),
            // Blip the clutch for the downshift at the start of the zone
            clutch: if seg_t < 0.2 { 1.0 - seg_t * 5.0 } else { 0.0 },
        },
        SegmentKind::Corner => PedalPositions {
            throttle: 0.2 + 0.3 * seg_t,
            brake: 0.0,
            clutch: 0.0,
        },
        SegmentKind::Accel => PedalPositions {
            throttle: 0.5 + 0.5 * smooth_t,
            brake: 0.0,
            clutch: 0.0,
        },
    }
}

fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Simple deterministic noise from a seed
fn noise(seed: f32) -> f32 {
    let x = (seed * 12.9898 + 78.233).sin() * 43_758.547;
    x - x.floor()
}

/// Small jitter centered around 0
fn jitter(seed: f32, amplitude: f32) -> f32 {
    (noise(seed) - 0.5) * 2.0 * amplitude
}

// =============================================================================
// DemoPedals
// =============================================================================

pub struct DemoPedals {
    start_time: Instant,
    sample_count: u64,
    track: Vec<TrackSegment>,
    throttle_ceiling: f32,
    inverted: bool,
    caps: DeviceCaps,
}

impl DemoPedals {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            sample_count: 0,
            track: demo_track(),
            throttle_ceiling: 1.0,
            inverted: true,
            caps: DeviceCaps {
                vendor_id: DEMO_VENDOR_ID,
                product_id: DEMO_PRODUCT_ID,
            },
        }
    }

    /// Limit throttle travel, e.g. 0.85 for a pedal stuck at 85%
    pub fn with_throttle_ceiling(mut self, ceiling: f32) -> Self {
        self.throttle_ceiling = ceiling.clamp(0.0, 1.0);
        self
    }

    /// Report idle as 0 instead of axis max
    pub fn non_inverted(mut self) -> Self {
        self.inverted = false;
        self
    }

    /// Pedal positions at a point in the lap, before noise and scaling
    pub fn positions_at(&self, lap_time: f32) -> PedalPositions {
        let mut positions = pedals_at(&self.track, lap_time);
        positions.throttle *= self.throttle_ceiling;
        positions
    }

    /// Full axis snapshot at a point in the lap
    pub fn snapshot_at(&mut self, lap_time: f32, flags: SampleFlags) -> AxisSnapshot {
        self.sample_count += 1;
        let n = self.sample_count as f32;
        let axis_max = axis::axis_max(flags.raw_data);
        let positions = self.positions_at(lap_time);

        let to_raw = |position: f32| -> u32 {
            let travel = (position * axis_max as f32).round().clamp(0.0, axis_max as f32) as u32;
            if self.inverted {
                axis_max - travel
            } else {
                travel
            }
        };

        // Noise only on pedals already in use so idle reads exactly idle
        let with_noise = |position: f32, ceiling: f32, seed: f32| {
            if position > 0.0 {
                (position + jitter(seed, 0.005)).clamp(0.0, ceiling)
            } else {
                position
            }
        };

        let mut snapshot = AxisSnapshot::default();
        // Unused channels rest at idle
        for channel in [AxisChannel::X, AxisChannel::U, AxisChannel::V] {
            snapshot.set_channel(channel, to_raw(0.0));
        }
        snapshot.set_channel(AxisChannel::Y, to_raw(with_noise(positions.throttle, self.throttle_ceiling, n)));
        snapshot.set_channel(AxisChannel::Z, to_raw(with_noise(positions.brake, 1.0, n * 1.3)));
        snapshot.set_channel(AxisChannel::R, to_raw(positions.clutch));
        snapshot
    }
}

impl Default for DemoPedals {
    fn default() -> Self {
        Self::new()
    }
}

impl AxisSource for DemoPedals {
    fn name(&self) -> &str {
        "Demo"
    }

    fn sample(&mut self, device: DeviceId, flags: SampleFlags) -> Result<AxisSnapshot, SourceError> {
        if device != 0 {
            return Err(SourceError::InvalidDevice(device));
        }
        let elapsed = self.start_time.elapsed().as_secs_f32();
        Ok(self.snapshot_at(elapsed, flags))
    }

    fn device_count(&self) -> u32 {
        1
    }

    fn capabilities(&self, device: DeviceId) -> Result<DeviceCaps, SourceError> {
        if device != 0 {
            return Err(SourceError::InvalidDevice(device));
        }
        Ok(self.caps)
    }
}
