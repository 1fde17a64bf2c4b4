//! Scripted control input
//!
//! Produces the per-tick setpoints of the demo session: two drive ports
//! following a slow sine, two servo ports sweeping between the end stops.

use crate::domain::models::Port;
use std::f64::consts::TAU;

/// Seconds for one full sweep
const SWEEP_PERIOD_S: f64 = 4.0;

/// Setpoints for one control tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlActions {
    /// (port, velocity in [-1, 1])
    pub velocities: [(Port, f64); 2],
    /// (port, angle in degrees)
    pub angles: [(Port, f64); 2],
}

pub fn sweep(tick: u32, period_ms: u64) -> ControlActions {
    let t = tick as f64 * period_ms as f64 / 1000.0;
    let phase = (t / SWEEP_PERIOD_S * TAU).sin();

    ControlActions {
        velocities: [(Port::Port1, phase), (Port::Port2, -phase)],
        angles: [(Port::Port3, 90.0 * phase), (Port::Port4, -90.0 * phase)],
    }
}
