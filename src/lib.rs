//! Bean Drift - simulation core of an arcade coffee-mill driving game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (vehicle physics, bean agents, session flow)
//! - `settings`: Data-driven game tuning
//! - `error`: Session contract and settings errors

pub mod error;
pub mod settings;
pub mod sim;

pub use error::{SessionError, SettingsError};
pub use settings::{BeanTuning, GameSettings, ResourceTuning, SessionTuning, SpillRule, VehicleTuning};

use glam::Vec3;

/// Simulation constants that are not part of the tuning data
pub mod consts {
    /// Fixed simulation timestep (50 Hz physics)
    pub const SIM_DT: f32 = 1.0 / 50.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest frame accepted by the fixed-step accumulator
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Tolerance for accumulated-time comparisons (absorbs f32 summation error)
    pub const TIME_EPSILON: f32 = 1e-4;

    /// Session timer and countdown step (real seconds)
    pub const LOGIC_STEP_SEC: f32 = 1.0;
    /// Attempts at finding a navigable spawn position before using the centre
    pub const SPAWN_SAMPLE_ATTEMPTS: u32 = 30;
    /// Search radius when projecting a spawn candidate onto the floor
    pub const SPAWN_SAMPLE_RADIUS: f32 = 2.0;

    /// Inputs below this magnitude count as released
    pub const INPUT_DEADZONE: f32 = 0.1;
    /// Below this speed drag and engine braking are skipped (m/s)
    pub const MIN_DRAG_SPEED: f32 = 0.1;
    /// Mill power below this snaps to zero
    pub const MILL_SNAP_EPSILON: f32 = 0.001;
    /// Speed needed before steering spins the mill (m/s)
    pub const MILL_STEER_MIN_SPEED: f32 = 1.0;
    /// Speed needed before throttle spins the mill (m/s)
    pub const MILL_THROTTLE_MIN_SPEED: f32 = 0.5;
}

/// Linear interpolation with `t` clamped to [0, 1]
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    a + (b - a) * t
}

/// Project a vector onto the ground plane
#[inline]
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Distance between two points measured on the ground plane
#[inline]
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    flatten(a - b).length()
}
