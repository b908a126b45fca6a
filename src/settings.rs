//! Game tuning
//!
//! Every tunable constant of a session lives here as a flat set of named
//! values. Settings are loaded once when a session starts and are treated as
//! immutable for its duration; each component keeps its own copy of the
//! section it reads.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Which rule removes ground coffee when the vehicle hits something
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SpillRule {
    /// Spill while in sustained high-speed contact, at `spill_speed` units/s
    Contact,
    /// Spill one unit when the vehicle stops abruptly from high speed
    #[default]
    SuddenStop,
    /// Both rules active
    Both,
}

impl SpillRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpillRule::Contact => "Contact",
            SpillRule::SuddenStop => "SuddenStop",
            SpillRule::Both => "Both",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "contact" => Some(SpillRule::Contact),
            "suddenstop" | "sudden_stop" | "stop" => Some(SpillRule::SuddenStop),
            "both" => Some(SpillRule::Both),
            _ => None,
        }
    }

    pub fn uses_contact(&self) -> bool {
        matches!(self, SpillRule::Contact | SpillRule::Both)
    }

    pub fn uses_sudden_stop(&self) -> bool {
        matches!(self, SpillRule::SuddenStop | SpillRule::Both)
    }
}

/// Vehicle handling and mill tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleTuning {
    /// Maximum forward speed (m/s)
    pub max_speed: f32,
    /// Force applied per unit of throttle
    pub acceleration_force: f32,
    /// Rigid body mass
    pub mass: f32,
    /// Linear damping applied every step (1/s)
    pub linear_damping: f32,

    // === Steering ===
    /// Maximum yaw rate (degrees/s)
    pub max_steer_angle: f32,
    /// Steering multiplier at standstill (>1)
    pub low_speed_steer_multiplier: f32,
    /// Speed below which the low-speed multiplier applies (m/s)
    pub low_speed_threshold: f32,
    /// Steering multiplier at max speed (0-1)
    pub min_steer_at_max_speed: f32,
    /// How much full throttle reduces steering (0-1)
    pub throttle_steer_reduction: f32,
    /// Below this speed steering is disabled (m/s)
    pub min_steering_speed: f32,

    // === Deceleration ===
    /// Drag coefficient (force ~ speed²)
    pub drag_coefficient: f32,
    /// Engine brake force when coasting forward
    pub engine_brake_force: f32,

    // === Drift ===
    /// Minimum speed for a drift (m/s)
    pub drift_speed_threshold: f32,
    /// Lateral speed must exceed this fraction of total speed
    pub drift_lateral_ratio: f32,
    /// Minimum steering and throttle magnitude for a drift
    pub drift_min_input: f32,
    /// Lateral velocity retained per step while drifting (0-1)
    pub drift_factor: f32,
    /// Rear wheel slip while drifting (0-1)
    pub rear_wheel_slip: f32,
    /// Front wheel grip while drifting (0-1)
    pub front_wheel_grip: f32,
    /// Lateral velocity retained per step at standstill
    pub lateral_retention_low: f32,
    /// Lateral velocity retained per step at max speed
    pub lateral_retention_high: f32,

    // === Mill ===
    /// Mill power while driving forward (0-1)
    pub forward_mill_power: f32,
    /// Mill power while steering (0-1)
    pub steering_mill_power: f32,
    /// Mill power while drifting (0-1)
    pub drift_mill_power: f32,
    /// Exponential approach rate toward the target mill power (1/s)
    pub mill_response_rate: f32,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            max_speed: 10.0,
            acceleration_force: 1100.0,
            mass: 1.0,
            linear_damping: 0.14,

            max_steer_angle: 60.0,
            low_speed_steer_multiplier: 1.5,
            low_speed_threshold: 2.0,
            min_steer_at_max_speed: 0.2,
            throttle_steer_reduction: 0.5,
            min_steering_speed: 0.5,

            drag_coefficient: 0.3,
            engine_brake_force: 2.0,

            drift_speed_threshold: 3.0,
            drift_lateral_ratio: 0.3,
            drift_min_input: 0.1,
            drift_factor: 0.85,
            rear_wheel_slip: 0.3,
            front_wheel_grip: 0.8,
            lateral_retention_low: 0.95,
            lateral_retention_high: 0.98,

            forward_mill_power: 0.1,
            steering_mill_power: 0.4,
            drift_mill_power: 0.6,
            mill_response_rate: 5.0,
        }
    }
}

/// Resource gauges, grinding, spilling and scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceTuning {
    /// Capacity of the ground bean gauge
    pub max_ground_beans: u32,
    /// Coffee units per finished batch
    pub max_ground_coffee: u32,
    /// Beans ground per second at full mill power
    pub base_mill_grind_speed: f32,
    /// Mill power must exceed this to grind
    pub min_mill_rotation_for_grinding: f32,
    /// Score per ground bean added through `add_ground_beans`
    pub score_per_ground_bean: u64,
    /// Score bonus for a finished coffee batch
    pub score_per_coffee_batch: u64,

    /// Which spill mechanism is active
    pub spill_rule: SpillRule,
    /// Coffee units spilled per second during sustained contact
    pub spill_speed: f32,
    /// Speed above which an impact or stop spills coffee (m/s)
    pub spill_speed_threshold: f32,
    /// Speed at or below which the vehicle counts as stopped (m/s)
    pub sudden_stop_speed: f32,
    /// Minimum seconds between sudden-stop spills
    pub spill_interval: f32,
    /// Overlap distance at which the vehicle crushes a bean
    pub crush_radius: f32,
}

impl Default for ResourceTuning {
    fn default() -> Self {
        Self {
            max_ground_beans: 20,
            max_ground_coffee: 10,
            base_mill_grind_speed: 2.0,
            min_mill_rotation_for_grinding: 0.05,
            score_per_ground_bean: 10,
            score_per_coffee_batch: 100,

            spill_rule: SpillRule::SuddenStop,
            spill_speed: 2.0,
            spill_speed_threshold: 5.0,
            sudden_stop_speed: 0.2,
            spill_interval: 1.0,
            crush_radius: 1.5,
        }
    }
}

/// Bean behaviour tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeanTuning {
    pub roam_radius: f32,
    pub roam_interval: f32,
    pub roam_speed: f32,

    pub flee_distance: f32,
    pub flee_speed: f32,
    /// Seconds between flee re-targets
    pub flee_retarget_interval: f32,
    /// The flee loop gives up once the player is beyond
    /// `flee_distance * flee_release_factor`. The per-tick decision usually
    /// leaves Fleeing earlier, at `flee_distance`; this is the loop's own fallback.
    pub flee_release_factor: f32,

    pub cohesion_radius: f32,
    /// Groups of this many neighbours or more are not joined
    pub max_group_size: usize,
    pub cohesion_speed: f32,
    /// Seconds between centroid re-targets
    pub cohesion_retarget_interval: f32,
    pub min_group_duration: f32,
    pub max_group_duration: f32,

    /// Distance at which a bean considers its destination reached
    pub arrive_distance: f32,
}

impl Default for BeanTuning {
    fn default() -> Self {
        Self {
            roam_radius: 10.0,
            roam_interval: 3.0,
            roam_speed: 3.0,

            flee_distance: 5.0,
            flee_speed: 6.0,
            flee_retarget_interval: 0.5,
            flee_release_factor: 1.2,

            cohesion_radius: 3.0,
            max_group_size: 5,
            cohesion_speed: 4.0,
            cohesion_retarget_interval: 1.0,
            min_group_duration: 3.0,
            max_group_duration: 6.0,

            arrive_distance: 0.1,
        }
    }
}

/// Session timing, arena and spawning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTuning {
    /// Session length (seconds)
    pub game_time_sec: f32,
    /// First value shown by the countdown
    pub countdown_from: i32,
    /// Roster capacity
    pub max_bean_count: usize,
    /// Radius around the arena centre used for fallback spawn sampling
    pub bean_spawn_radius: f32,
    /// Seconds between spawn attempts (gameplay time)
    pub bean_spawn_interval: f32,
    /// Preferred spawn locations; empty means sample the arena
    pub spawn_points: Vec<[f32; 3]>,
    /// Asset keys for bean models, one is picked per spawn
    pub bean_variants: Vec<String>,
    /// Radius of the navigable arena floor
    pub arena_radius: f32,
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            game_time_sec: 60.0,
            countdown_from: 3,
            max_bean_count: 30,
            bean_spawn_radius: 15.0,
            bean_spawn_interval: 0.3,
            spawn_points: Vec::new(),
            bean_variants: vec!["arabica".to_string(), "robusta".to_string()],
            arena_radius: 25.0,
        }
    }
}

/// Complete tuning for one session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub vehicle: VehicleTuning,
    pub resources: ResourceTuning,
    pub beans: BeanTuning,
    pub session: SessionTuning,
}

impl GameSettings {
    /// Parse and validate settings from a JSON document
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let v = &self.vehicle;
        let r = &self.resources;
        let b = &self.beans;
        let s = &self.session;

        positive("vehicle.max_speed", v.max_speed)?;
        positive("vehicle.mass", v.mass)?;
        if v.low_speed_threshold <= 0.0 || v.low_speed_threshold >= v.max_speed {
            return Err(SettingsError::OutOfRange {
                name: "vehicle.low_speed_threshold",
                requirement: "between 0 and max_speed",
                value: v.low_speed_threshold,
            });
        }
        unit_interval("vehicle.drift_factor", v.drift_factor)?;
        unit_interval("vehicle.lateral_retention_low", v.lateral_retention_low)?;
        unit_interval("vehicle.lateral_retention_high", v.lateral_retention_high)?;
        unit_interval("vehicle.drift_mill_power", v.drift_mill_power)?;
        unit_interval("vehicle.steering_mill_power", v.steering_mill_power)?;
        unit_interval("vehicle.forward_mill_power", v.forward_mill_power)?;

        if r.max_ground_coffee == 0 {
            return Err(SettingsError::OutOfRange {
                name: "resources.max_ground_coffee",
                requirement: "at least 1",
                value: 0.0,
            });
        }
        positive("resources.base_mill_grind_speed", r.base_mill_grind_speed)?;
        positive("resources.spill_speed", r.spill_speed)?;

        positive("beans.roam_interval", b.roam_interval)?;
        positive("beans.flee_retarget_interval", b.flee_retarget_interval)?;
        positive("beans.cohesion_retarget_interval", b.cohesion_retarget_interval)?;
        if b.min_group_duration > b.max_group_duration {
            return Err(SettingsError::OutOfRange {
                name: "beans.min_group_duration",
                requirement: "no greater than max_group_duration",
                value: b.min_group_duration,
            });
        }

        positive("session.game_time_sec", s.game_time_sec)?;
        positive("session.bean_spawn_interval", s.bean_spawn_interval)?;
        positive("session.arena_radius", s.arena_radius)?;

        Ok(())
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), SettingsError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(SettingsError::OutOfRange {
            name,
            requirement: "greater than 0",
            value,
        })
    }
}

fn unit_interval(name: &'static str, value: f32) -> Result<(), SettingsError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SettingsError::OutOfRange {
            name,
            requirement: "within 0..=1",
            value,
        })
    }
}
