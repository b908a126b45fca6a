//! Session-wide identifiers, phases and read-only snapshots
//!
//! Everything presentation layers are allowed to observe lives here.

use glam::Vec3;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// Current phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for the session to start
    #[default]
    Idle,
    /// 3-2-1 countdown, gameplay time frozen
    Countdown,
    /// Timer running, beans spawning
    Active,
    /// Time is up, gameplay frozen until reset
    Ended,
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Idle => "Idle",
            GamePhase::Countdown => "Countdown",
            GamePhase::Active => "Active",
            GamePhase::Ended => "Ended",
        }
    }
}

/// Unique bean identifier (never reused within a session)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BeanId(pub u32);

/// Handle of the registered player vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerHandle(pub u32);

/// Capabilities shared by everything that occupies the arena
pub trait SimEntity {
    type Id: Copy + Eq;

    fn id(&self) -> Self::Id;
    fn position(&self) -> Vec3;
}

/// Whether two entities overlap within `radius` on the ground plane
pub fn overlaps<A: SimEntity, B: SimEntity>(a: &A, b: &B, radius: f32) -> bool {
    crate::planar_distance(a.position(), b.position()) <= radius
}

/// RNG state wrapper for serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn to_rng(&self) -> Pcg32 {
        Pcg32::seed_from_u64(self.seed)
    }
}

/// Final tally handed to listeners when the session ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    pub score: u64,
    pub ground_beans: u32,
    pub ground_coffee: u32,
}

/// Scene change the caller must perform after leaving a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneRequest {
    /// Reload the game scene and start over
    Restart,
    /// Go back to the title screen
    Title,
}

/// Read-only view of the session for UI, audio and effects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: GamePhase,
    pub remaining_time: f32,
    pub is_active: bool,
    pub ground_beans: u32,
    pub ground_coffee: u32,
    pub score: u64,
    pub is_spilling: bool,
    pub roster_size: usize,
    pub player: Option<PlayerHandle>,
    /// Vehicle speed as a fraction of its max speed (0 when no vehicle)
    pub speed_rate: f32,
    pub mill_power: f32,
    pub is_drifting: bool,
}
