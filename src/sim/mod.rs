//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (roster kept in spawn order)
//! - No rendering, audio or platform dependencies

pub mod bean;
pub mod events;
pub mod navigation;
pub mod resources;
pub mod schedule;
pub mod session;
pub mod state;
pub mod tick;
pub mod vehicle;

pub use bean::{Bean, BeanAgent, BeanBehavior, BeanMotion, NeighborSnapshot, RosterView};
pub use events::{EventBus, GameEvent, ListenerId};
pub use navigation::{DiscSurface, NavSurface};
pub use resources::{CoffeeOutcome, PlayerResources};
pub use schedule::PeriodicTimer;
pub use session::SessionOrchestrator;
pub use state::{
    BeanId, GamePhase, PlayerHandle, RngState, SceneRequest, SessionResult, SessionSnapshot,
    SimEntity,
};
pub use tick::{Simulation, TickInput};
pub use vehicle::{VehicleSimulator, VehicleState};
