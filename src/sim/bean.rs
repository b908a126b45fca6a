//! Bean agents
//!
//! Each bean runs a small behaviour machine:
//! - `Roaming`: wander to a random nearby point every `roam_interval`
//! - `Fleeing`: run directly away from the player while it is close
//! - `Cohesion`: drift toward the centre of a small nearby group for a while
//!
//! Decisions read a [`RosterView`] captured before any bean moves this tick,
//! so the order beans are updated in never changes what they decide.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::navigation::NavSurface;
use super::schedule::PeriodicTimer;
use super::state::{BeanId, SimEntity};
use crate::settings::BeanTuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BeanBehavior {
    #[default]
    Roaming,
    Fleeing,
    Cohesion,
}

/// Position of one bean as seen at the start of a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborSnapshot {
    pub id: BeanId,
    pub position: Vec3,
}

/// Everything a bean may look at when deciding what to do
#[derive(Debug, Clone, Copy)]
pub struct RosterView<'a> {
    pub player: Option<Vec3>,
    pub beans: &'a [NeighborSnapshot],
}

impl RosterView<'_> {
    /// Beans within `radius` of `position`, excluding `exclude`
    pub fn neighbors(&self, exclude: BeanId, position: Vec3, radius: f32) -> Vec<NeighborSnapshot> {
        self.beans
            .iter()
            .filter(|b| b.id != exclude && b.position.distance(position) <= radius)
            .copied()
            .collect()
    }
}

/// Mean position of `origin` and its neighbours
pub fn group_center(origin: Vec3, neighbors: &[NeighborSnapshot]) -> Vec3 {
    let sum = neighbors.iter().fold(origin, |acc, n| acc + n.position);
    sum / (neighbors.len() + 1) as f32
}

/// Straight-line mover toward a destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeanMotion {
    pub position: Vec3,
    pub destination: Option<Vec3>,
    pub speed: f32,
}

impl BeanMotion {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            destination: None,
            speed: 0.0,
        }
    }

    pub fn set_destination(&mut self, destination: Vec3, speed: f32) {
        self.destination = Some(destination);
        self.speed = speed;
    }

    pub fn stop(&mut self) {
        self.destination = None;
    }

    pub fn is_moving(&self) -> bool {
        self.destination.is_some()
    }

    /// Move toward the destination without overshooting, staying on the floor
    pub fn step(&mut self, dt: f32, arrive_distance: f32, surface: &dyn NavSurface) {
        let Some(destination) = self.destination else {
            return;
        };
        let to_target = destination - self.position;
        let dist = to_target.length();
        let travel = self.speed * dt;

        if dist <= arrive_distance || dist <= travel {
            self.position = surface.clamp(destination);
            self.destination = None;
        } else {
            self.position = surface.clamp(self.position + to_target / dist * travel);
        }
    }
}

/// The single re-targeting loop currently driving a bean
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct MovementLoop {
    behavior: BeanBehavior,
    timer: PeriodicTimer,
}

impl MovementLoop {
    /// Start a loop whose first action is due on the tick that starts it
    fn start(behavior: BeanBehavior, tuning: &BeanTuning) -> Self {
        let interval = match behavior {
            BeanBehavior::Roaming => tuning.roam_interval,
            BeanBehavior::Fleeing => tuning.flee_retarget_interval,
            BeanBehavior::Cohesion => tuning.cohesion_retarget_interval,
        };
        let mut timer = PeriodicTimer::new(interval);
        timer.start();
        Self { behavior, timer }
    }
}

/// A behaviour change, for logging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: BeanBehavior,
    pub to: BeanBehavior,
}

/// Behaviour state machine of one bean
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeanAgent {
    behavior: BeanBehavior,
    movement: MovementLoop,
    /// Seconds left in the current group (Cohesion only)
    group_time_left: f32,
}

impl BeanAgent {
    pub fn new(tuning: &BeanTuning) -> Self {
        Self {
            behavior: BeanBehavior::Roaming,
            movement: MovementLoop::start(BeanBehavior::Roaming, tuning),
            group_time_left: 0.0,
        }
    }

    pub fn behavior(&self) -> BeanBehavior {
        self.behavior
    }

    pub fn group_time_left(&self) -> f32 {
        self.group_time_left
    }

    /// Pick the behaviour for this tick
    ///
    /// The player's proximity always wins; otherwise a bean joins a group of
    /// fewer than `max_group_size` neighbours, and stays grouped until its
    /// group timer runs out.
    fn decide(
        &self,
        id: BeanId,
        position: Vec3,
        view: &RosterView<'_>,
        tuning: &BeanTuning,
    ) -> Option<BeanBehavior> {
        let near_player = view
            .player
            .is_some_and(|p| p.distance(position) < tuning.flee_distance);

        if near_player {
            return (self.behavior != BeanBehavior::Fleeing).then_some(BeanBehavior::Fleeing);
        }

        if self.behavior != BeanBehavior::Cohesion {
            let count = view.neighbors(id, position, tuning.cohesion_radius).len();
            if count > 0 && count < tuning.max_group_size {
                return Some(BeanBehavior::Cohesion);
            }
            if self.behavior != BeanBehavior::Roaming {
                return Some(BeanBehavior::Roaming);
            }
            return None;
        }

        (self.group_time_left <= 0.0).then_some(BeanBehavior::Roaming)
    }

    /// Switch behaviour, replacing the running movement loop
    fn enter(&mut self, behavior: BeanBehavior, tuning: &BeanTuning, motion: &mut BeanMotion, rng: &mut impl Rng) {
        self.behavior = behavior;
        self.movement = MovementLoop::start(behavior, tuning);
        motion.stop();
        self.group_time_left = if behavior == BeanBehavior::Cohesion {
            if tuning.max_group_duration > tuning.min_group_duration {
                rng.random_range(tuning.min_group_duration..tuning.max_group_duration)
            } else {
                tuning.min_group_duration
            }
        } else {
            0.0
        };
    }

    /// One simulation step: decide, run the movement loop, move
    #[allow(clippy::too_many_arguments)]
    pub fn tick(
        &mut self,
        id: BeanId,
        motion: &mut BeanMotion,
        view: &RosterView<'_>,
        dt: f32,
        tuning: &BeanTuning,
        surface: &dyn NavSurface,
        rng: &mut impl Rng,
    ) -> Option<Transition> {
        let from = self.behavior;
        let mut transition = None;

        if self.behavior == BeanBehavior::Cohesion {
            self.group_time_left -= dt;
        }

        if let Some(next) = self.decide(id, motion.position, view, tuning) {
            self.enter(next, tuning, motion, rng);
            transition = Some(Transition { from, to: next });
        }

        for _ in 0..self.movement.timer.tick(dt) {
            if let Some(next) = self.run_loop_action(id, motion, view, tuning, surface, rng) {
                // the new loop acts on the next tick
                self.enter(next, tuning, motion, rng);
                transition = Some(Transition { from, to: next });
                break;
            }
        }

        motion.step(dt, tuning.arrive_distance, surface);
        transition
    }

    /// Perform the current loop's periodic action; returns a behaviour to
    /// switch to when the loop has finished
    fn run_loop_action(
        &mut self,
        id: BeanId,
        motion: &mut BeanMotion,
        view: &RosterView<'_>,
        tuning: &BeanTuning,
        surface: &dyn NavSurface,
        rng: &mut impl Rng,
    ) -> Option<BeanBehavior> {
        let position = motion.position;
        match self.movement.behavior {
            BeanBehavior::Roaming => {
                let angle = rng.random_range(0.0..std::f32::consts::TAU);
                let dist = tuning.roam_radius * rng.random::<f32>().sqrt();
                let candidate = position + Vec3::new(angle.cos() * dist, 0.0, angle.sin() * dist);
                if let Some(target) = surface.sample_position(candidate, tuning.roam_radius) {
                    motion.set_destination(target, tuning.roam_speed);
                }
                None
            }
            BeanBehavior::Fleeing => {
                let player = view.player?;
                if player.distance(position) >= tuning.flee_distance * tuning.flee_release_factor {
                    return Some(BeanBehavior::Roaming);
                }
                let away = crate::flatten(position - player).normalize_or_zero();
                let candidate = position + away * tuning.flee_distance;
                let target = surface
                    .sample_position(candidate, tuning.flee_distance)
                    .unwrap_or(candidate);
                motion.set_destination(target, tuning.flee_speed);
                None
            }
            BeanBehavior::Cohesion => {
                if self.group_time_left <= 0.0 {
                    return Some(BeanBehavior::Roaming);
                }
                let neighbors = view.neighbors(id, position, tuning.cohesion_radius);
                motion.set_destination(group_center(position, &neighbors), tuning.cohesion_speed);
                None
            }
        }
    }
}

/// A bean in the roster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bean {
    pub id: BeanId,
    /// Asset key chosen at spawn, for presentation
    pub variant: String,
    pub agent: BeanAgent,
    pub motion: BeanMotion,
}

impl Bean {
    pub fn new(id: BeanId, position: Vec3, variant: String, tuning: &BeanTuning) -> Self {
        Self {
            id,
            variant,
            agent: BeanAgent::new(tuning),
            motion: BeanMotion::new(position),
        }
    }

    pub fn behavior(&self) -> BeanBehavior {
        self.agent.behavior()
    }

    pub fn snapshot(&self) -> NeighborSnapshot {
        NeighborSnapshot {
            id: self.id,
            position: self.motion.position,
        }
    }

    pub fn tick(
        &mut self,
        view: &RosterView<'_>,
        dt: f32,
        tuning: &BeanTuning,
        surface: &dyn NavSurface,
        rng: &mut impl Rng,
    ) -> Option<Transition> {
        let transition = self
            .agent
            .tick(self.id, &mut self.motion, view, dt, tuning, surface, rng);
        if let Some(t) = transition {
            log::debug!("bean {:?}: {:?} -> {:?}", self.id, t.from, t.to);
        }
        transition
    }
}

impl SimEntity for Bean {
    type Id = BeanId;

    fn id(&self) -> BeanId {
        self.id
    }

    fn position(&self) -> Vec3 {
        self.motion.position
    }
}
