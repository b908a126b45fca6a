//! Cancellable periodic timers
//!
//! Every "wait, act, repeat" loop in the simulation is a [`PeriodicTimer`]
//! owned by the component that runs it. A timer holds the seconds left until
//! its next action; ticking it reports how many actions are due. Cancelling
//! (or dropping the owner) leaves nothing scheduled.

use serde::{Deserialize, Serialize};

use crate::consts::TIME_EPSILON;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodicTimer {
    interval: f32,
    remaining: f32,
    running: bool,
}

impl PeriodicTimer {
    /// A stopped timer with the given period (seconds)
    pub fn new(interval: f32) -> Self {
        Self {
            interval: interval.max(TIME_EPSILON),
            remaining: 0.0,
            running: false,
        }
    }

    /// Start so the first action is due on the next tick
    pub fn start(&mut self) {
        self.remaining = 0.0;
        self.running = true;
    }

    /// Start so the first action is due after one full interval
    pub fn start_delayed(&mut self) {
        self.remaining = self.interval;
        self.running = true;
    }

    pub fn cancel(&mut self) {
        self.running = false;
        self.remaining = 0.0;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Seconds until the next action (0 when stopped)
    pub fn remaining(&self) -> f32 {
        if self.running { self.remaining.max(0.0) } else { 0.0 }
    }

    /// Advance by `dt` seconds and return how many actions fired
    pub fn tick(&mut self, dt: f32) -> u32 {
        if !self.running {
            return 0;
        }
        self.remaining -= dt;
        let mut fired = 0;
        while self.remaining <= TIME_EPSILON {
            fired += 1;
            self.remaining += self.interval;
        }
        fired
    }
}
