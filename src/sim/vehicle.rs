//! Player vehicle simulation
//!
//! Arcade driving on a ground plane: throttle/brake, speed-sensitive
//! steering, drifting, and the coffee mill on the back. Mill power follows
//! what the driver is doing; while it spins, collected beans are ground into
//! coffee. Impacts spill coffee.
//!
//! Per tick order: steering, acceleration, deceleration, drift, integration,
//! mill, grinding, spilling.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::events::{EventBus, GameEvent};
use super::resources::PlayerResources;
use super::state::{PlayerHandle, SimEntity};
use crate::consts::*;
use crate::lerp;
use crate::settings::{ResourceTuning, VehicleTuning};

/// Rigid body and mill state (owned by [`VehicleSimulator`])
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleState {
    pub position: Vec3,
    /// Yaw-only orientation; forward is +Z, right is +X
    pub rotation: Quat,
    pub velocity: Vec3,
    /// Smoothed mill power in [0, 1]
    pub mill_power: f32,
    /// Seconds accumulated toward the next ground bean
    pub grind_timer: f32,
    /// Seconds accumulated toward the next contact spill
    pub spill_timer: f32,
    pub is_drifting: bool,
    /// Speed sampled at the start of this tick
    pub speed: f32,
    /// Speed sampled at the start of the previous tick
    pub last_speed: f32,
    /// Vehicle clock time of the last sudden-stop spill
    pub last_spill_at: Option<f32>,
    /// Active seconds simulated so far
    pub clock: f32,
}

impl VehicleState {
    fn at(position: Vec3, yaw: f32) -> Self {
        Self {
            position,
            rotation: Quat::from_rotation_y(yaw),
            velocity: Vec3::ZERO,
            mill_power: 0.0,
            grind_timer: 0.0,
            spill_timer: 0.0,
            is_drifting: false,
            speed: 0.0,
            last_speed: 0.0,
            last_spill_at: None,
            clock: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VehicleSimulator {
    handle: PlayerHandle,
    tuning: VehicleTuning,
    grinding: ResourceTuning,
    state: VehicleState,
    mill_spinning: bool,
}

impl VehicleSimulator {
    /// Place a vehicle at rest; `yaw` is in radians
    pub fn new(
        handle: PlayerHandle,
        tuning: &VehicleTuning,
        grinding: &ResourceTuning,
        position: Vec3,
        yaw: f32,
    ) -> Self {
        Self {
            handle,
            tuning: tuning.clone(),
            grinding: grinding.clone(),
            state: VehicleState::at(position, yaw),
            mill_spinning: false,
        }
    }

    pub fn handle(&self) -> PlayerHandle {
        self.handle
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn tuning(&self) -> &VehicleTuning {
        &self.tuning
    }

    pub fn forward(&self) -> Vec3 {
        self.state.rotation * Vec3::Z
    }

    pub fn right(&self) -> Vec3 {
        self.state.rotation * Vec3::X
    }

    pub fn speed(&self) -> f32 {
        self.state.velocity.length()
    }

    /// Signed velocity along the vehicle's forward axis
    pub fn forward_speed(&self) -> f32 {
        self.state.velocity.dot(self.forward())
    }

    /// Current speed as a fraction of max speed
    pub fn speed_rate(&self) -> f32 {
        self.speed() / self.tuning.max_speed
    }

    pub fn is_drifting(&self) -> bool {
        self.state.is_drifting
    }

    pub fn mill_power(&self) -> f32 {
        self.state.mill_power
    }

    /// Overwrite the velocity (collision response from the host physics)
    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.state.velocity = Vec3::new(velocity.x, 0.0, velocity.z);
    }

    /// The host's collision response brought the vehicle to a dead stop
    pub fn halt(&mut self) {
        self.state.velocity = Vec3::ZERO;
    }

    /// Contact with an obstacle began; fast contacts start a sustained spill
    pub fn begin_contact(&self, resources: &mut PlayerResources) {
        if self.speed() > self.grinding.spill_speed_threshold {
            resources.set_spilling(true);
        }
    }

    /// Contact ended; any sustained spill stops
    pub fn end_contact(&self, resources: &mut PlayerResources) {
        resources.set_spilling(false);
    }

    /// Steering multiplier for a given speed
    ///
    /// Boosted at low speed, falling to 1 at `low_speed_threshold`, then to
    /// `min_steer_at_max_speed` at `max_speed`.
    pub fn speed_steer_factor(&self, speed: f32) -> f32 {
        let t = &self.tuning;
        if speed <= t.low_speed_threshold {
            lerp(t.low_speed_steer_multiplier, 1.0, speed / t.low_speed_threshold)
        } else {
            let span = (t.max_speed - t.low_speed_threshold).max(f32::EPSILON);
            let u = (speed - t.low_speed_threshold) / span;
            lerp(1.0, t.min_steer_at_max_speed.clamp(0.0, 1.0), u)
        }
    }

    /// Yaw rate (degrees/s) for the given inputs at `speed`
    pub fn steer_rate(&self, steering: f32, throttle: f32, speed: f32) -> f32 {
        let t = &self.tuning;
        if speed < t.min_steering_speed {
            return 0.0;
        }
        let throttle_factor = 1.0 - throttle.abs() * t.throttle_steer_reduction.clamp(0.0, 1.0);
        steering * t.max_steer_angle * self.speed_steer_factor(speed) * throttle_factor
    }

    /// Advance one fixed step
    ///
    /// Does nothing (inputs treated as zero) while the session is inactive.
    pub fn tick(
        &mut self,
        throttle: f32,
        steering: f32,
        dt: f32,
        active: bool,
        resources: &mut PlayerResources,
        events: &mut EventBus,
    ) {
        if !active || dt <= 0.0 {
            return;
        }
        let throttle = throttle.clamp(-1.0, 1.0);
        let steering = steering.clamp(-1.0, 1.0);

        self.state.last_speed = self.state.speed;
        self.state.speed = self.speed();

        self.apply_steering(steering, throttle, dt);
        self.apply_acceleration(throttle, dt);
        self.apply_deceleration(throttle, dt);
        self.apply_drift(steering, throttle, dt);
        self.integrate(dt);
        self.update_mill(steering, throttle, dt, events);
        self.grind(dt, resources, events);
        self.spill(dt, resources, events);

        self.state.clock += dt;
    }

    fn apply_steering(&mut self, steering: f32, throttle: f32, dt: f32) {
        let rate = self.steer_rate(steering, throttle, self.state.speed);
        if rate == 0.0 {
            return;
        }
        let delta = Quat::from_rotation_y((rate * dt).to_radians());
        self.state.rotation = (self.state.rotation * delta).normalize();
    }

    /// Convert a force (already scaled by dt) into a velocity change over this step
    fn impulse(&self, force: f32, dt: f32) -> f32 {
        force / self.tuning.mass * dt
    }

    fn apply_acceleration(&mut self, throttle: f32, dt: f32) {
        let forward = self.forward();
        let forward_vel = self.state.velocity.dot(forward);
        let max_speed = self.tuning.max_speed;

        if throttle > 0.0 && forward_vel < max_speed {
            let dv = self.impulse(throttle * self.tuning.acceleration_force * dt, dt);
            // never push past max speed
            let dv = dv.min(max_speed - forward_vel);
            self.state.velocity += forward * dv;
        } else if throttle < 0.0 {
            let dv = self.impulse(throttle * self.tuning.acceleration_force * dt, dt);
            self.state.velocity += forward * dv;
        }
    }

    fn apply_deceleration(&mut self, throttle: f32, dt: f32) {
        let forward = self.forward();

        // engine brake while coasting forward
        if throttle.abs() < INPUT_DEADZONE && self.speed() > MIN_DRAG_SPEED {
            let forward_vel = self.state.velocity.dot(forward);
            if forward_vel > MIN_DRAG_SPEED {
                let dv = self
                    .impulse(self.tuning.engine_brake_force * dt, dt)
                    .min(forward_vel);
                self.state.velocity -= forward * dv;
            }
        }

        // air drag ~ speed²
        let speed = self.speed();
        if speed > MIN_DRAG_SPEED {
            let dv = self
                .impulse(self.tuning.drag_coefficient * speed * speed * dt, dt)
                .min(speed);
            self.state.velocity -= self.state.velocity / speed * dv;
        }
    }

    fn apply_drift(&mut self, steering: f32, throttle: f32, dt: f32) {
        let t = &self.tuning;
        let forward = self.forward();
        let right = self.right();
        let velocity = self.state.velocity;
        let speed = velocity.length();
        let forward_vel = velocity.dot(forward);
        let lateral_vel = velocity.dot(right);

        let drifting = speed > t.drift_speed_threshold
            && lateral_vel.abs() > speed * t.drift_lateral_ratio
            && steering.abs() > t.drift_min_input
            && throttle > t.drift_min_input;
        self.state.is_drifting = drifting;

        let retention = if drifting {
            // rear slip pushes the tail out, front grip pulls it back in
            let wheel_force =
                ((1.0 - t.front_wheel_grip) - t.rear_wheel_slip) * t.acceleration_force * dt;
            let wheel = self.impulse(wheel_force, dt);
            (t.drift_factor + wheel).max(0.0)
        } else {
            lerp(
                t.lateral_retention_low,
                t.lateral_retention_high,
                speed / t.max_speed,
            )
        };

        let mut velocity = forward * forward_vel + right * (lateral_vel * retention);
        velocity.y = 0.0;
        self.state.velocity = velocity;
    }

    fn integrate(&mut self, dt: f32) {
        let damping = (1.0 - self.tuning.linear_damping * dt).max(0.0);
        self.state.velocity *= damping;
        self.state.velocity.y = 0.0;
        self.state.position += self.state.velocity * dt;
    }

    /// Mill power the driver is currently asking for
    fn mill_target(&self, steering: f32, throttle: f32) -> f32 {
        let t = &self.tuning;
        let speed = self.speed();
        if self.state.is_drifting {
            t.drift_mill_power
        } else if steering.abs() > INPUT_DEADZONE && speed > MILL_STEER_MIN_SPEED {
            t.steering_mill_power * steering.abs()
        } else if throttle > INPUT_DEADZONE && speed > MILL_THROTTLE_MIN_SPEED {
            t.forward_mill_power * throttle
        } else {
            0.0
        }
    }

    fn update_mill(&mut self, steering: f32, throttle: f32, dt: f32, events: &mut EventBus) {
        let target = self.mill_target(steering, throttle);
        let mut power = lerp(
            self.state.mill_power,
            target,
            dt * self.tuning.mill_response_rate,
        );
        if power.abs() < MILL_SNAP_EPSILON {
            power = 0.0;
        }
        self.state.mill_power = power.clamp(0.0, 1.0);

        let spinning = self.state.mill_power > MILL_SNAP_EPSILON;
        if spinning != self.mill_spinning {
            events.emit(if spinning {
                GameEvent::MillStarted
            } else {
                GameEvent::MillStopped
            });
            self.mill_spinning = spinning;
        }
    }

    /// Seconds per ground bean at the current mill power
    pub fn grind_interval(&self) -> f32 {
        1.0 / (self.grinding.base_mill_grind_speed * self.state.mill_power)
    }

    fn grind(&mut self, dt: f32, resources: &mut PlayerResources, events: &mut EventBus) {
        let gate = self.state.mill_power > self.grinding.min_mill_rotation_for_grinding
            && resources.ground_beans() > 0;
        if !gate {
            self.state.grind_timer = 0.0;
            return;
        }

        self.state.grind_timer += dt;
        if self.state.grind_timer + TIME_EPSILON < self.grind_interval() {
            return;
        }
        self.state.grind_timer = 0.0;

        let consumed = resources.consume_ground_beans(1);
        let outcome = resources.add_ground_coffee(consumed);
        if outcome.batch_completed {
            log::debug!("Coffee batch complete, score {}", resources.score());
            events.emit(GameEvent::CoffeeBrewed {
                score: resources.score(),
            });
        } else {
            events.emit(GameEvent::CoffeeGround {
                ground_coffee: resources.ground_coffee(),
            });
        }
    }

    fn spill(&mut self, dt: f32, resources: &mut PlayerResources, events: &mut EventBus) {
        let rule = self.grinding.spill_rule;

        if rule.uses_contact() {
            if resources.is_spilling() {
                self.state.spill_timer += dt;
                let interval = 1.0 / self.grinding.spill_speed;
                if self.state.spill_timer + TIME_EPSILON >= interval {
                    self.state.spill_timer = 0.0;
                    if resources.remove_ground_coffee(1) > 0 {
                        events.emit(GameEvent::CoffeeSpilled {
                            ground_coffee: resources.ground_coffee(),
                        });
                    }
                }
            } else {
                self.state.spill_timer = 0.0;
            }
        }

        if rule.uses_sudden_stop() {
            let stopped = self.state.last_speed > self.grinding.spill_speed_threshold
                && self.state.speed <= self.grinding.sudden_stop_speed;
            let cooled_down = self
                .state
                .last_spill_at
                .is_none_or(|at| self.state.clock - at + TIME_EPSILON >= self.grinding.spill_interval);

            if stopped && cooled_down {
                self.state.last_spill_at = Some(self.state.clock);
                events.emit(GameEvent::Impact {
                    position: self.state.position,
                });
                if resources.remove_ground_coffee(1) > 0 {
                    events.emit(GameEvent::CoffeeSpilled {
                        ground_coffee: resources.ground_coffee(),
                    });
                }
            }
        }
    }
}

impl SimEntity for VehicleSimulator {
    type Id = PlayerHandle;

    fn id(&self) -> PlayerHandle {
        self.handle
    }

    fn position(&self) -> Vec3 {
        self.state.position
    }
}
