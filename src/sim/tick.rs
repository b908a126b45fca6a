//! Fixed timestep simulation tick
//!
//! [`Simulation`] owns the session, the player vehicle and the arena floor,
//! and advances them in a fixed order each step:
//! session timers, vehicle, beans, crush overlaps, event flush.

use glam::Vec3;

use super::events::{GameEvent, ListenerId};
use super::navigation::DiscSurface;
use super::session::SessionOrchestrator;
use super::state::{BeanId, PlayerHandle, SceneRequest, SessionSnapshot, overlaps};
use super::vehicle::VehicleSimulator;
use crate::consts::*;
use crate::error::{SessionError, SettingsError};
use crate::settings::GameSettings;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    /// Forward (+1) to reverse (-1)
    pub throttle: f32,
    /// Left (-1) to right (+1)
    pub steering: f32,
}

impl TickInput {
    pub fn new(throttle: f32, steering: f32) -> Self {
        Self { throttle, steering }
    }
}

#[derive(Debug)]
pub struct Simulation {
    session: SessionOrchestrator,
    vehicle: Option<VehicleSimulator>,
    surface: DiscSurface,
    /// Unsimulated frame time carried to the next `advance`
    accumulator: f32,
    tick_count: u64,
    next_handle: u32,
}

impl Simulation {
    /// Validate `settings` and build an idle session on a disc-shaped arena
    pub fn new(settings: GameSettings, seed: u64) -> Result<Self, SettingsError> {
        settings.validate()?;
        let surface = DiscSurface::new(Vec3::ZERO, settings.session.arena_radius);
        Ok(Self {
            session: SessionOrchestrator::new(settings, seed),
            vehicle: None,
            surface,
            accumulator: 0.0,
            tick_count: 0,
            next_handle: 1,
        })
    }

    /// Spawn the player vehicle at the arena centre and register it
    pub fn init(&mut self) -> Result<PlayerHandle, SessionError> {
        let handle = PlayerHandle(self.next_handle);
        self.session.register_player(handle)?;
        self.next_handle += 1;

        let settings = self.session.settings();
        let vehicle = VehicleSimulator::new(
            handle,
            &settings.vehicle,
            &settings.resources,
            self.surface.center,
            0.0,
        );
        self.vehicle = Some(vehicle);
        Ok(handle)
    }

    /// Remove the player vehicle
    pub fn despawn_player(&mut self) -> Result<(), SessionError> {
        let handle = self
            .vehicle
            .as_ref()
            .map_or(PlayerHandle(0), VehicleSimulator::handle);
        self.session.unregister_player(handle)?;
        self.vehicle = None;
        Ok(())
    }

    pub fn start(&mut self) -> bool {
        self.session.start()
    }

    pub fn session(&self) -> &SessionOrchestrator {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionOrchestrator {
        &mut self.session
    }

    pub fn vehicle(&self) -> Option<&VehicleSimulator> {
        self.vehicle.as_ref()
    }

    /// Host physics hooks (`set_velocity`, `halt`) go through here
    pub fn vehicle_mut(&mut self) -> Option<&mut VehicleSimulator> {
        self.vehicle.as_mut()
    }

    pub fn surface(&self) -> &DiscSurface {
        &self.surface
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&GameEvent) + 'static) -> ListenerId {
        self.session.events_mut().subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.session.events_mut().unsubscribe(id)
    }

    /// Advance one fixed step of `dt` real seconds
    ///
    /// Returns the events emitted during the step, after listeners saw them.
    pub fn tick(&mut self, input: &TickInput, dt: f32) -> Vec<GameEvent> {
        self.tick_count += 1;
        let game_dt = self.session.tick(dt, &self.surface);
        let active = self.session.is_active();

        if let Some(vehicle) = self.vehicle.as_mut() {
            let (resources, events) = self.session.vehicle_context();
            vehicle.tick(input.throttle, input.steering, game_dt, active, resources, events);
        }

        let player_position = self.vehicle.as_ref().map(|v| v.state().position);
        self.session
            .update_beans(player_position, game_dt, &self.surface);

        if active {
            self.crush_overlapping();
        }

        self.session.flush_events()
    }

    /// Run as many fixed steps as the frame time allows
    pub fn advance(&mut self, input: &TickInput, frame_dt: f32) -> Vec<GameEvent> {
        let dt = frame_dt.clamp(0.0, MAX_FRAME_DT);
        self.accumulator += dt;

        let mut events = Vec::new();
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            events.extend(self.tick(input, SIM_DT));
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        events
    }

    /// Crush every bean the vehicle currently covers
    fn crush_overlapping(&mut self) {
        let Some(vehicle) = self.vehicle.as_ref() else {
            return;
        };
        let radius = self.session.settings().resources.crush_radius;
        let speed_rate = vehicle.speed_rate();
        let hits: Vec<BeanId> = self
            .session
            .roster()
            .iter()
            .filter(|bean| overlaps(vehicle, *bean, radius))
            .map(|bean| bean.id)
            .collect();

        for id in hits {
            self.session.crush_bean(id, speed_rate);
        }
    }

    /// The host detected the vehicle running over a bean
    pub fn report_crush(&mut self, id: BeanId) -> bool {
        let speed_rate = self.vehicle.as_ref().map_or(0.0, VehicleSimulator::speed_rate);
        self.session.crush_bean(id, speed_rate)
    }

    /// The host detected the vehicle touching an obstacle
    pub fn begin_contact(&mut self) {
        if let Some(vehicle) = self.vehicle.as_ref() {
            vehicle.begin_contact(self.session.resources_mut());
        }
    }

    pub fn end_contact(&mut self) {
        if let Some(vehicle) = self.vehicle.as_ref() {
            vehicle.end_contact(self.session.resources_mut());
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot(self.vehicle.as_ref())
    }

    fn clear_vehicle(&mut self) {
        self.vehicle = None;
        self.accumulator = 0.0;
    }

    pub fn restart(&mut self) -> SceneRequest {
        self.clear_vehicle();
        self.session.restart()
    }

    pub fn return_to_title(&mut self) -> SceneRequest {
        self.clear_vehicle();
        self.session.return_to_title()
    }

    pub fn shutdown(&mut self) {
        self.clear_vehicle();
        self.session.shutdown();
        log::info!("Simulation shut down after {} ticks", self.tick_count);
    }
}
