//! Session flow: countdown, timer, spawning and the bean roster
//!
//! ```text
//! Idle --start--> Countdown --(countdown_from s)--> Active --(time up)--> Ended
//!   ^                                                                      |
//!   +------------------------- restart / return_to_title -----------------+
//! ```
//!
//! Countdown and the session clock run on real time. Spawning and bean
//! movement run on gameplay time, which is frozen outside `Active`.

use glam::Vec3;
use rand::Rng;
use rand_pcg::Pcg32;

use super::bean::{Bean, NeighborSnapshot, RosterView};
use super::events::{EventBus, GameEvent};
use super::navigation::NavSurface;
use super::resources::PlayerResources;
use super::schedule::PeriodicTimer;
use super::state::{BeanId, GamePhase, PlayerHandle, RngState, SceneRequest, SessionResult, SessionSnapshot};
use super::vehicle::VehicleSimulator;
use crate::consts::*;
use crate::error::SessionError;
use crate::settings::GameSettings;

#[derive(Debug)]
pub struct SessionOrchestrator {
    settings: GameSettings,
    phase: GamePhase,
    remaining_time: f32,
    /// Gameplay time multiplier (0 while frozen)
    time_scale: f32,
    countdown_value: i32,
    countdown: PeriodicTimer,
    spawner: PeriodicTimer,
    clock: PeriodicTimer,
    /// Beans in spawn order (ascending id)
    roster: Vec<Bean>,
    player: Option<PlayerHandle>,
    resources: PlayerResources,
    events: EventBus,
    rng_state: RngState,
    rng: Pcg32,
    next_bean_id: u32,
    ended_emitted: bool,
}

impl SessionOrchestrator {
    pub fn new(settings: GameSettings, seed: u64) -> Self {
        let rng_state = RngState::new(seed);
        Self {
            phase: GamePhase::Idle,
            remaining_time: settings.session.game_time_sec,
            time_scale: 1.0,
            countdown_value: settings.session.countdown_from,
            countdown: PeriodicTimer::new(LOGIC_STEP_SEC),
            spawner: PeriodicTimer::new(settings.session.bean_spawn_interval),
            clock: PeriodicTimer::new(LOGIC_STEP_SEC),
            roster: Vec::new(),
            player: None,
            resources: PlayerResources::new(&settings.resources),
            events: EventBus::new(),
            rng: rng_state.to_rng(),
            rng_state,
            next_bean_id: 0,
            ended_emitted: false,
            settings,
        }
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn remaining_time(&self) -> f32 {
        self.remaining_time
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn is_active(&self) -> bool {
        self.phase == GamePhase::Active
    }

    pub fn countdown_value(&self) -> i32 {
        self.countdown_value
    }

    pub fn roster(&self) -> &[Bean] {
        &self.roster
    }

    pub fn bean(&self, id: BeanId) -> Option<&Bean> {
        self.roster.iter().find(|b| b.id == id)
    }

    pub fn player(&self) -> Option<PlayerHandle> {
        self.player
    }

    pub fn resources(&self) -> &PlayerResources {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut PlayerResources {
        &mut self.resources
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Split borrow for the vehicle tick
    pub fn vehicle_context(&mut self) -> (&mut PlayerResources, &mut EventBus) {
        (&mut self.resources, &mut self.events)
    }

    /// Deliver the events queued this tick
    pub fn flush_events(&mut self) -> Vec<GameEvent> {
        self.events.flush()
    }

    pub fn result(&self) -> SessionResult {
        SessionResult {
            score: self.resources.score(),
            ground_beans: self.resources.ground_beans(),
            ground_coffee: self.resources.ground_coffee(),
        }
    }

    /// Begin the countdown; returns false unless the session is idle
    pub fn start(&mut self) -> bool {
        if self.phase != GamePhase::Idle {
            log::warn!("start ignored in phase {}", self.phase.as_str());
            return false;
        }
        self.phase = GamePhase::Countdown;
        self.time_scale = 0.0;
        self.countdown_value = self.settings.session.countdown_from;
        log::info!("Countdown from {}", self.countdown_value);

        self.events.emit(GameEvent::CountdownStarted);
        if self.countdown_value > 0 {
            self.events.emit(GameEvent::CountdownUpdated(self.countdown_value));
            self.countdown.start_delayed();
        } else {
            self.events.emit(GameEvent::CountdownFinished);
            self.activate();
        }
        true
    }

    /// Advance session timers by `real_dt` seconds
    ///
    /// Returns the gameplay time step for this tick (0 while frozen).
    pub fn tick(&mut self, real_dt: f32, surface: &dyn NavSurface) -> f32 {
        let game_dt = real_dt * self.time_scale;

        match self.phase {
            GamePhase::Countdown => {
                for _ in 0..self.countdown.tick(real_dt) {
                    self.countdown_value -= 1;
                    if self.countdown_value > 0 {
                        self.events.emit(GameEvent::CountdownUpdated(self.countdown_value));
                    } else {
                        self.events.emit(GameEvent::CountdownFinished);
                        self.activate();
                        break;
                    }
                }
            }
            GamePhase::Active => {
                for _ in 0..self.spawner.tick(game_dt) {
                    self.try_spawn(surface);
                }
                for _ in 0..self.clock.tick(real_dt) {
                    self.remaining_time = (self.remaining_time - LOGIC_STEP_SEC).max(0.0);
                    self.events.emit(GameEvent::TimeChanged(self.remaining_time));
                    if self.remaining_time <= TIME_EPSILON {
                        self.end();
                        break;
                    }
                }
            }
            GamePhase::Idle | GamePhase::Ended => {}
        }

        game_dt
    }

    fn activate(&mut self) {
        self.countdown.cancel();
        self.phase = GamePhase::Active;
        self.time_scale = 1.0;
        self.remaining_time = self.settings.session.game_time_sec;
        self.spawner.start();
        self.clock.start_delayed();
        log::info!("Session active for {}s", self.remaining_time);
        self.events.emit(GameEvent::TimeChanged(self.remaining_time));
    }

    fn end(&mut self) {
        self.phase = GamePhase::Ended;
        self.time_scale = 0.0;
        self.countdown.cancel();
        self.spawner.cancel();
        self.clock.cancel();

        if !self.ended_emitted {
            self.ended_emitted = true;
            let result = self.result();
            log::info!(
                "Session ended: score {}, beans {}, coffee {}",
                result.score,
                result.ground_beans,
                result.ground_coffee
            );
            self.events.emit(GameEvent::GameEnded(result));
        }
    }

    /// Spawn one bean if the roster has room
    pub fn try_spawn(&mut self, surface: &dyn NavSurface) -> Option<BeanId> {
        if self.roster.len() >= self.settings.session.max_bean_count {
            return None;
        }
        let variants = &self.settings.session.bean_variants;
        if variants.is_empty() {
            log::warn!("No bean variants configured, skipping spawn");
            return None;
        }
        let variant = variants[self.rng.random_range(0..variants.len())].clone();
        let position = self.spawn_position(surface);

        let id = BeanId(self.next_bean_id);
        self.next_bean_id += 1;
        self.roster
            .push(Bean::new(id, position, variant, &self.settings.beans));
        log::debug!("Spawned bean {:?} at {}", id, position);
        self.events.emit(GameEvent::BeanSpawned { id, position });
        Some(id)
    }

    /// A configured spawn point when available, otherwise a floor sample
    /// around the arena centre
    fn spawn_position(&mut self, surface: &dyn NavSurface) -> Vec3 {
        let points = &self.settings.session.spawn_points;
        if !points.is_empty() {
            let p = Vec3::from_array(points[self.rng.random_range(0..points.len())]);
            if let Some(hit) = surface.sample_position(p, SPAWN_SAMPLE_RADIUS) {
                return hit;
            }
        }

        let radius = self.settings.session.bean_spawn_radius;
        for _ in 0..SPAWN_SAMPLE_ATTEMPTS {
            let angle = self.rng.random_range(0.0..std::f32::consts::TAU);
            let dist = radius * self.rng.random::<f32>().sqrt();
            let candidate = Vec3::new(angle.cos() * dist, 0.0, angle.sin() * dist);
            if let Some(hit) = surface.sample_position(candidate, SPAWN_SAMPLE_RADIUS) {
                return hit;
            }
        }

        log::warn!(
            "No navigable spawn position after {} attempts, using centre",
            SPAWN_SAMPLE_ATTEMPTS
        );
        surface.clamp(Vec3::ZERO)
    }

    /// Move every bean one gameplay step
    ///
    /// All beans decide from positions captured before any of them moves.
    pub fn update_beans(&mut self, player_position: Option<Vec3>, game_dt: f32, surface: &dyn NavSurface) {
        if !self.is_active() || game_dt <= 0.0 || self.roster.is_empty() {
            return;
        }
        let snapshot: Vec<NeighborSnapshot> = self.roster.iter().map(Bean::snapshot).collect();
        let view = RosterView {
            player: player_position,
            beans: &snapshot,
        };
        for bean in self.roster.iter_mut() {
            bean.tick(&view, game_dt, &self.settings.beans, surface, &mut self.rng);
        }
    }

    /// Remove a bean run over by the player and credit the bean gauge
    ///
    /// Ignored outside `Active`: the result is final once the session ends.
    pub fn crush_bean(&mut self, id: BeanId, speed_rate: f32) -> bool {
        if !self.is_active() {
            log::debug!("crush of bean {:?} ignored in phase {}", id, self.phase.as_str());
            return false;
        }
        let Some(index) = self.roster.iter().position(|b| b.id == id) else {
            log::debug!("crush of unknown bean {:?} ignored", id);
            return false;
        };
        let bean = self.roster.remove(index);
        let position = bean.motion.position;
        if !self.resources.crush_bean() {
            log::debug!("bean gauge full, crushed bean {:?} lost", id);
        }
        log::debug!("Crushed bean {:?} at speed rate {:.2}", id, speed_rate);
        self.events.emit(GameEvent::BeanCrushed {
            id,
            position,
            speed_rate,
        });
        true
    }

    pub fn register_player(&mut self, handle: PlayerHandle) -> Result<(), SessionError> {
        if let Some(existing) = self.player {
            log::error!("player {:?} already registered", existing);
            return Err(SessionError::PlayerAlreadyRegistered {
                existing,
                attempted: handle,
            });
        }
        self.player = Some(handle);
        log::info!("Registered player {:?}", handle);
        Ok(())
    }

    pub fn unregister_player(&mut self, handle: PlayerHandle) -> Result<(), SessionError> {
        if self.player != Some(handle) {
            log::error!("unregister of {:?} does not match {:?}", handle, self.player);
            return Err(SessionError::PlayerMismatch {
                registered: self.player,
                attempted: handle,
            });
        }
        self.player = None;
        log::info!("Unregistered player {:?}", handle);
        Ok(())
    }

    /// Back to a fresh idle session; listeners stay subscribed
    fn reset(&mut self) {
        self.shutdown();
        self.events.clear_pending();
        let settings = &self.settings;
        self.phase = GamePhase::Idle;
        self.remaining_time = settings.session.game_time_sec;
        self.time_scale = 1.0;
        self.countdown_value = settings.session.countdown_from;
        self.resources = PlayerResources::new(&settings.resources);
        self.rng = self.rng_state.to_rng();
        self.next_bean_id = 0;
        self.ended_emitted = false;
    }

    pub fn restart(&mut self) -> SceneRequest {
        log::info!("Restarting session");
        self.reset();
        SceneRequest::Restart
    }

    pub fn return_to_title(&mut self) -> SceneRequest {
        log::info!("Returning to title");
        self.reset();
        SceneRequest::Title
    }

    /// Cancel every loop and drop the roster and player
    pub fn shutdown(&mut self) {
        self.countdown.cancel();
        self.spawner.cancel();
        self.clock.cancel();
        self.roster.clear();
        self.player = None;
    }

    pub fn snapshot(&self, vehicle: Option<&VehicleSimulator>) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            remaining_time: self.remaining_time,
            is_active: self.is_active(),
            ground_beans: self.resources.ground_beans(),
            ground_coffee: self.resources.ground_coffee(),
            score: self.resources.score(),
            is_spilling: self.resources.is_spilling(),
            roster_size: self.roster.len(),
            player: self.player,
            speed_rate: vehicle.map_or(0.0, VehicleSimulator::speed_rate),
            mill_power: vehicle.map_or(0.0, VehicleSimulator::mill_power),
            is_drifting: vehicle.is_some_and(VehicleSimulator::is_drifting),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::navigation::DiscSurface;
    use crate::settings::SessionTuning;

    fn floor() -> DiscSurface {
        DiscSurface::new(Vec3::ZERO, 25.0)
    }

    fn run(session: &mut SessionOrchestrator, seconds: f32) -> Vec<GameEvent> {
        let steps = (seconds / SIM_DT).round() as u32;
        let surface = floor();
        let mut events = Vec::new();
        for _ in 0..steps {
            session.tick(SIM_DT, &surface);
            events.extend(session.flush_events());
        }
        events
    }

    fn short_session(game_time_sec: f32, max_bean_count: usize) -> SessionOrchestrator {
        let settings = GameSettings {
            session: SessionTuning {
                game_time_sec,
                max_bean_count,
                ..SessionTuning::default()
            },
            ..GameSettings::default()
        };
        SessionOrchestrator::new(settings, 42)
    }

    #[test]
    fn test_countdown_sequence() {
        let mut session = SessionOrchestrator::new(GameSettings::default(), 1);
        assert!(session.start());
        assert_eq!(session.phase(), GamePhase::Countdown);
        assert_eq!(session.time_scale(), 0.0);

        let mut events = session.flush_events();
        events.extend(run(&mut session, 2.8));
        assert_eq!(session.phase(), GamePhase::Countdown);
        events.extend(run(&mut session, 0.4));
        assert_eq!(session.phase(), GamePhase::Active);

        let expected = vec![
            GameEvent::CountdownStarted,
            GameEvent::CountdownUpdated(3),
            GameEvent::CountdownUpdated(2),
            GameEvent::CountdownUpdated(1),
            GameEvent::CountdownFinished,
            GameEvent::TimeChanged(60.0),
        ];
        assert_eq!(events[..expected.len()], expected[..]);
        assert_eq!(session.time_scale(), 1.0);
    }

    #[test]
    fn test_start_only_from_idle() {
        let mut session = SessionOrchestrator::new(GameSettings::default(), 1);
        assert!(session.start());
        assert!(!session.start());
    }

    #[test]
    fn test_timer_ends_session_once() {
        let mut session = short_session(5.0, 5);
        session.start();
        let events = run(&mut session, 3.1 + 5.2);
        assert_eq!(session.phase(), GamePhase::Ended);
        assert_eq!(session.remaining_time(), 0.0);
        assert_eq!(session.time_scale(), 0.0);

        let ticks: Vec<f32> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::TimeChanged(t) => Some(*t),
                _ => None,
            })
            .collect();
        assert_eq!(ticks, vec![5.0, 4.0, 3.0, 2.0, 1.0, 0.0]);

        let ended = events
            .iter()
            .filter(|e| matches!(e, GameEvent::GameEnded(_)))
            .count();
        assert_eq!(ended, 1);
        assert!(run(&mut session, 3.0).is_empty(), "nothing happens after the end");
    }

    #[test]
    fn test_spawning_respects_capacity() {
        let mut session = short_session(60.0, 5);
        session.start();
        let events = run(&mut session, 3.1 + 4.0);
        assert_eq!(session.roster().len(), 5);

        let spawned = events
            .iter()
            .filter(|e| matches!(e, GameEvent::BeanSpawned { .. }))
            .count();
        assert_eq!(spawned, 5);

        let ids: Vec<u32> = session.roster().iter().map(|b| b.id.0).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        for bean in session.roster() {
            assert!(floor().contains(bean.motion.position));
            assert!(session.settings().session.bean_variants.contains(&bean.variant));
        }
    }

    #[test]
    fn test_no_spawns_outside_active() {
        let mut session = short_session(60.0, 5);
        run(&mut session, 2.0);
        session.start();
        run(&mut session, 2.0);
        assert!(session.roster().is_empty());
    }

    #[test]
    fn test_spawn_skipped_without_variants() {
        let mut settings = GameSettings::default();
        settings.session.bean_variants.clear();
        let mut session = SessionOrchestrator::new(settings, 3);
        session.start();
        run(&mut session, 5.0);
        assert_eq!(session.phase(), GamePhase::Active);
        assert!(session.roster().is_empty());
    }

    #[test]
    fn test_configured_spawn_points_are_used() {
        let mut settings = GameSettings::default();
        settings.session.spawn_points = vec![[3.0, 0.0, 4.0]];
        let mut session = SessionOrchestrator::new(settings, 3);
        let id = session.try_spawn(&floor()).unwrap();
        assert_eq!(session.bean(id).unwrap().motion.position, Vec3::new(3.0, 0.0, 4.0));
    }

    #[test]
    fn test_crush_ignored_outside_active() {
        let mut session = short_session(1.0, 5);
        let surface = floor();
        let idle = session.try_spawn(&surface).unwrap();
        assert!(!session.crush_bean(idle, 1.0), "idle");

        session.start();
        run(&mut session, 1.0);
        assert_eq!(session.phase(), GamePhase::Countdown);
        assert!(!session.crush_bean(idle, 1.0), "countdown");

        run(&mut session, 2.1 + 1.2);
        assert_eq!(session.phase(), GamePhase::Ended);
        let ended_with = session.result();
        let id = session.roster()[0].id;
        let roster = session.roster().len();
        assert!(!session.crush_bean(id, 1.0), "ended");
        assert_eq!(session.roster().len(), roster);
        assert_eq!(session.result(), ended_with);
        assert!(session.flush_events().is_empty());
    }

    /// Floor that rejects every sample
    struct NoFloor;

    impl NavSurface for NoFloor {
        fn sample_position(&self, _point: Vec3, _radius: f32) -> Option<Vec3> {
            None
        }
    }

    #[test]
    fn test_spawn_falls_back_to_centre() {
        let mut session = SessionOrchestrator::new(GameSettings::default(), 3);
        let id = session.try_spawn(&NoFloor).unwrap();
        assert_eq!(session.bean(id).unwrap().motion.position, Vec3::ZERO);

        let mut settings = GameSettings::default();
        settings.session.spawn_points = vec![[3.0, 0.0, 4.0]];
        let mut session = SessionOrchestrator::new(settings, 3);
        let id = session.try_spawn(&NoFloor).unwrap();
        assert_eq!(session.bean(id).unwrap().motion.position, Vec3::ZERO);
    }

    #[test]
    fn test_restart_drops_queued_events() {
        let mut session = SessionOrchestrator::new(GameSettings::default(), 1);
        session.start();
        session.restart();
        assert!(session.flush_events().is_empty());

        session.start();
        session.return_to_title();
        assert!(session.flush_events().is_empty());
    }

    #[test]
    fn test_spawn_stays_on_tiny_floor() {
        let mut session = SessionOrchestrator::new(GameSettings::default(), 3);
        // most samples miss a point-sized floor; hits and the fallback both land on it
        let tiny = DiscSurface::new(Vec3::ZERO, 0.0);
        let id = session.try_spawn(&tiny).unwrap();
        assert!(tiny.contains(session.bean(id).unwrap().motion.position));
    }

    #[test]
    fn test_crush_bean_credits_player() {
        let mut session = short_session(60.0, 5);
        session.start();
        run(&mut session, 3.1);
        assert!(session.is_active());
        let surface = floor();
        let a = session.try_spawn(&surface).unwrap();
        let b = session.try_spawn(&surface).unwrap();
        let before = session.roster().len();
        session.flush_events();

        assert!(session.crush_bean(a, 0.5));
        assert!(!session.crush_bean(a, 0.5), "already removed");
        assert_eq!(session.roster().len(), before - 1);
        assert!(session.bean(b).is_some());
        assert_eq!(session.resources().ground_beans(), 1);
        assert_eq!(session.resources().score(), 0);

        let events = session.flush_events();
        assert!(matches!(
            events.as_slice(),
            [GameEvent::BeanCrushed { id, speed_rate, .. }] if *id == a && *speed_rate == 0.5
        ));
    }

    #[test]
    fn test_second_player_is_rejected() {
        let mut session = SessionOrchestrator::new(GameSettings::default(), 1);
        session.register_player(PlayerHandle(1)).unwrap();
        let err = session.register_player(PlayerHandle(2)).unwrap_err();
        assert_eq!(
            err,
            SessionError::PlayerAlreadyRegistered {
                existing: PlayerHandle(1),
                attempted: PlayerHandle(2),
            }
        );
        assert_eq!(session.player(), Some(PlayerHandle(1)));
    }

    #[test]
    fn test_unregister_mismatch_is_rejected() {
        let mut session = SessionOrchestrator::new(GameSettings::default(), 1);
        assert!(session.unregister_player(PlayerHandle(1)).is_err());
        session.register_player(PlayerHandle(1)).unwrap();
        assert!(matches!(
            session.unregister_player(PlayerHandle(7)),
            Err(SessionError::PlayerMismatch { .. })
        ));
        session.unregister_player(PlayerHandle(1)).unwrap();
        assert_eq!(session.player(), None);
    }

    #[test]
    fn test_roster_kept_at_end_and_cleared_on_restart() {
        let mut session = short_session(2.0, 5);
        session.events_mut().subscribe(|_| {});
        session.register_player(PlayerHandle(1)).unwrap();
        session.start();
        run(&mut session, 3.1 + 2.2);
        assert_eq!(session.phase(), GamePhase::Ended);
        assert!(!session.roster().is_empty());

        assert_eq!(session.restart(), SceneRequest::Restart);
        assert_eq!(session.phase(), GamePhase::Idle);
        assert!(session.roster().is_empty());
        assert_eq!(session.player(), None);
        assert_eq!(session.remaining_time(), 2.0);
        assert_eq!(session.events_mut().listener_count(), 1);

        assert!(session.start(), "a reset session can start again");
        assert_eq!(session.return_to_title(), SceneRequest::Title);
        assert_eq!(session.phase(), GamePhase::Idle);
    }

    #[test]
    fn test_same_seed_same_spawns() {
        let spawn_positions = |seed| {
            let mut session = SessionOrchestrator::new(GameSettings::default(), seed);
            session.start();
            run(&mut session, 6.0);
            session
                .roster()
                .iter()
                .map(|b| b.motion.position)
                .collect::<Vec<_>>()
        };
        assert_eq!(spawn_positions(9), spawn_positions(9));
    }
}
