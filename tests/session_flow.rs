//! Full session runs through the public API

use std::cell::RefCell;
use std::rc::Rc;

use bean_drift::GameSettings;
use bean_drift::consts::SIM_DT;
use bean_drift::sim::{GameEvent, GamePhase, SceneRequest, Simulation, TickInput};

fn five_bean_settings() -> GameSettings {
    let mut settings = GameSettings::default();
    settings.session.max_bean_count = 5;
    settings
}

/// Drive a weaving line until the session ends; returns every event
fn play(sim: &mut Simulation) -> Vec<GameEvent> {
    let mut events = Vec::new();
    for step in 0..(70.0 / SIM_DT) as u32 {
        let t = step as f32 * SIM_DT;
        let input = TickInput::new(1.0, (t * 0.5).sin());
        events.extend(sim.tick(&input, SIM_DT));

        let snap = sim.snapshot();
        assert!(snap.roster_size <= 5);
        assert!(snap.ground_beans <= 20);
        assert!(snap.ground_coffee < 10);
        if snap.phase == GamePhase::Ended {
            break;
        }
    }
    events
}

#[test]
fn test_sixty_second_session_with_five_beans() {
    let mut sim = Simulation::new(five_bean_settings(), 2024).unwrap();
    sim.init().unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    sim.subscribe(move |e| sink.borrow_mut().push(e.clone()));

    assert!(sim.start());
    let events = play(&mut sim);
    assert_eq!(*seen.borrow(), events, "listeners see exactly the returned events");

    assert_eq!(
        events[..5],
        [
            GameEvent::CountdownStarted,
            GameEvent::CountdownUpdated(3),
            GameEvent::CountdownUpdated(2),
            GameEvent::CountdownUpdated(1),
            GameEvent::CountdownFinished,
        ]
    );

    let times: Vec<f32> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::TimeChanged(t) => Some(*t),
            _ => None,
        })
        .collect();
    let expected: Vec<f32> = (0..=60).rev().map(|t| t as f32).collect();
    assert_eq!(times, expected);

    let spawned = events
        .iter()
        .filter(|e| matches!(e, GameEvent::BeanSpawned { .. }))
        .count();
    let crushed = events
        .iter()
        .filter(|e| matches!(e, GameEvent::BeanCrushed { .. }))
        .count();
    assert!(spawned >= 5);
    assert_eq!(spawned - crushed, sim.snapshot().roster_size);

    let results: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::GameEnded(r) => Some(*r),
            _ => None,
        })
        .collect();
    assert_eq!(results.len(), 1);
    assert!(matches!(events.last(), Some(GameEvent::GameEnded(_))));

    let snap = sim.snapshot();
    assert_eq!(snap.phase, GamePhase::Ended);
    assert!(!snap.is_active);
    assert_eq!(snap.remaining_time, 0.0);
    assert_eq!(results[0].score, snap.score);
    assert_eq!(results[0].ground_beans, snap.ground_beans);
    assert_eq!(results[0].ground_coffee, snap.ground_coffee);

    for bean in sim.session().roster() {
        assert!(sim.surface().contains(bean.motion.position));
    }

    // frozen after the end
    let position = sim.vehicle().unwrap().state().position;
    assert!(sim.tick(&TickInput::new(1.0, 1.0), SIM_DT).is_empty());
    assert_eq!(sim.vehicle().unwrap().state().position, position);
}

#[test]
fn test_same_seed_replays_identically() {
    let run = || {
        let mut sim = Simulation::new(five_bean_settings(), 77).unwrap();
        sim.init().unwrap();
        sim.start();
        play(&mut sim)
    };
    assert_eq!(run(), run());
}

#[test]
fn test_restart_plays_a_second_session() {
    let mut sim = Simulation::new(five_bean_settings(), 3).unwrap();
    sim.init().unwrap();
    sim.start();
    play(&mut sim);

    assert_eq!(sim.restart(), SceneRequest::Restart);
    sim.init().unwrap();
    assert!(sim.start());
    let events = play(&mut sim);
    let ended = events
        .iter()
        .filter(|e| matches!(e, GameEvent::GameEnded(_)))
        .count();
    assert_eq!(ended, 1);
}

#[test]
fn test_settings_from_json_drive_the_session() {
    let json = r#"{ "session": { "game_time_sec": 5.0, "max_bean_count": 2 } }"#;
    let settings = GameSettings::from_json(json).unwrap();
    let mut sim = Simulation::new(settings, 1).unwrap();
    sim.init().unwrap();
    sim.start();

    let events = play(&mut sim);
    let times = events
        .iter()
        .filter(|e| matches!(e, GameEvent::TimeChanged(_)))
        .count();
    assert_eq!(times, 6);
    assert!(sim.snapshot().roster_size <= 2);
}
