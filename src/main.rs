//! Bean Drift headless runner
//!
//! Plays one scripted session and logs the signal stream.
//! Usage: `bean-drift [settings.json] [seed]`

use std::process::ExitCode;

use bean_drift::GameSettings;
use bean_drift::sim::{GameEvent, GamePhase, Simulation, TickInput};

/// Frame time of the simulated host loop
const FRAME_DT: f32 = 1.0 / 60.0;
/// Safety cap on simulated frames (ten minutes)
const MAX_FRAMES: u32 = 60 * 600;

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Bean Drift (headless) starting...");

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => match GameSettings::load(&path) {
            Ok(settings) => settings,
            Err(err) => {
                log::error!("{}", err);
                return ExitCode::FAILURE;
            }
        },
        None => GameSettings::default(),
    };
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(0xBEA5);

    let mut sim = match Simulation::new(settings, seed) {
        Ok(sim) => sim,
        Err(err) => {
            log::error!("{}", err);
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = sim.init() {
        log::error!("{}", err);
        return ExitCode::FAILURE;
    }

    sim.subscribe(|event| match event {
        GameEvent::CountdownUpdated(n) => log::info!("{}...", n),
        GameEvent::CountdownFinished => log::info!("Go!"),
        GameEvent::TimeChanged(t) => log::debug!("time left: {:.0}s", t),
        GameEvent::CoffeeBrewed { score } => log::info!("Coffee brewed! score {}", score),
        GameEvent::Impact { position } => log::info!("Impact at {}", position),
        other => log::trace!("{:?}", other),
    });
    sim.start();

    let mut result = None;
    for frame in 0..MAX_FRAMES {
        let t = frame as f32 * FRAME_DT;
        let input = TickInput::new(1.0, (t * 0.7).sin());
        for event in sim.advance(&input, FRAME_DT) {
            if let GameEvent::GameEnded(r) = event {
                result = Some(r);
            }
        }
        if sim.snapshot().phase == GamePhase::Ended {
            break;
        }
    }

    let Some(result) = result else {
        log::error!("Session did not end within {} frames", MAX_FRAMES);
        return ExitCode::FAILURE;
    };
    println!(
        "Score: {}  Ground beans: {}  Ground coffee: {}",
        result.score, result.ground_beans, result.ground_coffee
    );

    sim.shutdown();
    ExitCode::SUCCESS
}
