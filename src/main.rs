use junction_sim::{spawn_live, Scenario, Simulation};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Runs a scenario live, streaming every snapshot to stdout as JSON lines.
///
/// Usage: `junction-sim [--compare] [scenario.json]`
#[tokio::main]
async fn main() {
    env_logger::init();

    let mut compare = false;
    let mut path = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--compare" => compare = true,
            _ => path = Some(arg),
        }
    }

    let scenario = match path {
        Some(path) => match Scenario::load(&path) {
            Ok(scenario) => scenario,
            Err(err) => {
                eprintln!("Could not load {}: {}", path, err);
                std::process::exit(1);
            }
        },
        None => Scenario::default(),
    };

    let mut sim = Simulation::new(scenario.sim);
    sim.set_viewport(scenario.canvas_width, scenario.canvas_height);
    sim.load_settings(&scenario);

    if compare {
        match sim.compare_policies() {
            Ok(comparison) => match serde_json::to_string_pretty(&comparison) {
                Ok(json) => println!("{}", json),
                Err(err) => eprintln!("Could not encode results: {}", err),
            },
            Err(err) => eprintln!("Comparison failed: {}", err),
        }
        return;
    }

    let mut rx = sim.subscribe();
    if let Err(err) = sim.start() {
        eprintln!("Could not start simulation: {}", err);
        std::process::exit(1);
    }
    let sim = Arc::new(Mutex::new(sim));
    let runner = spawn_live(Arc::clone(&sim));

    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Some(message) => println!("{}", message),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                let mut sim = sim.lock().await;
                if let Err(err) = sim.stop() {
                    eprintln!("{}", err);
                }
                break;
            }
        }
    }
    let _ = runner.await;
}
