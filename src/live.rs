use crate::clock::TICK_RATE;
use crate::simulation::Simulation;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Steps the shared simulation at the live tick rate until it stops running.
///
/// The lock is held for one tick at a time so that settings updates and
/// viewport reports can interleave with the run.
pub async fn run_live(sim: Arc<Mutex<Simulation>>) {
    let mut ticker = interval(Duration::from_secs_f64(1.0 / TICK_RATE));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if !sim.lock().await.step() {
            break;
        }
    }
    log::debug!("Live runner exited");
}

/// Spawns [run_live] onto the current tokio runtime.
pub fn spawn_live(sim: Arc<Mutex<Simulation>>) -> JoinHandle<()> {
    tokio::spawn(run_live(sim))
}
