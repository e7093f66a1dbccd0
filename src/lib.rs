pub use adaptive::{AdaptiveScheduler, Phase, PhaseQueues};
pub use broadcast::{Broadcaster, StateSink};
pub use clock::SimClock;
pub use controller::SignalController;
pub use direction::{Axis, Direction, DirectionMap, TurnType};
pub use error::{Result, SimError};
pub use geometry::{compute_geometry, JunctionGeometry};
pub use light::{Lamp, MainLight, SignalGroup, SignalSnapshot, SignalState};
pub use live::{run_live, spawn_live};
pub use metrics::{DirectionMetrics, DirectionReport, MetricsConsumer, MetricsReport, RunMetrics};
pub use sequencer::PhaseSequencer;
pub use settings::{
    JunctionSettings, Scenario, SettingsProvider, SimConfig, SpawnRates, TrafficLightSettings,
};
pub use simulation::{PolicyComparison, PolicyKind, Simulation};
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use util::Interval;
pub use vehicle::{Manoeuvre, Vehicle, VehicleAttributes, VehicleSnapshot};

mod adaptive;
pub mod broadcast;
pub mod clock;
mod controller;
mod direction;
mod error;
pub mod geometry;
mod light;
mod live;
pub mod math;
mod metrics;
pub mod pedestrian;
mod sequencer;
pub mod settings;
mod simulation;
pub mod spawn;
pub mod stop_line;
mod util;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
}

type VehicleSet = SlotMap<VehicleId, Vehicle>;
