//! Client-supplied configuration and the timings derived from it.

use crate::direction::{Axis, Direction, TurnType};
use crate::error::Result;
use crate::pedestrian::PedestrianSettings;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Supplies the configuration of a run.
pub trait SettingsProvider {
    fn spawn_rates(&self) -> SpawnRates;
    fn junction_settings(&self) -> JunctionSettings;
    fn traffic_light_settings(&self) -> TrafficLightSettings;
}

/// Vehicle arrival rates in vehicles per simulated hour, per approach and turn.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpawnRates {
    rates: HashMap<Direction, HashMap<TurnType, f64>>,
}

impl SpawnRates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the arrival rate. Missing and negative rates are zero.
    pub fn rate(&self, dir: Direction, turn: TurnType) -> f64 {
        self.rates
            .get(&dir)
            .and_then(|turns| turns.get(&turn))
            .copied()
            .unwrap_or(0.0)
            .max(0.0)
    }

    pub fn set(&mut self, dir: Direction, turn: TurnType, per_hour: f64) {
        self.rates.entry(dir).or_default().insert(turn, per_hour);
    }

    pub fn with(mut self, dir: Direction, turn: TurnType, per_hour: f64) -> Self {
        self.set(dir, turn, per_hour);
        self
    }

    /// The combined arrival rate of every approach and turn.
    pub fn total(&self) -> f64 {
        itertools::iproduct!(Direction::ALL, TurnType::ALL)
            .map(|(dir, turn)| self.rate(dir, turn))
            .sum()
    }
}

/// The physical layout of the junction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JunctionSettings {
    /// The number of lanes per approach.
    pub lane_count: usize,
    /// Carried for clients; has no effect on the simulation.
    pub left_turn_lane_enabled: bool,
    /// Carried for clients; has no effect on the simulation.
    pub bus_lane_enabled: bool,
    /// How long pedestrian lights stay on, in s.
    pub pedestrian_crossing_duration: f64,
    pub pedestrian_events_per_hour: f64,
}

impl Default for JunctionSettings {
    fn default() -> Self {
        Self {
            lane_count: 2,
            left_turn_lane_enabled: false,
            bus_lane_enabled: false,
            pedestrian_crossing_duration: 0.0,
            pedestrian_events_per_hour: 0.0,
        }
    }
}

impl JunctionSettings {
    pub fn pedestrians(&self) -> PedestrianSettings {
        PedestrianSettings {
            crossing_duration: self.pedestrian_crossing_duration.max(0.0),
            events_per_hour: self.pedestrian_events_per_hour.max(0.0),
        }
    }
}

/// The fixed-cycle signal configuration. Green times are per hour and are
/// shared out over `sequences_per_hour` cycles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrafficLightSettings {
    pub enabled: bool,
    pub sequences_per_hour: f64,
    pub vertical_main_green_seconds: f64,
    pub horizontal_main_green_seconds: f64,
    pub vertical_right_green_seconds: f64,
    pub horizontal_right_green_seconds: f64,
}

/// The length in s of each sub-phase of one fixed cycle. Zero disables the
/// sub-phase.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PhaseTimings {
    pub vertical_main: f64,
    pub horizontal_main: f64,
    pub vertical_right: f64,
    pub horizontal_right: f64,
}

impl TrafficLightSettings {
    /// Derives the per-cycle lengths. All lengths are zero unless the lights
    /// are enabled with a positive number of sequences.
    pub fn timings(&self) -> PhaseTimings {
        if !self.enabled || self.sequences_per_hour <= 0.0 {
            return PhaseTimings::default();
        }
        let per_cycle = |seconds: f64| seconds.max(0.0) / self.sequences_per_hour;
        PhaseTimings {
            vertical_main: per_cycle(self.vertical_main_green_seconds),
            horizontal_main: per_cycle(self.horizontal_main_green_seconds),
            vertical_right: per_cycle(self.vertical_right_green_seconds),
            horizontal_right: per_cycle(self.horizontal_right_green_seconds),
        }
    }
}

impl PhaseTimings {
    pub fn main(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Vertical => self.vertical_main,
            Axis::Horizontal => self.horizontal_main,
        }
    }

    pub fn right(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Vertical => self.vertical_right,
            Axis::Horizontal => self.horizontal_right,
        }
    }

    /// The time to serve one axis: five gaps plus both green periods.
    pub fn cycle(&self, axis: Axis, gap: f64) -> f64 {
        5.0 * gap + self.main(axis) + self.right(axis)
    }

    /// The number of pedestrian opportunities a full cycle offers per minute.
    pub fn max_gaps_per_minute(&self, gap: f64, crossing_duration: f64) -> f64 {
        let total =
            self.cycle(Axis::Vertical, gap) + self.cycle(Axis::Horizontal, gap) + 2.0 * crossing_duration;
        if total > 0.0 {
            2.0 * 60.0 / total
        } else {
            0.0
        }
    }
}

/// Engine parameters which clients do not normally change.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimConfig {
    /// Vehicle speed in px per tick at a multiplier of one.
    pub base_speed: f64,
    /// Vehicle speed in px per tick at a multiplier of one, during fast runs.
    pub fast_speed: f64,
    /// The speed multiplier used by fast runs.
    pub fast_multiplier: f64,
    /// The length of a fast run in wall-clock seconds at 60 ticks per second.
    pub fast_duration: f64,
    /// The clearance interval between signal changes, in s.
    pub gap: f64,
    /// Seeds the random number generators. Random if absent.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            base_speed: 2.0,
            fast_speed: 10.0,
            fast_multiplier: 10.0,
            fast_duration: 10.0,
            gap: 1.0,
            seed: None,
        }
    }
}

/// A complete run configuration, as read from a JSON file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Scenario {
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub spawn_rates: SpawnRates,
    pub junction: JunctionSettings,
    pub traffic_lights: TrafficLightSettings,
    pub sim: SimConfig,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            canvas_width: 800.0,
            canvas_height: 800.0,
            spawn_rates: SpawnRates::default(),
            junction: JunctionSettings::default(),
            traffic_lights: TrafficLightSettings::default(),
            sim: SimConfig::default(),
        }
    }
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a scenario from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading scenario from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

impl SettingsProvider for Scenario {
    fn spawn_rates(&self) -> SpawnRates {
        self.spawn_rates.clone()
    }

    fn junction_settings(&self) -> JunctionSettings {
        self.junction
    }

    fn traffic_light_settings(&self) -> TrafficLightSettings {
        self.traffic_lights
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::SimError;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn missing_rates_are_zero() {
        let rates = SpawnRates::new().with(Direction::North, TurnType::Left, 120.0);
        assert_approx_eq!(rates.rate(Direction::North, TurnType::Left), 120.0);
        assert_approx_eq!(rates.rate(Direction::North, TurnType::Right), 0.0);
        assert_approx_eq!(rates.rate(Direction::West, TurnType::Forward), 0.0);
        assert_approx_eq!(rates.total(), 120.0);
    }

    #[test]
    fn timings_are_shared_over_sequences() {
        let lights = TrafficLightSettings {
            enabled: true,
            sequences_per_hour: 60.0,
            vertical_main_green_seconds: 1200.0,
            horizontal_main_green_seconds: 600.0,
            vertical_right_green_seconds: 300.0,
            horizontal_right_green_seconds: 0.0,
        };
        let timings = lights.timings();
        assert_approx_eq!(timings.main(Axis::Vertical), 20.0);
        assert_approx_eq!(timings.main(Axis::Horizontal), 10.0);
        assert_approx_eq!(timings.right(Axis::Vertical), 5.0);
        assert_approx_eq!(timings.right(Axis::Horizontal), 0.0);
        assert_approx_eq!(timings.cycle(Axis::Vertical, 1.0), 30.0);
        // 2 * 60 / (30 + 15 + 2 * 7.5)
        assert_approx_eq!(timings.max_gaps_per_minute(1.0, 7.5), 2.0);
    }

    #[test]
    fn disabled_lights_have_no_timings() {
        let mut lights = TrafficLightSettings {
            enabled: false,
            sequences_per_hour: 60.0,
            vertical_main_green_seconds: 1200.0,
            ..Default::default()
        };
        assert_eq!(lights.timings(), PhaseTimings::default());
        lights.enabled = true;
        lights.sequences_per_hour = 0.0;
        assert_eq!(lights.timings(), PhaseTimings::default());
    }

    #[test]
    fn scenario_fills_defaults() {
        let scenario = Scenario::from_json(
            r#"{
                "spawnRates": {"north": {"forward": 60}, "east": {"right": 30.5}},
                "junction": {"laneCount": 3, "pedestrianEventsPerHour": 120},
                "trafficLights": {"enabled": true, "sequencesPerHour": 10},
                "sim": {"seed": 42}
            }"#,
        )
        .unwrap();
        assert_approx_eq!(scenario.canvas_width, 800.0);
        assert_approx_eq!(
            scenario.spawn_rates().rate(Direction::East, TurnType::Right),
            30.5
        );
        assert_eq!(scenario.junction_settings().lane_count, 3);
        assert_approx_eq!(scenario.junction_settings().pedestrians().events_per_minute(), 2.0);
        assert!(scenario.traffic_light_settings().enabled);
        assert_eq!(scenario.sim.seed, Some(42));
        assert_approx_eq!(scenario.sim.base_speed, 2.0);
    }

    #[test]
    fn bad_scenarios_are_rejected() {
        let err = Scenario::from_json(r#"{"spawnRates": {"up": {"left": 1}}}"#);
        assert!(matches!(err, Err(SimError::Json(_))));
        let err = Scenario::load("/nonexistent/scenario.json");
        assert!(matches!(err, Err(SimError::Io(_))));
    }
}
