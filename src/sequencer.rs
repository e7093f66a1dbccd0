//! The fixed-cycle signal policy.
//!
//! Each axis in turn runs red, red-amber, green, amber, red, then its
//! right-turn arrows, followed by a clearance gap at which a pedestrian event
//! may be inserted. The vertical axis goes first.

use crate::controller::SignalController;
use crate::direction::Axis;
use crate::light::{Lamp, MainLight};
use crate::pedestrian::{PedestrianSampler, PedestrianSettings, WalkSequence};
use crate::settings::PhaseTimings;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// The clearance interval used when a non-positive one is configured.
pub const DEFAULT_GAP: f64 = 1.0;

/// The pause before a pedestrian event that follows the horizontal phase.
const PEDESTRIAN_LEAD_IN: f64 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Stage {
    /// Wait for the crossing axis to finish its right turns.
    Guard(Axis),
    MainRed(Axis),
    RedAmber(Axis),
    Green(Axis),
    Amber(Axis),
    ClearRed(Axis),
    ArrowOn(Axis),
    ArrowOff(Axis),
    Gap(Axis),
    /// Decide whether pedestrians cross before the next axis.
    Sample(Axis),
    LeadIn(Axis),
    Walk(Axis, WalkSequence),
}

/// Drives a [SignalController] through a fixed cycle in virtual time.
pub struct PhaseSequencer {
    timings: PhaseTimings,
    pedestrians: PedestrianSettings,
    gap: f64,
    stage: Stage,
    /// The base time at which the next stage runs.
    wake_at: f64,
    sampler: PedestrianSampler,
    rng: StdRng,
}

/// Returns `gap` if it is usable as a clearance interval.
pub(crate) fn checked_gap(gap: f64) -> f64 {
    if gap > 0.0 {
        gap
    } else {
        log::warn!("Ignoring signal gap of {}s, using {}s", gap, DEFAULT_GAP);
        DEFAULT_GAP
    }
}

impl PhaseSequencer {
    /// Creates a sequencer whose first stage runs at `now`.
    pub fn new(
        timings: PhaseTimings,
        pedestrians: PedestrianSettings,
        gap: f64,
        seed: u64,
        now: f64,
    ) -> Self {
        Self {
            timings,
            pedestrians,
            gap: checked_gap(gap),
            stage: Stage::Guard(Axis::Vertical),
            wake_at: now,
            sampler: PedestrianSampler::new(now),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Replaces the phase lengths. Takes effect from the next stage.
    pub fn set_timings(&mut self, timings: PhaseTimings) {
        self.timings = timings;
    }

    pub fn set_pedestrians(&mut self, pedestrians: PedestrianSettings) {
        self.pedestrians = pedestrians;
    }

    pub fn timings(&self) -> &PhaseTimings {
        &self.timings
    }

    /// The number of pedestrian opportunities one minute of cycling offers.
    pub fn max_gaps_per_minute(&self) -> f64 {
        self.timings
            .max_gaps_per_minute(self.gap, self.pedestrians.crossing_duration)
    }

    /// Runs every stage due at or before `now`.
    pub fn update(&mut self, now: f64, ctl: &mut SignalController) {
        while now >= self.wake_at {
            let at = self.wake_at;
            self.wake_at += self.step(at, ctl);
        }
    }

    /// Performs the current stage and returns the delay before the next.
    fn step(&mut self, now: f64, ctl: &mut SignalController) -> f64 {
        let gap = self.gap;
        let main_len = |axis| self.timings.main(axis);
        let right_len = |axis| self.timings.right(axis);
        let after_main = |axis| {
            if right_len(axis) > 0.0 {
                Stage::ArrowOn(axis)
            } else {
                Stage::ArrowOff(axis)
            }
        };

        let (next, delay) = match self.stage {
            Stage::Guard(axis) => {
                if ctl.state().any_arrow_on(axis.cross()) {
                    (Stage::Guard(axis), gap)
                } else if main_len(axis) > 0.0 {
                    (Stage::MainRed(axis), 0.0)
                } else {
                    (after_main(axis), 0.0)
                }
            }
            Stage::MainRed(axis) => {
                Self::show(ctl, axis, MainLight::Red);
                (Stage::RedAmber(axis), gap)
            }
            Stage::RedAmber(axis) => {
                Self::show(ctl, axis, MainLight::RedAmber);
                (Stage::Green(axis), gap)
            }
            Stage::Green(axis) => {
                Self::show(ctl, axis, MainLight::Green);
                (Stage::Amber(axis), main_len(axis))
            }
            Stage::Amber(axis) => {
                Self::show(ctl, axis, MainLight::Amber);
                (Stage::ClearRed(axis), gap)
            }
            Stage::ClearRed(axis) => {
                Self::show(ctl, axis, MainLight::Red);
                (after_main(axis), gap)
            }
            Stage::ArrowOn(axis) => {
                log::debug!("{:?} right-turn arrows on", axis);
                ctl.set_axis_arrows(axis, Lamp::On);
                ctl.broadcast();
                (Stage::ArrowOff(axis), right_len(axis))
            }
            Stage::ArrowOff(axis) => {
                ctl.set_axis_arrows(axis, Lamp::Off);
                ctl.broadcast();
                (Stage::Gap(axis), 0.0)
            }
            Stage::Gap(axis) => (Stage::Sample(axis), gap),
            Stage::Sample(axis) => {
                let max_gaps = self.max_gaps_per_minute();
                let per_minute = self.pedestrians.events_per_minute();
                if self
                    .sampler
                    .sample(now, max_gaps, per_minute, &mut self.rng)
                {
                    match axis {
                        Axis::Horizontal => (Stage::LeadIn(axis), 0.0),
                        Axis::Vertical => (self.walk(axis), 0.0),
                    }
                } else {
                    (Stage::Guard(axis.cross()), 0.0)
                }
            }
            Stage::LeadIn(axis) => (self.walk(axis), PEDESTRIAN_LEAD_IN),
            Stage::Walk(axis, mut walk) => match walk.step(ctl) {
                Some(delay) => (Stage::Walk(axis, walk), delay),
                None => (Stage::Guard(axis.cross()), 0.0),
            },
        };
        self.stage = next;
        delay
    }

    fn walk(&self, axis: Axis) -> Stage {
        log::debug!("Pedestrian event after {:?} phase", axis);
        Stage::Walk(axis, WalkSequence::new(self.pedestrians.crossing_duration))
    }

    fn show(ctl: &mut SignalController, axis: Axis, light: MainLight) {
        log::debug!("{:?} main lights {:?}", axis, light);
        ctl.set_axis_main(axis, light);
        ctl.broadcast();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::broadcast::RecordingSink;
    use crate::direction::Direction;
    use std::sync::Arc;

    fn timings(v_main: f64, v_right: f64, h_main: f64, h_right: f64) -> PhaseTimings {
        PhaseTimings {
            vertical_main: v_main,
            horizontal_main: h_main,
            vertical_right: v_right,
            horizontal_right: h_right,
        }
    }

    fn no_pedestrians() -> PedestrianSettings {
        PedestrianSettings::default()
    }

    /// Pedestrians on every opportunity.
    fn busy_pedestrians() -> PedestrianSettings {
        PedestrianSettings {
            crossing_duration: 3.0,
            events_per_hour: 600.0,
        }
    }

    #[test]
    fn vertical_then_horizontal() {
        let mut ctl = SignalController::new();
        let mut seq = PhaseSequencer::new(timings(10.0, 5.0, 10.0, 5.0), no_pedestrians(), 1.0, 0, 0.0);

        seq.update(1.5, &mut ctl);
        assert_eq!(ctl.state().main(Direction::North), MainLight::RedAmber);
        seq.update(2.5, &mut ctl);
        assert_eq!(ctl.state().main(Direction::North), MainLight::Green);
        assert_eq!(ctl.state().main(Direction::South), MainLight::Green);
        assert_eq!(ctl.state().main(Direction::East), MainLight::Red);
        seq.update(12.5, &mut ctl);
        assert_eq!(ctl.state().main(Direction::North), MainLight::Amber);
        seq.update(14.5, &mut ctl);
        assert_eq!(ctl.state().main(Direction::North), MainLight::Red);
        assert_eq!(ctl.state().right_turn(Direction::North), Lamp::On);
        seq.update(19.5, &mut ctl);
        assert_eq!(ctl.state().right_turn(Direction::North), Lamp::Off);
        seq.update(22.5, &mut ctl);
        assert_eq!(ctl.state().main(Direction::East), MainLight::Green);
        assert_eq!(ctl.state().main(Direction::West), MainLight::Green);
        assert_eq!(ctl.state().main(Direction::North), MainLight::Red);
    }

    #[test]
    fn zero_main_length_skips_to_arrows() {
        let mut ctl = SignalController::new();
        let mut seq = PhaseSequencer::new(timings(0.0, 5.0, 0.0, 0.0), no_pedestrians(), 1.0, 0, 0.0);
        seq.update(0.0, &mut ctl);
        assert_eq!(ctl.state().right_turn(Direction::South), Lamp::On);
        assert_eq!(ctl.state().main(Direction::South), MainLight::Red);
    }

    #[test]
    fn zero_timings_never_show_green() {
        let mut ctl = SignalController::new();
        let mut seq = PhaseSequencer::new(PhaseTimings::default(), no_pedestrians(), 1.0, 0, 0.0);
        let mut now = 0.0;
        while now < 100.0 {
            now += 0.25;
            seq.update(now, &mut ctl);
            for dir in Direction::ALL {
                assert_eq!(ctl.state().main(dir), MainLight::Red);
                assert_eq!(ctl.state().right_turn(dir), Lamp::Off);
            }
        }
    }

    #[test]
    fn non_positive_gap_falls_back() {
        let seq = PhaseSequencer::new(PhaseTimings::default(), no_pedestrians(), 0.0, 0, 0.0);
        assert_eq!(seq.gap, DEFAULT_GAP);
    }

    #[test]
    fn broadcasts_are_always_safe() {
        let sink = Arc::new(RecordingSink::default());
        let mut ctl = SignalController::with_sink(sink.clone());
        let mut seq = PhaseSequencer::new(timings(10.0, 5.0, 8.0, 4.0), busy_pedestrians(), 1.0, 3, 0.0);

        for tick in 1..=60 * 600 {
            seq.update(tick as f64 / 60.0, &mut ctl);
            let state = ctl.state();
            assert!(!(state.any_arrow_on(Axis::Vertical) && state.any_arrow_on(Axis::Horizontal)));
        }

        let mut walks = 0;
        for message in sink.messages() {
            let json: serde_json::Value = serde_json::from_str(&message).unwrap();
            let lit = |group: &str, dir: &str, lamp: &str| json[group][dir][lamp] == true;
            let names = ["north", "east", "south", "west"];
            let walking = names.iter().any(|d| lit("pedestrianLightStates", d, "on"));
            if walking {
                walks += 1;
                for d in names {
                    assert!(lit("trafficLightStates", d, "red"));
                    assert!(!lit("trafficLightStates", d, "green"));
                    assert!(!lit("trafficLightStates", d, "amber"));
                    assert!(!lit("rightTurnLightStates", d, "on"));
                }
            }
            let vertical = lit("rightTurnLightStates", "north", "on")
                || lit("rightTurnLightStates", "south", "on");
            let horizontal = lit("rightTurnLightStates", "east", "on")
                || lit("rightTurnLightStates", "west", "on");
            assert!(!(vertical && horizontal));
        }
        assert!(walks > 0);
    }

    #[test]
    fn horizontal_walk_has_lead_in() {
        let mut ctl = SignalController::new();
        let mut seq = PhaseSequencer::new(timings(10.0, 5.0, 10.0, 5.0), busy_pedestrians(), 1.0, 0, 0.0);

        // Vertical phase ends at 20 and the walk starts straight away
        seq.update(20.6, &mut ctl);
        assert_eq!(ctl.state().pedestrian(Direction::North), Lamp::On);
        assert_eq!(ctl.state().pedestrian(Direction::East), Lamp::Off);
        seq.update(22.1, &mut ctl);
        assert!(Direction::ALL.iter().all(|&d| ctl.state().pedestrian(d).is_on()));

        // Walk ends at 25, horizontal phase ends at 45, walk starts at 49
        seq.update(27.5, &mut ctl);
        assert!(!ctl.state().any_pedestrian_on());
        assert_eq!(ctl.state().main(Direction::East), MainLight::Green);
        seq.update(49.2, &mut ctl);
        assert!(!ctl.state().any_pedestrian_on());
        seq.update(49.6, &mut ctl);
        assert_eq!(ctl.state().pedestrian(Direction::North), Lamp::On);
    }
}
