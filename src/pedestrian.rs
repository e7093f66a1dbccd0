//! Random pedestrian crossing events.
//!
//! Signal policies offer a crossing opportunity at fixed points in their
//! cycle. [PedestrianSampler] spreads the configured number of events over
//! the opportunities in each minute, and [WalkSequence] runs one event.

use crate::controller::SignalController;
use crate::direction::Direction;
use crate::light::{Lamp, MainLight};
use rand::Rng;

/// The length of the sampling window in base seconds.
const WINDOW: f64 = 60.0;

/// The delay between clearing one approach and lighting its pedestrian signal.
pub const WALK_STAGGER: f64 = 0.5;

/// The pedestrian parameters of a junction.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PedestrianSettings {
    /// How long pedestrian lights stay on, in s.
    pub crossing_duration: f64,
    pub events_per_hour: f64,
}

impl PedestrianSettings {
    pub fn events_per_minute(&self) -> f64 {
        self.events_per_hour.max(0.0) / 60.0
    }
}

/// Decides at each crossing opportunity whether a pedestrian event happens.
#[derive(Clone, Copy, Debug, Default)]
pub struct PedestrianSampler {
    window_start: f64,
    gaps: u32,
    events: u32,
}

impl PedestrianSampler {
    pub fn new(now: f64) -> Self {
        Self {
            window_start: now,
            gaps: 0,
            events: 0,
        }
    }

    /// The chance of an event at the next opportunity.
    pub fn probability(&self, max_gaps_per_minute: f64, events_per_minute: f64) -> f64 {
        let remaining_gaps = max_gaps_per_minute - self.gaps as f64;
        let remaining_events = events_per_minute - self.events as f64;
        if remaining_gaps > 0.0 {
            remaining_events / remaining_gaps
        } else {
            0.0
        }
    }

    /// Records an opportunity at `now` and draws whether an event happens.
    pub fn sample(
        &mut self,
        now: f64,
        max_gaps_per_minute: f64,
        events_per_minute: f64,
        rng: &mut impl Rng,
    ) -> bool {
        self.gaps += 1;
        if now - self.window_start >= WINDOW {
            self.window_start = now;
            self.gaps = 0;
            self.events = 0;
        }
        let p = self.probability(max_gaps_per_minute, events_per_minute);
        let hit = rng.gen::<f64>() < p;
        if hit {
            self.events += 1;
        }
        hit
    }

    pub fn events(&self) -> u32 {
        self.events
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WalkStage {
    /// Clear vehicle lights facing the approach.
    Clear(usize),
    /// Light the approach's pedestrian signal.
    Light(usize),
    /// Turn every pedestrian signal off.
    Finish,
    Done,
}

/// One pedestrian event: each approach in turn is cleared and given a walk
/// signal, then all walk signals are held for the crossing duration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WalkSequence {
    stage: WalkStage,
    crossing_duration: f64,
}

impl WalkSequence {
    pub fn new(crossing_duration: f64) -> Self {
        Self {
            stage: WalkStage::Clear(0),
            crossing_duration: crossing_duration.max(0.0),
        }
    }

    /// Performs the next step and returns the base time to wait before the
    /// one after, or `None` once the event is over.
    pub fn step(&mut self, ctl: &mut SignalController) -> Option<f64> {
        match self.stage {
            WalkStage::Clear(idx) => {
                let dir = Direction::ALL[idx];
                let mut group = *ctl.state().group(dir);
                group.main = MainLight::Red;
                group.right_turn = Lamp::Off;
                ctl.set_state(dir, group);
                self.stage = WalkStage::Light(idx);
                Some(WALK_STAGGER)
            }
            WalkStage::Light(idx) => {
                ctl.set_pedestrian(Direction::ALL[idx], Lamp::On);
                ctl.apply_safety_override();
                if idx + 1 < Direction::ALL.len() {
                    self.stage = WalkStage::Clear(idx + 1);
                    Some(0.0)
                } else {
                    log::debug!("Pedestrians crossing for {}s", self.crossing_duration);
                    ctl.broadcast();
                    self.stage = WalkStage::Finish;
                    Some(self.crossing_duration)
                }
            }
            WalkStage::Finish => {
                for dir in Direction::ALL {
                    ctl.set_pedestrian(dir, Lamp::Off);
                }
                ctl.broadcast();
                self.stage = WalkStage::Done;
                None
            }
            WalkStage::Done => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn probability_spreads_events_over_gaps() {
        let mut sampler = PedestrianSampler::new(0.0);
        assert_eq!(sampler.probability(4.0, 2.0), 0.5);
        sampler.gaps = 4;
        assert_eq!(sampler.probability(4.0, 2.0), 0.0);
        sampler.gaps = 2;
        sampler.events = 2;
        assert_eq!(sampler.probability(4.0, 2.0), 0.0);
    }

    #[test]
    fn certain_event_is_taken() {
        let mut rng = StdRng::from_seed([7; 32]);
        let mut sampler = PedestrianSampler::new(0.0);
        // One opportunity left for one event
        assert!(sampler.sample(1.0, 2.0, 1.0, &mut rng));
        assert_eq!(sampler.events(), 1);
        assert!(!sampler.sample(2.0, 2.0, 1.0, &mut rng));
    }

    #[test]
    fn window_rolls_after_a_minute() {
        let mut rng = StdRng::from_seed([7; 32]);
        let mut sampler = PedestrianSampler::new(0.0);
        assert!(sampler.sample(1.0, 2.0, 1.0, &mut rng));
        assert!(sampler.sample(61.0, 1.0, 1.0, &mut rng));
        assert_eq!(sampler.events(), 1);
    }

    #[test]
    fn no_events_configured_never_fires() {
        let mut rng = StdRng::from_seed([1; 32]);
        let mut sampler = PedestrianSampler::new(0.0);
        for i in 0..1000 {
            assert!(!sampler.sample(i as f64, 20.0, 0.0, &mut rng));
        }
    }

    #[test]
    fn walk_clears_each_approach_then_holds() {
        let mut ctl = SignalController::new();
        ctl.set_axis_main(crate::direction::Axis::Vertical, MainLight::Green);
        let mut walk = WalkSequence::new(5.0);
        let mut delays = Vec::new();
        while let Some(delay) = walk.step(&mut ctl) {
            delays.push(delay);
            assert!(ctl.state().is_safe());
            if delays.len() == 8 {
                for dir in Direction::ALL {
                    assert_eq!(ctl.state().pedestrian(dir), Lamp::On);
                }
            }
        }
        assert_eq!(delays, vec![0.5, 0.0, 0.5, 0.0, 0.5, 0.0, 0.5, 5.0]);
        assert_eq!(walk.step(&mut ctl), None);
        assert!(!ctl.state().any_pedestrian_on());
        assert_eq!(ctl.state().main(Direction::North), MainLight::Red);
        assert_eq!(ctl.broadcasts(), 2);
    }
}
