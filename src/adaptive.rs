//! The demand-responsive signal policy.
//!
//! Rather than a fixed cycle, the phase with the highest priority is served
//! next. Priority grows with the number of vehicles waiting for the phase and
//! with the time since it was last served, so no phase starves.

use crate::controller::SignalController;
use crate::direction::{Axis, TurnType};
use crate::light::{Lamp, MainLight};
use crate::pedestrian::{PedestrianSampler, PedestrianSettings, WalkSequence};
use crate::sequencer::checked_gap;
use crate::vehicle::Vehicle;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// The shortest green window in s.
pub const MIN_GREEN: f64 = 5.0;

/// The longest green window in s, extensions included.
pub const MAX_GREEN: f64 = 30.0;

/// The most a green window grows by in one extension, in s.
const EXTENSION: f64 = 5.0;

/// Green time granted per waiting vehicle, in s.
const GREEN_PER_VEHICLE: f64 = 2.0;

/// The weight of waiting time against queue length.
const STARVATION_WEIGHT: f64 = 0.5;

/// Seconds of waiting worth one queued vehicle, before weighting.
const STARVATION_SCALE: f64 = 10.0;

/// A set of movements which may run together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    NsMain,
    NsRight,
    EwMain,
    EwRight,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::NsMain, Phase::NsRight, Phase::EwMain, Phase::EwRight];

    pub fn axis(self) -> Axis {
        match self {
            Phase::NsMain | Phase::NsRight => Axis::Vertical,
            Phase::EwMain | Phase::EwRight => Axis::Horizontal,
        }
    }

    pub fn is_right_turn(self) -> bool {
        matches!(self, Phase::NsRight | Phase::EwRight)
    }

    /// The phase which serves a vehicle.
    pub fn serving(vehicle: &Vehicle) -> Self {
        let right = vehicle.turn() == TurnType::Right;
        match (vehicle.origin().axis(), right) {
            (Axis::Vertical, false) => Phase::NsMain,
            (Axis::Vertical, true) => Phase::NsRight,
            (Axis::Horizontal, false) => Phase::EwMain,
            (Axis::Horizontal, true) => Phase::EwRight,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// The number of vehicles waiting at their stop lines for each phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhaseQueues([usize; 4]);

impl PhaseQueues {
    /// Counts the vehicles which have not yet crossed their stop line.
    pub fn count<'a>(vehicles: impl IntoIterator<Item = &'a Vehicle>) -> Self {
        let mut queues = Self::default();
        for veh in vehicles {
            if !veh.has_crossed_stop_line() {
                queues.0[Phase::serving(veh).index()] += 1;
            }
        }
        queues
    }

    pub fn get(&self, phase: Phase) -> usize {
        self.0[phase.index()]
    }

    pub fn set(&mut self, phase: Phase, count: usize) {
        self.0[phase.index()] = count;
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Stage {
    /// Pick the next phase and turn it green.
    Select,
    /// Decide whether to extend the green window or end it.
    Serve {
        phase: Phase,
        initial: usize,
        total: f64,
    },
    /// Decide whether pedestrians cross before the next phase.
    Sample,
    Walk(WalkSequence),
}

/// Drives a [SignalController] by serving the most pressing phase in turn.
pub struct AdaptiveScheduler {
    pedestrians: PedestrianSettings,
    gap: f64,
    stage: Stage,
    wake_at: f64,
    last_served: [f64; 4],
    sampler: PedestrianSampler,
    rng: StdRng,
}

impl AdaptiveScheduler {
    /// Creates a scheduler whose first selection happens at `now`.
    pub fn new(pedestrians: PedestrianSettings, gap: f64, seed: u64, now: f64) -> Self {
        Self {
            pedestrians,
            gap: checked_gap(gap),
            stage: Stage::Select,
            wake_at: now,
            last_served: [now; 4],
            sampler: PedestrianSampler::new(now),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn set_pedestrians(&mut self, pedestrians: PedestrianSettings) {
        self.pedestrians = pedestrians;
    }

    /// The urgency of serving a phase at `now`.
    pub fn priority(&self, phase: Phase, queues: &PhaseQueues, now: f64) -> f64 {
        let waited = now - self.last_served[phase.index()];
        queues.get(phase) as f64 + STARVATION_WEIGHT * (waited / STARVATION_SCALE)
    }

    /// The phase with the highest priority. Ties go to the earliest in [Phase::ALL].
    pub fn select(&self, queues: &PhaseQueues, now: f64) -> Phase {
        let mut best = Phase::ALL[0];
        let mut best_priority = self.priority(best, queues, now);
        for phase in &Phase::ALL[1..] {
            let priority = self.priority(*phase, queues, now);
            if priority > best_priority {
                best = *phase;
                best_priority = priority;
            }
        }
        best
    }

    /// The number of pedestrian opportunities per minute, assuming every
    /// phase is as short as possible.
    pub fn max_gaps_per_minute(&self) -> f64 {
        60.0 / (MIN_GREEN + self.gap)
    }

    /// Runs every stage due at or before `now`, using the current queues.
    pub fn update(&mut self, now: f64, ctl: &mut SignalController, queues: &PhaseQueues) {
        while now >= self.wake_at {
            let at = self.wake_at;
            self.wake_at += self.step(at, ctl, queues);
        }
    }

    fn step(&mut self, now: f64, ctl: &mut SignalController, queues: &PhaseQueues) -> f64 {
        let (next, delay) = match self.stage {
            Stage::Select => {
                let phase = self.select(queues, now);
                let initial = queues.get(phase);
                let window = (GREEN_PER_VEHICLE * initial as f64).clamp(MIN_GREEN, MAX_GREEN);
                log::debug!("Serving {:?} for {}s ({} waiting)", phase, window, initial);
                Self::grant(ctl, phase);
                let serve = Stage::Serve {
                    phase,
                    initial,
                    total: window,
                };
                (serve, window)
            }
            Stage::Serve {
                phase,
                initial,
                total,
            } => {
                let waiting = queues.get(phase);
                if initial > 0 && 2 * waiting >= initial && total < MAX_GREEN {
                    let extension = EXTENSION.min(MAX_GREEN - total);
                    log::debug!("Extending {:?} by {}s ({} waiting)", phase, extension, waiting);
                    let serve = Stage::Serve {
                        phase,
                        initial,
                        total: total + extension,
                    };
                    (serve, extension)
                } else {
                    ctl.set_all_red();
                    ctl.broadcast();
                    self.last_served[phase.index()] = now;
                    (Stage::Sample, self.gap)
                }
            }
            Stage::Sample => {
                let max_gaps = self.max_gaps_per_minute();
                let per_minute = self.pedestrians.events_per_minute();
                if self
                    .sampler
                    .sample(now, max_gaps, per_minute, &mut self.rng)
                {
                    log::debug!("Pedestrian event");
                    let walk = WalkSequence::new(self.pedestrians.crossing_duration);
                    (Stage::Walk(walk), 0.0)
                } else {
                    (Stage::Select, 0.0)
                }
            }
            Stage::Walk(mut walk) => match walk.step(ctl) {
                Some(delay) => (Stage::Walk(walk), delay),
                None => (Stage::Select, 0.0),
            },
        };
        self.stage = next;
        delay
    }

    /// Shows the lights for a phase, with everything else red.
    fn grant(ctl: &mut SignalController, phase: Phase) {
        ctl.set_all_red();
        if phase.is_right_turn() {
            ctl.set_axis_arrows(phase.axis(), Lamp::On);
        } else {
            ctl.set_axis_main(phase.axis(), MainLight::Green);
        }
        ctl.broadcast();
    }
}
