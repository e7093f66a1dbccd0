use crate::clock::SIMULATED_TIME_SCALE;
use crate::direction::{Direction, DirectionMap, TurnType};
use crate::settings::SpawnRates;
use crate::vehicle::{VehicleAttributes, SPRITE_COUNT};
use itertools::iproduct;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;

/// Seconds per hour, converting hourly rates to per-second rates.
const SECONDS_PER_HOUR: f64 = 3600.0;

/// The chance that a vehicle arrives during a tick of `dt` base seconds.
///
/// Rates are per simulated hour, so a tick covers `dt × 60` simulated seconds.
pub fn spawn_probability(per_hour: f64, dt: f64) -> f64 {
    if per_hour <= 0.0 || dt <= 0.0 {
        return 0.0;
    }
    (per_hour * dt * SIMULATED_TIME_SCALE / SECONDS_PER_HOUR).min(1.0)
}

/// The lanes forward-moving vehicles may use. Turning lanes are excluded once
/// there are enough lanes for them to be dedicated.
pub fn forward_lanes(lanes: usize) -> SmallVec<[usize; 8]> {
    if lanes < 3 {
        smallvec::smallvec![0]
    } else {
        (1..lanes - 1).collect()
    }
}

/// Draws vehicle arrivals.
pub struct Spawner {
    rng: StdRng,
    /// Round-robin position in the forward lanes, per approach.
    next_forward: DirectionMap<usize>,
}

impl Spawner {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            next_forward: DirectionMap::default(),
        }
    }

    /// Picks the lane for the next forward-moving vehicle on an approach.
    pub fn forward_lane(&mut self, dir: Direction, lanes: usize) -> usize {
        let candidates = forward_lanes(lanes);
        let idx = &mut self.next_forward[dir];
        let lane = candidates[*idx % candidates.len()];
        *idx += 1;
        lane
    }

    /// Draws independently for each approach and turn whether a vehicle
    /// arrives during a tick of `dt` base seconds.
    pub fn spawn(
        &mut self,
        rates: &SpawnRates,
        dt: f64,
        lanes: usize,
        speed: f64,
        now: f64,
    ) -> SmallVec<[VehicleAttributes; 4]> {
        let mut arrivals = SmallVec::new();
        for (dir, turn) in iproduct!(Direction::ALL, TurnType::ALL) {
            let p = spawn_probability(rates.rate(dir, turn), dt);
            if p <= 0.0 || self.rng.gen::<f64>() >= p {
                continue;
            }
            let lane = match turn {
                TurnType::Forward => self.forward_lane(dir, lanes),
                TurnType::Left => 0,
                TurnType::Right => lanes.saturating_sub(1),
            };
            arrivals.push(VehicleAttributes {
                direction: dir,
                turn,
                lane,
                speed,
                spawn_time: now,
                sprite_index: self.rng.gen_range(0..SPRITE_COUNT),
            });
        }
        arrivals
    }
}
