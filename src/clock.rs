use crate::util::clock_label;

/// The number of ticks per wall-clock second when running live.
pub const TICK_RATE: f64 = 60.0;

/// Simulated seconds shown to clients per base second.
pub const SIMULATED_TIME_SCALE: f64 = 60.0;

/// The authoritative virtual clock.
///
/// Base time is measured in seconds at a speed multiplier of one; signal
/// timings and pedestrian windows are expressed in base time. Clients are
/// shown the simulated time, which runs [SIMULATED_TIME_SCALE] times faster.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimClock {
    base: f64,
    ticks: u64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock by one tick at the given multiplier and returns
    /// the elapsed base time.
    pub fn advance(&mut self, multiplier: f64) -> f64 {
        let dt = multiplier.max(0.0) / TICK_RATE;
        self.base += dt;
        self.ticks += 1;
        dt
    }

    /// The current base time in seconds.
    pub fn now(&self) -> f64 {
        self.base
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The simulated time in seconds.
    pub fn simulated_seconds(&self) -> f64 {
        self.base * SIMULATED_TIME_SCALE
    }

    /// The simulated time formatted as `"{h}h {m}m"`.
    pub fn label(&self) -> String {
        clock_label(self.simulated_seconds())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn one_second_of_ticks_is_one_simulated_minute() {
        let mut clock = SimClock::new();
        for _ in 0..60 {
            clock.advance(1.0);
        }
        assert_approx_eq!(clock.now(), 1.0);
        assert_approx_eq!(clock.simulated_seconds(), 60.0);
        assert_eq!(clock.ticks(), 60);
        assert_eq!(clock.label(), "0h 1m");
    }

    #[test]
    fn multiplier_scales_each_tick() {
        let mut clock = SimClock::new();
        assert_approx_eq!(clock.advance(10.0), 10.0 / 60.0);
        assert_approx_eq!(clock.advance(0.5), 0.5 / 60.0);
        clock.reset();
        assert_eq!(clock.ticks(), 0);
        assert_approx_eq!(clock.now(), 0.0);
    }
}
