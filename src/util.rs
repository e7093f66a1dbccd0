//! Miscellaneous utility structs and functions.

use std::fmt::Debug;

use cgmath::num_traits::Float;
use serde::{Deserialize, Serialize};

/// An interval on the real number line.
#[derive(Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval<T> {
    pub min: T,
    pub max: T,
}

impl<T> Interval<T> {
    /// Creates a new interval.
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: Float> Interval<T> {
    /// Creates an interval with the given centre and radius.
    pub fn disc(centre: T, radius: T) -> Self {
        Self {
            min: centre - radius,
            max: centre + radius,
        }
    }
}

impl<T: Debug> Debug for Interval<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interval({:?}, {:?})", &self.min, &self.max)
    }
}

/// Formats a number of simulated seconds as a clock label, e.g. `"2h 15m"`.
pub fn clock_label(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let hours = (seconds / 3600.0).floor() as u64;
    let minutes = ((seconds % 3600.0) / 60.0).floor() as u64;
    format!("{}h {}m", hours, minutes)
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn disc_is_symmetric() {
        let band = Interval::disc(300.0, 40.0);
        assert_eq!(band, Interval::new(260.0, 340.0));
        assert_approx_eq!(band.max - band.min, 80.0);
    }

    #[test]
    fn clock_labels() {
        assert_eq!(clock_label(0.0), "0h 0m");
        assert_eq!(clock_label(59.9), "0h 0m");
        assert_eq!(clock_label(3725.0), "1h 2m");
    }
}
