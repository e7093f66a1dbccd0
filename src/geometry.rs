//! Static layout of the junction on the client's canvas.

use crate::util::Interval;
use serde::Serialize;

/// The default width of a lane in px.
pub const DEFAULT_LANE_WIDTH: f64 = 20.0;

/// The layout of the junction, derived from the canvas size and lane count.
///
/// The junction box is the square where the two roads overlap. Each road
/// carries `num_lanes` lanes in each direction, so the box is
/// `2 * num_lanes * lane_width` across and centred on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JunctionGeometry {
    /// The number of lanes per approach.
    pub num_lanes: usize,
    /// The width of a lane in px.
    pub lane_width: f64,
    /// The canvas width in px.
    pub canvas_width: f64,
    /// The canvas height in px.
    pub canvas_height: f64,
    /// The vertical extent of the horizontal road (`top` to `bottom`).
    horizontal: Interval<f64>,
    /// The horizontal extent of the vertical road (`left` to `right`).
    vertical: Interval<f64>,
    /// The width of a car in px.
    pub car_width: f64,
    /// The length of a car in px.
    pub car_height: f64,
}

/// Computes the junction layout. Pure; identical inputs give identical output.
pub fn compute_geometry(
    canvas_width: f64,
    canvas_height: f64,
    num_lanes: usize,
    lane_width: f64,
) -> JunctionGeometry {
    let half_width = num_lanes as f64 * lane_width;
    JunctionGeometry {
        num_lanes,
        lane_width,
        canvas_width,
        canvas_height,
        horizontal: Interval::disc(canvas_height / 2.0, half_width),
        vertical: Interval::disc(canvas_width / 2.0, half_width),
        car_width: lane_width * 0.8,
        car_height: lane_width * 2.0,
    }
}

impl JunctionGeometry {
    /// The y coordinate of the top edge of the junction box.
    pub fn top(&self) -> f64 {
        self.horizontal.min
    }

    /// The y coordinate of the bottom edge of the junction box.
    pub fn bottom(&self) -> f64 {
        self.horizontal.max
    }

    /// The x coordinate of the left edge of the junction box.
    pub fn left(&self) -> f64 {
        self.vertical.min
    }

    /// The x coordinate of the right edge of the junction box.
    pub fn right(&self) -> f64 {
        self.vertical.max
    }

    /// The offset of a lane's centre line from the road edge it is numbered from.
    pub fn lane_offset(&self, lane: usize) -> f64 {
        self.lane_width * (lane as f64 + 0.5)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn boundaries_are_centred() {
        let geom = compute_geometry(800.0, 600.0, 2, DEFAULT_LANE_WIDTH);
        assert_approx_eq!(geom.left(), 360.0);
        assert_approx_eq!(geom.right(), 440.0);
        assert_approx_eq!(geom.top(), 260.0);
        assert_approx_eq!(geom.bottom(), 340.0);
        assert_approx_eq!(geom.car_width, 16.0);
        assert_approx_eq!(geom.car_height, 40.0);
    }

    #[test]
    fn recomputation_is_bit_identical() {
        let a = compute_geometry(1013.0, 777.0, 3, 17.5);
        let b = compute_geometry(1013.0, 777.0, 3, 17.5);
        assert_eq!(a, b);
        assert_eq!(a.top().to_bits(), b.top().to_bits());
        assert_eq!(a.bottom().to_bits(), b.bottom().to_bits());
        assert_eq!(a.left().to_bits(), b.left().to_bits());
        assert_eq!(a.right().to_bits(), b.right().to_bits());
    }
}
