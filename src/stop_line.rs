//! Decides whether each vehicle may cross its stop line, and keeps queued
//! vehicles a fixed distance apart.

use crate::direction::Direction;
use crate::geometry::JunctionGeometry;
use crate::light::SignalState;
use crate::vehicle::{axis_coord, Vehicle};

/// The distance of the stop line from the junction box, in lane widths.
const STOP_LINE_LANES: f64 = 1.25;

/// The fixed part of the stop line's distance from the junction box, in px.
const STOP_LINE_CLEARANCE: f64 = 25.0;

/// The space left between a queued vehicle and the one in front, in px.
pub const FOLLOWING_CLEARANCE: f64 = 5.0;

/// The coordinate along the vehicle's axis of travel at which it must stop.
pub fn stop_line(vehicle: &Vehicle, geom: &JunctionGeometry) -> f64 {
    let offset = STOP_LINE_LANES * geom.lane_width + STOP_LINE_CLEARANCE;
    match vehicle.direction() {
        Direction::North => geom.bottom() + offset,
        Direction::East => geom.left() - offset,
        Direction::South => geom.top() - offset,
        Direction::West => geom.right() + offset,
    }
}

/// Whether one more step at the vehicle's speed keeps it on the near side of `line`.
pub fn can_pass(vehicle: &Vehicle, line: f64) -> bool {
    let dir = vehicle.direction();
    let next = vehicle.axis_pos() + dir.sign() * vehicle.speed();
    dir.sign() * (line - next) >= 0.0
}

/// Whether the vehicle is strictly past `line`.
pub fn has_crossed(vehicle: &Vehicle, line: f64) -> bool {
    let dir = vehicle.direction();
    dir.sign() * (vehicle.axis_pos() - line) > 0.0
}

/// Pulls the vehicle back so that it is at least `height + 5` behind the
/// nearest vehicle ahead of it in the same lane and direction.
///
/// `others` must not contain the vehicle itself.
pub fn enforce_following_gap<'a>(
    vehicle: &mut Vehicle,
    others: impl IntoIterator<Item = &'a Vehicle>,
) {
    let dir = vehicle.direction();
    let pos = vehicle.axis_pos();
    let leader = others
        .into_iter()
        .filter(|other| other.direction() == dir && other.lane() == vehicle.lane())
        .map(|other| axis_coord(other.position(), dir))
        .filter(|&other_pos| dir.sign() * (other_pos - pos) > 0.0)
        .min_by(|a, b| {
            let da = dir.sign() * (a - pos);
            let db = dir.sign() * (b - pos);
            da.total_cmp(&db)
        });

    if let Some(leader_pos) = leader {
        let gap = vehicle.height() + FOLLOWING_CLEARANCE;
        if dir.sign() * (leader_pos - pos) < gap {
            vehicle.set_axis_pos(leader_pos - dir.sign() * gap);
        }
    }
}

/// Moves a vehicle by one tick, holding it at its stop line while its signal
/// forbids crossing.
pub fn update_vehicle<'a>(
    vehicle: &mut Vehicle,
    signals: &SignalState,
    geom: &JunctionGeometry,
    others: impl IntoIterator<Item = &'a Vehicle>,
) {
    if !vehicle.has_crossed_stop_line()
        && !signals.permits(vehicle.direction(), vehicle.turn())
    {
        let line = stop_line(vehicle, geom);
        if !can_pass(vehicle, line) {
            vehicle.set_axis_pos(line);
            enforce_following_gap(vehicle, others);
            return;
        }
    }

    vehicle.advance(geom);
    if !vehicle.has_crossed_stop_line() && has_crossed(vehicle, stop_line(vehicle, geom)) {
        vehicle.mark_crossed();
    }
    enforce_following_gap(vehicle, others);
}
