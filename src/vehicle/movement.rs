//! Per-tick movement rules for each manoeuvre.

use super::{axis_coord, set_axis_coord, Manoeuvre, Vehicle};
use crate::direction::Direction;
use crate::geometry::JunctionGeometry;
use crate::math::heading_step;
use std::f64::consts::FRAC_PI_4;

/// How far inside the junction box a left turn swings onto the new road, in px.
pub const LEFT_TURN_MARGIN: f64 = 10.0;

/// How far inside the junction box each leg of a right turn ends, in px.
pub const RIGHT_TURN_MARGIN: f64 = 15.0;

/// The edge of the junction box a vehicle travelling `dir` enters through.
fn near_edge(dir: Direction, geom: &JunctionGeometry) -> f64 {
    match dir {
        Direction::North => geom.bottom(),
        Direction::East => geom.left(),
        Direction::South => geom.top(),
        Direction::West => geom.right(),
    }
}

/// The edge of the junction box a vehicle travelling `dir` leaves through.
fn far_edge(dir: Direction, geom: &JunctionGeometry) -> f64 {
    match dir {
        Direction::North => geom.top(),
        Direction::East => geom.right(),
        Direction::South => geom.bottom(),
        Direction::West => geom.left(),
    }
}

/// Whether `coord` has reached `target` when moving in `dir`.
fn reached(coord: f64, target: f64, dir: Direction) -> bool {
    dir.sign() * (coord - target) >= 0.0
}

impl Vehicle {
    /// Moves the vehicle by one tick according to its manoeuvre.
    pub(crate) fn advance(&mut self, geom: &JunctionGeometry) {
        match self.manoeuvre {
            Manoeuvre::Forward => self.move_forward(),
            Manoeuvre::Left { completed } => self.move_left_turn(completed, geom),
            Manoeuvre::Right { phase } => self.move_right_turn(phase, geom),
        }
    }

    /// Moves `speed` along the current direction.
    pub(crate) fn move_forward(&mut self) {
        let next = self.axis_pos() + self.direction.sign() * self.speed;
        self.set_axis_pos(next);
    }

    /// Drives up to the near side of the junction box, then swings onto the
    /// crossing road in a single step.
    fn move_left_turn(&mut self, completed: bool, geom: &JunctionGeometry) {
        if completed {
            return self.move_forward();
        }

        let dir = self.direction;
        let target = near_edge(dir, geom) + dir.sign() * LEFT_TURN_MARGIN;
        let next = self.axis_pos() + dir.sign() * self.speed;
        if reached(next, target, dir) {
            self.set_axis_pos(target);
            self.direction = dir.anticlockwise();
            self.manoeuvre = Manoeuvre::Left { completed: true };
        } else {
            self.set_axis_pos(next);
        }
    }

    /// Follows a two-segment approximation of a quarter circle across the
    /// junction box, turning 45 degrees at the end of each segment.
    fn move_right_turn(&mut self, phase: u8, geom: &JunctionGeometry) {
        if phase >= 2 {
            return self.move_forward();
        }

        self.translate(heading_step(self.heading, self.speed));

        let dir = self.direction;
        if phase == 0 {
            let target = near_edge(dir, geom) + dir.sign() * RIGHT_TURN_MARGIN;
            if reached(self.axis_pos(), target, dir) {
                self.set_axis_pos(target);
                self.heading += FRAC_PI_4;
                self.manoeuvre = Manoeuvre::Right { phase: 1 };
            }
        } else {
            let next_dir = dir.clockwise();
            let target = far_edge(next_dir, geom) - next_dir.sign() * RIGHT_TURN_MARGIN;
            if reached(axis_coord(self.pos, next_dir), target, next_dir) {
                set_axis_coord(&mut self.pos, next_dir, target);
                self.direction = next_dir;
                self.heading += FRAC_PI_4;
                self.manoeuvre = Manoeuvre::Right { phase: 2 };
            }
        }
    }
}
