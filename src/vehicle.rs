use crate::direction::{Direction, TurnType};
use crate::error::{Result, SimError};
use crate::geometry::JunctionGeometry;
use crate::math::{Point2d, Vector2d};
use crate::VehicleId;
use serde::Serialize;

mod movement;

/// The number of distinct car sprites a client may draw.
pub const SPRITE_COUNT: u8 = 5;

/// A simulated vehicle.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID
    pub(crate) id: VehicleId,
    /// The direction the vehicle was travelling when it spawned.
    origin: Direction,
    /// The direction the vehicle is currently travelling.
    direction: Direction,
    /// The lane index, counted from the kerb.
    lane: usize,
    /// The manoeuvre the vehicle makes at the junction.
    turn: TurnType,
    /// The position of the vehicle's centre in px.
    pos: Point2d,
    /// The distance covered per tick in px.
    speed: f64,
    /// Progress through the manoeuvre.
    manoeuvre: Manoeuvre,
    /// The heading in radians, clockwise from north. Only right turns rotate it.
    heading: f64,
    /// Whether the vehicle has passed its stop line.
    crossed_stop_line: bool,
    /// The simulated time at which the vehicle spawned, in s.
    spawn_time: f64,
    /// Whether the vehicle's wait has been added to the run metrics.
    wait_recorded: bool,
    /// Which sprite the client draws.
    sprite_index: u8,
    /// The vehicle width in px.
    width: f64,
    /// The vehicle length in px.
    height: f64,
}

/// The attributes of a vehicle about to be spawned.
#[derive(Clone, Copy, Debug)]
pub struct VehicleAttributes {
    /// The direction of travel on entry.
    pub direction: Direction,
    /// The manoeuvre to make at the junction.
    pub turn: TurnType,
    /// The requested lane. Ignored for turning vehicles, which always use the kerb
    /// lane (left) or the innermost lane (right).
    pub lane: usize,
    /// The distance covered per tick in px.
    pub speed: f64,
    /// The simulated time of the spawn, in s.
    pub spawn_time: f64,
    /// Which sprite the client draws.
    pub sprite_index: u8,
}

/// Progress through a manoeuvre.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Manoeuvre {
    Forward,
    /// `completed` flips once the vehicle has swung onto the new road.
    Left { completed: bool },
    /// 0: approaching the arc, 1: mid arc, 2: straight on the new road.
    Right { phase: u8 },
}

/// The serialized form of a vehicle sent to the state sink.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleSnapshot {
    pub direction: Direction,
    pub lane: usize,
    pub speed: f64,
    pub turn_type: TurnType,
    pub x: f64,
    pub y: f64,
    pub current_right_turn_angle: f64,
    pub sprite_index: u8,
    pub width: f64,
    pub height: f64,
}

impl Vehicle {
    /// Creates a vehicle at the canvas edge of its approach.
    ///
    /// Fails if the junction has no lanes or if a forward lane does not exist.
    pub(crate) fn new(attributes: &VehicleAttributes, geom: &JunctionGeometry) -> Result<Self> {
        let lanes = geom.num_lanes;
        if lanes == 0 {
            return Err(SimError::InvalidLaneCount(lanes));
        }
        let lane = match attributes.turn {
            TurnType::Left => 0,
            TurnType::Right => lanes - 1,
            TurnType::Forward => attributes.lane,
        };
        if lane >= lanes {
            return Err(SimError::LaneOutOfRange { lane, lanes });
        }

        let width = geom.car_width;
        let height = geom.car_height;
        let offset = geom.lane_offset(lane);
        let pos = match attributes.direction {
            Direction::North => Point2d::new(geom.left() + offset, geom.canvas_height + height),
            Direction::East => Point2d::new(-width, geom.top() + offset),
            Direction::South => Point2d::new(geom.right() - offset, -height),
            Direction::West => Point2d::new(geom.canvas_width + width, geom.bottom() - offset),
        };
        let manoeuvre = match attributes.turn {
            TurnType::Forward => Manoeuvre::Forward,
            TurnType::Left => Manoeuvre::Left { completed: false },
            TurnType::Right => Manoeuvre::Right { phase: 0 },
        };

        Ok(Self {
            id: VehicleId::default(),
            origin: attributes.direction,
            direction: attributes.direction,
            lane,
            turn: attributes.turn,
            pos,
            speed: attributes.speed,
            manoeuvre,
            heading: attributes.direction.heading(),
            crossed_stop_line: false,
            spawn_time: attributes.spawn_time,
            wait_recorded: false,
            sprite_index: attributes.sprite_index % SPRITE_COUNT,
            width,
            height,
        })
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The direction the vehicle was travelling when it spawned.
    pub fn origin(&self) -> Direction {
        self.origin
    }

    /// The direction the vehicle is currently travelling.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn lane(&self) -> usize {
        self.lane
    }

    pub fn turn(&self) -> TurnType {
        self.turn
    }

    pub fn manoeuvre(&self) -> Manoeuvre {
        self.manoeuvre
    }

    /// The coordinates of the centre of the vehicle.
    pub fn position(&self) -> Point2d {
        self.pos
    }

    /// The distance covered per tick in px.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// The heading in radians, clockwise from north.
    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn has_crossed_stop_line(&self) -> bool {
        self.crossed_stop_line
    }

    pub fn spawn_time(&self) -> f64 {
        self.spawn_time
    }

    pub fn wait_recorded(&self) -> bool {
        self.wait_recorded
    }

    /// The vehicle's width in px.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// The vehicle's length in px.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// The direction the vehicle leaves the junction in.
    pub fn exit_direction(&self) -> Direction {
        match self.turn {
            TurnType::Forward => self.origin,
            TurnType::Left => self.origin.anticlockwise(),
            TurnType::Right => self.origin.clockwise(),
        }
    }

    /// Whether the vehicle has driven far enough past the canvas edge on its
    /// exit road that no part of it is visible.
    pub fn is_off_canvas(&self, geom: &JunctionGeometry) -> bool {
        let h = self.height;
        match self.exit_direction() {
            Direction::North => self.pos.y < -h,
            Direction::South => self.pos.y > geom.canvas_height + h,
            Direction::East => self.pos.x > geom.canvas_width + h,
            Direction::West => self.pos.x < -h,
        }
    }

    /// The position along the current axis of travel.
    pub(crate) fn axis_pos(&self) -> f64 {
        axis_coord(self.pos, self.direction)
    }

    /// Sets the position along the current axis of travel.
    pub(crate) fn set_axis_pos(&mut self, value: f64) {
        set_axis_coord(&mut self.pos, self.direction, value);
    }

    pub(crate) fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    /// Marks the stop line as crossed. Never reverts.
    pub(crate) fn mark_crossed(&mut self) {
        self.crossed_stop_line = true;
    }

    /// Marks the wait as recorded, returning `false` if it already was.
    pub(crate) fn take_wait(&mut self) -> bool {
        !std::mem::replace(&mut self.wait_recorded, true)
    }

    /// Serializes the vehicle for the state sink.
    pub fn snapshot(&self) -> VehicleSnapshot {
        VehicleSnapshot {
            direction: self.direction,
            lane: self.lane,
            speed: self.speed,
            turn_type: self.turn,
            x: self.pos.x,
            y: self.pos.y,
            current_right_turn_angle: self.heading,
            sprite_index: self.sprite_index,
            width: self.width,
            height: self.height,
        }
    }

    #[cfg(test)]
    pub(crate) fn place(&mut self, pos: Point2d) {
        self.pos = pos;
    }

    fn translate(&mut self, delta: Vector2d) {
        self.pos += delta;
    }
}

/// The coordinate of `pos` along the axis `dir` travels on.
pub(crate) fn axis_coord(pos: Point2d, dir: Direction) -> f64 {
    match dir {
        Direction::North | Direction::South => pos.y,
        Direction::East | Direction::West => pos.x,
    }
}

fn set_axis_coord(pos: &mut Point2d, dir: Direction, value: f64) {
    match dir {
        Direction::North | Direction::South => pos.y = value,
        Direction::East | Direction::West => pos.x = value,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::{compute_geometry, DEFAULT_LANE_WIDTH};
    use assert_approx_eq::assert_approx_eq;

    fn attrs(direction: Direction, turn: TurnType, lane: usize) -> VehicleAttributes {
        VehicleAttributes {
            direction,
            turn,
            lane,
            speed: 2.0,
            spawn_time: 0.0,
            sprite_index: 0,
        }
    }

    #[test]
    fn turning_vehicles_are_assigned_fixed_lanes() {
        let geom = compute_geometry(800.0, 800.0, 3, DEFAULT_LANE_WIDTH);
        for dir in Direction::ALL {
            let left = Vehicle::new(&attrs(dir, TurnType::Left, 2), &geom).unwrap();
            assert_eq!(left.lane(), 0);
            let right = Vehicle::new(&attrs(dir, TurnType::Right, 0), &geom).unwrap();
            assert_eq!(right.lane(), 2);
        }
    }

    #[test]
    fn rejects_missing_lanes() {
        let geom = compute_geometry(800.0, 800.0, 2, DEFAULT_LANE_WIDTH);
        let err = Vehicle::new(&attrs(Direction::North, TurnType::Forward, 2), &geom);
        assert!(matches!(
            err,
            Err(SimError::LaneOutOfRange { lane: 2, lanes: 2 })
        ));

        let empty = compute_geometry(800.0, 800.0, 0, DEFAULT_LANE_WIDTH);
        let err = Vehicle::new(&attrs(Direction::North, TurnType::Left, 0), &empty);
        assert!(matches!(err, Err(SimError::InvalidLaneCount(0))));
    }

    #[test]
    fn spawns_just_off_canvas() {
        let geom = compute_geometry(800.0, 600.0, 2, DEFAULT_LANE_WIDTH);
        let north = Vehicle::new(&attrs(Direction::North, TurnType::Forward, 1), &geom).unwrap();
        assert_approx_eq!(north.position().x, geom.left() + 30.0);
        assert_approx_eq!(north.position().y, 600.0 + geom.car_height);
        assert_approx_eq!(north.heading(), 0.0);

        let west = Vehicle::new(&attrs(Direction::West, TurnType::Forward, 0), &geom).unwrap();
        assert_approx_eq!(west.position().x, 800.0 + geom.car_width);
        assert_approx_eq!(west.position().y, geom.bottom() - 10.0);
        assert!(!west.is_off_canvas(&geom));
    }

    #[test]
    fn wait_is_taken_once() {
        let geom = compute_geometry(800.0, 600.0, 1, DEFAULT_LANE_WIDTH);
        let mut veh = Vehicle::new(&attrs(Direction::East, TurnType::Forward, 0), &geom).unwrap();
        assert!(veh.take_wait());
        assert!(!veh.take_wait());
        assert!(veh.wait_recorded());
    }

    #[test]
    fn exit_uses_final_road() {
        let geom = compute_geometry(800.0, 600.0, 1, DEFAULT_LANE_WIDTH);
        let mut veh = Vehicle::new(&attrs(Direction::North, TurnType::Right, 0), &geom).unwrap();
        veh.pos = Point2d::new(-100.0, -100.0);
        assert!(!veh.is_off_canvas(&geom));
        veh.pos = Point2d::new(800.0 + geom.car_height + 1.0, 300.0);
        assert!(veh.is_off_canvas(&geom));
    }
}
