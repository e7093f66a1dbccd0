//! Compass directions, turn intents and junction axes.

use crate::error::SimError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

/// A direction of travel. A vehicle "approaching from the south" travels `North`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

/// The manoeuvre a vehicle makes at the junction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnType {
    Forward,
    Left,
    Right,
}

/// One of the two road axes crossing at the junction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// North and south bound traffic.
    Vertical,
    /// East and west bound traffic.
    Horizontal,
}

impl Direction {
    /// All directions, in the order signals are swept during a pedestrian event.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// A dense index, used to key per-direction arrays.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The direction after a 90 degree clockwise rotation (a right turn).
    pub const fn clockwise(self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    /// The direction after a 90 degree anti-clockwise rotation (a left turn).
    pub const fn anticlockwise(self) -> Self {
        match self {
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
            Direction::East => Direction::North,
        }
    }

    /// The axis this direction travels along.
    pub const fn axis(self) -> Axis {
        match self {
            Direction::North | Direction::South => Axis::Vertical,
            Direction::East | Direction::West => Axis::Horizontal,
        }
    }

    /// The sign of motion along the travel axis in screen space (y grows downwards).
    pub const fn sign(self) -> f64 {
        match self {
            Direction::North | Direction::West => -1.0,
            Direction::South | Direction::East => 1.0,
        }
    }

    /// The heading angle in radians, measured clockwise from north.
    pub fn heading(self) -> f64 {
        use std::f64::consts::{FRAC_PI_2, PI};
        match self {
            Direction::North => 0.0,
            Direction::East => FRAC_PI_2,
            Direction::South => PI,
            Direction::West => -FRAC_PI_2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        }
    }
}

impl TurnType {
    pub const ALL: [TurnType; 3] = [TurnType::Left, TurnType::Forward, TurnType::Right];

    pub const fn as_str(self) -> &'static str {
        match self {
            TurnType::Forward => "forward",
            TurnType::Left => "left",
            TurnType::Right => "right",
        }
    }
}

impl Axis {
    /// The two directions of travel on this axis.
    pub const fn directions(self) -> [Direction; 2] {
        match self {
            Axis::Vertical => [Direction::North, Direction::South],
            Axis::Horizontal => [Direction::East, Direction::West],
        }
    }

    /// The perpendicular axis.
    pub const fn cross(self) -> Axis {
        match self {
            Axis::Vertical => Axis::Horizontal,
            Axis::Horizontal => Axis::Vertical,
        }
    }
}

/// A value for each of the four directions.
///
/// Serializes as a map keyed by direction name, in the order north, east,
/// south, west.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirectionMap<T>([T; 4]);

impl<T> DirectionMap<T> {
    pub fn from_fn(f: impl FnMut(Direction) -> T) -> Self {
        Self(Direction::ALL.map(f))
    }

    /// Iterates over the entries in compass order.
    pub fn iter(&self) -> impl Iterator<Item = (Direction, &T)> {
        Direction::ALL.into_iter().zip(self.0.iter())
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.0.iter_mut()
    }
}

impl<T> Index<Direction> for DirectionMap<T> {
    type Output = T;

    fn index(&self, dir: Direction) -> &T {
        &self.0[dir.index()]
    }
}

impl<T> IndexMut<Direction> for DirectionMap<T> {
    fn index_mut(&mut self, dir: Direction) -> &mut T {
        &mut self.0[dir.index()]
    }
}

impl<T: Serialize> Serialize for DirectionMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        for (dir, value) in self.iter() {
            map.serialize_entry(dir.as_str(), value)?;
        }
        map.end()
    }
}

impl FromStr for Direction {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "north" | "n" => Ok(Direction::North),
            "east" | "e" => Ok(Direction::East),
            "south" | "s" => Ok(Direction::South),
            "west" | "w" => Ok(Direction::West),
            _ => Err(SimError::UnknownDirection(s.to_string())),
        }
    }
}

impl FromStr for TurnType {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forward" | "straight" => Ok(TurnType::Forward),
            "left" => Ok(TurnType::Left),
            "right" => Ok(TurnType::Right),
            _ => Err(SimError::UnknownTurnType(s.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TurnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn four_rotations_return_home() {
        for dir in Direction::ALL {
            let mut cw = dir;
            let mut acw = dir;
            for _ in 0..4 {
                cw = cw.clockwise();
                acw = acw.anticlockwise();
            }
            assert_eq!(cw, dir);
            assert_eq!(acw, dir);
            assert_eq!(dir.clockwise().anticlockwise(), dir);
        }
    }

    #[test]
    fn left_turn_ordering() {
        assert_eq!(Direction::North.anticlockwise(), Direction::West);
        assert_eq!(Direction::West.anticlockwise(), Direction::South);
        assert_eq!(Direction::South.anticlockwise(), Direction::East);
        assert_eq!(Direction::East.anticlockwise(), Direction::North);
    }

    #[test]
    fn direction_map_serializes_in_compass_order() {
        let mut map = DirectionMap::from_fn(|dir| dir.index());
        map[Direction::West] = 7;
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"north":0,"east":1,"south":2,"west":7}"#);
    }

    #[test]
    fn parse_rejects_unknown_names() {
        assert_eq!("North".parse::<Direction>().unwrap(), Direction::North);
        assert_eq!("right".parse::<TurnType>().unwrap(), TurnType::Right);
        assert!(matches!(
            "up".parse::<Direction>(),
            Err(SimError::UnknownDirection(_))
        ));
        assert!(matches!(
            "u-turn".parse::<TurnType>(),
            Err(SimError::UnknownTurnType(_))
        ));
    }
}
