use crate::direction::{Axis, Direction, DirectionMap, TurnType};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// The state of a main traffic light.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MainLight {
    #[default]
    Red,
    RedAmber,
    Green,
    Amber,
}

/// The state of a single-lamp signal: a right-turn arrow or a pedestrian light.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Lamp {
    #[default]
    Off,
    On,
}

/// The lights facing one approach.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SignalGroup {
    pub main: MainLight,
    pub right_turn: Lamp,
    pub pedestrian: Lamp,
}

/// The lights of the whole junction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SignalState {
    groups: DirectionMap<SignalGroup>,
}

/// The serialized form of [SignalState].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalSnapshot {
    pub traffic_light_states: DirectionMap<MainLight>,
    pub right_turn_light_states: DirectionMap<Lamp>,
    pub pedestrian_light_states: DirectionMap<Lamp>,
}

impl MainLight {
    /// The lit lamps as `(red, amber, green)`.
    pub fn lamps(self) -> (bool, bool, bool) {
        match self {
            MainLight::Red => (true, false, false),
            MainLight::RedAmber => (true, true, false),
            MainLight::Green => (false, false, true),
            MainLight::Amber => (false, true, false),
        }
    }
}

impl Lamp {
    pub fn is_on(self) -> bool {
        self == Lamp::On
    }
}

impl From<bool> for Lamp {
    fn from(on: bool) -> Self {
        if on {
            Lamp::On
        } else {
            Lamp::Off
        }
    }
}

impl Serialize for MainLight {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (red, amber, green) = self.lamps();
        let mut state = serializer.serialize_struct("MainLight", 3)?;
        state.serialize_field("red", &red)?;
        state.serialize_field("amber", &amber)?;
        state.serialize_field("green", &green)?;
        state.end()
    }
}

impl Serialize for Lamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Lamp", 2)?;
        state.serialize_field("off", &!self.is_on())?;
        state.serialize_field("on", &self.is_on())?;
        state.end()
    }
}

impl SignalState {
    /// Gets the lights facing one approach.
    pub fn group(&self, dir: Direction) -> &SignalGroup {
        &self.groups[dir]
    }

    pub(crate) fn group_mut(&mut self, dir: Direction) -> &mut SignalGroup {
        &mut self.groups[dir]
    }

    pub fn main(&self, dir: Direction) -> MainLight {
        self.groups[dir].main
    }

    pub fn right_turn(&self, dir: Direction) -> Lamp {
        self.groups[dir].right_turn
    }

    pub fn pedestrian(&self, dir: Direction) -> Lamp {
        self.groups[dir].pedestrian
    }

    /// Whether a vehicle travelling `dir` with the given intent may cross its stop line.
    pub fn permits(&self, dir: Direction, turn: TurnType) -> bool {
        match turn {
            TurnType::Right => self.right_turn(dir).is_on(),
            TurnType::Forward | TurnType::Left => self.main(dir) == MainLight::Green,
        }
    }

    pub fn any_pedestrian_on(&self) -> bool {
        self.groups.iter().any(|(_, group)| group.pedestrian.is_on())
    }

    /// Whether either right-turn arrow on an axis is lit.
    pub fn any_arrow_on(&self, axis: Axis) -> bool {
        axis.directions()
            .iter()
            .any(|&dir| self.right_turn(dir).is_on())
    }

    /// Whether the state is one that may be shown to road users: no main light
    /// or arrow may be lit while pedestrians are crossing.
    pub fn is_safe(&self) -> bool {
        !self.any_pedestrian_on()
            || self
                .groups
                .iter()
                .all(|(_, g)| g.main == MainLight::Red && g.right_turn == Lamp::Off)
    }

    /// Forces every main light red and every arrow off while any pedestrian
    /// light is on. Returns whether anything changed.
    pub fn apply_safety_override(&mut self) -> bool {
        if !self.any_pedestrian_on() {
            return false;
        }
        let mut changed = false;
        for group in self.groups.values_mut() {
            changed |= group.main != MainLight::Red || group.right_turn != Lamp::Off;
            group.main = MainLight::Red;
            group.right_turn = Lamp::Off;
        }
        changed
    }

    pub fn snapshot(&self) -> SignalSnapshot {
        SignalSnapshot {
            traffic_light_states: DirectionMap::from_fn(|dir| self.main(dir)),
            right_turn_light_states: DirectionMap::from_fn(|dir| self.right_turn(dir)),
            pedestrian_light_states: DirectionMap::from_fn(|dir| self.pedestrian(dir)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn initial_state_is_all_red() {
        let state = SignalState::default();
        for dir in Direction::ALL {
            assert_eq!(state.main(dir), MainLight::Red);
            assert_eq!(state.right_turn(dir), Lamp::Off);
            assert_eq!(state.pedestrian(dir), Lamp::Off);
        }
        assert!(state.is_safe());
    }

    #[test]
    fn permits_by_turn() {
        let mut state = SignalState::default();
        state.group_mut(Direction::North).main = MainLight::Green;
        state.group_mut(Direction::South).right_turn = Lamp::On;
        assert!(state.permits(Direction::North, TurnType::Forward));
        assert!(state.permits(Direction::North, TurnType::Left));
        assert!(!state.permits(Direction::North, TurnType::Right));
        assert!(state.permits(Direction::South, TurnType::Right));
        assert!(!state.permits(Direction::South, TurnType::Forward));
        assert!(state.any_arrow_on(Axis::Vertical));
        assert!(!state.any_arrow_on(Axis::Horizontal));
    }

    #[test]
    fn safety_override_is_idempotent() {
        let mut state = SignalState::default();
        state.group_mut(Direction::East).main = MainLight::Green;
        state.group_mut(Direction::West).right_turn = Lamp::On;
        assert!(!state.apply_safety_override());
        assert_eq!(state.main(Direction::East), MainLight::Green);

        state.group_mut(Direction::North).pedestrian = Lamp::On;
        assert!(!state.is_safe());
        assert!(state.apply_safety_override());
        assert!(state.is_safe());
        let once = state;
        assert!(!state.apply_safety_override());
        assert_eq!(state, once);
        assert_eq!(state.main(Direction::East), MainLight::Red);
        assert_eq!(state.right_turn(Direction::West), Lamp::Off);
    }

    #[test]
    fn snapshot_uses_lamp_maps() {
        let mut state = SignalState::default();
        state.group_mut(Direction::North).main = MainLight::RedAmber;
        state.group_mut(Direction::East).right_turn = Lamp::On;
        let json = serde_json::to_value(state.snapshot()).unwrap();
        assert_eq!(
            json["trafficLightStates"]["north"],
            serde_json::json!({"red": true, "amber": true, "green": false})
        );
        assert_eq!(
            json["rightTurnLightStates"]["east"],
            serde_json::json!({"off": false, "on": true})
        );
        assert_eq!(
            json["pedestrianLightStates"]["west"],
            serde_json::json!({"off": true, "on": false})
        );
    }
}
