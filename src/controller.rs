use crate::broadcast::{encode, StateSink};
use crate::direction::{Axis, Direction};
use crate::light::{Lamp, MainLight, SignalGroup, SignalState};
use std::sync::Arc;

/// Owns the lights of the junction and publishes them to a [StateSink].
///
/// Every published state has the pedestrian safety override applied.
#[derive(Default)]
pub struct SignalController {
    state: SignalState,
    sink: Option<Arc<dyn StateSink>>,
    broadcasts: usize,
}

impl SignalController {
    /// Creates a controller with every light red and no sink.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(sink: Arc<dyn StateSink>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::default()
        }
    }

    pub fn set_sink(&mut self, sink: Option<Arc<dyn StateSink>>) {
        self.sink = sink;
    }

    /// Gets the current light state.
    pub fn state(&self) -> &SignalState {
        &self.state
    }

    /// The number of broadcasts since the controller was created or reset.
    pub fn broadcasts(&self) -> usize {
        self.broadcasts
    }

    /// Replaces the lights facing one approach.
    pub fn set_state(&mut self, dir: Direction, group: SignalGroup) {
        *self.state.group_mut(dir) = group;
    }

    /// Sets the main lights for both approaches on an axis.
    pub fn set_axis_main(&mut self, axis: Axis, light: MainLight) {
        for dir in axis.directions() {
            self.state.group_mut(dir).main = light;
        }
    }

    /// Sets the right-turn arrows for both approaches on an axis.
    pub fn set_axis_arrows(&mut self, axis: Axis, lamp: Lamp) {
        for dir in axis.directions() {
            self.state.group_mut(dir).right_turn = lamp;
        }
    }

    pub fn set_pedestrian(&mut self, dir: Direction, lamp: Lamp) {
        self.state.group_mut(dir).pedestrian = lamp;
    }

    /// Turns every main light red and every arrow off, leaving pedestrian lights.
    pub fn set_all_red(&mut self) {
        for dir in Direction::ALL {
            let group = self.state.group_mut(dir);
            group.main = MainLight::Red;
            group.right_turn = Lamp::Off;
        }
    }

    pub fn apply_safety_override(&mut self) {
        if self.state.apply_safety_override() {
            log::debug!("Pedestrian override forced all vehicle lights red");
        }
    }

    /// Applies the safety override and publishes the state to the sink, if any.
    pub fn broadcast(&mut self) {
        self.apply_safety_override();
        self.broadcasts += 1;
        let Some(sink) = &self.sink else {
            return;
        };
        if let Some(message) = encode(&self.state.snapshot()) {
            sink.publish(&message);
        }
    }

    /// Returns every light to its initial state. The sink is kept.
    pub fn reset(&mut self) {
        self.state = SignalState::default();
        self.broadcasts = 0;
    }
}
