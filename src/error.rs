//! Errors raised by the simulation.

use thiserror::Error;

/// A specialised result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;

/// An error raised by the simulation.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("unknown direction `{0}`")]
    UnknownDirection(String),
    #[error("unknown turn type `{0}`")]
    UnknownTurnType(String),
    #[error("a junction needs at least one lane per approach, got {0}")]
    InvalidLaneCount(usize),
    #[error("lane {lane} does not exist on a junction with {lanes} lanes")]
    LaneOutOfRange { lane: usize, lanes: usize },
    #[error("no viewport has been reported yet")]
    GeometryUnavailable,
    #[error("no simulation is running")]
    NotRunning,
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scenario: {0}")]
    Json(#[from] serde_json::Error),
}
