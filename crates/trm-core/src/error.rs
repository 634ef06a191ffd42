//! Error Types
//!
//! Structural errors raised while building, loading or walking a network.
//! Exhaustion (no trustworthy server) and non-convergence are reported as
//! data, not as errors.

use thiserror::Error;

use crate::topology::SensorId;

#[derive(Debug, Error)]
pub enum TrmError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed network document: {0}")]
    Xml(String),

    #[error("sensor {sensor} references undefined sensor {neighbor}")]
    UndefinedSensor { sensor: SensorId, neighbor: SensorId },

    #[error("sensor {0} is linked to itself")]
    SelfLink(SensorId),

    #[error("sensor {0} is defined more than once")]
    DuplicateSensor(SensorId),

    #[error("sensor {sensor} lists neighbor {neighbor} as {declared} but it is a {actual}")]
    NeighborTypeMismatch {
        sensor: SensorId,
        neighbor: SensorId,
        declared: String,
        actual: String,
    },

    #[error("unknown sensor {0}")]
    UnknownSensor(SensorId),

    #[error("invalid path: {0}")]
    InvalidPath(String),
}

pub type Result<T> = std::result::Result<T, TrmError>;
