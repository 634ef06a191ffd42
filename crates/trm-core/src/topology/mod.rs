//! Geometry & Topology
//!
//! Sensors, the network arena that owns them, path search and the
//! generation and perturbation of random networks.

pub mod generation;
pub mod network;
pub mod path;
pub mod perturbation;
pub mod search;
pub mod sensor;

pub use generation::{GenerationConfig, ServiceProfile};
pub use network::{Network, NetworkFlags};
pub use path::Path;
pub use perturbation::OscillationReport;
pub use sensor::{Sensor, SensorId, SensorState};
