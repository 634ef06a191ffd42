//! Shared value types for the trust model simulator.
//!
//! This crate contains pure data structures with no simulation logic beyond
//! aggregation laws. It is a dependency for all other crates in the
//! workspace.

pub mod event;
pub mod fuzzy;
pub mod outcome;
pub mod satisfaction;
pub mod service;
pub mod snapshot;

pub use event::SimulationEvent;
pub use fuzzy::{GaussianTerm, Memberships, TrustLevel, TrustVariable};
pub use outcome::{compute_outcomes, EnergyReport, Outcome, Role, RoleEnergy};
pub use satisfaction::Satisfaction;
pub use service::{
    OfferedService, Service, BENEVOLENCE_THRESHOLD, RELAY_SERVICE_ID, RELAY_SERVICE_NAME,
};
pub use snapshot::{NetworkSnapshot, SensorSnapshot};
