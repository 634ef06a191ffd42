//! Core simulation logic: topology, path search, trust models, persistence.

pub mod collusion;
pub mod conditions;
pub mod energy;
pub mod error;
pub mod geometry;
pub mod iteration;
pub mod model;
pub mod models;
pub mod params;
pub mod persistence;
pub mod topology;
pub mod transaction;

pub use conditions::SearchCondition;
pub use energy::EnergyLedger;
pub use error::{Result, TrmError};
pub use geometry::Position;
pub use iteration::{Convergence, IterationSettings, TrustMatrix};
pub use model::{run_client, ClientPhase, ClientReport, GatheredInformation, Selection, TrustModel};
pub use models::{
    EigenTrust, EigenTrustParams, PeerTrust, PeerTrustParams, PowerTrust, PowerTrustParams, Trip,
    TripParams,
};
pub use params::{load_params, parse_params};
pub use persistence::{from_xml, load_network, save_network, to_xml};
pub use topology::{
    GenerationConfig, Network, NetworkFlags, OscillationReport, Path, Sensor, SensorId,
    ServiceProfile,
};
pub use transaction::{Transaction, TransactionWindow};
