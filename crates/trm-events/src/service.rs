//! Service Types
//!
//! Services requested by clients and offered by servers.
//!
//! Every server offers the `Relay` pseudo-service. A server whose only
//! offering is `Relay` exists purely to extend connectivity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifier of the relay pseudo-service.
pub const RELAY_SERVICE_ID: u32 = 0;

/// Name of the relay pseudo-service.
pub const RELAY_SERVICE_NAME: &str = "Relay";

/// Goodness at or above which a server is benevolent for a service.
pub const BENEVOLENCE_THRESHOLD: f64 = 0.5;

/// A service identity. Equality and hashing use the id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: u32,
    pub name: String,
}

impl Service {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// The relay pseudo-service offered by every server.
    pub fn relay() -> Self {
        Self::new(RELAY_SERVICE_ID, RELAY_SERVICE_NAME)
    }

    pub fn is_relay(&self) -> bool {
        self.id == RELAY_SERVICE_ID
    }
}

impl PartialEq for Service {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Service {}

impl Hash for Service {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.name, self.id)
    }
}

/// A service offered by a server together with how well it is served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferedService {
    pub service: Service,
    /// Intrinsic quality in [0, 1]
    pub goodness: f64,
}

impl OfferedService {
    /// Creates an offering, clamping goodness into [0, 1].
    pub fn new(service: Service, goodness: f64) -> Self {
        Self {
            service,
            goodness: goodness.clamp(0.0, 1.0),
        }
    }

    pub fn relay() -> Self {
        Self::new(Service::relay(), 1.0)
    }

    pub fn is_benevolent(&self) -> bool {
        self.goodness >= BENEVOLENCE_THRESHOLD
    }
}
