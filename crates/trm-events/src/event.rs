//! Progress Events
//!
//! Messages the simulation driver pushes to its progress sink: a network
//! snapshot, a textual status or an aggregated outcome.

use serde::{Deserialize, Serialize};

use crate::outcome::Outcome;
use crate::snapshot::NetworkSnapshot;

/// A progress notification emitted during a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimulationEvent {
    /// Network state after a round
    Network { round: u32, snapshot: NetworkSnapshot },
    /// Human-readable status text
    Status { message: String },
    /// Outcome of a round and the aggregate so far. `outcome` is `None` when
    /// no client reached a trustworthy server.
    Outcome {
        round: u32,
        outcome: Option<Outcome>,
        overall: Option<Outcome>,
    },
}

impl SimulationEvent {
    pub fn status(message: impl Into<String>) -> Self {
        SimulationEvent::Status {
            message: message.into(),
        }
    }

    /// Round the event refers to, if any.
    pub fn round(&self) -> Option<u32> {
        match self {
            SimulationEvent::Network { round, .. } | SimulationEvent::Outcome { round, .. } => {
                Some(*round)
            }
            SimulationEvent::Status { .. } => None,
        }
    }

    /// Serializes to a single JSON line.
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses a single JSON line.
    pub fn from_jsonl(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}
