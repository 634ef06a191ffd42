//! Trust Model Engine
//!
//! The `TrustModel` trait every algorithm implements, and the per-client
//! decision cycle that drives it.

pub mod engine;

pub use engine::{run_client, ClientPhase, ClientReport};

use rand::RngCore;
use std::fmt;

use trm_events::{Outcome, Satisfaction, Service};

use crate::energy::EnergyLedger;
use crate::error::Result;
use crate::iteration::Convergence;
use crate::topology::{Network, Path, SensorId};
use crate::transaction;

/// Snapshot of what a client learned before deciding.
#[derive(Debug, Clone)]
pub struct GatheredInformation<X> {
    pub client: SensorId,
    pub service: Service,
    /// Paths from the client to every reachable candidate server
    pub paths: Vec<Path>,
    /// Model-specific extras
    pub extra: X,
}

impl<X> GatheredInformation<X> {
    pub fn new(client: SensorId, service: Service, paths: Vec<Path>, extra: X) -> Self {
        Self {
            client,
            service,
            paths,
            extra,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// The path a model chose and the score that won.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub path: Path,
    pub score: f64,
}

impl Selection {
    pub fn new(path: Path, score: f64) -> Self {
        Self { path, score }
    }

    pub fn server(&self) -> SensorId {
        self.path.target()
    }
}

/// A trust and reputation model.
///
/// Every method takes the network by shared reference: concurrent clients
/// write per-sensor state only through sensor locks.
pub trait TrustModel: Send + Sync {
    /// Per-sensor extension state
    type State: Default + Clone + Send + fmt::Debug;
    /// Extra gathered information
    type Extra: Send;

    fn name(&self) -> &'static str;

    fn window_size(&self) -> usize;

    /// Name of the model's privileged role, if it has one.
    fn privileged_role(&self) -> Option<&'static str> {
        None
    }

    /// Prepares a fresh network for a run: resets per-sensor state and seeds
    /// privileged sensors.
    fn initialize(
        &self,
        network: &mut Network<Self::State>,
        service: &Service,
        rng: &mut dyn RngCore,
    ) -> Result<()>;

    fn gather_information(
        &self,
        network: &Network<Self::State>,
        client: SensorId,
        service: &Service,
        ledger: &mut EnergyLedger,
    ) -> Result<GatheredInformation<Self::Extra>>;

    /// Picks a path from the gathered candidates, or `None` when no
    /// trustworthy server is reachable.
    fn score_and_rank(
        &self,
        network: &Network<Self::State>,
        info: &GatheredInformation<Self::Extra>,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Selection>>;

    /// Satisfaction of being served with `goodness`.
    fn satisfaction(&self, goodness: f64) -> Satisfaction {
        Satisfaction::from_goodness(goodness)
    }

    fn perform_transaction(
        &self,
        network: &Network<Self::State>,
        selection: Option<&Selection>,
        service: &Service,
        ledger: &mut EnergyLedger,
    ) -> Result<Option<Outcome>> {
        transaction::perform_transaction(
            network,
            selection.map(|s| &s.path),
            service,
            |g| self.satisfaction(g),
            ledger,
        )
    }

    fn reward(
        &self,
        _network: &Network<Self::State>,
        _info: &GatheredInformation<Self::Extra>,
        _selection: &Selection,
        outcome: Outcome,
    ) -> Result<Outcome> {
        Ok(outcome)
    }

    fn punish(
        &self,
        _network: &Network<Self::State>,
        _info: &GatheredInformation<Self::Extra>,
        _selection: &Selection,
        outcome: Outcome,
    ) -> Result<Outcome> {
        Ok(outcome)
    }

    /// Takes the non-convergence reports collected since the last call.
    fn drain_warnings(&self) -> Vec<Convergence> {
        Vec::new()
    }
}
