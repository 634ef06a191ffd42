//! Client Decision Cycle
//!
//! Idle -> Gathering -> Scoring -> Transacting -> Rewarding | Punishing -> Idle.
//! A client that finds no trustworthy server ends the cycle with no outcome.

use rand::RngCore;

use trm_events::{Outcome, Service};

use super::{Selection, TrustModel};
use crate::energy::EnergyLedger;
use crate::error::Result;
use crate::topology::{Network, SensorId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPhase {
    Idle,
    Gathering,
    Scoring,
    Transacting,
    Rewarding,
    Punishing,
}

/// Result of one client decision cycle.
#[derive(Debug, Clone)]
pub struct ClientReport {
    pub client: SensorId,
    /// Number of candidate paths gathered
    pub candidates: usize,
    pub selection: Option<Selection>,
    /// `None` when no trustworthy server was reachable
    pub outcome: Option<Outcome>,
}

fn enter(client: SensorId, phase: ClientPhase) {
    tracing::debug!("client {} -> {:?}", client, phase);
}

/// Runs one full decision cycle for `client`.
pub fn run_client<M: TrustModel>(
    model: &M,
    network: &Network<M::State>,
    client: SensorId,
    service: &Service,
    rng: &mut dyn RngCore,
) -> Result<ClientReport> {
    let mut ledger = EnergyLedger::new(client);

    enter(client, ClientPhase::Gathering);
    let info = model.gather_information(network, client, service, &mut ledger)?;
    tracing::debug!("client {} gathered {} paths", client, info.paths.len());

    enter(client, ClientPhase::Scoring);
    let selection = model.score_and_rank(network, &info, rng)?;

    enter(client, ClientPhase::Transacting);
    let outcome = model.perform_transaction(network, selection.as_ref(), service, &mut ledger)?;

    let outcome = match (&selection, outcome) {
        (Some(selection), Some(outcome)) => {
            if outcome.is_satisfied() {
                enter(client, ClientPhase::Rewarding);
                Some(model.reward(network, &info, selection, outcome)?)
            } else {
                enter(client, ClientPhase::Punishing);
                Some(model.punish(network, &info, selection, outcome)?)
            }
        }
        (_, outcome) => outcome,
    };

    if outcome.is_none() {
        tracing::debug!("client {} found no trustworthy server", client);
    }
    enter(client, ClientPhase::Idle);

    Ok(ClientReport {
        client,
        candidates: info.paths.len(),
        selection,
        outcome,
    })
}
