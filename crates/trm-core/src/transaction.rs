//! Transactions
//!
//! A transaction records a client being served by a server. Every sensor
//! keeps the most recent ones in two bounded windows: the transactions it
//! requested and the transactions it served.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use trm_events::{Outcome, Satisfaction, Service};

use crate::collusion;
use crate::energy::EnergyLedger;
use crate::error::{Result, TrmError};
use crate::topology::{Network, Path, SensorId};

/// Window size used when a model does not configure one.
pub const DEFAULT_WINDOW_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub client: SensorId,
    pub server: SensorId,
    pub outcome: Outcome,
    /// Satisfaction the client reports about the server, in [0, 1]
    pub feedback: f64,
}

impl Transaction {
    pub fn is_satisfied(&self) -> bool {
        self.outcome.is_satisfied()
    }
}

/// Sliding window over the most recent transactions.
#[derive(Debug, Clone)]
pub struct TransactionWindow {
    capacity: usize,
    entries: VecDeque<Transaction>,
}

impl Default for TransactionWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

impl TransactionWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends a transaction, evicting the oldest when full.
    pub fn push(&mut self, transaction: Transaction) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(transaction);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Transactions served by `server`.
    pub fn with_server(&self, server: SensorId) -> impl Iterator<Item = &Transaction> {
        self.entries.iter().filter(move |t| t.server == server)
    }

    /// Transactions requested by `client`.
    pub fn with_client(&self, client: SensorId) -> impl Iterator<Item = &Transaction> {
        self.entries.iter().filter(move |t| t.client == client)
    }

    pub fn mean_feedback(&self) -> Option<f64> {
        if self.entries.is_empty() {
            return None;
        }
        Some(self.entries.iter().map(|t| t.feedback).sum::<f64>() / self.entries.len() as f64)
    }

    pub fn to_vec(&self) -> Vec<Transaction> {
        self.entries.iter().cloned().collect()
    }
}

/// Requests `service` along `path` and records the result.
///
/// Returns `Ok(None)` when there is no path. Otherwise charges the round trip,
/// derives satisfaction from the server's goodness, and appends the
/// transaction to the client's and the server's windows.
pub fn perform_transaction<S, F>(
    network: &Network<S>,
    path: Option<&Path>,
    service: &Service,
    satisfaction: F,
    ledger: &mut EnergyLedger,
) -> Result<Option<Outcome>>
where
    F: Fn(f64) -> Satisfaction,
{
    let Some(path) = path else {
        return Ok(None);
    };
    network.validate_path(path)?;

    let client = path.source();
    let server = path.target();
    let goodness = network.get(server)?.goodness(service).ok_or_else(|| {
        TrmError::InvalidPath(format!("sensor {} does not offer {}", server, service))
    })?;

    ledger.charge_round_trip(network, path)?;

    let satisfaction = satisfaction(goodness);
    let feedback =
        collusion::reported_opinion(network, client, server, service, satisfaction.value());
    let outcome =
        Outcome::single(satisfaction, path.hops()).with_energy(ledger.report(network, service));

    let transaction = Transaction {
        client,
        server,
        outcome: outcome.clone(),
        feedback,
    };
    network.get(client)?.lock().given.push(transaction.clone());
    network.get(server)?.lock().received.push(transaction);

    Ok(Some(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Position;
    use crate::topology::Sensor;
    use trm_events::OfferedService;

    fn temperature() -> Service {
        Service::new(1, "Temperature")
    }

    fn transaction(server: SensorId, feedback: f64) -> Transaction {
        Transaction {
            client: 1,
            server,
            outcome: Outcome::single(Satisfaction::binary(feedback >= 0.5), 1),
            feedback,
        }
    }

    fn network() -> Network<()> {
        let mut net = Network::new(10.0);
        net.add_sensor(Sensor::new(1, Position::new(0.0, 0.0)).with_client(true))
            .unwrap();
        net.add_sensor(
            Sensor::new(2, Position::new(0.0, 2.0))
                .with_service(OfferedService::relay())
                .with_service(OfferedService::new(temperature(), 0.8)),
        )
        .unwrap();
        net.link(1, 2).unwrap();
        net
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut window = TransactionWindow::new(2);
        window.push(transaction(2, 1.0));
        window.push(transaction(3, 0.0));
        window.push(transaction(4, 0.5));

        assert_eq!(window.len(), 2);
        let servers: Vec<_> = window.iter().map(|t| t.server).collect();
        assert_eq!(servers, vec![3, 4]);
        assert_eq!(window.mean_feedback(), Some(0.25));
        assert_eq!(window.with_server(4).count(), 1);
    }

    #[test]
    fn test_zero_capacity_window_stays_empty() {
        let mut window = TransactionWindow::new(0);
        window.push(transaction(2, 1.0));
        assert!(window.is_empty());
        assert_eq!(window.mean_feedback(), None);
    }

    #[test]
    fn test_no_path_means_no_outcome() {
        let net = network();
        let mut ledger = EnergyLedger::new(1);
        let satisfaction = Satisfaction::from_goodness;
        let outcome =
            perform_transaction(&net, None, &temperature(), satisfaction, &mut ledger).unwrap();
        assert!(outcome.is_none());
        assert_eq!(ledger.total(), 0.0);
    }

    #[test]
    fn test_transaction_recorded_on_both_sides() {
        let net = network();
        let mut ledger = EnergyLedger::new(1);
        let path = Path::from_sensors(vec![1, 2]).unwrap();

        let satisfaction = Satisfaction::from_goodness;
        let outcome =
            perform_transaction(&net, Some(&path), &temperature(), satisfaction, &mut ledger)
                .unwrap()
                .unwrap();

        assert!(outcome.is_satisfied());
        assert_eq!(outcome.avg_path_length, 1.0);
        assert_eq!(outcome.energy.unwrap().client.mean, 2.0);

        let given = net.sensor(1).unwrap().lock().given.to_vec();
        let received = net.sensor(2).unwrap().lock().received.to_vec();
        assert_eq!(given.len(), 1);
        assert_eq!(received, given);
        assert_eq!(given[0].feedback, 1.0);
    }

    #[test]
    fn test_target_must_offer_service() {
        let net = network();
        let mut ledger = EnergyLedger::new(2);
        let path = Path::from_sensors(vec![2, 1]).unwrap();
        let satisfaction = Satisfaction::from_goodness;
        let err =
            perform_transaction(&net, Some(&path), &temperature(), satisfaction, &mut ledger)
                .unwrap_err();
        assert!(matches!(err, TrmError::InvalidPath(_)));
    }
}
