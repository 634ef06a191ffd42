//! Energy Ledger
//!
//! Charges transmitted distance during one client decision cycle. Every hop
//! adds its Euclidean length to the sender's counter and to the ledger, which
//! then reports the mean spent per role.

use std::collections::BTreeMap;

use trm_events::{EnergyReport, Role, RoleEnergy, Service};

use crate::error::Result;
use crate::topology::{Network, Path, SensorId};

#[derive(Debug, Clone)]
pub struct EnergyLedger {
    requester: SensorId,
    spent: BTreeMap<SensorId, f64>,
}

impl EnergyLedger {
    pub fn new(requester: SensorId) -> Self {
        Self {
            requester,
            spent: BTreeMap::new(),
        }
    }

    pub fn requester(&self) -> SensorId {
        self.requester
    }

    /// Charges one transmission from `from` to `to`.
    pub fn charge_hop<S>(
        &mut self,
        network: &Network<S>,
        from: SensorId,
        to: SensorId,
    ) -> Result<f64> {
        let distance = network.distance(from, to)?;
        network.get(from)?.add_transmitted(distance);
        *self.spent.entry(from).or_insert(0.0) += distance;
        Ok(distance)
    }

    /// Charges a message travelling from source to target.
    pub fn charge_path<S>(&mut self, network: &Network<S>, path: &Path) -> Result<f64> {
        let mut total = 0.0;
        for (from, to) in path.hop_pairs() {
            total += self.charge_hop(network, from, to)?;
        }
        Ok(total)
    }

    /// Charges a request along `path` and the response back.
    pub fn charge_round_trip<S>(&mut self, network: &Network<S>, path: &Path) -> Result<f64> {
        let mut total = self.charge_path(network, path)?;
        let sensors = path.sensors();
        for pair in sensors.windows(2).rev() {
            total += self.charge_hop(network, pair[1], pair[0])?;
        }
        Ok(total)
    }

    pub fn spent_by(&self, id: SensorId) -> f64 {
        self.spent.get(&id).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.spent.values().sum()
    }

    /// Mean distance spent per transmitting sensor, grouped by role. The
    /// requester always counts as a client; roles nobody transmitted for
    /// keep the empty sentinel.
    pub fn report<S>(&self, network: &Network<S>, service: &Service) -> EnergyReport {
        let mut grouped: BTreeMap<Role, (f64, u32)> = BTreeMap::new();
        for (&id, &distance) in &self.spent {
            let role = if id == self.requester {
                Role::Client
            } else {
                network.role_of(id, service)
            };
            let entry = grouped.entry(role).or_insert((0.0, 0));
            entry.0 += distance;
            entry.1 += 1;
        }

        let mut report = EnergyReport::default();
        for (role, (sum, count)) in grouped {
            report.set(role, RoleEnergy::new(sum / count as f64, count));
        }
        report
    }
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

    fn network() -> Network<()> {
        let mut net = Network::new(10.0);
        net.add_sensor(Sensor::new(1, Position::new(0.0, 0.0)).with_client(true))
            .unwrap();
        net.add_sensor(
            Sensor::new(2, Position::new(3.0, 4.0)).with_service(OfferedService::relay()),
        )
        .unwrap();
        net.add_sensor(
            Sensor::new(3, Position::new(3.0, 8.0))
                .with_service(OfferedService::relay())
                .with_service(OfferedService::new(temperature(), 1.0)),
        )
        .unwrap();
        net.link(1, 2).unwrap();
        net.link(2, 3).unwrap();
        net
    }

    #[test]
    fn test_round_trip_charges_both_directions() {
        let net = network();
        let mut ledger = EnergyLedger::new(1);
        let path = Path::from_sensors(vec![1, 2, 3]).unwrap();

        let total = ledger.charge_round_trip(&net, &path).unwrap();
        assert!((total - 18.0).abs() < 1e-12);
        assert_eq!(ledger.spent_by(1), 5.0);
        assert_eq!(ledger.spent_by(2), 9.0);
        assert_eq!(ledger.spent_by(3), 4.0);
        assert_eq!(net.sensor(2).unwrap().transmitted_distance(), 9.0);
    }

    #[test]
    fn test_report_groups_by_role() {
        let net = network();
        let mut ledger = EnergyLedger::new(1);
        ledger
            .charge_round_trip(&net, &Path::from_sensors(vec![1, 2, 3]).unwrap())
            .unwrap();

        let report = ledger.report(&net, &temperature());
        assert_eq!(report.client, RoleEnergy::new(5.0, 1));
        assert_eq!(report.relay, RoleEnergy::new(9.0, 1));
        assert_eq!(report.benevolent, RoleEnergy::new(4.0, 1));
        assert!(report.malicious.is_sentinel());
        assert!(report.privileged.is_sentinel());
    }

    #[test]
    fn test_unknown_sensor_is_an_error() {
        let net = network();
        let mut ledger = EnergyLedger::new(1);
        assert!(ledger.charge_hop(&net, 1, 99).is_err());
        assert_eq!(ledger.total(), 0.0);
    }
}
