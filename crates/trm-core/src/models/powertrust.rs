//! PowerTrust
//!
//! Global reputation by power iteration over mean feedback, damped towards
//! the most reputable servers (power nodes). Reputation is recomputed after
//! every transaction and the power nodes are re-chosen from the result.

use parking_lot::Mutex;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use trm_events::{Outcome, Service};

use super::{charge_requests, privileged_count};
use crate::collusion;
use crate::conditions::OffersService;
use crate::energy::EnergyLedger;
use crate::error::Result;
use crate::iteration::{power_iterate, uniform, Convergence, IterationSettings, TrustMatrix};
use crate::model::{GatheredInformation, Selection, TrustModel};
use crate::topology::{Network, SensorId};
use crate::transaction::{self, DEFAULT_WINDOW_SIZE};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerTrustParams {
    #[serde(alias = "windowSize")]
    pub window_size: usize,
    pub epsilon: f64,
    /// Damping weight of the power-node prior
    pub alpha: f64,
    /// Fraction of sensors acting as power nodes
    #[serde(alias = "powerNodesPercentage")]
    pub power_nodes_percentage: f64,
    #[serde(alias = "maxIterations")]
    pub max_iterations: usize,
}

impl Default for PowerTrustParams {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            epsilon: 0.001,
            alpha: 0.15,
            power_nodes_percentage: 0.01,
            max_iterations: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerTrustState {
    pub reputation: f64,
}

#[derive(Debug, Default)]
pub struct PowerTrust {
    params: PowerTrustParams,
    /// Serializes reputation updates across concurrent clients
    update_lock: Mutex<()>,
    warnings: Mutex<Vec<Convergence>>,
}

impl PowerTrust {
    pub fn new(params: PowerTrustParams) -> Self {
        Self {
            params,
            update_lock: Mutex::new(()),
            warnings: Mutex::new(Vec::new()),
        }
    }

    pub fn params(&self) -> &PowerTrustParams {
        &self.params
    }

    pub fn reputations(network: &Network<PowerTrustState>) -> Vec<(SensorId, f64)> {
        network
            .sensors()
            .map(|s| (s.id, s.lock().ext.reputation))
            .collect()
    }

    /// Row-normalized mean feedback each sensor gave each server. Sensors
    /// that never rated anyone rate everyone uniformly.
    pub fn feedback_matrix(network: &Network<PowerTrustState>, service: &Service) -> TrustMatrix {
        let ids = network.ids();
        let mut matrix = TrustMatrix::new(ids.clone());
        let mut counts = TrustMatrix::new(ids.clone());

        for &i in &ids {
            if collusion::is_colluding(network, i, service) {
                for &j in &ids {
                    if j != i && collusion::is_malicious(network, j, service) {
                        matrix.set(i, j, 1.0);
                        counts.set(i, j, 1.0);
                    }
                }
                continue;
            }
            let Some(sensor) = network.sensor(i) else {
                continue;
            };
            let ratings: Vec<(SensorId, f64)> = sensor
                .lock()
                .given
                .iter()
                .map(|t| (t.server, t.feedback))
                .collect();
            for (server, feedback) in ratings {
                matrix.set(i, server, matrix.get(i, server) + feedback);
                counts.set(i, server, counts.get(i, server) + 1.0);
            }
        }

        for &i in &ids {
            for &j in &ids {
                let n = counts.get(i, j);
                if n > 0.0 {
                    matrix.set(i, j, matrix.get(i, j) / n);
                }
            }
        }
        matrix.normalize_rows(&uniform(ids.len()));
        matrix
    }

    /// Marks the `k` most reputable servers reachable from an active client
    /// as power nodes. Ties go to the lower id.
    pub fn select_power_nodes(&self, network: &Network<PowerTrustState>) -> Vec<SensorId> {
        let reachable = network.reachable_from(&network.active_clients());
        let mut servers: Vec<(SensorId, f64)> = network
            .servers()
            .filter(|s| s.active && reachable.contains(&s.id))
            .map(|s| (s.id, s.lock().ext.reputation))
            .collect();
        let k = privileged_count(self.params.power_nodes_percentage, network.len(), servers.len());
        servers.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let chosen: Vec<SensorId> = servers.iter().take(k).map(|(id, _)| *id).collect();
        for sensor in network.sensors() {
            sensor.set_privileged(chosen.contains(&sensor.id));
        }
        chosen
    }

    /// Recomputes every reputation and re-chooses the power nodes.
    pub fn update_reputations(
        &self,
        network: &Network<PowerTrustState>,
        service: &Service,
    ) -> Result<()> {
        let _guard = self.update_lock.lock();

        let matrix = Self::feedback_matrix(network, service);
        let flags: Vec<bool> = matrix
            .ids()
            .iter()
            .map(|&id| network.sensor(id).map_or(false, |s| s.is_privileged()))
            .collect();
        let power = flags.iter().filter(|&&p| p).count();
        let prior: Vec<f64> = if power == 0 {
            uniform(flags.len())
        } else {
            flags
                .iter()
                .map(|&p| if p { 1.0 / power as f64 } else { 0.0 })
                .collect()
        };
        let start: Vec<f64> = matrix
            .ids()
            .iter()
            .map(|&id| network.sensor(id).map_or(0.0, |s| s.lock().ext.reputation))
            .collect();

        let (reputation, convergence) = power_iterate(
            &matrix,
            &prior,
            &start,
            IterationSettings {
                alpha: self.params.alpha,
                epsilon: self.params.epsilon,
                max_iterations: self.params.max_iterations,
            },
            self.name(),
        );
        if !convergence.converged {
            self.warnings.lock().push(convergence);
        }

        for (idx, &id) in matrix.ids().iter().enumerate() {
            network.get(id)?.lock().ext.reputation = reputation[idx];
        }
        self.select_power_nodes(network);
        Ok(())
    }
}

impl TrustModel for PowerTrust {
    type State = PowerTrustState;
    type Extra = ();

    fn name(&self) -> &'static str {
        "PowerTrust"
    }

    fn window_size(&self) -> usize {
        self.params.window_size
    }

    fn privileged_role(&self) -> Option<&'static str> {
        Some("power-node")
    }

    fn initialize(
        &self,
        network: &mut Network<PowerTrustState>,
        _service: &Service,
        _rng: &mut dyn RngCore,
    ) -> Result<()> {
        network.reset_state(self.params.window_size);
        let initial = if network.is_empty() {
            0.0
        } else {
            1.0 / network.len() as f64
        };
        for sensor in network.sensors_mut() {
            sensor.state_mut().ext.reputation = initial;
        }
        let nodes = self.select_power_nodes(network);
        tracing::debug!("PowerTrust: {} power nodes", nodes.len());
        Ok(())
    }

    fn gather_information(
        &self,
        network: &Network<PowerTrustState>,
        client: SensorId,
        service: &Service,
        ledger: &mut EnergyLedger,
    ) -> Result<GatheredInformation<()>> {
        let paths = network.find_paths(client, &OffersService::new(service.clone()));
        charge_requests(network, ledger, &paths)?;
        Ok(GatheredInformation::new(client, service.clone(), paths, ()))
    }

    /// Most reputable reachable server; ties keep the first path found.
    fn score_and_rank(
        &self,
        network: &Network<PowerTrustState>,
        info: &GatheredInformation<()>,
        _rng: &mut dyn RngCore,
    ) -> Result<Option<Selection>> {
        let mut best: Option<Selection> = None;
        for path in &info.paths {
            let score = network.get(path.target())?.lock().ext.reputation;
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(Selection::new(path.clone(), score));
            }
        }
        Ok(best)
    }

    fn perform_transaction(
        &self,
        network: &Network<PowerTrustState>,
        selection: Option<&Selection>,
        service: &Service,
        ledger: &mut EnergyLedger,
    ) -> Result<Option<Outcome>> {
        let outcome = transaction::perform_transaction(
            network,
            selection.map(|s| &s.path),
            service,
            |g| self.satisfaction(g),
            ledger,
        )?;
        if outcome.is_some() {
            self.update_reputations(network, service)?;
        }
        Ok(outcome)
    }

    fn drain_warnings(&self) -> Vec<Convergence> {
        std::mem::take(&mut *self.warnings.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Position;
    use crate::topology::Sensor;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use trm_events::OfferedService;

    fn temperature() -> Service {
        Service::new(1, "Temperature")
    }

    /// Clients 1 and 2, benevolent server 3, malicious server 4.
    fn network() -> Network<PowerTrustState> {
        let mut net = Network::new(10.0);
        for id in 1..=2 {
            net.add_sensor(Sensor::new(id, Position::new(id as f64, 0.0)).with_client(true))
                .unwrap();
        }
        for (id, g) in [(3, 1.0), (4, 0.0)] {
            net.add_sensor(
                Sensor::new(id, Position::new(id as f64, 1.0))
                    .with_service(OfferedService::relay())
                    .with_service(OfferedService::new(temperature(), g)),
            )
            .unwrap();
        }
        net.set_neighbors(1.0);
        net
    }

    fn model() -> PowerTrust {
        PowerTrust::new(PowerTrustParams {
            power_nodes_percentage: 0.25,
            ..Default::default()
        })
    }

    #[test]
    fn test_initialize_spreads_reputation() {
        let mut net = network();
        let model = model();
        let mut rng = SmallRng::seed_from_u64(0);
        model.initialize(&mut net, &temperature(), &mut rng).unwrap();

        for (_, r) in PowerTrust::reputations(&net) {
            assert_eq!(r, 0.25);
        }
        // Equal reputations: lowest server id wins
        assert!(net.sensor(3).unwrap().is_privileged());
        assert!(!net.sensor(4).unwrap().is_privileged());
    }

    #[test]
    fn test_reputation_follows_feedback() {
        let mut net = network();
        let model = model();
        let mut rng = SmallRng::seed_from_u64(0);
        let service = temperature();
        model.initialize(&mut net, &service, &mut rng).unwrap();

        for (client, server) in [(1, 3), (2, 4), (1, 4), (2, 3)] {
            let selection = Selection::new(
                crate::topology::Path::from_sensors(vec![client, server]).unwrap(),
                0.0,
            );
            let mut ledger = EnergyLedger::new(client);
            model
                .perform_transaction(&net, Some(&selection), &service, &mut ledger)
                .unwrap()
                .unwrap();
        }

        let reps: Vec<f64> = PowerTrust::reputations(&net).into_iter().map(|(_, r)| r).collect();
        assert!(reps.iter().all(|&r| r >= 0.0));
        assert!((reps.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(reps[2] > reps[3]);
        assert!(net.sensor(3).unwrap().is_privileged());
    }

    #[test]
    fn test_selects_most_reputable() {
        let mut net = network();
        let model = model();
        let mut rng = SmallRng::seed_from_u64(0);
        model.initialize(&mut net, &temperature(), &mut rng).unwrap();
        net.sensor(4).unwrap().lock().ext.reputation = 0.9;

        let mut ledger = EnergyLedger::new(1);
        let info = model
            .gather_information(&net, 1, &temperature(), &mut ledger)
            .unwrap();
        let chosen = model.score_and_rank(&net, &info, &mut rng).unwrap().unwrap();
        assert_eq!(chosen.server(), 4);
    }

    #[test]
    fn test_power_nodes_are_reachable() {
        let mut net = network();
        net.add_sensor(
            Sensor::new(5, Position::new(9.0, 9.0))
                .with_service(OfferedService::relay())
                .with_service(OfferedService::new(temperature(), 1.0)),
        )
        .unwrap();
        let model = model();
        let mut rng = SmallRng::seed_from_u64(0);
        model.initialize(&mut net, &temperature(), &mut rng).unwrap();

        net.sensor(4).unwrap().lock().ext.reputation = 0.5;
        net.sensor(5).unwrap().lock().ext.reputation = 0.9;
        assert_eq!(model.select_power_nodes(&net), vec![4]);
        assert!(!net.sensor(5).unwrap().is_privileged());

        net.sensor_mut(4).unwrap().active = false;
        assert_eq!(model.select_power_nodes(&net), vec![3]);
    }

    #[test]
    fn test_feedback_matrix_rows_are_stochastic() {
        let net = network();
        let matrix = PowerTrust::feedback_matrix(&net, &temperature());
        for &id in matrix.ids() {
            let sum: f64 = matrix.row(id).unwrap().iter().sum();
            assert!((sum - 1.0).abs() < 1e-12);
        }
    }
}
