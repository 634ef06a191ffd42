//! EigenTrust
//!
//! Global trust as the stationary vector of normalized local trust, damped
//! towards a prior over pre-trusted peers.
//!
//! Local trust `s_ij` counts +1 for every satisfying and -1 for every
//! unsatisfying transaction `i` requested from `j`. Rows of `max(s_ij, 0)`
//! are normalized; rows without positive mass fall back to the prior.

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use trm_events::Service;

use super::{charge_requests, privileged_count, ZERO_TRUST};
use crate::collusion;
use crate::conditions::{Active, And, Benevolent, IsClient, OffersService, SearchCondition};
use crate::energy::EnergyLedger;
use crate::error::Result;
use crate::iteration::{power_iterate, uniform, Convergence, IterationSettings, TrustMatrix};
use crate::model::{GatheredInformation, Selection, TrustModel};
use crate::topology::{Network, Path, SensorId};
use crate::transaction::DEFAULT_WINDOW_SIZE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EigenTrustParams {
    #[serde(alias = "windowSize")]
    pub window_size: usize,
    pub epsilon: f64,
    /// Fraction of sensors seeded as pre-trusted peers
    #[serde(alias = "preTrustedPeersPercentage")]
    pub pre_trusted_peers_percentage: f64,
    /// Damping weight of the pre-trusted prior
    #[serde(alias = "preTrustedPeersWeight")]
    pub pre_trusted_peers_weight: f64,
    #[serde(alias = "zeroTrustNodeSelectionProbability")]
    pub zero_trust_node_selection_probability: f64,
    #[serde(alias = "maxIterations")]
    pub max_iterations: usize,
}

impl Default for EigenTrustParams {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            epsilon: 0.001,
            pre_trusted_peers_percentage: 0.1,
            pre_trusted_peers_weight: 0.2,
            zero_trust_node_selection_probability: 0.1,
            max_iterations: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EigenTrustState {
    /// Last global trust computed for this sensor
    pub global_trust: f64,
}

/// Paths to reachable clients and the local trust matrix.
#[derive(Debug, Clone)]
pub struct EigenTrustExtra {
    pub client_paths: Vec<Path>,
    pub local_trust: TrustMatrix,
    pub prior: Vec<f64>,
}

#[derive(Debug, Default)]
pub struct EigenTrust {
    params: EigenTrustParams,
    warnings: Mutex<Vec<Convergence>>,
}

impl EigenTrust {
    pub fn new(params: EigenTrustParams) -> Self {
        Self {
            params,
            warnings: Mutex::new(Vec::new()),
        }
    }

    pub fn params(&self) -> &EigenTrustParams {
        &self.params
    }

    /// Uniform over pre-trusted peers, or over everyone when there are none.
    pub fn prior<S>(network: &Network<S>) -> Vec<f64> {
        let flags: Vec<bool> = network.sensors().map(|s| s.is_privileged()).collect();
        let count = flags.iter().filter(|&&p| p).count();
        if count == 0 {
            return uniform(flags.len());
        }
        flags
            .into_iter()
            .map(|p| if p { 1.0 / count as f64 } else { 0.0 })
            .collect()
    }

    /// Normalized local trust matrix over every sensor.
    pub fn local_trust(
        network: &Network<EigenTrustState>,
        service: &Service,
        prior: &[f64],
    ) -> TrustMatrix {
        let ids = network.ids();
        let mut matrix = TrustMatrix::new(ids.clone());

        for &i in &ids {
            if collusion::is_colluding(network, i, service) {
                for &j in &ids {
                    if j != i && collusion::is_malicious(network, j, service) {
                        matrix.set(i, j, 1.0);
                    }
                }
                continue;
            }

            let Some(sensor) = network.sensor(i) else {
                continue;
            };
            let history: Vec<(SensorId, bool)> = sensor
                .lock()
                .given
                .iter()
                .map(|t| (t.server, t.is_satisfied()))
                .collect();
            for (server, satisfied) in history {
                let delta = if satisfied { 1.0 } else { -1.0 };
                matrix.set(i, server, matrix.get(i, server) + delta);
            }
            for &j in &ids {
                if matrix.get(i, j) < 0.0 {
                    matrix.set(i, j, 0.0);
                }
            }
        }

        matrix.normalize_rows(prior);
        matrix
    }

    /// Picks a candidate: with probability `1 - zero_prob` proportionally to
    /// trust among trusted candidates, otherwise uniformly among zero-trust
    /// ones. Falls back to the most trusted candidate.
    fn select(&self, candidates: &[(&Path, f64)], rng: &mut dyn RngCore) -> Option<Selection> {
        if candidates.is_empty() {
            return None;
        }

        let pick_zero = rng.gen::<f64>() < self.params.zero_trust_node_selection_probability;
        let chosen = if pick_zero {
            let zero: Vec<_> = candidates.iter().filter(|(_, t)| *t <= ZERO_TRUST).collect();
            zero.choose(rng).map(|(p, t)| Selection::new((*p).clone(), *t))
        } else {
            let trusted: Vec<_> = candidates.iter().filter(|(_, t)| *t > ZERO_TRUST).collect();
            let total: f64 = trusted.iter().map(|(_, t)| t).sum();
            let mut roll = rng.gen::<f64>() * total;
            let mut found = None;
            for (path, trust) in &trusted {
                if roll < *trust {
                    found = Some(Selection::new((*path).clone(), *trust));
                    break;
                }
                roll -= trust;
            }
            found.or_else(|| {
                trusted
                    .last()
                    .map(|(p, t)| Selection::new((*p).clone(), *t))
            })
        };

        chosen.or_else(|| {
            let mut best = &candidates[0];
            for candidate in &candidates[1..] {
                if candidate.1 > best.1 {
                    best = candidate;
                }
            }
            Some(Selection::new(best.0.clone(), best.1))
        })
    }
}

impl TrustModel for EigenTrust {
    type State = EigenTrustState;
    type Extra = EigenTrustExtra;

    fn name(&self) -> &'static str {
        "EigenTrust"
    }

    fn window_size(&self) -> usize {
        self.params.window_size
    }

    fn privileged_role(&self) -> Option<&'static str> {
        Some("pre-trusted")
    }

    fn initialize(
        &self,
        network: &mut Network<EigenTrustState>,
        service: &Service,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        network.reset_state(self.params.window_size);

        let condition = And(Active, Benevolent::new(service.clone()));
        let net: &Network<EigenTrustState> = network;
        let candidates: Vec<SensorId> = net
            .sensors()
            .filter(|s| condition.matches(net, s))
            .map(|s| s.id)
            .collect();
        let k = privileged_count(
            self.params.pre_trusted_peers_percentage,
            network.len(),
            candidates.len(),
        );
        for &id in candidates.choose_multiple(rng, k) {
            network.get(id)?.set_privileged(true);
        }
        tracing::debug!("EigenTrust: {} pre-trusted peers", k);
        Ok(())
    }

    fn gather_information(
        &self,
        network: &Network<EigenTrustState>,
        client: SensorId,
        service: &Service,
        ledger: &mut EnergyLedger,
    ) -> Result<GatheredInformation<EigenTrustExtra>> {
        let paths = network.find_paths(client, &OffersService::new(service.clone()));
        let client_paths = network.find_paths(client, &IsClient);
        charge_requests(network, ledger, &paths)?;
        charge_requests(network, ledger, &client_paths)?;

        let prior = Self::prior(network);
        let local_trust = Self::local_trust(network, service, &prior);
        Ok(GatheredInformation::new(
            client,
            service.clone(),
            paths,
            EigenTrustExtra {
                client_paths,
                local_trust,
                prior,
            },
        ))
    }

    fn score_and_rank(
        &self,
        network: &Network<EigenTrustState>,
        info: &GatheredInformation<EigenTrustExtra>,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Selection>> {
        if info.paths.is_empty() {
            return Ok(None);
        }

        let extra = &info.extra;
        let (trust, convergence) = power_iterate(
            &extra.local_trust,
            &extra.prior,
            &extra.prior,
            IterationSettings {
                alpha: self.params.pre_trusted_peers_weight,
                epsilon: self.params.epsilon,
                max_iterations: self.params.max_iterations,
            },
            self.name(),
        );
        if !convergence.converged {
            self.warnings.lock().push(convergence);
        }

        for (idx, &id) in extra.local_trust.ids().iter().enumerate() {
            network.get(id)?.lock().ext.global_trust = trust[idx];
        }

        let candidates: Vec<(&Path, f64)> = info
            .paths
            .iter()
            .map(|p| {
                let t = extra
                    .local_trust
                    .index_of(p.target())
                    .map_or(0.0, |i| trust[i]);
                (p, t)
            })
            .collect();
        Ok(self.select(&candidates, rng))
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
    use crate::transaction::Transaction;
    use trm_events::{OfferedService, Outcome, Satisfaction};

    fn temperature() -> Service {
        Service::new(1, "Temperature")
    }

    fn server(id: SensorId, goodness: f64) -> Sensor<EigenTrustState> {
        Sensor::new(id, Position::new(id as f64, 0.0))
            .with_service(OfferedService::relay())
            .with_service(OfferedService::new(temperature(), goodness))
    }

    fn network() -> Network<EigenTrustState> {
        let mut net = Network::new(10.0);
        net.add_sensor(Sensor::new(1, Position::new(0.0, 0.0)).with_client(true))
            .unwrap();
        net.add_sensor(server(2, 1.0)).unwrap();
        net.add_sensor(server(3, 0.0)).unwrap();
        net.add_sensor(server(4, 1.0)).unwrap();
        net.set_neighbors(1.0);
        net
    }

    fn record(net: &Network<EigenTrustState>, client: SensorId, server: SensorId, satisfied: bool) {
        let tx = Transaction {
            client,
            server,
            outcome: Outcome::single(Satisfaction::binary(satisfied), 1),
            feedback: if satisfied { 1.0 } else { 0.0 },
        };
        net.sensor(client).unwrap().lock().given.push(tx);
    }

    #[test]
    fn test_default_params() {
        let params = EigenTrustParams::default();
        assert_eq!(params.window_size, 10);
        assert_eq!(params.epsilon, 0.001);
        assert_eq!(params.pre_trusted_peers_percentage, 0.1);
        assert_eq!(params.pre_trusted_peers_weight, 0.2);
        assert_eq!(params.zero_trust_node_selection_probability, 0.1);
    }

    #[test]
    fn test_legacy_parameter_names() {
        let params: EigenTrustParams = crate::params::parse_params(
            "windowSize = 5\n\
             preTrustedPeersPercentage = 0.0\n\
             zeroTrustNodeSelectionProbability = 0.0\n",
        )
        .unwrap();
        assert_eq!(params.window_size, 5);
        assert_eq!(params.pre_trusted_peers_percentage, 0.0);
        assert_eq!(params.epsilon, 0.001);
    }

    #[test]
    fn test_pre_trusted_peers_are_benevolent() {
        let mut net = network();
        let model = EigenTrust::new(EigenTrustParams {
            pre_trusted_peers_percentage: 0.5,
            ..Default::default()
        });
        let mut rng = SmallRng::seed_from_u64(1);
        model.initialize(&mut net, &temperature(), &mut rng).unwrap();

        let privileged: Vec<_> =
            net.sensors().filter(|s| s.is_privileged()).map(|s| s.id).collect();
        assert_eq!(privileged.len(), 2);
        assert!(privileged.iter().all(|&id| id == 2 || id == 4));

        let prior = EigenTrust::prior(&net);
        assert!((prior.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert_eq!(prior[0], 0.0);
    }

    #[test]
    fn test_local_trust_counts_satisfaction() {
        let net = network();
        record(&net, 1, 2, true);
        record(&net, 1, 2, true);
        record(&net, 1, 3, false);
        record(&net, 1, 4, true);

        let prior = EigenTrust::prior(&net);
        let matrix = EigenTrust::local_trust(&net, &temperature(), &prior);
        assert!((matrix.get(1, 2) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(matrix.get(1, 3), 0.0);
        assert!((matrix.get(1, 4) - 1.0 / 3.0).abs() < 1e-12);
        // No history: prior row
        assert_eq!(matrix.row(2).unwrap(), prior.as_slice());
    }

    #[test]
    fn test_global_trust_favours_good_history() {
        let net = network();
        for _ in 0..3 {
            record(&net, 1, 2, true);
            record(&net, 1, 3, false);
        }
        let model = EigenTrust::new(EigenTrustParams {
            zero_trust_node_selection_probability: 0.0,
            ..Default::default()
        });
        let mut ledger = EnergyLedger::new(1);
        let info = model
            .gather_information(&net, 1, &temperature(), &mut ledger)
            .unwrap();
        assert_eq!(info.paths.len(), 3);

        let mut rng = SmallRng::seed_from_u64(2);
        model.score_and_rank(&net, &info, &mut rng).unwrap();

        let t2 = net.sensor(2).unwrap().lock().ext.global_trust;
        let t3 = net.sensor(3).unwrap().lock().ext.global_trust;
        assert!(t2 > t3);
        let total: f64 = net.sensors().map(|s| s.lock().ext.global_trust).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_select_zero_trust_branch() {
        let model = EigenTrust::new(EigenTrustParams {
            zero_trust_node_selection_probability: 1.0,
            ..Default::default()
        });
        let a = Path::from_sensors(vec![1, 2]).unwrap();
        let b = Path::from_sensors(vec![1, 3]).unwrap();
        let mut rng = SmallRng::seed_from_u64(0);

        let chosen = model.select(&[(&a, 0.9), (&b, 0.0)], &mut rng).unwrap();
        assert_eq!(chosen.server(), 3);

        // No zero-trust candidate: fall back to the most trusted
        let chosen = model.select(&[(&a, 0.2), (&b, 0.8)], &mut rng).unwrap();
        assert_eq!(chosen.server(), 3);
        assert!(model.select(&[], &mut rng).is_none());
    }
}
