//! TRIP
//!
//! Fuzzy trust for one-hop neighbors. A neighbor's trust fuses the client's
//! direct experience with weighted recommendations from nearby vehicles
//! (ordinary sensors) and road-side units (RSUs):
//!
//! `trust = alpha * direct + beta * vehicles + gamma * rsus`
//!
//! Without RSU recommendations `alpha` and `beta` split `gamma`; without
//! vehicle recommendations `alpha` absorbs `beta`. The fused value is then
//! classified fuzzily. Recommender weights learn from every transaction.

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use trm_events::{Outcome, Satisfaction, Service, TrustLevel, TrustVariable, BENEVOLENCE_THRESHOLD};

use super::{charge_requests, privileged_count};
use crate::collusion;
use crate::conditions::{Active, And, OffersService, SearchCondition};
use crate::energy::EnergyLedger;
use crate::error::Result;
use crate::model::{GatheredInformation, Selection, TrustModel};
use crate::topology::{Network, Path, SensorId};
use crate::transaction::DEFAULT_WINDOW_SIZE;

/// Bounds of a single recommender weight.
pub const MIN_WEIGHT: f64 = 1e-5;
pub const MAX_WEIGHT: f64 = 0.99999;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripParams {
    #[serde(alias = "windowSize")]
    pub window_size: usize,
    /// Weight of direct trust
    pub alpha: f64,
    /// Weight of vehicle recommendations
    pub beta: f64,
    /// Weight of RSU recommendations
    pub gamma: f64,
    /// Hops within which recommendations are collected
    #[serde(alias = "recommendationRadius")]
    pub recommendation_radius: usize,
    #[serde(alias = "rsuPercentage")]
    pub rsu_percentage: f64,
    /// Direct trust in a neighbor never dealt with
    #[serde(alias = "initialTrust")]
    pub initial_trust: f64,
    #[serde(alias = "weightLearningRate")]
    pub weight_learning_rate: f64,
    pub fuzzy: TrustVariable,
}

impl Default for TripParams {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            alpha: 0.6,
            beta: 0.3,
            gamma: 0.1,
            recommendation_radius: 2,
            rsu_percentage: 0.1,
            initial_trust: 0.5,
            weight_learning_rate: 0.1,
            fuzzy: TrustVariable::default(),
        }
    }
}

/// Recommender weights for one (client, neighbor) pair.
///
/// Every write renormalizes the table to sum to 1 with each weight inside
/// `[MIN_WEIGHT, MAX_WEIGHT]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightTable {
    weights: BTreeMap<SensorId, f64>,
}

impl WeightTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn get(&self, recommender: SensorId) -> Option<f64> {
        self.weights.get(&recommender).copied()
    }

    /// Stored weight, or the equal share a newcomer would receive.
    pub fn weight(&self, recommender: SensorId) -> f64 {
        self.get(recommender)
            .unwrap_or(1.0 / (self.weights.len() + 1) as f64)
    }

    pub fn sum(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SensorId, f64)> + '_ {
        self.weights.iter().map(|(&id, &w)| (id, w))
    }

    pub fn set_weight(&mut self, recommender: SensorId, weight: f64) {
        self.weights.insert(recommender, weight.max(0.0));
        self.renormalize();
    }

    /// Adds `recommender` with an equal share if it is not yet known.
    pub fn ensure(&mut self, recommender: SensorId) {
        if !self.weights.contains_key(&recommender) {
            let share = if self.weights.is_empty() {
                1.0
            } else {
                self.sum() / self.weights.len() as f64
            };
            self.set_weight(recommender, share);
        }
    }

    pub fn scale(&mut self, recommender: SensorId, factor: f64) {
        self.ensure(recommender);
        let current = self.weight(recommender);
        self.set_weight(recommender, current * factor);
    }

    /// Scales the table to sum to 1, then pins out-of-range weights to their
    /// bound and spreads the difference over the free ones until every
    /// weight fits. The sum stays 1 whenever `n * MIN_WEIGHT <= 1` and the
    /// table has more than one entry.
    fn renormalize(&mut self) {
        let n = self.weights.len();
        if n == 0 {
            return;
        }
        let sum = self.sum();
        let mut shares: Vec<f64> = self
            .weights
            .values()
            .map(|&w| if sum > 0.0 { w / sum } else { 1.0 / n as f64 })
            .collect();
        let mut pinned = vec![false; n];

        loop {
            let pinned_mass: f64 = (0..n).filter(|&i| pinned[i]).map(|i| shares[i]).sum();
            let free: Vec<usize> = (0..n).filter(|&i| !pinned[i]).collect();
            if free.is_empty() {
                break;
            }
            let target = 1.0 - pinned_mass;
            let free_mass: f64 = free.iter().map(|&i| shares[i]).sum();
            for &i in &free {
                shares[i] = if free_mass > 0.0 {
                    shares[i] * target / free_mass
                } else {
                    target / free.len() as f64
                };
            }

            // Floor violators are pinned before ceiling ones
            let mut violators: Vec<usize> = free
                .iter()
                .copied()
                .filter(|&i| shares[i] < MIN_WEIGHT)
                .collect();
            if violators.is_empty() {
                violators = free
                    .iter()
                    .copied()
                    .filter(|&i| shares[i] > MAX_WEIGHT)
                    .collect();
            }
            if violators.is_empty() {
                break;
            }
            for i in violators {
                shares[i] = shares[i].clamp(MIN_WEIGHT, MAX_WEIGHT);
                pinned[i] = true;
            }
        }

        for (w, share) in self.weights.values_mut().zip(shares) {
            *w = share;
        }
    }
}

/// Per-sensor TRIP state, as seen by this sensor when it acts as a client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripState {
    /// Direct trust in neighbors this sensor has been served by
    pub direct_trust: BTreeMap<SensorId, f64>,
    /// Recommender weights per neighbor
    pub weights: BTreeMap<SensorId, WeightTable>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub recommender: SensorId,
    pub subject: SensorId,
    pub value: f64,
    pub rsu: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TripExtra {
    pub recommendations: Vec<Recommendation>,
}

impl TripExtra {
    pub fn about(&self, subject: SensorId) -> impl Iterator<Item = &Recommendation> {
        self.recommendations.iter().filter(move |r| r.subject == subject)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Trip {
    params: TripParams,
}

impl Trip {
    pub fn new(params: TripParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TripParams {
        &self.params
    }

    /// Fuses the three trust sources, redistributing the weight of any
    /// missing source.
    pub fn fuse(&self, direct: f64, vehicles: Option<f64>, rsus: Option<f64>) -> f64 {
        let params = &self.params;
        let (mut alpha, mut beta, mut gamma) = (params.alpha, params.beta, params.gamma);
        if rsus.is_none() {
            alpha += gamma / 2.0;
            beta += gamma / 2.0;
            gamma = 0.0;
        }
        if vehicles.is_none() {
            alpha += beta;
            beta = 0.0;
        }
        let total = alpha + beta + gamma;
        let fused = alpha * direct + beta * vehicles.unwrap_or(0.0) + gamma * rsus.unwrap_or(0.0);
        if total > 0.0 {
            (fused / total).clamp(0.0, 1.0)
        } else {
            direct.clamp(0.0, 1.0)
        }
    }

    /// Fused trust of `subject` from the client's state and the gathered
    /// recommendations.
    pub fn trust_in(&self, state: &TripState, subject: SensorId, extra: &TripExtra) -> f64 {
        let direct = state
            .direct_trust
            .get(&subject)
            .copied()
            .unwrap_or(self.params.initial_trust);
        let empty = WeightTable::new();
        let table = state.weights.get(&subject).unwrap_or(&empty);

        let weighted = |rsu: bool| -> Option<f64> {
            let mut sum = 0.0;
            let mut total = 0.0;
            for r in extra.about(subject).filter(|r| r.rsu == rsu) {
                let w = table.weight(r.recommender);
                sum += w * r.value;
                total += w;
            }
            (total > 0.0).then(|| sum / total)
        };
        self.fuse(direct, weighted(false), weighted(true))
    }

    /// Whether a neighbor with fused `trust` is accepted.
    pub fn accepts<R: Rng + ?Sized>(&self, trust: f64, rng: &mut R) -> bool {
        match self.params.fuzzy.classify(trust, rng) {
            TrustLevel::Trust => true,
            TrustLevel::MaybeTrust => rng.gen_bool(self.params.fuzzy.maybe_trust_acceptance()),
            TrustLevel::NotTrust => false,
        }
    }

    /// Records the client's experience and updates the weights of everyone
    /// who recommended the chosen neighbor.
    fn learn(
        &self,
        network: &Network<TripState>,
        info: &GatheredInformation<TripExtra>,
        selection: &Selection,
        outcome: &Outcome,
    ) -> Result<()> {
        let server = selection.server();
        let satisfied = outcome.is_satisfied();
        let rate = self.params.weight_learning_rate;

        let mut state = network.get(info.client)?.lock();
        let experience: Vec<f64> = state.given.with_server(server).map(|t| t.feedback).collect();
        if !experience.is_empty() {
            let mean = experience.iter().sum::<f64>() / experience.len() as f64;
            state.ext.direct_trust.insert(server, mean);
        }

        let table = state.ext.weights.entry(server).or_default();
        for r in info.extra.about(server) {
            let agreed = (r.value >= BENEVOLENCE_THRESHOLD) == satisfied;
            let factor = if agreed { 1.0 + rate } else { 1.0 - rate };
            table.scale(r.recommender, factor);
        }
        Ok(())
    }
}

impl TrustModel for Trip {
    type State = TripState;
    type Extra = TripExtra;

    fn name(&self) -> &'static str {
        "TRIP"
    }

    fn window_size(&self) -> usize {
        self.params.window_size
    }

    fn privileged_role(&self) -> Option<&'static str> {
        Some("rsu")
    }

    /// Picks RSUs at random among active servers. Each RSU starts with
    /// direct trust in its neighbors equal to their goodness.
    fn initialize(
        &self,
        network: &mut Network<TripState>,
        service: &Service,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        network.reset_state(self.params.window_size);

        let servers: Vec<SensorId> = network
            .servers()
            .filter(|s| s.active)
            .map(|s| s.id)
            .collect();
        let k = privileged_count(self.params.rsu_percentage, network.len(), servers.len());
        let rsus: Vec<SensorId> = servers.choose_multiple(rng, k).copied().collect();

        let net: &Network<TripState> = network;
        for &id in &rsus {
            let rsu = net.get(id)?;
            rsu.set_privileged(true);
            let known: Vec<(SensorId, f64)> = rsu
                .neighbors
                .iter()
                .filter_map(|&n| net.sensor(n).and_then(|s| s.goodness(service)).map(|g| (n, g)))
                .collect();
            rsu.lock().ext.direct_trust.extend(known);
        }
        tracing::debug!("TRIP: {} RSUs", rsus.len());
        Ok(())
    }

    fn gather_information(
        &self,
        network: &Network<TripState>,
        client: SensorId,
        service: &Service,
        ledger: &mut EnergyLedger,
    ) -> Result<GatheredInformation<TripExtra>> {
        let condition = And(Active, OffersService::new(service.clone()));
        let paths: Vec<Path> = network
            .neighbors_of(client)
            .iter()
            .filter(|&&n| network.sensor(n).map_or(false, |s| condition.matches(network, s)))
            .filter_map(|&n| Path::from_sensors(vec![client, n]))
            .collect();
        let recommender_paths = network.hop_paths(client, self.params.recommendation_radius);
        charge_requests(network, ledger, &paths)?;
        charge_requests(network, ledger, &recommender_paths)?;

        let mut recommendations = Vec::new();
        for rpath in &recommender_paths {
            let recommender = network.get(rpath.target())?;
            let colluding = collusion::is_colluding(network, recommender.id, service);
            let opinions = recommender.lock().ext.direct_trust.clone();
            for path in &paths {
                let subject = path.target();
                if subject == recommender.id {
                    continue;
                }
                let honest = match opinions.get(&subject) {
                    Some(&v) => v,
                    None if colluding => 0.0,
                    None => continue,
                };
                recommendations.push(Recommendation {
                    recommender: recommender.id,
                    subject,
                    value: collusion::reported_opinion(
                        network,
                        recommender.id,
                        subject,
                        service,
                        honest,
                    ),
                    rsu: recommender.is_privileged(),
                });
            }
        }

        Ok(GatheredInformation::new(
            client,
            service.clone(),
            paths,
            TripExtra { recommendations },
        ))
    }

    /// Most trusted accepted neighbor; ties keep the first neighbor found.
    fn score_and_rank(
        &self,
        network: &Network<TripState>,
        info: &GatheredInformation<TripExtra>,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Selection>> {
        let state = network.get(info.client)?.lock().ext.clone();

        let mut best: Option<Selection> = None;
        for path in &info.paths {
            let trust = self.trust_in(&state, path.target(), &info.extra);
            if !self.accepts(trust, rng) {
                continue;
            }
            if best.as_ref().map_or(true, |b| trust > b.score) {
                best = Some(Selection::new(path.clone(), trust));
            }
        }
        Ok(best)
    }

    fn satisfaction(&self, goodness: f64) -> Satisfaction {
        Satisfaction::fuzzy(goodness, &self.params.fuzzy)
    }

    fn reward(
        &self,
        network: &Network<TripState>,
        info: &GatheredInformation<TripExtra>,
        selection: &Selection,
        outcome: Outcome,
    ) -> Result<Outcome> {
        self.learn(network, info, selection, &outcome)?;
        Ok(outcome)
    }

    fn punish(
        &self,
        network: &Network<TripState>,
        info: &GatheredInformation<TripExtra>,
        selection: &Selection,
        outcome: Outcome,
    ) -> Result<Outcome> {
        self.learn(network, info, selection, &outcome)?;
        Ok(outcome)
    }
}
