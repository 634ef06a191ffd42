//! PeerTrust
//!
//! Scores a server by its feedback history, weighting each past client's
//! feedback by how similarly that client rates the servers both have used
//! (the trust-peer-similarity metric).

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use trm_events::{Satisfaction, Service};

use super::charge_requests;
use crate::conditions::OffersService;
use crate::energy::EnergyLedger;
use crate::error::Result;
use crate::model::{GatheredInformation, Selection, TrustModel};
use crate::topology::{Network, SensorId};
use crate::transaction::DEFAULT_WINDOW_SIZE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerTrustParams {
    #[serde(alias = "windowSize")]
    pub window_size: usize,
}

impl Default for PeerTrustParams {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PeerTrust {
    params: PeerTrustParams,
}

/// Mean feedback per server over a client's requested transactions.
fn feedback_profile(network: &Network<()>, client: SensorId) -> BTreeMap<SensorId, f64> {
    let Some(sensor) = network.sensor(client) else {
        return BTreeMap::new();
    };
    let mut sums: BTreeMap<SensorId, (f64, u32)> = BTreeMap::new();
    for t in sensor.lock().given.iter() {
        let entry = sums.entry(t.server).or_insert((0.0, 0));
        entry.0 += t.feedback;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(server, (sum, count))| (server, sum / count as f64))
        .collect()
}

impl PeerTrust {
    pub fn new(params: PeerTrustParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PeerTrustParams {
        &self.params
    }

    /// `1 - sqrt(mean squared difference)` of the two clients' mean feedback
    /// over servers both have used; 0 when they share none.
    pub fn similarity(network: &Network<()>, a: SensorId, b: SensorId) -> f64 {
        if a == b {
            return 1.0;
        }
        let pa = feedback_profile(network, a);
        let pb = feedback_profile(network, b);

        let diffs: Vec<f64> = pa
            .iter()
            .filter_map(|(server, fa)| pb.get(server).map(|fb| (fa - fb).powi(2)))
            .collect();
        if diffs.is_empty() {
            return 0.0;
        }
        let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
        (1.0 - mean.sqrt()).max(0.0)
    }

    /// Similarity-weighted mean feedback `server` received, from `client`'s
    /// point of view. A server without history is fully trusted.
    pub fn tpsm(network: &Network<()>, client: SensorId, server: SensorId) -> Result<f64> {
        let history: Vec<(SensorId, f64)> = network
            .get(server)?
            .lock()
            .received
            .iter()
            .map(|t| (t.client, t.feedback))
            .collect();
        if history.is_empty() {
            return Ok(1.0);
        }

        let mut similarities: BTreeMap<SensorId, f64> = BTreeMap::new();
        let mut weighted = 0.0;
        let mut total = 0.0;
        for &(rater, feedback) in &history {
            let sim = *similarities
                .entry(rater)
                .or_insert_with(|| Self::similarity(network, client, rater));
            weighted += feedback * sim;
            total += sim;
        }

        if total > 0.0 {
            Ok(weighted / total)
        } else {
            Ok(history.iter().map(|(_, f)| f).sum::<f64>() / history.len() as f64)
        }
    }
}

impl TrustModel for PeerTrust {
    type State = ();
    type Extra = ();

    fn name(&self) -> &'static str {
        "PeerTrust"
    }

    fn window_size(&self) -> usize {
        self.params.window_size
    }

    fn initialize(
        &self,
        network: &mut Network<()>,
        _service: &Service,
        _rng: &mut dyn RngCore,
    ) -> Result<()> {
        network.reset_state(self.params.window_size);
        Ok(())
    }

    fn gather_information(
        &self,
        network: &Network<()>,
        client: SensorId,
        service: &Service,
        ledger: &mut EnergyLedger,
    ) -> Result<GatheredInformation<()>> {
        let paths = network.find_paths(client, &OffersService::new(service.clone()));
        charge_requests(network, ledger, &paths)?;
        Ok(GatheredInformation::new(client, service.clone(), paths, ()))
    }

    /// Highest TPSM wins; ties keep the first path found.
    fn score_and_rank(
        &self,
        network: &Network<()>,
        info: &GatheredInformation<()>,
        _rng: &mut dyn RngCore,
    ) -> Result<Option<Selection>> {
        let mut best: Option<Selection> = None;
        for path in &info.paths {
            let score = Self::tpsm(network, info.client, path.target())?;
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(Selection::new(path.clone(), score));
            }
        }
        Ok(best)
    }

    fn satisfaction(&self, goodness: f64) -> Satisfaction {
        Satisfaction::interval(goodness, 0.0, 1.0)
    }
}
