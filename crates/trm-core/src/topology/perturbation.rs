//! Network Perturbation
//!
//! Between executions a network may reshuffle which servers behave well
//! (oscillating mode) and put sensors to sleep (dynamic mode). Both run
//! with exclusive access to the network.

use rand::seq::SliceRandom;
use rand::Rng;

use trm_events::{Service, BENEVOLENCE_THRESHOLD};

use super::network::Network;
use super::sensor::SensorId;
use crate::conditions::{Benevolent, Malicious, SearchCondition};

/// Goodness given to a server forced below the threshold.
const FORCED_MALICIOUS: f64 = 0.0;
/// Goodness given to a server forced above the threshold.
const FORCED_BENEVOLENT: f64 = 1.0;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OscillationReport {
    /// Benevolent servers turned malicious
    pub flipped: Vec<SensorId>,
    /// Malicious servers turned benevolent
    pub restored: Vec<SensorId>,
}

/// Goodness mirrored around 0.5, pushed across the threshold if it lands on it.
fn mirrored(goodness: f64, to_benevolent: bool) -> f64 {
    let g = 1.0 - goodness;
    match (to_benevolent, g >= BENEVOLENCE_THRESHOLD) {
        (true, true) | (false, false) => g,
        (true, false) => FORCED_BENEVOLENT,
        (false, true) => FORCED_MALICIOUS,
    }
}

impl<S> Network<S> {
    fn classified(&self, service: &Service, benevolent: bool) -> Vec<SensorId> {
        let good = Benevolent::new(service.clone());
        let bad = Malicious::new(service.clone());
        self.sensors()
            .filter(|s| !s.is_privileged())
            .filter(|s| {
                if benevolent {
                    good.matches(self, s)
                } else {
                    bad.matches(self, s)
                }
            })
            .map(|s| s.id)
            .collect()
    }

    fn benevolent_count(&self, service: &Service) -> usize {
        let good = Benevolent::new(service.clone());
        self.sensors().filter(|s| good.matches(self, s)).count()
    }

    /// Turns roughly half of the non-privileged benevolent servers malicious,
    /// then restores malicious servers until the benevolent count is back to
    /// where it started. Identities shuffle; the count is conserved.
    pub fn oscillate<R: Rng + ?Sized>(
        &mut self,
        service: &Service,
        rng: &mut R,
    ) -> OscillationReport {
        let before = self.benevolent_count(service);
        let mut report = OscillationReport::default();

        for id in self.classified(service, true) {
            if !rng.gen_bool(0.5) {
                continue;
            }
            if let Some(sensor) = self.sensor_mut(id) {
                let g = sensor.goodness(service).unwrap_or(FORCED_BENEVOLENT);
                sensor.set_goodness(service, mirrored(g, false));
                report.flipped.push(id);
            }
        }

        // Long-standing malicious servers first, just-flipped ones last
        let mut candidates: Vec<SensorId> = self
            .classified(service, false)
            .into_iter()
            .filter(|id| !report.flipped.contains(id))
            .collect();
        candidates.shuffle(rng);
        let mut flipped = report.flipped.clone();
        flipped.shuffle(rng);
        candidates.extend(flipped);

        let mut count = self.benevolent_count(service);
        for id in candidates {
            if count >= before {
                break;
            }
            if let Some(sensor) = self.sensor_mut(id) {
                let g = sensor.goodness(service).unwrap_or(FORCED_MALICIOUS);
                sensor.set_goodness(service, mirrored(g, true));
                report.restored.push(id);
                count += 1;
            }
        }

        tracing::debug!(
            "Oscillation: {} flipped, {} restored",
            report.flipped.len(),
            report.restored.len()
        );
        report
    }

    /// Puts each sensor to sleep with `sleep_probability`, waking the rest.
    /// Returns the number of sleeping sensors.
    pub fn toggle_activity<R: Rng + ?Sized>(
        &mut self,
        sleep_probability: f64,
        rng: &mut R,
    ) -> usize {
        let p = sleep_probability.clamp(0.0, 1.0);
        let mut asleep = 0;
        for sensor in self.sensors_mut() {
            sensor.active = !rng.gen_bool(p);
            if !sensor.active {
                asleep += 1;
            }
        }
        asleep
    }
}
