//! Outcome Types
//!
//! The recorded result of one or more transactions: satisfaction, average
//! path length and per-role energy consumption.
//!
//! Outcomes carry the number of transactions they summarize, so aggregating
//! already-aggregated outcomes gives the same means as aggregating the leaf
//! outcomes directly.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::satisfaction::Satisfaction;

/// Role a sensor plays with respect to the requested service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Malicious,
    Benevolent,
    Relay,
    /// Pre-trusted peer, power node or RSU, depending on the model
    Privileged,
}

impl Role {
    /// Returns all roles in report column order.
    pub fn all() -> &'static [Role] {
        &[
            Role::Client,
            Role::Malicious,
            Role::Benevolent,
            Role::Relay,
            Role::Privileged,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Malicious => "malicious",
            Role::Benevolent => "benevolent",
            Role::Relay => "relay",
            Role::Privileged => "privileged",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mean energy spent by the sensors of one role.
///
/// `samples == 0` (equivalently a mean of exactly 0.0) is the "no
/// contributions" sentinel and is left out of aggregated means.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RoleEnergy {
    pub mean: f64,
    pub samples: u32,
}

impl RoleEnergy {
    pub fn new(mean: f64, samples: u32) -> Self {
        Self { mean, samples }
    }

    pub fn is_sentinel(&self) -> bool {
        self.samples == 0 || self.mean == 0.0
    }

    fn merge(&self, other: &RoleEnergy) -> RoleEnergy {
        match (self.is_sentinel(), other.is_sentinel()) {
            (true, true) => RoleEnergy::default(),
            (true, false) => *other,
            (false, true) => *self,
            (false, false) => {
                let samples = self.samples + other.samples;
                let mean = (self.mean * self.samples as f64 + other.mean * other.samples as f64)
                    / samples as f64;
                RoleEnergy { mean, samples }
            }
        }
    }
}

/// Per-role average transmitted distance.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnergyReport {
    pub client: RoleEnergy,
    pub malicious: RoleEnergy,
    pub benevolent: RoleEnergy,
    pub relay: RoleEnergy,
    pub privileged: RoleEnergy,
}

impl EnergyReport {
    pub fn get(&self, role: Role) -> RoleEnergy {
        match role {
            Role::Client => self.client,
            Role::Malicious => self.malicious,
            Role::Benevolent => self.benevolent,
            Role::Relay => self.relay,
            Role::Privileged => self.privileged,
        }
    }

    pub fn set(&mut self, role: Role, energy: RoleEnergy) {
        match role {
            Role::Client => self.client = energy,
            Role::Malicious => self.malicious = energy,
            Role::Benevolent => self.benevolent = energy,
            Role::Relay => self.relay = energy,
            Role::Privileged => self.privileged = energy,
        }
    }

    /// Sample-weighted merge, role by role, ignoring sentinel entries.
    pub fn merge(&self, other: &EnergyReport) -> EnergyReport {
        let mut out = EnergyReport::default();
        for &role in Role::all() {
            out.set(role, self.get(role).merge(&other.get(role)));
        }
        out
    }
}

/// Result of one transaction, or the aggregate of several.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub satisfaction: Satisfaction,
    /// Mean normalized satisfaction value
    pub avg_satisfaction: f64,
    /// Mean path length in hops
    pub avg_path_length: f64,
    /// Number of transactions summarized
    pub transactions: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<EnergyReport>,
}

impl Outcome {
    /// Outcome of a single transaction.
    pub fn single(satisfaction: Satisfaction, path_length: usize) -> Self {
        Self {
            avg_satisfaction: satisfaction.value(),
            satisfaction,
            avg_path_length: path_length as f64,
            transactions: 1,
            energy: None,
        }
    }

    pub fn with_energy(mut self, energy: EnergyReport) -> Self {
        self.energy = Some(energy);
        self
    }

    pub fn is_satisfied(&self) -> bool {
        self.satisfaction.is_satisfied()
    }

    /// Aggregates `self` with `others`.
    ///
    /// Means are weighted by transaction count, so `self` counts once and
    /// leaf outcomes contribute equally. Satisfaction is folded pairwise in
    /// order; binary disagreement draws from `rng`.
    pub fn aggregate<R: Rng + ?Sized>(&self, others: &[Outcome], rng: &mut R) -> Outcome {
        let mut satisfaction = self.satisfaction.clone();
        let mut weight = self.weight();
        let mut sat_sum = self.avg_satisfaction * weight;
        let mut path_sum = self.avg_path_length * weight;
        let mut transactions = self.transactions;
        let mut energy = self.energy;

        for other in others {
            satisfaction = satisfaction.aggregate(&other.satisfaction, rng);
            let w = other.weight();
            sat_sum += other.avg_satisfaction * w;
            path_sum += other.avg_path_length * w;
            weight += w;
            transactions += other.transactions;
            energy = match (energy, other.energy) {
                (Some(a), Some(b)) => Some(a.merge(&b)),
                (a, b) => a.or(b),
            };
        }

        Outcome {
            satisfaction,
            avg_satisfaction: sat_sum / weight,
            avg_path_length: path_sum / weight,
            transactions,
            energy,
        }
    }

    fn weight(&self) -> f64 {
        self.transactions.max(1) as f64
    }

    /// Tab-separated export line: satisfied (0/1), mean satisfaction, mean
    /// path length, then client, malicious, benevolent and relay energy,
    /// and the privileged-role energy when `privileged` is set.
    pub fn to_tsv(&self, privileged: bool) -> String {
        let energy = self.energy.unwrap_or_default();
        let mut columns = vec![
            if self.is_satisfied() { "1" } else { "0" }.to_string(),
            format!("{:.6}", self.avg_satisfaction),
            format!("{:.6}", self.avg_path_length),
        ];
        for &role in Role::all() {
            if role == Role::Privileged && !privileged {
                continue;
            }
            columns.push(format!("{:.6}", energy.get(role).mean));
        }
        columns.join("\t")
    }

    /// Column names matching [`Outcome::to_tsv`].
    pub fn tsv_header(privileged: bool) -> String {
        let mut columns = vec!["satisfied", "avg_satisfaction", "avg_path_length"];
        for &role in Role::all() {
            if role == Role::Privileged && !privileged {
                continue;
            }
            columns.push(role.as_str());
        }
        columns.join("\t")
    }
}

/// Reduces a collection of outcomes to one.
///
/// Returns `None` for an empty collection (no client reached a trustworthy
/// server) and the outcome itself for a single-element collection.
pub fn compute_outcomes<R: Rng + ?Sized>(outcomes: &[Outcome], rng: &mut R) -> Option<Outcome> {
    match outcomes {
        [] => None,
        [only] => Some(only.clone()),
        [first, rest @ ..] => Some(first.aggregate(rest, rng)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn interval(value: f64, path: usize) -> Outcome {
        Outcome::single(Satisfaction::interval(value, 0.0, 1.0), path)
    }

    #[test]
    fn test_compute_outcomes_empty_and_single() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(compute_outcomes(&[], &mut rng).is_none());

        let one = interval(0.7, 3);
        assert_eq!(compute_outcomes(&[one.clone()], &mut rng), Some(one));
    }

    #[test]
    fn test_first_outcome_counts_once() {
        let mut rng = SmallRng::seed_from_u64(1);
        let a = interval(1.0, 1);
        let b = interval(0.0, 3);

        let agg = a.aggregate(&[b], &mut rng);
        assert!((agg.avg_satisfaction - 0.5).abs() < 1e-12);
        assert!((agg.avg_path_length - 2.0).abs() < 1e-12);
        assert_eq!(agg.transactions, 2);
    }

    #[test]
    fn test_aggregate_is_associative_over_means() {
        let mut rng = SmallRng::seed_from_u64(4);
        let a = interval(0.9, 1);
        let b = interval(0.2, 4);
        let c = interval(0.4, 2);

        let ab = a.aggregate(&[b.clone()], &mut rng);
        let ab_c = ab.aggregate(&[c.clone()], &mut rng);
        let abc = a.aggregate(&[b, c], &mut rng);

        assert!((ab_c.avg_satisfaction - abc.avg_satisfaction).abs() < 1e-9);
        assert!((ab_c.avg_path_length - abc.avg_path_length).abs() < 1e-9);
        assert_eq!(ab_c.transactions, abc.transactions);
    }

    #[test]
    fn test_energy_sentinel_is_excluded() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut with_relay = EnergyReport::default();
        with_relay.client = RoleEnergy::new(10.0, 1);
        with_relay.relay = RoleEnergy::new(4.0, 2);

        let mut without_relay = EnergyReport::default();
        without_relay.client = RoleEnergy::new(20.0, 1);

        let a = interval(1.0, 2).with_energy(with_relay);
        let b = interval(1.0, 1).with_energy(without_relay);
        let energy = a.aggregate(&[b], &mut rng).energy.unwrap();

        assert!((energy.client.mean - 15.0).abs() < 1e-12);
        // Only the contributing outcome counts for relays
        assert!((energy.relay.mean - 4.0).abs() < 1e-12);
        assert_eq!(energy.relay.samples, 2);
        assert!(energy.malicious.is_sentinel());
    }

    #[test]
    fn test_tsv_columns() {
        let outcome = Outcome::single(Satisfaction::binary(true), 2);
        let line = outcome.to_tsv(false);
        let columns: Vec<&str> = line.split('\t').collect();
        assert_eq!(columns.len(), 7);
        assert_eq!(columns[0], "1");
        assert_eq!(columns[2], "2.000000");

        assert_eq!(outcome.to_tsv(true).split('\t').count(), 8);
        assert_eq!(Outcome::tsv_header(true).split('\t').count(), 8);
    }

    #[test]
    fn test_outcome_json_round_trip() {
        let outcome = interval(0.25, 5).with_energy(EnergyReport::default());
        let json = serde_json::to_string(&outcome).unwrap();
        let parsed: Outcome = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, outcome);
    }
}
