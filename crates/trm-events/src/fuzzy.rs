//! Fuzzy Trust Variable
//!
//! A linguistic variable over the trust domain [0, 1] with three Gaussian
//! terms: "Not Trust", "+/- Trust" and "Trust". Used by fuzzy satisfaction
//! and by the TRIP model to classify fused trust values.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Linguistic trust levels, ordered from least to most trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    NotTrust,
    MaybeTrust,
    Trust,
}

impl TrustLevel {
    /// Returns all levels in ascending order.
    pub fn all() -> &'static [TrustLevel] {
        &[TrustLevel::NotTrust, TrustLevel::MaybeTrust, TrustLevel::Trust]
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            TrustLevel::NotTrust => "Not Trust",
            TrustLevel::MaybeTrust => "+/- Trust",
            TrustLevel::Trust => "Trust",
        }
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Gaussian membership function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianTerm {
    pub mean: f64,
    pub sigma: f64,
}

impl GaussianTerm {
    pub fn new(mean: f64, sigma: f64) -> Self {
        Self { mean, sigma }
    }

    /// Unnormalized degree of membership of `x`.
    pub fn degree(&self, x: f64) -> f64 {
        if self.sigma <= 0.0 {
            return if (x - self.mean).abs() < f64::EPSILON { 1.0 } else { 0.0 };
        }
        let z = (x - self.mean) / self.sigma;
        (-0.5 * z * z).exp()
    }
}

/// Degrees of membership in each trust level. Normalized values sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Memberships {
    pub not_trust: f64,
    pub maybe_trust: f64,
    pub trust: f64,
}

impl Memberships {
    pub fn get(&self, level: TrustLevel) -> f64 {
        match level {
            TrustLevel::NotTrust => self.not_trust,
            TrustLevel::MaybeTrust => self.maybe_trust,
            TrustLevel::Trust => self.trust,
        }
    }

    pub fn sum(&self) -> f64 {
        self.not_trust + self.maybe_trust + self.trust
    }

    /// Level with the highest degree. Ties go to the less trusted level.
    pub fn dominant(&self) -> TrustLevel {
        let mut best = TrustLevel::NotTrust;
        for &level in TrustLevel::all() {
            if self.get(level) > self.get(best) {
                best = level;
            }
        }
        best
    }

    /// Averages the degrees of two membership sets term by term.
    pub fn average(&self, other: &Memberships) -> Memberships {
        Memberships {
            not_trust: (self.not_trust + other.not_trust) / 2.0,
            maybe_trust: (self.maybe_trust + other.maybe_trust) / 2.0,
            trust: (self.trust + other.trust) / 2.0,
        }
        .normalized()
    }

    fn normalized(self) -> Memberships {
        let total = self.sum();
        if total <= f64::EPSILON {
            return self;
        }
        Memberships {
            not_trust: self.not_trust / total,
            maybe_trust: self.maybe_trust / total,
            trust: self.trust / total,
        }
    }
}

/// The trust linguistic variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustVariable {
    pub not_trust: GaussianTerm,
    pub maybe_trust: GaussianTerm,
    pub trust: GaussianTerm,
}

impl Default for TrustVariable {
    fn default() -> Self {
        Self {
            not_trust: GaussianTerm::new(0.0, 0.2),
            maybe_trust: GaussianTerm::new(0.5, 0.15),
            trust: GaussianTerm::new(1.0, 0.2),
        }
    }
}

impl TrustVariable {
    pub fn term(&self, level: TrustLevel) -> GaussianTerm {
        match level {
            TrustLevel::NotTrust => self.not_trust,
            TrustLevel::MaybeTrust => self.maybe_trust,
            TrustLevel::Trust => self.trust,
        }
    }

    /// Normalized membership degrees of `x`.
    ///
    /// When every term is numerically zero the closest term gets full
    /// membership.
    pub fn memberships(&self, x: f64) -> Memberships {
        let raw = Memberships {
            not_trust: self.not_trust.degree(x),
            maybe_trust: self.maybe_trust.degree(x),
            trust: self.trust.degree(x),
        };
        if raw.sum() > f64::EPSILON {
            return raw.normalized();
        }

        let mut closest = TrustLevel::NotTrust;
        for &level in TrustLevel::all() {
            if (self.term(level).mean - x).abs() < (self.term(closest).mean - x).abs() {
                closest = level;
            }
        }
        let mut out = Memberships::default();
        match closest {
            TrustLevel::NotTrust => out.not_trust = 1.0,
            TrustLevel::MaybeTrust => out.maybe_trust = 1.0,
            TrustLevel::Trust => out.trust = 1.0,
        }
        out
    }

    /// Classifies `x` by roulette-wheel sampling over its membership degrees.
    pub fn classify<R: Rng + ?Sized>(&self, x: f64, rng: &mut R) -> TrustLevel {
        let memberships = self.memberships(x);
        let roll: f64 = rng.gen::<f64>() * memberships.sum();
        let mut cumulative = 0.0;
        for &level in TrustLevel::all() {
            cumulative += memberships.get(level);
            if roll < cumulative {
                return level;
            }
        }
        memberships.dominant()
    }

    /// Crisp value of a membership set (weighted mean of term centres).
    pub fn defuzzify(&self, memberships: &Memberships) -> f64 {
        let total = memberships.sum();
        if total <= f64::EPSILON {
            return self.maybe_trust.mean;
        }
        TrustLevel::all()
            .iter()
            .map(|&level| memberships.get(level) * self.term(level).mean)
            .sum::<f64>()
            / total
    }

    /// Probability with which a "+/- Trust" candidate is accepted:
    /// `mean(+/- Trust) - mean(Not Trust) - sigma(Not Trust)`, clamped to [0, 1].
    pub fn maybe_trust_acceptance(&self) -> f64 {
        (self.maybe_trust.mean - self.not_trust.mean - self.not_trust.sigma).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_memberships_are_normalized() {
        let var = TrustVariable::default();
        for x in [0.0, 0.1, 0.33, 0.5, 0.77, 1.0] {
            let m = var.memberships(x);
            assert!((m.sum() - 1.0).abs() < 1e-9, "sum at {} was {}", x, m.sum());
        }
    }

    #[test]
    fn test_extremes_are_dominated_by_outer_terms() {
        let var = TrustVariable::default();
        assert_eq!(var.memberships(0.0).dominant(), TrustLevel::NotTrust);
        assert_eq!(var.memberships(0.5).dominant(), TrustLevel::MaybeTrust);
        assert_eq!(var.memberships(1.0).dominant(), TrustLevel::Trust);
    }

    #[test]
    fn test_far_value_falls_back_to_closest_term() {
        let var = TrustVariable {
            not_trust: GaussianTerm::new(0.0, 0.001),
            maybe_trust: GaussianTerm::new(0.5, 0.001),
            trust: GaussianTerm::new(1.0, 0.001),
        };
        let m = var.memberships(0.9);
        assert_eq!(m.trust, 1.0);
        assert_eq!(m.dominant(), TrustLevel::Trust);
    }

    #[test]
    fn test_classify_is_deterministic_with_seed() {
        let var = TrustVariable::default();
        let mut rng1 = SmallRng::seed_from_u64(7);
        let mut rng2 = SmallRng::seed_from_u64(7);

        let a: Vec<TrustLevel> =
            (0..50).map(|i| var.classify(i as f64 / 50.0, &mut rng1)).collect();
        let b: Vec<TrustLevel> =
            (0..50).map(|i| var.classify(i as f64 / 50.0, &mut rng2)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_classify_certain_trust() {
        let var = TrustVariable::default();
        let mut rng = SmallRng::seed_from_u64(1);
        // Membership of Trust at 1.0 is above 0.99, so nearly every draw lands there
        let trusted = (0..200)
            .filter(|_| var.classify(1.0, &mut rng) == TrustLevel::Trust)
            .count();
        assert!(trusted > 190);
    }

    #[test]
    fn test_maybe_trust_acceptance() {
        let var = TrustVariable::default();
        assert!((var.maybe_trust_acceptance() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_defuzzify_round_trip_near_centres() {
        let var = TrustVariable::default();
        assert!(var.defuzzify(&var.memberships(1.0)) > 0.9);
        assert!(var.defuzzify(&var.memberships(0.0)) < 0.1);
    }

    #[test]
    fn test_average_memberships() {
        let var = TrustVariable::default();
        let low = var.memberships(0.0);
        let high = var.memberships(1.0);
        let avg = low.average(&high);
        assert!((avg.sum() - 1.0).abs() < 1e-9);
        assert!((avg.not_trust - avg.trust).abs() < 1e-9);
    }
}
