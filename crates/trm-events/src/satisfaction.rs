//! Satisfaction
//!
//! How satisfied a client was with a transaction. Three representations
//! exist (binary, interval and fuzzy); all of them aggregate pairwise into a
//! single representative value.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::fuzzy::{Memberships, TrustLevel, TrustVariable};
use crate::service::BENEVOLENCE_THRESHOLD;

/// A client's satisfaction with one or more transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Satisfaction {
    /// Satisfied or not
    Binary { satisfied: bool },
    /// A value within `[min, max]`, satisfied above the midpoint
    Interval { value: f64, min: f64, max: f64 },
    /// A crisp value with its fuzzy classification
    Fuzzy {
        value: f64,
        memberships: Memberships,
        level: TrustLevel,
    },
}

impl Satisfaction {
    pub fn binary(satisfied: bool) -> Self {
        Satisfaction::Binary { satisfied }
    }

    /// Binary satisfaction of being served with `goodness`.
    pub fn from_goodness(goodness: f64) -> Self {
        Satisfaction::binary(goodness >= BENEVOLENCE_THRESHOLD)
    }

    /// Creates an interval satisfaction. Bounds are reordered if needed and
    /// the value is clamped into them.
    pub fn interval(value: f64, min: f64, max: f64) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Satisfaction::Interval {
            value: value.clamp(min, max),
            min,
            max,
        }
    }

    /// Classifies `value` with the given fuzzy variable.
    pub fn fuzzy(value: f64, variable: &TrustVariable) -> Self {
        let value = value.clamp(0.0, 1.0);
        let memberships = variable.memberships(value);
        Satisfaction::Fuzzy {
            value,
            memberships,
            level: memberships.dominant(),
        }
    }

    pub fn is_satisfied(&self) -> bool {
        match self {
            Satisfaction::Binary { satisfied } => *satisfied,
            Satisfaction::Interval { value, min, max } => *value > (min + max) / 2.0,
            Satisfaction::Fuzzy { level, .. } => *level == TrustLevel::Trust,
        }
    }

    /// Satisfaction normalized into [0, 1].
    pub fn value(&self) -> f64 {
        match self {
            Satisfaction::Binary { satisfied } => {
                if *satisfied {
                    1.0
                } else {
                    0.0
                }
            }
            Satisfaction::Interval { value, min, max } => {
                let width = max - min;
                if width <= f64::EPSILON {
                    if value >= min {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    (value - min) / width
                }
            }
            Satisfaction::Fuzzy { value, .. } => *value,
        }
    }

    /// Combines two satisfactions into one representative value.
    ///
    /// - binary: agreeing inputs keep their value, disagreeing inputs pick
    ///   one uniformly at random (seed `rng` for reproducible results)
    /// - interval: bounds widen to cover both, values average
    /// - fuzzy: membership degrees average term by term
    ///
    /// Mixed representations combine as an interval over [0, 1] of their
    /// normalized values.
    pub fn aggregate<R: Rng + ?Sized>(&self, other: &Satisfaction, rng: &mut R) -> Satisfaction {
        match (self, other) {
            (Satisfaction::Binary { satisfied: a }, Satisfaction::Binary { satisfied: b }) => {
                if a == b {
                    Satisfaction::binary(*a)
                } else if rng.gen_bool(0.5) {
                    Satisfaction::binary(*a)
                } else {
                    Satisfaction::binary(*b)
                }
            }
            (
                Satisfaction::Interval {
                    value: v1,
                    min: min1,
                    max: max1,
                },
                Satisfaction::Interval {
                    value: v2,
                    min: min2,
                    max: max2,
                },
            ) => Satisfaction::interval((v1 + v2) / 2.0, min1.min(*min2), max1.max(*max2)),
            (
                Satisfaction::Fuzzy {
                    value: v1,
                    memberships: m1,
                    ..
                },
                Satisfaction::Fuzzy {
                    value: v2,
                    memberships: m2,
                    ..
                },
            ) => {
                let memberships = m1.average(m2);
                Satisfaction::Fuzzy {
                    value: (v1 + v2) / 2.0,
                    memberships,
                    level: memberships.dominant(),
                }
            }
            _ => Satisfaction::interval((self.value() + other.value()) / 2.0, 0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_binary_agreement_is_deterministic() {
        let mut rng = SmallRng::seed_from_u64(3);
        let yes = Satisfaction::binary(true);
        let no = Satisfaction::binary(false);

        assert_eq!(yes.aggregate(&yes, &mut rng), yes);
        assert_eq!(no.aggregate(&no, &mut rng), no);
    }

    #[test]
    fn test_binary_disagreement_picks_one_of_the_inputs() {
        // Disagreement is resolved randomly; assert only on the possible results
        let mut rng = SmallRng::seed_from_u64(11);
        let yes = Satisfaction::binary(true);
        let no = Satisfaction::binary(false);

        let mut seen_true = false;
        let mut seen_false = false;
        for _ in 0..64 {
            match yes.aggregate(&no, &mut rng) {
                Satisfaction::Binary { satisfied: true } => seen_true = true,
                Satisfaction::Binary { satisfied: false } => seen_false = true,
                other => panic!("unexpected aggregate {:?}", other),
            }
        }
        assert!(seen_true && seen_false);
    }

    #[test]
    fn test_binary_disagreement_reproducible_with_seed() {
        let yes = Satisfaction::binary(true);
        let no = Satisfaction::binary(false);
        let mut rng1 = SmallRng::seed_from_u64(99);
        let mut rng2 = SmallRng::seed_from_u64(99);

        let a: Vec<bool> = (0..20).map(|_| yes.aggregate(&no, &mut rng1).is_satisfied()).collect();
        let b: Vec<bool> = (0..20).map(|_| yes.aggregate(&no, &mut rng2).is_satisfied()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_interval_aggregate() {
        let mut rng = SmallRng::seed_from_u64(0);
        let a = Satisfaction::interval(0.2, 0.0, 1.0);
        let b = Satisfaction::interval(3.0, 1.0, 4.0);

        match a.aggregate(&b, &mut rng) {
            Satisfaction::Interval { value, min, max } => {
                assert_eq!(min, 0.0);
                assert_eq!(max, 4.0);
                assert!((value - 1.6).abs() < 1e-12);
            }
            other => panic!("expected interval, got {:?}", other),
        }
    }

    #[test]
    fn test_interval_satisfied_above_midpoint() {
        assert!(Satisfaction::interval(0.8, 0.0, 1.0).is_satisfied());
        assert!(!Satisfaction::interval(0.5, 0.0, 1.0).is_satisfied());
        assert!(!Satisfaction::interval(0.1, 0.0, 1.0).is_satisfied());
    }

    #[test]
    fn test_interval_value_is_normalized() {
        let s = Satisfaction::interval(3.0, 2.0, 6.0);
        assert!((s.value() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_fuzzy_satisfaction() {
        let var = TrustVariable::default();
        let good = Satisfaction::fuzzy(1.0, &var);
        let bad = Satisfaction::fuzzy(0.0, &var);

        assert!(good.is_satisfied());
        assert!(!bad.is_satisfied());

        let mut rng = SmallRng::seed_from_u64(5);
        let both = good.aggregate(&good, &mut rng);
        assert!(both.is_satisfied());
        assert!((both.value() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mixed_kinds_fall_back_to_interval() {
        let var = TrustVariable::default();
        let mut rng = SmallRng::seed_from_u64(5);
        let mixed = Satisfaction::binary(true).aggregate(&Satisfaction::fuzzy(0.0, &var), &mut rng);
        assert!(matches!(mixed, Satisfaction::Interval { .. }));
        assert!((mixed.value() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_serialization_tag() {
        let json = serde_json::to_string(&Satisfaction::binary(true)).unwrap();
        assert_eq!(json, r#"{"kind":"binary","satisfied":true}"#);
    }
}
