//! Path
//!
//! An ordered, non-empty sequence of sensors from a requesting client to a
//! target.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::sensor::SensorId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path(Vec<SensorId>);

impl Path {
    /// Zero-hop path consisting of `source` only.
    pub fn single(source: SensorId) -> Self {
        Path(vec![source])
    }

    /// Returns `None` for an empty sequence.
    pub fn from_sensors(sensors: Vec<SensorId>) -> Option<Self> {
        if sensors.is_empty() {
            None
        } else {
            Some(Path(sensors))
        }
    }

    /// New path with `next` appended.
    pub fn extended(&self, next: SensorId) -> Path {
        let mut sensors = self.0.clone();
        sensors.push(next);
        Path(sensors)
    }

    pub fn source(&self) -> SensorId {
        self.0[0]
    }

    pub fn target(&self) -> SensorId {
        self.0[self.0.len() - 1]
    }

    pub fn hops(&self) -> usize {
        self.0.len() - 1
    }

    pub fn sensors(&self) -> &[SensorId] {
        &self.0
    }

    /// Sensors strictly between source and target.
    pub fn intermediates(&self) -> &[SensorId] {
        if self.0.len() <= 2 {
            &[]
        } else {
            &self.0[1..self.0.len() - 1]
        }
    }

    pub fn contains(&self, id: SensorId) -> bool {
        self.0.contains(&id)
    }

    /// Consecutive `(from, to)` hops from source to target.
    pub fn hop_pairs(&self) -> impl Iterator<Item = (SensorId, SensorId)> + '_ {
        self.0.windows(2).map(|w| (w[0], w[1]))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|id| id.to_string()).collect();
        f.write_str(&parts.join(" -> "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_accessors() {
        let path = Path::from_sensors(vec![1, 4, 6, 9]).unwrap();
        assert_eq!(path.source(), 1);
        assert_eq!(path.target(), 9);
        assert_eq!(path.hops(), 3);
        assert_eq!(path.intermediates(), &[4, 6]);
        assert_eq!(path.hop_pairs().collect::<Vec<_>>(), vec![(1, 4), (4, 6), (6, 9)]);
        assert_eq!(path.to_string(), "1 -> 4 -> 6 -> 9");
    }

    #[test]
    fn test_single_and_empty() {
        assert!(Path::from_sensors(vec![]).is_none());

        let path = Path::single(3);
        assert_eq!(path.hops(), 0);
        assert_eq!(path.source(), path.target());
        assert!(path.intermediates().is_empty());
        assert_eq!(path.extended(5).hops(), 1);
    }
}
