//! Path Search
//!
//! Breadth-first traversal over active sensors. Topology is frozen while a
//! round runs, so searches take the network by shared reference.

use std::collections::{HashMap, HashSet, VecDeque};

use super::network::Network;
use super::path::Path;
use super::sensor::SensorId;
use crate::conditions::SearchCondition;

impl<S> Network<S> {
    /// Paths from `source` to every reachable sensor satisfying `condition`,
    /// in discovery order.
    ///
    /// Every shortest route is kept, so a server reached through two relays
    /// at the same depth yields two paths. The search does not continue past
    /// a matching sensor, so no returned path has a matching intermediate.
    /// The source itself is never a match. Inactive sensors are neither
    /// matched nor traversed.
    pub fn find_paths(&self, source: SensorId, condition: &dyn SearchCondition<S>) -> Vec<Path> {
        let mut found = Vec::new();
        match self.sensor(source) {
            Some(s) if s.active => {}
            _ => return found,
        }

        // Depth at which each sensor was first reached
        let mut depth: HashMap<SensorId, usize> = HashMap::from([(source, 0)]);
        let mut queue = VecDeque::from([Path::single(source)]);

        while let Some(path) = queue.pop_front() {
            let hops = path.hops() + 1;
            for &next in self.neighbors_of(path.target()) {
                if depth.get(&next).map_or(false, |&d| d < hops) {
                    continue;
                }
                let Some(sensor) = self.sensor(next) else {
                    continue;
                };
                if !sensor.active {
                    continue;
                }
                depth.insert(next, hops);

                let extended = path.extended(next);
                if condition.matches(self, sensor) {
                    found.push(extended);
                } else {
                    queue.push_back(extended);
                }
            }
        }

        found
    }

    /// Hop count of the shortest active path between two sensors.
    pub fn distance_in_hops(&self, from: SensorId, to: SensorId) -> Option<usize> {
        if !self.contains(from) || !self.contains(to) {
            return None;
        }
        if from == to {
            return Some(0);
        }

        let mut visited: HashSet<SensorId> = HashSet::from([from]);
        let mut queue = VecDeque::from([(from, 0usize)]);
        while let Some((current, hops)) = queue.pop_front() {
            for &next in self.neighbors_of(current) {
                if !visited.insert(next) {
                    continue;
                }
                if next == to {
                    return Some(hops + 1);
                }
                if self.sensor(next).map_or(false, |s| s.active) {
                    queue.push_back((next, hops + 1));
                }
            }
        }
        None
    }

    /// Breadth-first tree paths from `source` to every active sensor at most
    /// `radius` hops away, excluding the source.
    pub fn hop_paths(&self, source: SensorId, radius: usize) -> Vec<Path> {
        let mut found = Vec::new();
        match self.sensor(source) {
            Some(s) if s.active => {}
            _ => return found,
        }

        let mut visited: HashSet<SensorId> = HashSet::from([source]);
        let mut queue = VecDeque::from([Path::single(source)]);
        while let Some(path) = queue.pop_front() {
            if path.hops() >= radius {
                continue;
            }
            for &next in self.neighbors_of(path.target()) {
                if !self.sensor(next).map_or(false, |s| s.active) || !visited.insert(next) {
                    continue;
                }
                let extended = path.extended(next);
                found.push(extended.clone());
                queue.push_back(extended);
            }
        }
        found
    }

    /// Sensors some active source can reach over at least one link, moving
    /// through active sensors only. A source only counts when another
    /// source reaches it.
    pub fn reachable_from(&self, sources: &[SensorId]) -> HashSet<SensorId> {
        let mut reached = HashSet::new();
        for &source in sources {
            if !self.sensor(source).map_or(false, |s| s.active) {
                continue;
            }
            let mut visited: HashSet<SensorId> = HashSet::from([source]);
            let mut queue = VecDeque::from([source]);
            while let Some(current) = queue.pop_front() {
                for &next in self.neighbors_of(current) {
                    if self.sensor(next).map_or(false, |s| s.active) && visited.insert(next) {
                        reached.insert(next);
                        queue.push_back(next);
                    }
                }
            }
        }
        reached
    }
}
