//! Network
//!
//! Arena owning every sensor of a simulated network. Sensors refer to their
//! neighbors by id; adjacency is rebuilt from positions whenever the radio
//! range changes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use trm_events::{NetworkSnapshot, Role, SensorSnapshot, Service};

use super::path::Path;
use super::sensor::{Sensor, SensorId};
use crate::conditions::{Benevolent, Malicious, SearchCondition};
use crate::error::{Result, TrmError};
use crate::geometry::diagonal;

/// Behaviour switches carried by a network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkFlags {
    /// Malicious sensors lie in favour of each other
    pub collusion: bool,
    /// Sensors sleep and wake between executions
    pub dynamic: bool,
    /// Server goodness is reshuffled between executions
    pub oscillating: bool,
}

#[derive(Debug, Clone)]
pub struct Network<S> {
    sensors: Vec<Sensor<S>>,
    index: HashMap<SensorId, usize>,
    max_distance: f64,
    range_factor: f64,
    radio_range: f64,
    pub flags: NetworkFlags,
}

impl<S> Network<S> {
    /// Empty network over a square region of side `max_distance`.
    pub fn new(max_distance: f64) -> Self {
        Self {
            sensors: Vec::new(),
            index: HashMap::new(),
            max_distance,
            range_factor: 0.0,
            radio_range: 0.0,
            flags: NetworkFlags::default(),
        }
    }

    pub fn with_flags(mut self, flags: NetworkFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Adds a sensor. Neighbor lists are not touched.
    pub fn add_sensor(&mut self, sensor: Sensor<S>) -> Result<()> {
        if self.index.contains_key(&sensor.id) {
            return Err(TrmError::DuplicateSensor(sensor.id));
        }
        self.index.insert(sensor.id, self.sensors.len());
        self.sensors.push(sensor);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    /// Absolute radio range.
    pub fn radio_range(&self) -> f64 {
        self.radio_range
    }

    /// Radio range as a fraction of the region diagonal.
    pub fn range_factor(&self) -> f64 {
        self.range_factor
    }

    pub fn sensors(&self) -> impl Iterator<Item = &Sensor<S>> {
        self.sensors.iter()
    }

    pub fn sensors_mut(&mut self) -> impl Iterator<Item = &mut Sensor<S>> {
        self.sensors.iter_mut()
    }

    pub fn ids(&self) -> Vec<SensorId> {
        self.sensors.iter().map(|s| s.id).collect()
    }

    pub fn sensor(&self, id: SensorId) -> Option<&Sensor<S>> {
        self.index.get(&id).map(|&i| &self.sensors[i])
    }

    pub fn sensor_mut(&mut self, id: SensorId) -> Option<&mut Sensor<S>> {
        match self.index.get(&id) {
            Some(&i) => Some(&mut self.sensors[i]),
            None => None,
        }
    }

    /// Like [`Network::sensor`] but fails with `UnknownSensor`.
    pub fn get(&self, id: SensorId) -> Result<&Sensor<S>> {
        self.sensor(id).ok_or(TrmError::UnknownSensor(id))
    }

    pub fn contains(&self, id: SensorId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn clients(&self) -> impl Iterator<Item = &Sensor<S>> {
        self.sensors.iter().filter(|s| s.client)
    }

    pub fn servers(&self) -> impl Iterator<Item = &Sensor<S>> {
        self.sensors.iter().filter(|s| s.is_server())
    }

    /// Ids of active clients, in sensor order.
    pub fn active_clients(&self) -> Vec<SensorId> {
        self.clients().filter(|s| s.active).map(|s| s.id).collect()
    }

    pub fn neighbors_of(&self, id: SensorId) -> &[SensorId] {
        self.sensor(id).map(|s| s.neighbors.as_slice()).unwrap_or(&[])
    }

    pub fn distance(&self, a: SensorId, b: SensorId) -> Result<f64> {
        Ok(self.get(a)?.position.distance(&self.get(b)?.position))
    }

    /// Recomputes adjacency from scratch: two sensors are linked when their
    /// distance is within `range_factor` times the region diagonal. A zero
    /// range leaves the graph without edges.
    pub fn set_neighbors(&mut self, range_factor: f64) {
        self.set_range(range_factor);
        let range = self.radio_range;

        for sensor in &mut self.sensors {
            sensor.neighbors.clear();
        }
        if range <= 0.0 {
            return;
        }

        let positions: Vec<_> = self.sensors.iter().map(|s| (s.id, s.position)).collect();
        for (i, (a, pa)) in positions.iter().enumerate() {
            for (b, pb) in positions.iter().skip(i + 1) {
                if pa.distance(pb) <= range {
                    self.sensors[i].neighbors.push(*b);
                    let j = self.index[b];
                    self.sensors[j].neighbors.push(*a);
                }
            }
        }
    }

    /// Records the range without relinking, for networks with explicit
    /// neighbor lists.
    pub(crate) fn set_range(&mut self, range_factor: f64) {
        self.range_factor = range_factor.max(0.0);
        self.radio_range = self.range_factor * diagonal(self.max_distance);
    }

    /// Links two sensors in both directions.
    pub fn link(&mut self, a: SensorId, b: SensorId) -> Result<()> {
        if a == b {
            return Err(TrmError::SelfLink(a));
        }
        let ia = *self.index.get(&a).ok_or(TrmError::UnknownSensor(a))?;
        let ib = *self.index.get(&b).ok_or(TrmError::UnknownSensor(b))?;
        if !self.sensors[ia].neighbors.contains(&b) {
            self.sensors[ia].neighbors.push(b);
        }
        if !self.sensors[ib].neighbors.contains(&a) {
            self.sensors[ib].neighbors.push(a);
        }
        Ok(())
    }

    /// Checks that a path names known sensors and only crosses links.
    pub fn validate_path(&self, path: &Path) -> Result<()> {
        for &id in path.sensors() {
            self.get(id)?;
        }
        for (from, to) in path.hop_pairs() {
            if !self.get(from)?.is_neighbor(to) {
                return Err(TrmError::InvalidPath(format!(
                    "{} and {} are not neighbors in {}",
                    from, to, path
                )));
            }
        }
        Ok(())
    }

    /// Role of a sensor with respect to `service`.
    ///
    /// Privileged sensors report as privileged regardless of goodness;
    /// servers that neither serve the service well nor badly are relays.
    pub fn role_of(&self, id: SensorId, service: &Service) -> Role {
        let Some(sensor) = self.sensor(id) else {
            return Role::Client;
        };
        if sensor.is_privileged() {
            Role::Privileged
        } else if Benevolent::new(service.clone()).matches(self, sensor) {
            Role::Benevolent
        } else if Malicious::new(service.clone()).matches(self, sensor) {
            Role::Malicious
        } else if sensor.is_server() {
            Role::Relay
        } else {
            Role::Client
        }
    }

    /// Total transmitted distance per role.
    pub fn energy_by_role(&self, service: &Service) -> BTreeMap<Role, f64> {
        let mut totals = BTreeMap::new();
        for sensor in &self.sensors {
            *totals.entry(self.role_of(sensor.id, service)).or_insert(0.0) +=
                sensor.transmitted_distance();
        }
        totals
    }

    /// Serializable view of the current state.
    pub fn snapshot(&self, service: &Service) -> NetworkSnapshot {
        let sensors = self
            .sensors
            .iter()
            .map(|s| SensorSnapshot {
                id: s.id,
                x: s.position.x,
                y: s.position.y,
                active: s.active,
                client: s.client,
                server: s.is_server(),
                role: self.role_of(s.id, service),
                privileged: s.is_privileged(),
                neighbors: s.neighbors.clone(),
                transmitted_distance: s.transmitted_distance(),
            })
            .collect();

        NetworkSnapshot {
            service: service.name.clone(),
            max_distance: self.max_distance,
            radio_range: self.radio_range,
            sensors,
        }
    }
}

impl<S: Default> Network<S> {
    /// Clears per-sensor state and privileged flags before a run.
    pub fn reset_state(&mut self, window_size: usize) {
        for sensor in &mut self.sensors {
            sensor.reset_state(window_size);
        }
    }
}
