//! Snapshot Types
//!
//! Serializable view of a network at a point in time, pushed to progress
//! sinks after each round and used for analysis and debugging.

use serde::{Deserialize, Serialize};

use crate::outcome::Role;

/// Position, role and energy of one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub active: bool,
    pub client: bool,
    pub server: bool,
    /// Role for the service the snapshot was taken against
    pub role: Role,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub neighbors: Vec<u32>,
    #[serde(default)]
    pub transmitted_distance: f64,
}

/// Whole-network snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub service: String,
    pub max_distance: f64,
    pub radio_range: f64,
    pub sensors: Vec<SensorSnapshot>,
}

impl NetworkSnapshot {
    /// Number of sensors currently classified as `role`.
    pub fn count_role(&self, role: Role) -> usize {
        self.sensors.iter().filter(|s| s.role == role).count()
    }

    pub fn active_count(&self) -> usize {
        self.sensors.iter().filter(|s| s.active).count()
    }

    /// Total transmitted distance of all sensors.
    pub fn total_energy(&self) -> f64 {
        self.sensors.iter().map(|s| s.transmitted_distance).sum()
    }

    pub fn sensor(&self, id: u32) -> Option<&SensorSnapshot> {
        self.sensors.iter().find(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor(id: u32, role: Role, active: bool, energy: f64) -> SensorSnapshot {
        SensorSnapshot {
            id,
            x: 0.0,
            y: 0.0,
            active,
            client: role == Role::Client,
            server: role != Role::Client,
            role,
            privileged: role == Role::Privileged,
            neighbors: vec![],
            transmitted_distance: energy,
        }
    }

    #[test]
    fn test_snapshot_counts() {
        let snapshot = NetworkSnapshot {
            service: "Temperature".into(),
            max_distance: 100.0,
            radio_range: 30.0,
            sensors: vec![
                sensor(1, Role::Client, true, 5.0),
                sensor(2, Role::Benevolent, false, 1.5),
                sensor(3, Role::Relay, true, 0.0),
            ],
        };

        assert_eq!(snapshot.count_role(Role::Client), 1);
        assert_eq!(snapshot.count_role(Role::Malicious), 0);
        assert_eq!(snapshot.active_count(), 2);
        assert!((snapshot.total_energy() - 6.5).abs() < 1e-12);
        assert_eq!(snapshot.sensor(2).map(|s| s.role), Some(Role::Benevolent));
    }

    #[test]
    fn test_snapshot_defaults_on_deserialize() {
        let json = r#"{"service":"s","max_distance":1.0,"radio_range":0.5,"sensors":[
            {"id":1,"x":0.1,"y":0.2,"active":true,"client":true,"server":false,"role":"client"}]}"#;
        let snapshot: NetworkSnapshot = serde_json::from_str(json).unwrap();
        assert!(snapshot.sensors[0].neighbors.is_empty());
        assert!(!snapshot.sensors[0].privileged);
    }
}
