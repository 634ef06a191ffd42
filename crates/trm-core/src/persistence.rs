//! Network Persistence
//!
//! XML documents describing a network:
//!
//! ```xml
//! <network max_distance="100" range_factor="0.2"
//!          collusion="false" dynamic="false" oscillating="false">
//!   <sensor id="1" x="0.12" y="0.5" client="true">
//!     <neighbor id="2" type="server"/>
//!   </sensor>
//!   <sensor id="2" x="0.3" y="0.41" client="false">
//!     <service id="0" name="Relay" goodness="1"/>
//!     <service id="1" name="Temperature" goodness="0"/>
//!     <neighbor id="1" type="client"/>
//!   </sensor>
//! </network>
//! ```
//!
//! Coordinates are stored divided by `max_distance`. A neighbor's `type` is
//! `server` when it offers any service, `client` otherwise. A document
//! without any `neighbor` element is linked by radio range on load.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use trm_events::{OfferedService, Service, RELAY_SERVICE_ID};

use crate::error::{Result, TrmError};
use crate::geometry::Position;
use crate::topology::{Network, NetworkFlags, Sensor, SensorId};

const CLIENT_TYPE: &str = "client";
const SERVER_TYPE: &str = "server";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "network")]
struct NetworkXml {
    #[serde(rename = "@max_distance")]
    max_distance: f64,
    #[serde(rename = "@range_factor", default)]
    range_factor: f64,
    #[serde(rename = "@collusion", default)]
    collusion: bool,
    #[serde(rename = "@dynamic", default)]
    dynamic: bool,
    #[serde(rename = "@oscillating", default)]
    oscillating: bool,
    #[serde(rename = "sensor", default)]
    sensors: Vec<SensorXml>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SensorXml {
    #[serde(rename = "@id")]
    id: SensorId,
    #[serde(rename = "@x")]
    x: f64,
    #[serde(rename = "@y")]
    y: f64,
    #[serde(rename = "@client", default)]
    client: bool,
    #[serde(rename = "service", default)]
    services: Vec<ServiceXml>,
    #[serde(rename = "neighbor", default)]
    neighbors: Vec<NeighborXml>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ServiceXml {
    #[serde(rename = "@id")]
    id: u32,
    #[serde(rename = "@name", default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "@goodness")]
    goodness: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct NeighborXml {
    #[serde(rename = "@id")]
    id: SensorId,
    #[serde(rename = "@type")]
    kind: String,
}

fn sensor_type<S>(sensor: &Sensor<S>) -> &'static str {
    if sensor.is_server() {
        SERVER_TYPE
    } else {
        CLIENT_TYPE
    }
}

fn scale(max_distance: f64) -> f64 {
    if max_distance > 0.0 {
        max_distance
    } else {
        1.0
    }
}

/// Serializes a network to an XML document.
pub fn to_xml<S>(network: &Network<S>) -> Result<String> {
    let factor = scale(network.max_distance());
    let doc = NetworkXml {
        max_distance: network.max_distance(),
        range_factor: network.range_factor(),
        collusion: network.flags.collusion,
        dynamic: network.flags.dynamic,
        oscillating: network.flags.oscillating,
        sensors: network
            .sensors()
            .map(|s| SensorXml {
                id: s.id,
                x: s.position.x / factor,
                y: s.position.y / factor,
                client: s.client,
                services: s
                    .services
                    .iter()
                    .map(|o| ServiceXml {
                        id: o.service.id,
                        name: Some(o.service.name.clone()),
                        goodness: o.goodness,
                    })
                    .collect(),
                neighbors: s
                    .neighbors
                    .iter()
                    .filter_map(|&n| network.sensor(n))
                    .map(|n| NeighborXml {
                        id: n.id,
                        kind: sensor_type(n).to_string(),
                    })
                    .collect(),
            })
            .collect(),
    };
    quick_xml::se::to_string(&doc).map_err(|e| TrmError::Xml(e.to_string()))
}

/// Parses and validates an XML document. No network is returned unless
/// every reference in it is sound.
pub fn from_xml<S: Default>(text: &str) -> Result<Network<S>> {
    let doc: NetworkXml = quick_xml::de::from_str(text).map_err(|e| TrmError::Xml(e.to_string()))?;
    let factor = scale(doc.max_distance);

    let mut network = Network::new(doc.max_distance).with_flags(NetworkFlags {
        collusion: doc.collusion,
        dynamic: doc.dynamic,
        oscillating: doc.oscillating,
    });

    let mut seen = HashSet::new();
    for s in &doc.sensors {
        if !seen.insert(s.id) {
            return Err(TrmError::DuplicateSensor(s.id));
        }
        let position = Position::new(s.x * factor, s.y * factor);
        let mut sensor = Sensor::new(s.id, position).with_client(s.client);
        for service in &s.services {
            let svc = if service.id == RELAY_SERVICE_ID {
                Service::relay()
            } else {
                let name = service
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Service {}", service.id));
                Service::new(service.id, name)
            };
            sensor.offer(OfferedService::new(svc, service.goodness));
        }
        network.add_sensor(sensor)?;
    }

    let explicit = doc.sensors.iter().any(|s| !s.neighbors.is_empty());
    if !explicit {
        network.set_neighbors(doc.range_factor);
        tracing::debug!("No neighbor lists, linked {} sensors by range", network.len());
        return Ok(network);
    }

    network.set_range(doc.range_factor);
    for s in &doc.sensors {
        for n in &s.neighbors {
            if n.id == s.id {
                return Err(TrmError::SelfLink(s.id));
            }
            let neighbor = network.sensor(n.id).ok_or(TrmError::UndefinedSensor {
                sensor: s.id,
                neighbor: n.id,
            })?;
            if n.kind != CLIENT_TYPE && n.kind != SERVER_TYPE {
                return Err(TrmError::Xml(format!(
                    "sensor {} has neighbor {} of unknown type {:?}",
                    s.id, n.id, n.kind
                )));
            }
            let actual = sensor_type(neighbor);
            if n.kind != actual {
                return Err(TrmError::NeighborTypeMismatch {
                    sensor: s.id,
                    neighbor: n.id,
                    declared: n.kind.clone(),
                    actual: actual.to_string(),
                });
            }
            network.link(s.id, n.id)?;
        }
    }
    Ok(network)
}

pub fn save_network<S>(network: &Network<S>, path: &Path) -> Result<()> {
    let xml = to_xml(network)?;
    std::fs::write(path, xml)?;
    tracing::info!("Saved network of {} sensors to {:?}", network.len(), path);
    Ok(())
}

pub fn load_network<S: Default>(path: &Path) -> Result<Network<S>> {
    let text = std::fs::read_to_string(path)?;
    let network = from_xml(&text)?;
    tracing::info!("Loaded network of {} sensors from {:?}", network.len(), path);
    Ok(network)
}
