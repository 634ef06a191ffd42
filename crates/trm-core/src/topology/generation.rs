//! Random Network Generation
//!
//! Places sensors uniformly in a square, draws client/server roles and
//! service offerings, then links every pair within radio range.

use rand::Rng;
use serde::{Deserialize, Serialize};

use trm_events::{OfferedService, Service};

use super::network::{Network, NetworkFlags};
use super::sensor::{Sensor, SensorId};
use crate::geometry::Position;

/// How a service is distributed among servers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceProfile {
    pub service: Service,
    /// Probability that a server offers the service
    pub prob_offer: f64,
    /// Probability that an offering server serves it well
    pub prob_goodness: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub num_sensors: usize,
    pub prob_client: f64,
    /// Radio range as a fraction of the region diagonal
    pub range_factor: f64,
    /// Side of the square region
    pub max_distance: f64,
    pub profiles: Vec<ServiceProfile>,
    #[serde(default)]
    pub flags: NetworkFlags,
}

impl<S: Default> Network<S> {
    /// Generates a random network. Sensor ids run from 1 to `num_sensors`.
    ///
    /// Each sensor is a client with probability `prob_client`; every other
    /// sensor is a server offering `Relay` plus each profiled service with
    /// its `prob_offer`, at goodness 1.0 with probability `prob_goodness`
    /// and 0.0 otherwise.
    pub fn generate<R: Rng + ?Sized>(config: &GenerationConfig, rng: &mut R) -> Network<S> {
        let mut network = Network::new(config.max_distance).with_flags(config.flags);

        for i in 0..config.num_sensors {
            let id = (i + 1) as SensorId;
            let position = Position::new(
                rng.gen::<f64>() * config.max_distance,
                rng.gen::<f64>() * config.max_distance,
            );
            let client = rng.gen_bool(config.prob_client.clamp(0.0, 1.0));
            let mut sensor = Sensor::new(id, position).with_client(client);

            if !client {
                sensor.offer(OfferedService::relay());
                for profile in &config.profiles {
                    if rng.gen_bool(profile.prob_offer.clamp(0.0, 1.0)) {
                        let good = rng.gen_bool(profile.prob_goodness.clamp(0.0, 1.0));
                        let goodness = if good { 1.0 } else { 0.0 };
                        sensor.offer(OfferedService::new(profile.service.clone(), goodness));
                    }
                }
            }

            // Ids are fresh, so this cannot collide
            let _ = network.add_sensor(sensor);
        }

        network.set_neighbors(config.range_factor);
        tracing::info!(
            "Generated network: {} sensors, {} clients, {} servers",
            network.len(),
            network.clients().count(),
            network.servers().count()
        );
        network
    }
}
