//! Configuration loading for the simulation driver.
//!
//! Driver settings are read from a TOML file with a `[network]` and a
//! `[simulation]` section. Every field has a default, so partial files work.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use trm_core::{GenerationConfig, NetworkFlags, ServiceProfile};
use trm_events::Service;

/// Complete driver configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriverConfig {
    /// How networks are built or loaded
    #[serde(default)]
    pub network: NetworkConfig,
    /// What is run and for how long
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl DriverConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Serializes the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, TomlSerializeError> {
        toml::to_string_pretty(self).map_err(TomlSerializeError)
    }
}

/// Network generation and perturbation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Fewest sensors in a generated network
    pub min_sensors: usize,
    /// Most sensors in a generated network
    pub max_sensors: usize,
    /// Probability that a sensor is a client
    pub prob_client: f64,
    /// Probability that a server offers the requested service
    pub prob_service: f64,
    /// Probability that an offering server is benevolent
    pub prob_goodness: f64,
    /// Radio range as a fraction of the region diagonal
    pub range_factor: f64,
    /// Side of the square region
    pub max_distance: f64,
    pub service_id: u32,
    pub service_name: String,
    /// Probability that a sensor sleeps during an execution (dynamic mode)
    pub sleep_probability: f64,
    pub collusion: bool,
    pub dynamic: bool,
    pub oscillating: bool,
    /// Executions between goodness oscillations
    pub oscillation_interval: u32,
    /// Network file to load instead of generating one per round
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            min_sensors: 20,
            max_sensors: 50,
            prob_client: 0.3,
            prob_service: 0.5,
            prob_goodness: 0.5,
            range_factor: 0.25,
            max_distance: 100.0,
            service_id: 1,
            service_name: "Temperature".to_string(),
            sleep_probability: 0.1,
            collusion: false,
            dynamic: false,
            oscillating: false,
            oscillation_interval: 1,
            file: None,
        }
    }
}

impl NetworkConfig {
    pub fn service(&self) -> Service {
        Service::new(self.service_id, self.service_name.clone())
    }

    pub fn flags(&self) -> NetworkFlags {
        NetworkFlags {
            collusion: self.collusion,
            dynamic: self.dynamic,
            oscillating: self.oscillating,
        }
    }

    /// Generation settings for a network of `num_sensors`.
    pub fn generation(&self, num_sensors: usize) -> GenerationConfig {
        GenerationConfig {
            num_sensors,
            prob_client: self.prob_client,
            range_factor: self.range_factor,
            max_distance: self.max_distance,
            profiles: vec![ServiceProfile {
                service: self.service(),
                prob_offer: self.prob_service,
                prob_goodness: self.prob_goodness,
            }],
            flags: self.flags(),
        }
    }

    /// Inclusive sensor-count range, tolerating swapped bounds.
    pub fn sensor_range(&self) -> (usize, usize) {
        if self.min_sensors <= self.max_sensors {
            (self.min_sensors, self.max_sensors)
        } else {
            (self.max_sensors, self.min_sensors)
        }
    }
}

/// How client workers within an execution are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One client after another on the driver thread; reproducible
    #[default]
    Sequential,
    /// Clients run on the rayon pool
    Parallel,
}

/// Simulation run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Registered model name
    pub model: String,
    pub rounds: u32,
    /// Executions (client batches) per round
    pub executions: u32,
    pub seed: u64,
    pub mode: ExecutionMode,
    /// TSV file receiving one line per round
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            model: "eigentrust".to_string(),
            rounds: 10,
            executions: 5,
            seed: 42,
            mode: ExecutionMode::Sequential,
            output: None,
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Error that can occur during TOML serialization.
#[derive(Debug, Error)]
#[error("TOML serialize error: {0}")]
pub struct TomlSerializeError(pub toml::ser::Error);

/// Generates a default configuration file content.
pub fn default_config_toml() -> String {
    r#"# Trust model simulation configuration

[network]
min_sensors = 20
max_sensors = 50
prob_client = 0.3
prob_service = 0.5
prob_goodness = 0.5
range_factor = 0.25
max_distance = 100.0
service_id = 1
service_name = "Temperature"
sleep_probability = 0.1
collusion = false
dynamic = false
oscillating = false
oscillation_interval = 1
# file = "network.xml"

[simulation]
model = "eigentrust"
rounds = 10
executions = 5
seed = 42
mode = "sequential"
# output = "outcomes.tsv"
"#
    .to_string()
}
