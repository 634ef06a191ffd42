//! Driver errors.

use thiserror::Error;

use trm_core::{SensorId, TrmError};

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("unknown model {0:?}")]
    UnknownModel(String),

    #[error(transparent)]
    Core(#[from] TrmError),

    #[error("worker for client {client} failed in round {round}: {message}")]
    WorkerFailed {
        round: u32,
        client: SensorId,
        message: String,
    },

    #[error("export failed: {0}")]
    Export(#[source] std::io::Error),
}
