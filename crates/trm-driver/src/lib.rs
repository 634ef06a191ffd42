//! Simulation driver: rounds, executions and reporting.
//!
//! The driver sits on top of `trm-core`. It picks a trust model by name,
//! builds or loads a network for every round, runs all clients of an
//! execution (one after another or on a worker pool), aggregates the
//! outcomes and pushes progress to a sink.
//!
//! # Modules
//!
//! - [`config`]: TOML driver configuration
//! - [`registry`]: model name to parameter parser and factory
//! - [`runner`]: the round/execution loop and its report
//! - [`progress`]: progress sinks
//! - [`export`]: TSV outcome history

pub mod config;
pub mod error;
pub mod export;
pub mod progress;
pub mod registry;
pub mod runner;

pub use config::{
    default_config_toml, ConfigError, DriverConfig, ExecutionMode, NetworkConfig,
    SimulationConfig, TomlSerializeError,
};
pub use error::DriverError;
pub use export::OutcomeExporter;
pub use progress::{CallbackSink, NullSink, ProgressSink};
pub use registry::{ModelRegistry, ModelRunner};
pub use runner::{RoundRecord, Simulation, SimulationReport, StopHandle};
