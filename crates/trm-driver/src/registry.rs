//! Model Registry
//!
//! Maps model names to a parameter parser and a model factory, so a model
//! can be picked by name from the command line or a configuration file.

use std::collections::BTreeMap;
use std::path::Path;

use trm_core::{
    load_params, EigenTrust, EigenTrustParams, PeerTrust, PeerTrustParams, PowerTrust,
    PowerTrustParams, Trip, TripParams, TrustModel,
};

use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::progress::ProgressSink;
use crate::runner::{Simulation, SimulationReport, StopHandle};

/// A model with its parameters resolved, ready to run.
pub trait ModelRunner: Send + Sync {
    fn name(&self) -> &'static str;

    /// Name of the model's privileged role, if any
    fn privileged_role(&self) -> Option<&'static str>;

    fn run(
        &self,
        config: &DriverConfig,
        sink: &mut dyn ProgressSink,
        stop: &StopHandle,
    ) -> Result<SimulationReport, DriverError>;
}

/// Parameters plus the constructor that turns them into a model. A fresh
/// model is built for every run.
struct Runner<P, M> {
    params: P,
    build: fn(P) -> M,
}

impl<P, M> ModelRunner for Runner<P, M>
where
    P: Clone + Send + Sync + 'static,
    M: TrustModel + 'static,
{
    fn name(&self) -> &'static str {
        (self.build)(self.params.clone()).name()
    }

    fn privileged_role(&self) -> Option<&'static str> {
        (self.build)(self.params.clone()).privileged_role()
    }

    fn run(
        &self,
        config: &DriverConfig,
        sink: &mut dyn ProgressSink,
        stop: &StopHandle,
    ) -> Result<SimulationReport, DriverError> {
        let model = (self.build)(self.params.clone());
        Simulation::new(model, config.clone())
            .with_stop_handle(stop.clone())
            .run(sink)
    }
}

type Factory = Box<dyn Fn(Option<&Path>) -> Box<dyn ModelRunner> + Send + Sync>;

/// Name-keyed model constructors. Names are matched case-insensitively.
#[derive(Default)]
pub struct ModelRegistry {
    factories: BTreeMap<String, Factory>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding EigenTrust, PeerTrust, PowerTrust and TRIP.
    pub fn with_builtin_models() -> Self {
        let mut registry = Self::new();
        registry.register("eigentrust", load_params::<EigenTrustParams>, EigenTrust::new);
        registry.register("peertrust", load_params::<PeerTrustParams>, PeerTrust::new);
        registry.register("powertrust", load_params::<PowerTrustParams>, PowerTrust::new);
        registry.register("trip", load_params::<TripParams>, Trip::new);
        registry
    }

    /// Registers a model under `name`.
    pub fn register<P, M>(&mut self, name: &str, parse: fn(Option<&Path>) -> P, build: fn(P) -> M)
    where
        P: Clone + Send + Sync + 'static,
        M: TrustModel + 'static,
    {
        let factory: Factory = Box::new(move |params: Option<&Path>| -> Box<dyn ModelRunner> {
            Box::new(Runner {
                params: parse(params),
                build,
            })
        });
        self.factories.insert(name.to_lowercase(), factory);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_lowercase())
    }

    /// Builds the named model, reading its parameters from `params`.
    pub fn create(
        &self,
        name: &str,
        params: Option<&Path>,
    ) -> Result<Box<dyn ModelRunner>, DriverError> {
        let factory = self
            .factories
            .get(&name.to_lowercase())
            .ok_or_else(|| DriverError::UnknownModel(name.to_string()))?;
        Ok(factory(params))
    }
}
