//! Simulation Runner
//!
//! Rounds and executions. Every round builds (or loads) a fresh network and
//! initializes the model on it; every execution perturbs the network when
//! dynamic or oscillating mode is on, then runs one decision cycle for each
//! active client and waits for all of them. A round's outcome aggregates
//! every successful transaction of its executions.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use trm_core::{load_network, run_client, Convergence, Network, SensorId, TrustModel};
use trm_events::{compute_outcomes, Outcome, Service, SimulationEvent};

use crate::config::{DriverConfig, ExecutionMode};
use crate::error::DriverError;
use crate::progress::ProgressSink;

/// Cooperative cancellation flag, checked between executions.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One finished round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: u32,
    /// `None` when no client reached a trustworthy server
    pub outcome: Option<Outcome>,
    pub convergence_warnings: Vec<Convergence>,
}

/// Everything a simulation produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub run_id: Uuid,
    pub model: String,
    pub rounds: Vec<RoundRecord>,
    pub overall: Option<Outcome>,
    /// True when the run was cancelled before its last round
    pub stopped: bool,
}

impl SimulationReport {
    pub fn outcomes(&self) -> impl Iterator<Item = Option<&Outcome>> {
        self.rounds.iter().map(|r| r.outcome.as_ref())
    }

    pub fn satisfied_rounds(&self) -> usize {
        self.rounds
            .iter()
            .filter(|r| r.outcome.as_ref().map_or(false, |o| o.is_satisfied()))
            .count()
    }
}

/// Runs a trust model over the networks described by a configuration.
pub struct Simulation<M: TrustModel> {
    model: M,
    config: DriverConfig,
    stop: StopHandle,
}

impl<M: TrustModel> Simulation<M> {
    pub fn new(model: M, config: DriverConfig) -> Self {
        Self {
            model,
            config,
            stop: StopHandle::new(),
        }
    }

    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn run(&self, sink: &mut dyn ProgressSink) -> Result<SimulationReport, DriverError> {
        let sim = &self.config.simulation;
        let service = self.config.network.service();
        let mut rng = SmallRng::seed_from_u64(sim.seed);
        let mut report = SimulationReport {
            run_id: Uuid::new_v4(),
            model: self.model.name().to_string(),
            rounds: Vec::new(),
            overall: None,
            stopped: false,
        };

        tracing::info!(
            "Running {} for {} rounds of {} executions (seed {}, {:?})",
            self.model.name(),
            sim.rounds,
            sim.executions,
            sim.seed,
            sim.mode
        );
        sink.status(format!("Simulation {} started with {}", report.run_id, self.model.name()));

        for round in 1..=sim.rounds {
            if self.stop.is_stopped() {
                report.stopped = true;
                break;
            }

            let mut network = self.build_network(&mut rng)?;
            self.model.initialize(&mut network, &service, &mut rng)?;
            tracing::info!(
                "Round {}: {} sensors, {} clients",
                round,
                network.len(),
                network.clients().count()
            );

            let mut outcomes = Vec::new();
            for execution in 0..sim.executions {
                if self.stop.is_stopped() {
                    report.stopped = true;
                    break;
                }
                self.perturb(&mut network, &service, execution, &mut rng);
                let result =
                    self.run_execution(&network, &service, round, &mut rng, &mut outcomes);
                if let Err(e) = result {
                    sink.status(format!("Round {} halted: {}", round, e));
                    return Err(e);
                }
            }

            let outcome = compute_outcomes(&outcomes, &mut rng);
            let convergence_warnings = self.model.drain_warnings();
            for warning in &convergence_warnings {
                sink.status(format!("Round {}: {}", round, warning));
            }

            match &outcome {
                Some(o) => tracing::info!(
                    "Round {}: {} transactions, satisfaction {:.3}, path length {:.2}",
                    round,
                    o.transactions,
                    o.avg_satisfaction,
                    o.avg_path_length
                ),
                None => {
                    tracing::warn!("Round {}: no trustworthy path found", round);
                    sink.status(format!("Round {}: no trustworthy path found", round));
                }
            }

            let finished: Vec<Outcome> = report
                .rounds
                .iter()
                .filter_map(|r| r.outcome.clone())
                .chain(outcome.clone())
                .collect();
            report.overall = compute_outcomes(&finished, &mut rng);

            sink.send(SimulationEvent::Network {
                round,
                snapshot: network.snapshot(&service),
            });
            sink.send(SimulationEvent::Outcome {
                round,
                outcome: outcome.clone(),
                overall: report.overall.clone(),
            });
            report.rounds.push(RoundRecord {
                round,
                outcome,
                convergence_warnings,
            });

            if report.stopped {
                break;
            }
        }

        if report.stopped {
            sink.status(format!("Simulation stopped after {} rounds", report.rounds.len()));
        } else {
            sink.status(format!("Simulation finished after {} rounds", report.rounds.len()));
        }
        Ok(report)
    }

    fn build_network(&self, rng: &mut SmallRng) -> Result<Network<M::State>, DriverError> {
        let config = &self.config.network;
        let mut network = match &config.file {
            Some(path) => load_network(path)?,
            None => {
                let (min, max) = config.sensor_range();
                let num_sensors = rng.gen_range(min..=max);
                Network::generate(&config.generation(num_sensors), rng)
            }
        };
        network.flags = config.flags();
        Ok(network)
    }

    fn perturb(
        &self,
        network: &mut Network<M::State>,
        service: &Service,
        execution: u32,
        rng: &mut SmallRng,
    ) {
        let config = &self.config.network;
        if network.flags.dynamic {
            let asleep = network.toggle_activity(config.sleep_probability, rng);
            tracing::debug!("{} sensors asleep", asleep);
        }
        let interval = config.oscillation_interval.max(1);
        if network.flags.oscillating && execution > 0 && execution % interval == 0 {
            let report = network.oscillate(service, rng);
            tracing::debug!("Oscillation: {:?}", report);
        }
    }

    /// Runs one decision cycle for every active client and joins them all.
    fn run_execution(
        &self,
        network: &Network<M::State>,
        service: &Service,
        round: u32,
        rng: &mut SmallRng,
        outcomes: &mut Vec<Outcome>,
    ) -> Result<(), DriverError> {
        let clients: Vec<(SensorId, u64)> = network
            .active_clients()
            .into_iter()
            .map(|id| (id, rng.gen()))
            .collect();

        let worker = |&(client, seed): &(SensorId, u64)| -> Result<Option<Outcome>, DriverError> {
            let mut client_rng = SmallRng::seed_from_u64(seed);
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                run_client(&self.model, network, client, service, &mut client_rng)
            }));
            match result {
                Ok(Ok(report)) => Ok(report.outcome),
                Ok(Err(e)) => Err(DriverError::WorkerFailed {
                    round,
                    client,
                    message: e.to_string(),
                }),
                Err(payload) => Err(DriverError::WorkerFailed {
                    round,
                    client,
                    message: panic_message(payload.as_ref()),
                }),
            }
        };

        let results: Vec<Result<Option<Outcome>, DriverError>> = match self.config.simulation.mode {
            ExecutionMode::Sequential => clients.iter().map(worker).collect(),
            ExecutionMode::Parallel => clients.par_iter().map(worker).collect(),
        };

        for result in results {
            if let Some(outcome) = result? {
                outcomes.push(outcome);
            }
        }
        Ok(())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
