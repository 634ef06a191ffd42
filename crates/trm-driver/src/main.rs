//! Trust model simulator
//!
//! Runs EigenTrust, PeerTrust, PowerTrust or TRIP over randomly generated or
//! loaded sensor networks and reports the outcome of every round.

use clap::Parser;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use trm_core::{save_network, Network};
use trm_driver::{
    default_config_toml, CallbackSink, DriverConfig, DriverError, ExecutionMode, ModelRegistry,
    OutcomeExporter, StopHandle,
};
use trm_events::SimulationEvent;

/// Command line arguments for the simulator
#[derive(Parser, Debug)]
#[command(name = "trm_sim")]
#[command(about = "Trust and reputation model simulator for sensor networks")]
struct Args {
    /// Trust model to run
    #[arg(long)]
    model: Option<String>,

    /// Driver configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Model parameter file
    #[arg(long)]
    params: Option<PathBuf>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    rounds: Option<u32>,

    /// Executions per round
    #[arg(long)]
    executions: Option<u32>,

    /// Network file to run on instead of generating networks
    #[arg(long)]
    network: Option<PathBuf>,

    /// Generate one network, save it here and run every round on it
    #[arg(long)]
    save_network: Option<PathBuf>,

    /// TSV file receiving one line per round
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON file receiving the full simulation report
    #[arg(long)]
    report: Option<PathBuf>,

    /// Run the clients of an execution in parallel
    #[arg(long)]
    parallel: bool,

    /// Print a default configuration file and exit
    #[arg(long)]
    print_default_config: bool,

    /// List the available models and exit
    #[arg(long)]
    list_models: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), DriverError> {
    if args.print_default_config {
        print!("{}", default_config_toml());
        return Ok(());
    }

    let registry = ModelRegistry::with_builtin_models();
    if args.list_models {
        for name in registry.names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => DriverConfig::from_file(path)?,
        None => DriverConfig::default(),
    };
    apply_overrides(&mut config, &args);

    if let Some(path) = &args.save_network {
        let mut rng = SmallRng::seed_from_u64(config.simulation.seed);
        let (min, max) = config.network.sensor_range();
        let generation = config.network.generation(rng.gen_range(min..=max));
        let network: Network<()> = Network::generate(&generation, &mut rng);
        save_network(&network, path)?;
        config.network.file = Some(path.clone());
    }

    let runner = registry.create(&config.simulation.model, args.params.as_deref())?;
    let sim = &config.simulation;

    println!("Trust Model Simulator");
    println!("=====================");
    println!("Model: {}", runner.name());
    println!("Seed: {}", sim.seed);
    println!("Rounds: {}", sim.rounds);
    println!("Executions per round: {}", sim.executions);
    println!("Mode: {:?}", sim.mode);
    match &config.network.file {
        Some(path) => println!("Network: {}", path.display()),
        None => {
            let (min, max) = config.network.sensor_range();
            println!("Network: generated, {}-{} sensors", min, max);
        }
    }
    println!();

    let mut sink = CallbackSink(|event: &SimulationEvent| match event {
        SimulationEvent::Status { message } => println!("  {}", message),
        SimulationEvent::Outcome {
            round,
            outcome: Some(outcome),
            ..
        } => println!(
            "[Round {:>3}] satisfied: {:<5} satisfaction: {:.3} path length: {:.2} \
             ({} transactions)",
            round,
            outcome.is_satisfied(),
            outcome.avg_satisfaction,
            outcome.avg_path_length,
            outcome.transactions
        ),
        _ => {}
    });
    let report = runner.run(&config, &mut sink, &StopHandle::new())?;

    if let Some(path) = &config.simulation.output {
        let privileged = runner.privileged_role().is_some();
        let mut exporter = OutcomeExporter::new(path, privileged).map_err(DriverError::Export)?;
        for record in &report.rounds {
            exporter
                .write_round(record.round, record.outcome.as_ref())
                .map_err(DriverError::Export)?;
        }
        exporter.flush().map_err(DriverError::Export)?;
        println!("Wrote {} rounds to {}", exporter.rows(), path.display());
    }

    if let Some(path) = &args.report {
        let file = File::create(path).map_err(DriverError::Export)?;
        serde_json::to_writer_pretty(BufWriter::new(file), &report)
            .map_err(|e| DriverError::Export(e.into()))?;
        println!("Wrote report to {}", path.display());
    }

    println!();
    println!(
        "Simulation complete. {} of {} rounds satisfied.",
        report.satisfied_rounds(),
        report.rounds.len()
    );
    match &report.overall {
        Some(overall) => println!(
            "Overall: satisfaction {:.3}, path length {:.2} over {} transactions",
            overall.avg_satisfaction, overall.avg_path_length, overall.transactions
        ),
        None => println!("No trustworthy path found in any round."),
    }
    Ok(())
}

fn apply_overrides(config: &mut DriverConfig, args: &Args) {
    if let Some(model) = &args.model {
        config.simulation.model = model.clone();
    }
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    if let Some(rounds) = args.rounds {
        config.simulation.rounds = rounds;
    }
    if let Some(executions) = args.executions {
        config.simulation.executions = executions;
    }
    if let Some(network) = &args.network {
        config.network.file = Some(network.clone());
    }
    if let Some(output) = &args.output {
        config.simulation.output = Some(output.clone());
    }
    if args.parallel {
        config.simulation.mode = ExecutionMode::Parallel;
    }
}
