//! DIP Tuner binary
//!
//! Tunes sliding-mode controller gains with PSO against the reference
//! double inverted pendulum, and evaluates tuned or hand-picked gains.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dip_common::HistoryLog;
use dip_controllers::{ControllerKind, ControllerRegistry};
use dip_optimizer::{CostFunction, PsoTuner, TunedGains};
use dip_sim::{ClosedLoopSimulator, DoubleInvertedPendulum};
use dip_tuner::{
    EvaluationRecord, TunerConfig, TuningRecord, DEFAULT_CONFIG_PATH, TUNER_VERSION,
};

/// PSO gain tuning for DIP sliding-mode controllers
#[derive(Debug, Parser)]
#[command(name = "dip-tuner", version)]
struct Cli {
    /// Configuration file (missing file means defaults)
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List controller types with their default gains and search bounds
    List,
    /// Tune one controller type and write the best gains
    Tune {
        /// Controller type tag, e.g. `classical_smc`
        #[arg(long)]
        controller: String,
        /// Output JSON path; printed to stdout when omitted
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Overrides `pso.seed`
        #[arg(long)]
        seed: Option<u64>,
        /// Overrides `pso.n_particles`
        #[arg(long)]
        particles: Option<usize>,
        /// Overrides `pso.iters`
        #[arg(long)]
        iters: Option<usize>,
    },
    /// Simulate one controller and report its cost
    Evaluate {
        /// Controller type tag; not needed with `--gains-file`
        #[arg(long)]
        controller: Option<String>,
        /// Comma-separated gains, registry defaults when omitted
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        gains: Option<Vec<f64>>,
        /// Tuned gains file written by `tune`
        #[arg(long, conflicts_with_all = ["controller", "gains"])]
        gains_file: Option<PathBuf>,
    },
}

/// Plant, registry and simulator shared by the subcommands
struct Workbench {
    registry: Arc<ControllerRegistry>,
    simulator: ClosedLoopSimulator,
}

impl Workbench {
    fn new(cfg: &TunerConfig) -> Result<Self> {
        let plant = Arc::new(DoubleInvertedPendulum::new(cfg.plant)?);
        let registry = Arc::new(ControllerRegistry::new().with_plant(plant.clone()));
        let mut simulator = ClosedLoopSimulator::new(plant)
            .with_initial_state(cfg.initial_state())
            .with_integrator(cfg.simulation.integrator);
        if let Some(workers) = cfg.simulation.workers {
            simulator = simulator.with_workers(workers);
        }
        Ok(Self {
            registry,
            simulator,
        })
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    info!("Starting DIP tuner v{}", TUNER_VERSION);

    let cfg = TunerConfig::load(Some(&cli.config))
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    match cli.command {
        Command::List => list(&cfg),
        Command::Tune {
            controller,
            output,
            seed,
            particles,
            iters,
        } => tune(&cfg, &controller, output.as_deref(), seed, particles, iters),
        Command::Evaluate {
            controller,
            gains,
            gains_file,
        } => evaluate(&cfg, controller.as_deref(), gains, gains_file.as_deref()),
    }
}

fn list(cfg: &TunerConfig) -> Result<()> {
    let registry = ControllerRegistry::new();
    for tag in registry.list_types()? {
        let meta = registry.metadata(tag)?;
        let bounds = cfg.bounds(meta.kind, &registry)?;
        println!("{}: {}", tag, meta.description);
        for (i, name) in meta.gain_names().iter().enumerate() {
            println!(
                "  {:<8} default {:>8.3}   bounds [{}, {}]",
                name,
                meta.default_gains[i],
                bounds.lower()[i],
                bounds.upper()[i]
            );
        }
    }
    Ok(())
}

fn tune(
    cfg: &TunerConfig,
    controller: &str,
    output: Option<&Path>,
    seed: Option<u64>,
    particles: Option<usize>,
    iters: Option<usize>,
) -> Result<()> {
    let kind: ControllerKind = controller.parse()?;
    let bench = Workbench::new(cfg)?;
    let bounds = cfg.bounds(kind, &bench.registry)?;
    let n_particles = particles.unwrap_or(cfg.pso.n_particles);
    let iters = iters.unwrap_or(cfg.pso.iters);
    // Always run seeded so every record can be replayed
    let seed = seed.or(cfg.pso.seed).unwrap_or_else(rand::random);

    let tuner = PsoTuner::new(bench.registry.clone(), Arc::new(bench.simulator), kind)
        .with_cost(CostFunction::new(cfg.cost)?)
        .with_settings(cfg.controller_settings(kind))
        .with_config(cfg.pso.coefficients)
        .with_horizon(cfg.simulation.duration, cfg.simulation.dt);

    info!(
        controller = %kind,
        n_particles,
        iters,
        seed,
        "Tuning {} gains",
        bounds.dim()
    );
    let result = tuner.optimize_seeded(&bounds, n_particles, iters, seed)?;
    let record = TuningRecord::new(&result, Some(seed));

    match output {
        Some(path) => {
            record.save(path)?;
            info!(path = %path.display(), run_id = %record.run_id, "Wrote tuned gains");
        }
        None => println!("{}", serde_json::to_string_pretty(&record)?),
    }
    Ok(())
}

fn evaluate(
    cfg: &TunerConfig,
    controller: Option<&str>,
    gains: Option<Vec<f64>>,
    gains_file: Option<&Path>,
) -> Result<()> {
    let (kind, gains) = match (gains_file, controller) {
        (Some(path), _) => {
            let tuned = TunedGains::load(path)
                .with_context(|| format!("reading tuned gains from {}", path.display()))?;
            (tuned.controller, Some(tuned.gains))
        }
        (None, Some(tag)) => (tag.parse::<ControllerKind>()?, gains),
        (None, None) => bail!("either --controller or --gains-file is required"),
    };

    let bench = Workbench::new(cfg)?;
    let settings = cfg.controller_settings(kind);
    let controller = bench
        .registry
        .create_kind(kind, gains.as_deref(), Some(&settings))?;

    let mut history = HistoryLog::new();
    let traj = bench.simulator.run(
        &controller,
        cfg.simulation.duration,
        cfg.simulation.dt,
        &mut history,
    );
    let cost = CostFunction::new(cfg.cost)?.evaluate(&traj);

    let record = EvaluationRecord {
        controller: kind.tag().to_string(),
        gains: controller.gains(),
        steps: traj.len(),
        failure: traj
            .failure
            .as_ref()
            .map(|f| format!("step {}: {} ({})", f.step, f.reason, f.detail)),
        final_state: traj.final_state().copied(),
        cost,
    };
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
