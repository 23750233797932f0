use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error};

use gridrun::config::RunConfig;
use gridrun::coordinator::Coordinator;
use gridrun::partition;
use gridrun::poller::PollOutcome;
use gridrun::store::factory::StoreFactory;
use gridrun::units::{SessionScoreUnit, SESSION_SCORE_UNIT};
use gridrun::worker::{UnitRegistry, WorkerServer, WorkerState};

/// Coordinate partitioned batch runs across remote workers
#[derive(Parser)]
#[command(name = "gridrun")]
#[command(about = "Partitioned distributed execution coordinator", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a coordinated run across the configured workers
    Run {
        /// Path to the configuration file
        #[arg(short = 'c', long, default_value = "gridrun.toml")]
        config: PathBuf,

        /// Unit-of-work name (overrides the configured one)
        #[arg(long)]
        unit: Option<String>,
    },
    /// Serve the worker execution endpoint
    Worker {
        /// Path to the configuration file
        #[arg(short = 'c', long, default_value = "gridrun.toml")]
        config: PathBuf,

        /// Port to listen on
        #[arg(short, long, default_value = "8081")]
        port: u16,
    },
    /// Print the partition plan for the configured workers
    Plan {
        /// Path to the configuration file
        #[arg(short = 'c', long, default_value = "gridrun.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .init();

    debug!("gridrun started with verbosity level: {}", cli.verbose);

    let result = match cli.command {
        Commands::Run { config, unit } => run_coordinated(config, unit).await,
        Commands::Worker { config, port } => run_worker(config, port).await,
        Commands::Plan { config } => print_plan(config),
    };

    if let Err(e) = result {
        error!("Fatal error: {e}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run_coordinated(config_path: PathBuf, unit: Option<String>) -> anyhow::Result<()> {
    let config = RunConfig::load(&config_path)?;
    let unit_name = unit.unwrap_or_else(|| config.unit.clone());

    let store = StoreFactory::from_config(&config.store).await?;
    let coordinator = Coordinator::new(store, &config)?;
    let report = coordinator.run(&unit_name).await?;

    println!(
        "Run {} finished in {:.1}s",
        report.run_id,
        report.elapsed.as_secs_f64()
    );
    for record in &report.records {
        match &record.failure_detail {
            Some(detail) => println!(
                "  partition {}/{}: {} ({detail})",
                record.partition.index, record.partition.count, record.status
            ),
            None => println!(
                "  partition {}/{}: {}",
                record.partition.index, record.partition.count, record.status
            ),
        }
    }

    match &report.outcome {
        PollOutcome::TimedOutWithOrphans { orphans, .. } => {
            anyhow::bail!(
                "run {} timed out with {} partitions still not terminal",
                report.run_id,
                orphans.len()
            )
        }
        PollOutcome::Completed { .. } if !report.succeeded() => {
            anyhow::bail!("run {} finished with failed partitions", report.run_id)
        }
        PollOutcome::Completed { .. } => Ok(()),
    }
}

async fn run_worker(config_path: PathBuf, port: u16) -> anyhow::Result<()> {
    let config = RunConfig::load(&config_path)?;
    let store = StoreFactory::from_config(&config.store).await?;

    // Every worker seeds the same deterministic dataset and only ever
    // touches the users owned by the partition it is asked to run
    let mut registry = UnitRegistry::new();
    registry.register(
        SESSION_SCORE_UNIT,
        Arc::new(SessionScoreUnit::with_generated(42, 1000, 10)),
    );

    let state = Arc::new(WorkerState::new(store, registry));
    WorkerServer::new(state, port).serve().await?;
    Ok(())
}

fn print_plan(config_path: PathBuf) -> anyhow::Result<()> {
    let config = RunConfig::load(&config_path)?;
    let descriptors = partition::plan(config.workers.len() as u32)?;

    println!("Unit: {}", config.unit);
    for (descriptor, worker) in descriptors.iter().zip(&config.workers) {
        println!(
            "  partition {}/{} -> {worker}",
            descriptor.index, descriptor.count
        );
    }
    Ok(())
}
