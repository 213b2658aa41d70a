// Bus Ring Sweep Runner
// Monte Carlo parameter sweep over hop time, deposit size and collaboration level
//
// Usage:
//   cargo run --release --bin sweep -- --gas-costs gas.csv --dataset users.csv
//   cargo run --release --bin sweep -- --config sweep.yaml --runs 5 ...
//   RUST_LOG=bus_ring_sim=debug cargo run --release --bin sweep -- ...

mod report;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use bus_ring_sim::campaign::{self, GasCostFile};
use bus_ring_sim::{CampaignError, CancelToken, ConfigError, DatasetError, PaymentDataset, SweepConfig};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use report::{CsvReportWriter, SweepReport};

/// Bus ring payment sweep
///
/// Runs every configuration of the sweep `runs` times with seeds
/// `seed .. seed + runs` and writes one result row per configuration.
#[derive(Parser, Debug)]
#[command(name = "sweep")]
#[command(version, about, long_about = None)]
struct Args {
    /// YAML sweep definition; built-in campaign when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Semicolon-separated gas measurements (k;alpha;nPayments;EndEpoch;...)
    #[arg(long)]
    gas_costs: PathBuf,

    /// Payment dataset CSV (User,pairs_json)
    #[arg(long)]
    dataset: PathBuf,

    /// Result CSV
    #[arg(short, long, default_value = "simulation_results.csv")]
    output: PathBuf,

    /// Also write the full report as JSON
    #[arg(long)]
    json_report: Option<PathBuf>,

    /// Runs per configuration (overrides the config file)
    #[arg(long)]
    runs: Option<u64>,

    /// Base seed (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads (overrides the config file)
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
enum SweepError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Campaign(#[from] CampaignError),

    #[error("writing results: {0}")]
    Io(#[from] std::io::Error),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,bus_ring_sim=info,sweep=info")),
        )
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(SweepError::Campaign(CampaignError::Cancelled)) => {
            warn!("sweep interrupted, no results written");
            ExitCode::from(130)
        }
        Err(err) => {
            error!(%err, "sweep failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), SweepError> {
    let mut config = match &args.config {
        Some(path) => SweepConfig::from_yaml_file(path)?,
        None => SweepConfig::default(),
    };
    if let Some(runs) = args.runs {
        config.runs = runs;
    }
    if let Some(seed) = args.seed {
        config.base_seed = seed;
    }
    if args.threads.is_some() {
        config.threads = args.threads;
    }
    config.validate()?;

    let dataset = PaymentDataset::load(&args.dataset)?;
    info!(
        users = dataset.len(),
        payment_rate = dataset.average_payment_rate(),
        payments_per_user = dataset.average_payments_per_user(),
        "dataset loaded"
    );

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(err) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!(%err, "could not install Ctrl-C handler");
    }

    info!(
        configurations = config.configuration_count(),
        runs = config.runs,
        base_seed = config.base_seed,
        "starting sweep"
    );
    let started = Instant::now();
    let reports = campaign::run_sweep(&config, &GasCostFile(args.gas_costs.clone()), &dataset, &cancel)?;

    let mut csv = CsvReportWriter::create(&args.output)?;
    for r in &reports {
        csv.write_row(r)?;
    }
    csv.finish()?;
    info!(path = %args.output.display(), rows = reports.len(), "results written");

    if let Some(path) = &args.json_report {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis().to_string())
            .unwrap_or_default();
        report::write_json(
            path,
            &SweepReport {
                timestamp,
                version: env!("CARGO_PKG_VERSION"),
                prng: "ChaCha8Rng",
                base_seed: config.base_seed,
                runs_per_configuration: config.runs,
                configurations: &reports,
            },
        )?;
        info!(path = %path.display(), "json report written");
    }

    info!(elapsed_secs = started.elapsed().as_secs_f64(), "sweep complete");
    Ok(())
}
