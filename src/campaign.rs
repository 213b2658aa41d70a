// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Bus Ring Payment Simulator - Campaign Driver
//
// Expands a `SweepConfig` into configurations, runs `runs` seeded ring
// lifetimes per configuration and aggregates waiting times and net expenses.
// Configurations execute in parallel on a rayon pool; each run owns its
// generator and only borrows the dataset and gas tables.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::config::{ConfigError, SweepConfig};
use crate::dataset::{DatasetError, PaymentDataset};
use crate::gas::{GasCostTable, GasTableError};
use crate::participant::Participant;
use crate::ring::{RingError, RingSimulation};
use crate::stats::SampleStats;
use crate::theory::{self, TheoreticalDeposit, TheoryInputs};
use crate::types::{RingParams, RingSummary};

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    #[error(transparent)]
    Ring(RingError),

    #[error(transparent)]
    Gas(#[from] GasTableError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("no valid payments among the users picked for seed {seed}")]
    NoPayments { seed: u64 },

    #[error("sweep cancelled")]
    Cancelled,
}

impl From<RingError> for CampaignError {
    fn from(err: RingError) -> Self {
        match err {
            RingError::Cancelled => CampaignError::Cancelled,
            other => CampaignError::Ring(other),
        }
    }
}

// ─── Gas cost sources ────────────────────────────────────────────────────────

/// Supplies the gas table of one `(k, alpha)` population.
pub trait GasCostSource {
    fn table(&self, cooperative: usize, non_cooperative: usize) -> Result<GasCostTable, GasTableError>;
}

/// Measurements CSV on disk, filtered per population.
#[derive(Debug, Clone)]
pub struct GasCostFile(pub PathBuf);

impl GasCostSource for GasCostFile {
    fn table(&self, cooperative: usize, non_cooperative: usize) -> Result<GasCostTable, GasTableError> {
        GasCostTable::load(&self.0, cooperative, non_cooperative)
    }
}

/// One table shared by every population.
impl GasCostSource for GasCostTable {
    fn table(&self, _cooperative: usize, _non_cooperative: usize) -> Result<GasCostTable, GasTableError> {
        Ok(self.clone())
    }
}

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Population {
    /// Fully cooperative users (k).
    pub cooperative: usize,
    /// Users running at the configuration's collaboration level (alpha).
    pub non_cooperative: usize,
}

impl Population {
    /// `alpha = percent * k / 100`, rounded down.
    pub fn new(cooperative: usize, non_cooperative_percent: usize) -> Self {
        Self {
            cooperative,
            non_cooperative: non_cooperative_percent * cooperative / 100,
        }
    }

    pub fn total(&self) -> usize {
        self.cooperative + self.non_cooperative
    }

    /// First `k` at 1.0, the rest at `level`, shuffled.
    pub fn collaboration_levels(&self, level: f64, rng: &mut ChaCha8Rng) -> Vec<f64> {
        let mut levels: Vec<f64> = (0..self.total())
            .map(|i| if i < self.cooperative { 1.0 } else { level })
            .collect();
        levels.shuffle(rng);
        levels
    }
}

/// One point of the sweep, fully resolved.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub population: Population,
    pub collaboration_level: f64,
    pub hop_time_ms: f64,
    pub deposit_percentage: f64,
    /// Per-position collaboration probability, shared by every run.
    pub levels: Arc<Vec<f64>>,
    pub gas_costs: Arc<GasCostTable>,
    pub theory: TheoreticalDeposit,
}

impl Configuration {
    pub fn total_wallet(&self, wallet_per_user: f64) -> f64 {
        wallet_per_user * self.population.total() as f64
    }

    pub fn total_deposit(&self, wallet_per_user: f64) -> f64 {
        self.total_wallet(wallet_per_user) * self.deposit_percentage / 100.0
    }
}

/// Expand the sweep in output order: population, collaboration level, hop
/// time, deposit percentage.
pub fn plan_sweep<S: GasCostSource + ?Sized>(
    config: &SweepConfig,
    gas_source: &S,
    dataset: &PaymentDataset,
) -> Result<Vec<Configuration>, CampaignError> {
    config.validate()?;

    let payment_rate = dataset.average_payment_rate();
    let payments_per_user = dataset.average_payments_per_user();
    let mut shuffle_rng = ChaCha8Rng::seed_from_u64(config.base_seed);
    let mut plan = Vec::with_capacity(config.configuration_count());

    for &k in &config.cooperative_users {
        for &percent in &config.non_cooperative_percent {
            let population = Population::new(k, percent);
            let gas_costs = gas_source.table(population.cooperative, population.non_cooperative)?;
            // A bus can carry every member of the ring.
            gas_costs.ensure_dense(population.total())?;
            let gas_costs = Arc::new(gas_costs);
            debug!(
                cooperative = population.cooperative,
                non_cooperative = population.non_cooperative,
                entries = gas_costs.len(),
                "gas table loaded"
            );

            for &collaboration_level in &config.collaboration_levels {
                let levels = Arc::new(population.collaboration_levels(collaboration_level, &mut shuffle_rng));

                for &hop_time_ms in &config.hop_times_ms {
                    let theory = theory::theoretical_deposit(&TheoryInputs {
                        payment_rate,
                        payments_per_user,
                        users: population.total(),
                        hop_time_ms,
                        epochs: config.epochs,
                        gas_costs: &gas_costs,
                        gas_price: config.gas_price,
                        confirm_cost: config.confirm_cost(),
                        wallet_per_user: config.wallet_per_user,
                    })?;

                    for &deposit_percentage in &config.deposit_percentages {
                        plan.push(Configuration {
                            population,
                            collaboration_level,
                            hop_time_ms,
                            deposit_percentage,
                            levels: Arc::clone(&levels),
                            gas_costs: Arc::clone(&gas_costs),
                            theory: theory.clone(),
                        });
                    }
                }
            }
        }
    }

    Ok(plan)
}

// ─── Single run ──────────────────────────────────────────────────────────────

/// Per-user samples of one ring lifetime.
#[derive(Debug, Clone, Default)]
pub struct RunSamples {
    /// Mean waiting time of every user.
    pub waiting_times: Vec<f64>,
    /// Net expense of users with collaboration level 1.0.
    pub cooperative_expenses: Vec<f64>,
    pub non_cooperative_expenses: Vec<f64>,
    pub summary: Option<RingSummary>,
}

impl RunSamples {
    fn extend(&mut self, other: RunSamples) {
        self.waiting_times.extend(other.waiting_times);
        self.cooperative_expenses.extend(other.cooperative_expenses);
        self.non_cooperative_expenses.extend(other.non_cooperative_expenses);
    }
}

/// Build the ring for `seed` and run it to completion.
pub fn run_single(
    configuration: &Configuration,
    config: &SweepConfig,
    dataset: &PaymentDataset,
    seed: u64,
    cancel: &CancelToken,
) -> Result<RunSamples, CampaignError> {
    let users = configuration.population.total();
    let picked = dataset.pick_users(users, seed)?;

    let mut start_time = f64::INFINITY;
    let participants: Vec<Participant> = picked
        .iter()
        .enumerate()
        .map(|(id, &source)| {
            let payments = &dataset.users()[source].payments;
            if let Some(first) = payments.first() {
                start_time = start_time.min(first.time);
            }
            Participant::new(
                id,
                config.wallet_per_user,
                payments.iter().copied(),
                configuration.levels[id],
            )
        })
        .collect();

    if !start_time.is_finite() {
        return Err(CampaignError::NoPayments { seed });
    }

    let total_wallet = configuration.total_wallet(config.wallet_per_user);
    let total_deposit = configuration.total_deposit(config.wallet_per_user);
    let deposit_share = total_deposit / users as f64;

    let params = RingParams {
        confirm_cost: config.confirm_cost(),
        gas_price: config.gas_price,
        hop_time: configuration.hop_time_ms,
        start_time,
        epoch_count: config.epochs,
        delta_d: total_deposit / config.epochs as f64,
        total_wallet,
        initial_deposit: total_deposit,
    };

    let mut ring = RingSimulation::new(participants, params, Arc::clone(&configuration.gas_costs), seed)?;
    let summary = ring.run_with_cancel(cancel)?;

    let mut samples = RunSamples {
        summary: Some(summary),
        ..RunSamples::default()
    };
    for participant in ring.participants() {
        samples.waiting_times.push(participant.mean_waiting_time());
        let expense = participant.net_expense(deposit_share);
        if participant.is_cooperative() {
            samples.cooperative_expenses.push(expense);
        } else {
            samples.non_cooperative_expenses.push(expense);
        }
    }
    Ok(samples)
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationReport {
    pub hop_time_ms: f64,
    pub deposit_percentage: f64,
    pub collaboration_level: f64,
    pub population: Population,
    pub runs: u64,
    pub waiting_time: SampleStats,
    pub expense_cooperative: SampleStats,
    pub expense_non_cooperative: SampleStats,
    pub theoretical_deposit: f64,
    pub theoretical_deposit_percentage: f64,
    pub elapsed_ms: u64,
}

/// Runs `base_seed .. base_seed + runs` and pools every user's samples.
pub fn run_configuration(
    configuration: &Configuration,
    config: &SweepConfig,
    dataset: &PaymentDataset,
    cancel: &CancelToken,
) -> Result<ConfigurationReport, CampaignError> {
    let started = Instant::now();
    let mut pooled = RunSamples::default();

    for run in 0..config.runs {
        if cancel.is_cancelled() {
            return Err(CampaignError::Cancelled);
        }
        let seed = config.base_seed.wrapping_add(run);
        pooled.extend(run_single(configuration, config, dataset, seed, cancel)?);
    }

    let report = ConfigurationReport {
        hop_time_ms: configuration.hop_time_ms,
        deposit_percentage: configuration.deposit_percentage,
        collaboration_level: configuration.collaboration_level,
        population: configuration.population,
        runs: config.runs,
        waiting_time: SampleStats::of(&pooled.waiting_times),
        expense_cooperative: SampleStats::of(&pooled.cooperative_expenses),
        expense_non_cooperative: SampleStats::of(&pooled.non_cooperative_expenses),
        theoretical_deposit: configuration.theory.deposit,
        theoretical_deposit_percentage: configuration.theory.deposit_percentage,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };

    info!(
        hop_time_ms = report.hop_time_ms,
        deposit_percentage = report.deposit_percentage,
        collaboration_level = report.collaboration_level,
        mean_waiting_time = report.waiting_time.mean,
        mean_expense_coop = report.expense_cooperative.mean,
        mean_expense_non_coop = report.expense_non_cooperative.mean,
        "configuration done"
    );
    Ok(report)
}

/// Plan and execute the whole sweep. Reports come back in sweep order.
pub fn run_sweep<S: GasCostSource + ?Sized>(
    config: &SweepConfig,
    gas_source: &S,
    dataset: &PaymentDataset,
    cancel: &CancelToken,
) -> Result<Vec<ConfigurationReport>, CampaignError> {
    let plan = plan_sweep(config, gas_source, dataset)?;
    info!(
        configurations = plan.len(),
        runs = config.runs,
        dataset_users = dataset.len(),
        "sweep planned"
    );

    let execute = || {
        plan.par_iter()
            .map(|configuration| run_configuration(configuration, config, dataset, cancel))
            .collect::<Result<Vec<_>, _>>()
    };

    match config.threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
            pool.install(execute)
        }
        None => execute(),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
