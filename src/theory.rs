// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Bus Ring Payment Simulator - Theoretical Deposit Sizing
//
// Closed-form deposit that exactly covers the expected cost of keeping the
// ring alive for one epoch: confirmations by everyone but the payer, the
// per-round start + pay gas, and the extra gas of the epoch-closing round.

use serde::Serialize;

use crate::gas::{GasCostTable, GasTableError};

/// Inputs of the theoretical deposit for one configuration.
#[derive(Debug, Clone)]
pub struct TheoryInputs<'a> {
    /// Payments per second per user (from the dataset).
    pub payment_rate: f64,
    /// Mean number of payments per user (from the dataset).
    pub payments_per_user: f64,
    /// Ring size N.
    pub users: usize,
    /// Bus hop time in milliseconds.
    pub hop_time_ms: f64,
    /// Epochs per ring lifetime E.
    pub epochs: u32,
    pub gas_costs: &'a GasCostTable,
    /// USD per gas unit.
    pub gas_price: f64,
    /// USD per confirmation.
    pub confirm_cost: f64,
    /// Per-user wallet in USD, for the percentage.
    pub wallet_per_user: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TheoreticalDeposit {
    /// Bus round-trip time in seconds.
    pub round_time: f64,
    /// Expected rounds per epoch.
    pub rounds_per_epoch: f64,
    /// Upper bound on payments per round.
    pub max_payments_per_round: usize,
    /// Deposit redistributed per epoch (USD).
    pub delta_d: f64,
    /// Deposit per user over the whole lifetime (USD).
    pub deposit: f64,
    /// `deposit` as a percentage of the per-user wallet.
    pub deposit_percentage: f64,
}

/// `T_round = N * hop / 1000` seconds.
pub fn round_time(users: usize, hop_time_ms: f64) -> f64 {
    users as f64 * hop_time_ms / 1000.0
}

/// `min(ceil(N * lambda * T_round), N - 1)`.
pub fn max_payments_per_round(users: usize, payment_rate: f64, round_time: f64) -> usize {
    let expected = (users as f64 * payment_rate * round_time).ceil().max(0.0) as usize;
    expected.min(users.saturating_sub(1))
}

pub fn theoretical_deposit(inputs: &TheoryInputs<'_>) -> Result<TheoreticalDeposit, GasTableError> {
    let n = inputs.users;
    let epochs = inputs.epochs as f64;
    let t_round = round_time(n, inputs.hop_time_ms);
    let n_round = inputs.payments_per_user / (epochs * inputs.payment_rate * t_round);
    let m_round = max_payments_per_round(n, inputs.payment_rate, t_round);

    let ordinary = inputs.gas_costs.lookup(m_round, false)?;
    let closing = inputs.gas_costs.lookup(m_round, true)?;

    let round_cost = ordinary.usd(inputs.gas_price);
    let deposit_back_cost = closing.usd(inputs.gas_price) - round_cost;

    let delta_d = inputs.confirm_cost * n.saturating_sub(1) as f64 * n_round
        + round_cost * n_round
        + deposit_back_cost;
    let deposit = delta_d * epochs / n as f64;

    Ok(TheoreticalDeposit {
        round_time: t_round,
        rounds_per_epoch: n_round,
        max_payments_per_round: m_round,
        delta_d,
        deposit,
        deposit_percentage: deposit / inputs.wallet_per_user * 100.0,
    })
}
