// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Bus Ring Payment Simulator - Type Definitions

use serde::{Deserialize, Serialize};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Score every participant holds at the start of an epoch.
pub const INITIAL_SCORE: i64 = -1;

/// A refusing hop costs this many hop times (forced retry / backoff).
pub const REFUSAL_HOP_FACTOR: f64 = 2.0;

/// Index of a participant inside its ring. Doubles as bus payload.
pub type ParticipantId = usize;

// ─── Payment ─────────────────────────────────────────────────────────────────

/// One scheduled payment: due at `time`, moving `amount` out of the wallet.
///
/// Deserializes from either `{"time": .., "amount": ..}` or the dataset's
/// compact `[time, amount]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub time: f64,
    pub amount: f64,
}

impl Payment {
    pub fn new(time: f64, amount: f64) -> Self {
        Self { time, amount }
    }

    pub fn is_due(&self, now: f64) -> bool {
        self.time <= now
    }
}

// ─── Ring Parameters ─────────────────────────────────────────────────────────

/// Fixed parameters of a single ring lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingParams {
    /// USD charged to every participant that confirms a round.
    pub confirm_cost: f64,
    /// USD per gas unit.
    pub gas_price: f64,
    /// Time for the bus to move one position.
    pub hop_time: f64,
    /// Clock value at construction (earliest scheduled payment).
    pub start_time: f64,
    /// Number of epochs in the ring lifetime.
    pub epoch_count: u32,
    /// Deposit redistributed at each epoch boundary.
    pub delta_d: f64,
    /// Sum of all initial wallets.
    pub total_wallet: f64,
    /// Initial refundable deposit pool.
    pub initial_deposit: f64,
}

// ─── Run Summary ─────────────────────────────────────────────────────────────

/// Outcome of a completed `run_simulation`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RingSummary {
    pub rounds: u64,
    pub settlements: u64,
    pub final_clock: f64,
    pub epochs_closed: u32,
    pub deposit_remaining: f64,
}

/// Snapshot taken at every epoch transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpochRecord {
    pub epoch: u32,
    pub clock: f64,
    pub refund: f64,
    pub deposit_remaining: f64,
}
