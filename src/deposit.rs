// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Bus Ring Payment Simulator - Refundable Deposit Pool

use serde::{Deserialize, Serialize};

/// The pool must be below this at the end of a ring lifetime.
pub const DEPOSIT_TOLERANCE: f64 = 0.001;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DepositError {
    #[error("deposit not exhausted at end of ring lifetime: {remaining} left after {epochs_closed} epochs")]
    NotExhausted { remaining: f64, epochs_closed: u32 },
}

// ---------------------------------------------------------------------------
// Deposit pool
// ---------------------------------------------------------------------------

/// Shared refundable deposit drained by `delta_d` at every epoch boundary.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DepositPool {
    /// Pool size at ring construction.
    pub initial: f64,
    /// What is left after the epochs closed so far.
    pub remaining: f64,
    /// Amount drawn per epoch.
    pub delta_d: f64,
    /// Sum of refunds paid out so far.
    pub refunded: f64,
    /// Number of epoch boundaries processed.
    pub epochs_closed: u32,
}

impl DepositPool {
    pub fn new(initial: f64, delta_d: f64) -> Self {
        Self {
            initial,
            remaining: initial,
            delta_d,
            refunded: 0.0,
            epochs_closed: 0,
        }
    }

    /// Amount to hand out at the next epoch boundary: `max(0, delta_d)`.
    pub fn epoch_refund(&self) -> f64 {
        self.delta_d.max(0.0)
    }

    /// Close one epoch. The pool shrinks by exactly `delta_d` even when the
    /// refund itself was skipped; `paid_out` is what actually reached users.
    pub fn close_epoch(&mut self, paid_out: f64) {
        self.refunded += paid_out;
        self.remaining -= self.delta_d;
        self.epochs_closed += 1;
    }

    /// End-of-life check: remaining pool strictly below `DEPOSIT_TOLERANCE`.
    pub fn verify_exhausted(&self) -> Result<(), DepositError> {
        if self.remaining < DEPOSIT_TOLERANCE {
            Ok(())
        } else {
            Err(DepositError::NotExhausted {
                remaining: self.remaining,
                epochs_closed: self.epochs_closed,
            })
        }
    }

    /// Accounting error `|initial - (refunded + remaining)|`; zero whenever
    /// `delta_d >= 0`.
    pub fn leakage(&self) -> f64 {
        (self.initial - (self.refunded + self.remaining)).abs()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
