// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Bus Ring Payment Simulator - Participant Model

use std::collections::VecDeque;

use rand::Rng;
use serde::Serialize;

use crate::types::{ParticipantId, Payment, INITIAL_SCORE};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Precondition violations of the pending-payment discipline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParticipantError {
    #[error("participant {0} already has a pending payment")]
    PaymentAlreadyPending(ParticipantId),

    #[error("participant {0} has no scheduled payment to settle")]
    NoScheduledPayment(ParticipantId),

    #[error("participant {0} has no pending payment to settle")]
    NoPendingPayment(ParticipantId),
}

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// A ring member: wallet, payment schedule, and incentive bookkeeping.
///
/// `expenses`, `refunded_deposit` and `score` resets are driven by the ring;
/// the participant only mutates its own queue, wallet and waiting times.
#[derive(Debug, Clone, Serialize)]
pub struct Participant {
    id: ParticipantId,
    wallet: f64,
    payments: VecDeque<Payment>,
    collaboration_level: f64,
    pending_payment: Option<Payment>,
    score: i64,
    pub(crate) expenses: f64,
    pub(crate) refunded_deposit: f64,
    waiting_times: Vec<f64>,
}

impl Participant {
    pub fn new(
        id: ParticipantId,
        wallet: f64,
        payments: impl IntoIterator<Item = Payment>,
        collaboration_level: f64,
    ) -> Self {
        Self {
            id,
            wallet,
            payments: payments.into_iter().collect(),
            collaboration_level,
            pending_payment: None,
            score: INITIAL_SCORE,
            expenses: 0.0,
            refunded_deposit: 0.0,
            waiting_times: Vec::new(),
        }
    }

    /// Whether this participant acts when the bus reaches it at `now`.
    ///
    /// A due payment compels collaboration. Otherwise one Bernoulli trial
    /// with probability `collaboration_level`; a refusal costs one score point.
    pub fn will_collaborate<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R) -> bool {
        if self.head_due(now) {
            return true;
        }
        let collaborates = rng.gen::<f64>() < self.collaboration_level;
        if !collaborates {
            self.score -= 1;
        }
        collaborates
    }

    /// Board the bus with the head payment if it is due.
    pub fn will_pay(&mut self, now: f64, bus: &mut Vec<ParticipantId>) -> Result<(), ParticipantError> {
        let Some(head) = self.payments.front().copied() else {
            return Ok(());
        };
        if self.pending_payment.is_some() {
            return Err(ParticipantError::PaymentAlreadyPending(self.id));
        }
        if head.is_due(now) {
            self.pending_payment = Some(head);
            bus.push(self.id);
        }
        Ok(())
    }

    /// Execute the pending payment at `now`.
    pub fn settle(&mut self, now: f64) -> Result<Payment, ParticipantError> {
        if self.payments.is_empty() {
            return Err(ParticipantError::NoScheduledPayment(self.id));
        }
        let pending = self
            .pending_payment
            .take()
            .ok_or(ParticipantError::NoPendingPayment(self.id))?;
        self.payments.pop_front();
        self.waiting_times.push(now - pending.time);
        self.wallet -= pending.amount;
        Ok(pending)
    }

    /// Mean of all waiting-time samples, 0.0 before the first settlement.
    pub fn mean_waiting_time(&self) -> f64 {
        if self.waiting_times.is_empty() {
            return 0.0;
        }
        self.waiting_times.iter().sum::<f64>() / self.waiting_times.len() as f64
    }

    /// Expense net of refunds, plus the deposit share the user put in.
    pub fn net_expense(&self, deposit_share: f64) -> f64 {
        self.expenses - self.refunded_deposit + deposit_share
    }

    pub fn is_cooperative(&self) -> bool {
        self.collaboration_level >= 1.0
    }

    pub(crate) fn reset_score(&mut self) {
        self.score = INITIAL_SCORE;
    }

    fn head_due(&self, now: f64) -> bool {
        self.payments.front().is_some_and(|p| p.is_due(now))
    }

    // ─── Accessors ──────────────────────────────────────────────────────

    pub fn id(&self) -> ParticipantId { self.id }
    pub fn wallet(&self) -> f64 { self.wallet }
    pub fn score(&self) -> i64 { self.score }
    pub fn expenses(&self) -> f64 { self.expenses }
    pub fn refunded_deposit(&self) -> f64 { self.refunded_deposit }
    pub fn collaboration_level(&self) -> f64 { self.collaboration_level }
    pub fn pending_payment(&self) -> Option<Payment> { self.pending_payment }
    pub fn waiting_times(&self) -> &[f64] { &self.waiting_times }
    pub fn remaining_payments(&self) -> usize { self.payments.len() }
    pub fn has_payments(&self) -> bool { !self.payments.is_empty() }
    pub fn next_payment(&self) -> Option<&Payment> { self.payments.front() }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
