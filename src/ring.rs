// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Bus Ring Payment Simulator - Ring Engine
//
// Discrete-event simulation of one ring lifetime. The bus starts at the exit
// node, collects due payments hop by hop, and settles them when it comes back
// to the same exit node. Every settlement is followed by a confirmation round;
// epochs close when the ring's total wallet crosses the next threshold.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use crate::cancel::CancelToken;
use crate::deposit::{DepositError, DepositPool};
use crate::gas::{GasCostTable, GasTableError};
use crate::participant::{Participant, ParticipantError};
use crate::refund::{self, RefundError};
use crate::types::*;

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum RingError {
    #[error("ring has no participants")]
    EmptyRing,

    #[error("participant at position {position} carries id {id}")]
    IdMismatch { position: usize, id: ParticipantId },

    #[error("invalid ring parameter: {0}")]
    InvalidParameter(&'static str),

    #[error(transparent)]
    Participant(#[from] ParticipantError),

    #[error(transparent)]
    Gas(#[from] GasTableError),

    #[error(transparent)]
    Refund(#[from] RefundError),

    #[error(transparent)]
    Deposit(#[from] DepositError),

    #[error("run cancelled")]
    Cancelled,
}

// ─── RingSimulation ──────────────────────────────────────────────────────────

pub struct RingSimulation {
    pub(crate) participants: Vec<Participant>,
    pub(crate) bus: Vec<ParticipantId>,
    pub(crate) exit_index: usize,
    pub(crate) clock: f64,
    pub(crate) params: RingParams,
    pub(crate) deposit: DepositPool,
    pub(crate) gas_costs: Arc<GasCostTable>,
    pub(crate) rng: ChaCha8Rng,

    /// Current epoch, starting at 1.
    pub(crate) epoch_index: u32,
    /// Set when the upcoming round closes an epoch.
    pub(crate) end_epoch: bool,

    pub(crate) rounds: u64,
    pub(crate) settlements: u64,
    pub(crate) epoch_history: Vec<EpochRecord>,
}

impl RingSimulation {
    /// Build a ring. `participants[i].id()` must equal `i`; `seed` drives
    /// every collaboration trial of this ring.
    pub fn new(
        participants: Vec<Participant>,
        params: RingParams,
        gas_costs: Arc<GasCostTable>,
        seed: u64,
    ) -> Result<Self, RingError> {
        if participants.is_empty() {
            return Err(RingError::EmptyRing);
        }
        if let Some((position, p)) = participants
            .iter()
            .enumerate()
            .find(|(position, p)| p.id() != *position)
        {
            return Err(RingError::IdMismatch { position, id: p.id() });
        }
        if !(params.hop_time > 0.0) {
            return Err(RingError::InvalidParameter("hop_time must be positive"));
        }
        // A hop below the clock's f64 resolution would stall the rotation.
        if params.start_time + params.hop_time == params.start_time {
            return Err(RingError::InvalidParameter("hop_time vanishes against start_time"));
        }
        if params.epoch_count == 0 {
            return Err(RingError::InvalidParameter("epoch_count must be at least 1"));
        }

        Ok(Self {
            participants,
            bus: Vec::new(),
            exit_index: 0,
            clock: params.start_time,
            deposit: DepositPool::new(params.initial_deposit, params.delta_d),
            params,
            gas_costs,
            rng: ChaCha8Rng::seed_from_u64(seed),
            epoch_index: 1,
            end_epoch: false,
            rounds: 0,
            settlements: 0,
            epoch_history: Vec::new(),
        })
    }

    /// Rotate the bus from the exit node until one settlement happens.
    pub fn simulate_round(&mut self) -> Result<(), RingError> {
        self.bus.clear();
        let n = self.participants.len();
        let mut current = self.exit_index;

        loop {
            if current == self.exit_index && !self.bus.is_empty() {
                self.handle_payments()?;
                self.exit_index = (self.exit_index + 1) % n;
                break;
            }

            let participant = &mut self.participants[current];
            if participant.will_collaborate(self.clock, &mut self.rng) {
                participant.will_pay(self.clock, &mut self.bus)?;
                self.clock += self.params.hop_time;
            } else {
                self.clock += self.params.hop_time * REFUSAL_HOP_FACTOR;
                // An idle exit node that refuses gives up its role.
                if current == self.exit_index && self.bus.is_empty() {
                    self.exit_index = (self.exit_index + 1) % n;
                }
            }

            current = (current + 1) % n;
        }

        self.rounds += 1;
        Ok(())
    }

    /// Settle the bus at the exit node, then run the confirmation round.
    fn handle_payments(&mut self) -> Result<(), RingError> {
        let payments = self.bus.len();
        let cost = self.gas_costs.lookup(payments, self.end_epoch)?;
        let overhead = cost.usd(self.params.gas_price);

        // The exit node bears the whole rotation + settlement overhead.
        self.participants[self.exit_index].expenses += overhead;

        for &id in &self.bus {
            self.participants[id].settle(self.clock)?;
        }
        self.settlements += payments as u64;
        trace!(
            clock = self.clock,
            exit = self.exit_index,
            payments,
            overhead,
            epoch_end = self.end_epoch,
            "bus settled"
        );
        self.bus.clear();

        self.handle_confirmation_round();
        Ok(())
    }

    fn handle_confirmation_round(&mut self) {
        let now = self.clock;
        let confirm_cost = self.params.confirm_cost;
        for participant in &mut self.participants {
            if participant.will_collaborate(now, &mut self.rng) {
                participant.expenses += confirm_cost;
            }
        }
    }

    /// Refund the epoch share by collaboration weight, reset scores, drain
    /// the pool.
    pub fn handle_epoch_end(&mut self) -> Result<(), RingError> {
        let scores: Vec<i64> = self.participants.iter().map(Participant::score).collect();
        let distribution = refund::distribute_refund(self.deposit.epoch_refund(), &scores)?;

        for share in &distribution.shares {
            self.participants[share.participant].refunded_deposit += share.amount;
        }
        for participant in &mut self.participants {
            participant.reset_score();
        }
        self.deposit.close_epoch(distribution.total_refund);

        let record = EpochRecord {
            epoch: self.epoch_index,
            clock: self.clock,
            refund: distribution.total_refund,
            deposit_remaining: self.deposit.remaining,
        };
        debug!(
            epoch = record.epoch,
            clock = record.clock,
            refund = record.refund,
            deposit_remaining = record.deposit_remaining,
            "epoch closed"
        );
        self.epoch_history.push(record);
        Ok(())
    }

    /// Run until every schedule is exhausted, then close the last epoch and
    /// check that the deposit pool is empty.
    pub fn run_simulation(&mut self) -> Result<RingSummary, RingError> {
        self.run_loop(None)
    }

    /// Same as [`run_simulation`](Self::run_simulation), abandoning the run
    /// with `RingError::Cancelled` once `cancel` is set.
    pub fn run_with_cancel(&mut self, cancel: &CancelToken) -> Result<RingSummary, RingError> {
        self.run_loop(Some(cancel))
    }

    fn run_loop(&mut self, cancel: Option<&CancelToken>) -> Result<RingSummary, RingError> {
        while self.participants.iter().any(Participant::has_payments) {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                return Err(RingError::Cancelled);
            }

            if self.total_wallet() < self.epoch_threshold() {
                self.end_epoch = true;
            }

            self.simulate_round()?;

            if self.end_epoch {
                self.close_epoch()?;
            }
        }

        self.end_epoch = true;
        self.close_epoch()?;

        debug!(
            rounds = self.rounds,
            deposit_remaining = self.deposit.remaining,
            leakage = self.deposit.leakage(),
            "ring lifetime over"
        );
        self.deposit.verify_exhausted()?;
        Ok(self.summary())
    }

    fn close_epoch(&mut self) -> Result<(), RingError> {
        self.handle_epoch_end()?;
        self.epoch_index += 1;
        self.end_epoch = false;
        Ok(())
    }

    /// Wallet level below which the current epoch ends.
    fn epoch_threshold(&self) -> f64 {
        let progress = self.epoch_index as f64 / self.params.epoch_count as f64;
        self.params.total_wallet * (1.0 - progress)
    }

    pub fn total_wallet(&self) -> f64 {
        self.participants.iter().map(Participant::wallet).sum()
    }

    pub fn summary(&self) -> RingSummary {
        RingSummary {
            rounds: self.rounds,
            settlements: self.settlements,
            final_clock: self.clock,
            epochs_closed: self.deposit.epochs_closed,
            deposit_remaining: self.deposit.remaining,
        }
    }

    // ─── Accessors ──────────────────────────────────────────────────────

    pub fn participants(&self) -> &[Participant] { &self.participants }
    pub fn into_participants(self) -> Vec<Participant> { self.participants }
    pub fn bus(&self) -> &[ParticipantId] { &self.bus }
    pub fn exit_index(&self) -> usize { self.exit_index }
    pub fn clock(&self) -> f64 { self.clock }
    pub fn deposit(&self) -> &DepositPool { &self.deposit }
    pub fn epoch_index(&self) -> u32 { self.epoch_index }
    pub fn epoch_history(&self) -> &[EpochRecord] { &self.epoch_history }
    pub fn params(&self) -> &RingParams { &self.params }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas::GasCost;

    fn flat_costs(max: usize) -> Arc<GasCostTable> {
        let mut table = GasCostTable::new();
        for n in 1..=max {
            table.insert(n, false, GasCost::new(100, 200));
            table.insert(n, true, GasCost::new(100, 300));
        }
        Arc::new(table)
    }

    fn params(total_wallet: f64, epochs: u32, deposit: f64) -> RingParams {
        RingParams {
            confirm_cost: 0.5,
            gas_price: 0.01,
            hop_time: 10.0,
            start_time: 0.0,
            epoch_count: epochs,
            delta_d: deposit / epochs as f64,
            total_wallet,
            initial_deposit: deposit,
        }
    }

    #[test]
    fn rejects_empty_ring() {
        let err = RingSimulation::new(Vec::new(), params(0.0, 1, 0.0), flat_costs(1), 0);
        assert!(matches!(err, Err(RingError::EmptyRing)));
    }

    #[test]
    fn rejects_misnumbered_participants() {
        let ring = vec![Participant::new(1, 10.0, [], 1.0)];
        let err = RingSimulation::new(ring, params(10.0, 1, 0.0), flat_costs(1), 0);
        assert!(matches!(err, Err(RingError::IdMismatch { position: 0, id: 1 })));
    }

    #[test]
    fn rejects_zero_hop_time() {
        let ring = vec![Participant::new(0, 10.0, [], 1.0)];
        let mut p = params(10.0, 1, 0.0);
        p.hop_time = 0.0;
        let err = RingSimulation::new(ring, p, flat_costs(1), 0);
        assert!(matches!(err, Err(RingError::InvalidParameter(_))));
    }

    #[test]
    fn rejects_hop_below_clock_resolution() {
        let ring = vec![Participant::new(0, 10.0, [Payment::new(1.6e12, 1.0)], 1.0)];
        let mut p = params(10.0, 1, 0.0);
        p.start_time = 1.6e12;
        p.hop_time = 1e-5;
        let err = RingSimulation::new(ring, p, flat_costs(1), 0);
        assert!(matches!(err, Err(RingError::InvalidParameter(_))));
    }

    #[test]
    fn exit_node_pays_overhead() {
        // Payer sits behind the exit node; the exit node gets the gas bill.
        let ring = vec![
            Participant::new(0, 10.0, [], 1.0),
            Participant::new(1, 10.0, [Payment::new(0.0, 4.0)], 1.0),
        ];
        let mut sim = RingSimulation::new(ring, params(20.0, 1, 0.0), flat_costs(2), 1).unwrap();
        sim.simulate_round().unwrap();

        let exit = &sim.participants()[0];
        let payer = &sim.participants()[1];
        // 300 gas * 0.01 + one confirmation
        assert!((exit.expenses() - 3.5).abs() < 1e-9);
        assert!((payer.expenses() - 0.5).abs() < 1e-9);
        assert!((payer.wallet() - 6.0).abs() < 1e-9);
        assert_eq!(sim.exit_index(), 1);
        assert!(sim.bus().is_empty());
    }

    #[test]
    fn epoch_round_uses_epoch_end_table() {
        let ring = vec![Participant::new(0, 10.0, [Payment::new(0.0, 1.0)], 1.0)];
        let mut sim = RingSimulation::new(ring, params(10.0, 1, 0.0), flat_costs(1), 1).unwrap();
        sim.end_epoch = true;
        sim.simulate_round().unwrap();
        // 400 gas * 0.01 + confirmation
        assert!((sim.participants()[0].expenses() - 4.5).abs() < 1e-9);
    }

    #[test]
    fn missing_gas_entry_aborts_round() {
        let ring = vec![
            Participant::new(0, 10.0, [Payment::new(0.0, 1.0)], 1.0),
            Participant::new(1, 10.0, [Payment::new(0.0, 1.0)], 1.0),
        ];
        let mut sim = RingSimulation::new(ring, params(20.0, 1, 0.0), flat_costs(1), 1).unwrap();
        let err = sim.simulate_round().unwrap_err();
        assert!(matches!(
            err,
            RingError::Gas(GasTableError::MissingEntry { payments: 2, epoch_end: false })
        ));
    }

    #[test]
    fn epoch_threshold_tracks_epoch_index() {
        let ring = vec![Participant::new(0, 100.0, [], 1.0)];
        let mut sim = RingSimulation::new(ring, params(100.0, 4, 0.0), flat_costs(1), 1).unwrap();
        assert!((sim.epoch_threshold() - 75.0).abs() < 1e-9);
        sim.epoch_index = 3;
        assert!((sim.epoch_threshold() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn epoch_history_records_every_transition() {
        // First round drops the ring wallet to 8 < 10, so the second round
        // closes epoch 1; the forced final transition closes epoch 2.
        let ring = vec![
            Participant::new(0, 10.0, [Payment::new(0.0, 6.0), Payment::new(0.0, 4.0)], 1.0),
            Participant::new(1, 10.0, [Payment::new(0.0, 6.0), Payment::new(0.0, 4.0)], 1.0),
        ];
        let mut sim = RingSimulation::new(ring, params(20.0, 2, 10.0), flat_costs(2), 3).unwrap();
        let summary = sim.run_simulation().unwrap();

        assert_eq!(summary.epochs_closed, 2);
        assert_eq!(sim.epoch_history().len(), 2);
        assert_eq!(sim.epoch_history()[0].epoch, 1);
        assert_eq!(sim.epoch_history()[1].epoch, 2);
        assert!(summary.deposit_remaining.abs() < 1e-9);
        assert!(sim.deposit().leakage() < 1e-9);
    }
}
