// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Bus Ring Payment Simulator
//
// Discrete-event model of a bus-relay anonymous payment ring on a blockchain
// ledger: waiting times and expenses under different hop times, deposit sizes
// and shares of non-cooperative participants.

pub mod types;
pub mod participant;
pub mod refund;
pub mod deposit;
pub mod gas;
pub mod ring;
pub mod cancel;

// Campaign layer
pub mod dataset;
pub mod theory;
pub mod stats;
pub mod config;
pub mod campaign;

pub use types::*;
pub use participant::{Participant, ParticipantError};
pub use refund::{distribute_refund, RefundDistribution, RefundError};
pub use deposit::{DepositError, DepositPool, DEPOSIT_TOLERANCE};
pub use gas::{GasCost, GasCostTable, GasTableError};
pub use ring::{RingError, RingSimulation};
pub use cancel::CancelToken;
pub use dataset::{DatasetError, PaymentDataset, SourceUser};
pub use theory::{TheoreticalDeposit, TheoryInputs};
pub use stats::{mean_sd, SampleStats};
pub use config::{ConfigError, SweepConfig};
pub use campaign::{
    CampaignError, Configuration, ConfigurationReport, GasCostFile, GasCostSource, Population,
};
