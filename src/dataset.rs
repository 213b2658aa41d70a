// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Bus Ring Payment Simulator - Payment Dataset
//
// Wallet-capped historical payment sequences, one per source user, supplied
// by an external preprocessing step as CSV with columns `User,pairs_json`.
// `pairs_json` holds `[[timestamp_ms, amount], ...]`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::types::Payment;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("dataset unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("dataset has no header line")]
    MissingHeader,

    #[error("dataset line {line}: expected `User,pairs_json`")]
    MalformedRow { line: usize },

    #[error("dataset line {line}: invalid pairs_json: {source}")]
    InvalidPairs {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("dataset contains no users")]
    Empty,
}

// ---------------------------------------------------------------------------
// SourceUser / PaymentDataset
// ---------------------------------------------------------------------------

/// One historical user and their timestamp-ordered payments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUser {
    pub label: String,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentDataset {
    users: Vec<SourceUser>,
}

impl PaymentDataset {
    pub fn from_users(users: Vec<SourceUser>) -> Self {
        Self { users }
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, DatasetError> {
        let mut lines = reader.lines().enumerate();
        match lines.next() {
            Some((_, header)) => {
                header?;
            }
            None => return Err(DatasetError::MissingHeader),
        }

        let mut users = Vec::new();
        for (index, line) in lines {
            let line = line?;
            let line_no = index + 1;
            if line.trim().is_empty() {
                continue;
            }
            let (label, pairs) = line
                .split_once(',')
                .ok_or(DatasetError::MalformedRow { line: line_no })?;
            let pairs = unquote(pairs);
            // A user without recorded payments exports an empty cell.
            let payments: Vec<Payment> = if pairs.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&pairs)
                    .map_err(|source| DatasetError::InvalidPairs { line: line_no, source })?
            };
            users.push(SourceUser {
                label: unquote(label),
                payments,
            });
        }
        Ok(Self { users })
    }

    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn user(&self, index: usize) -> Option<&SourceUser> {
        self.users.get(index)
    }

    pub fn users(&self) -> &[SourceUser] {
        &self.users
    }

    /// Global payment generation rate in payments per second.
    ///
    /// Per user: mean gap between strictly increasing consecutive timestamps.
    /// The rate is the inverse of the mean of those per-user means; users with
    /// fewer than two payments or no positive gap are ignored.
    pub fn average_payment_rate(&self) -> f64 {
        let mean_intervals: Vec<f64> = self
            .users
            .iter()
            .filter(|u| u.payments.len() >= 2)
            .filter_map(|u| {
                let mut times: Vec<f64> = u.payments.iter().map(|p| p.time).collect();
                times.sort_by(f64::total_cmp);
                let gaps: Vec<f64> = times
                    .windows(2)
                    .filter(|w| w[1] > w[0])
                    .map(|w| (w[1] - w[0]) / 1000.0)
                    .collect();
                if gaps.is_empty() {
                    None
                } else {
                    Some(gaps.iter().sum::<f64>() / gaps.len() as f64)
                }
            })
            .collect();

        if mean_intervals.is_empty() {
            return 0.0;
        }
        let global_mean = mean_intervals.iter().sum::<f64>() / mean_intervals.len() as f64;
        1.0 / global_mean
    }

    pub fn average_payments_per_user(&self) -> f64 {
        if self.users.is_empty() {
            return 0.0;
        }
        let total: usize = self.users.iter().map(|u| u.payments.len()).sum();
        total as f64 / self.users.len() as f64
    }

    /// Reproducibly draw `k` source users for one run.
    pub fn pick_users(&self, k: usize, seed: u64) -> Result<Vec<usize>, DatasetError> {
        if self.users.is_empty() {
            return Err(DatasetError::Empty);
        }
        Ok(pick_user_indices(self.users.len(), k, seed))
    }
}

/// Draw `k` indices from `0..available`: without replacement when
/// `k <= available`, with replacement otherwise.
///
/// `available` must be non-zero when `k > 0`.
pub fn pick_user_indices(available: usize, k: usize, seed: u64) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    if k <= available {
        return index::sample(&mut rng, available, k).into_vec();
    }
    (0..k).map(|_| rng.gen_range(0..available)).collect()
}

fn unquote(field: &str) -> String {
    let field = field.trim();
    let inner = field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .unwrap_or(field);
    inner.replace("\"\"", "\"")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
