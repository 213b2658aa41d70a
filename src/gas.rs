// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Bus Ring Payment Simulator - Gas Cost Tables
//
// Two dense maps from "payments settled this round" to measured gas: one for
// rounds that close an epoch (deposit refund included) and one for ordinary
// rounds. Measurements come from an external execution environment as a
// semicolon-separated CSV; this module only reads them.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GasTableError {
    #[error("gas cost file unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("gas cost file has no header line")]
    MissingHeader,

    #[error("gas cost header lacks column `{0}`")]
    MissingColumn(&'static str),

    #[error("no gas cost rows for k={k}, alpha={alpha}")]
    NoRows { k: usize, alpha: usize },

    #[error("no gas cost entry for {payments} payments (epoch end: {epoch_end})")]
    MissingEntry { payments: usize, epoch_end: bool },
}

// ---------------------------------------------------------------------------
// GasCost
// ---------------------------------------------------------------------------

/// Gas consumed by one settlement round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasCost {
    /// Rotation start (`startConfirm`).
    pub start_confirm_gas: u64,
    /// Settlement (`pay`).
    pub pay_gas: u64,
}

impl GasCost {
    pub fn new(start_confirm_gas: u64, pay_gas: u64) -> Self {
        Self { start_confirm_gas, pay_gas }
    }

    pub fn total(&self) -> u64 {
        self.start_confirm_gas + self.pay_gas
    }

    /// Cost in USD at `gas_price` USD per gas unit.
    pub fn usd(&self, gas_price: f64) -> f64 {
        self.start_confirm_gas as f64 * gas_price + self.pay_gas as f64 * gas_price
    }
}

// ---------------------------------------------------------------------------
// GasCostTable
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GasCostTable {
    epoch_end: BTreeMap<usize, GasCost>,
    ordinary: BTreeMap<usize, GasCost>,
}

const COL_K: &str = "k";
const COL_ALPHA: &str = "alpha";
const COL_PAYMENTS: &str = "nPayments";
const COL_END_EPOCH: &str = "EndEpoch";
const COL_END_EPOCH_SPACED: &str = "End Epoch";
const COL_START: &str = "StartConfirmGas";
const COL_PAY: &str = "PayGas";

struct Columns {
    k: usize,
    alpha: usize,
    payments: usize,
    end_epoch: usize,
    start: usize,
    pay: usize,
}

impl Columns {
    fn from_header(header: &str) -> Result<Self, GasTableError> {
        let names: Vec<&str> = header.split(';').map(str::trim).collect();
        let find = |name: &'static str| {
            names
                .iter()
                .position(|n| *n == name)
                .ok_or(GasTableError::MissingColumn(name))
        };
        let end_epoch = find(COL_END_EPOCH).or_else(|_| find(COL_END_EPOCH_SPACED))?;
        Ok(Self {
            k: find(COL_K)?,
            alpha: find(COL_ALPHA)?,
            payments: find(COL_PAYMENTS)?,
            end_epoch,
            start: find(COL_START)?,
            pay: find(COL_PAY)?,
        })
    }

    /// `(k, alpha, payments, epoch_end, cost)`, or `None` for a malformed row.
    fn parse(&self, line: &str) -> Option<(usize, usize, usize, bool, GasCost)> {
        let fields: Vec<&str> = line.split(';').map(str::trim).collect();
        let field = |i: usize| fields.get(i).copied();
        Some((
            field(self.k)?.parse().ok()?,
            field(self.alpha)?.parse().ok()?,
            field(self.payments)?.parse().ok()?,
            field(self.end_epoch)? == "Yes",
            GasCost::new(field(self.start)?.parse().ok()?, field(self.pay)?.parse().ok()?),
        ))
    }
}

impl GasCostTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, payments: usize, epoch_end: bool, cost: GasCost) {
        self.table_mut(epoch_end).insert(payments, cost);
    }

    /// Cost of a round settling `payments` payments.
    pub fn lookup(&self, payments: usize, epoch_end: bool) -> Result<GasCost, GasTableError> {
        self.table(epoch_end)
            .get(&payments)
            .copied()
            .ok_or(GasTableError::MissingEntry { payments, epoch_end })
    }

    /// Every count in `1..=max_payments` must be present in both tables.
    pub fn ensure_dense(&self, max_payments: usize) -> Result<(), GasTableError> {
        for payments in 1..=max_payments {
            for epoch_end in [false, true] {
                self.lookup(payments, epoch_end)?;
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.epoch_end.len() + self.ordinary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read measurements for one `(k, alpha)` population from a
    /// semicolon-separated CSV. Malformed rows are skipped.
    pub fn from_reader<R: BufRead>(reader: R, k: usize, alpha: usize) -> Result<Self, GasTableError> {
        let mut lines = reader.lines();
        let header = loop {
            match lines.next() {
                Some(line) => {
                    let line = line?;
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => return Err(GasTableError::MissingHeader),
            }
        };
        let columns = Columns::from_header(header.trim_start_matches('\u{feff}'))?;

        let mut table = Self::new();
        for (index, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match columns.parse(&line) {
                Some((row_k, row_alpha, payments, epoch_end, cost)) => {
                    if row_k == k && row_alpha == alpha {
                        table.insert(payments, epoch_end, cost);
                    }
                }
                None => warn!(line = index + 2, "skipping malformed gas cost row"),
            }
        }

        if table.is_empty() {
            return Err(GasTableError::NoRows { k, alpha });
        }
        Ok(table)
    }

    pub fn load(path: &Path, k: usize, alpha: usize) -> Result<Self, GasTableError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), k, alpha)
    }

    fn table(&self, epoch_end: bool) -> &BTreeMap<usize, GasCost> {
        if epoch_end { &self.epoch_end } else { &self.ordinary }
    }

    fn table_mut(&mut self, epoch_end: bool) -> &mut BTreeMap<usize, GasCost> {
        if epoch_end { &mut self.epoch_end } else { &mut self.ordinary }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
k;alpha;nPayments;EndEpoch;DeployGas;StartConfirmGas;MaxConfirmGas;MinConfirmGas;PayGas
2;1;1;No;900000;40000;50056;50000;60000
2;1;1;Yes;900000;40000;50056;50000;90000
2;1;2;No;900000;41000;50056;50000;70000
2;1;2;Yes;900000;41000;50056;50000;99000
3;0;1;No;900000;1;1;1;1
2;1;oops;No;;;;;
";

    #[test]
    fn loads_matching_population_only() {
        let table = GasCostTable::from_reader(SAMPLE.as_bytes(), 2, 1).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.lookup(1, false).unwrap(), GasCost::new(40000, 60000));
        assert_eq!(table.lookup(1, true).unwrap(), GasCost::new(40000, 90000));
        assert_eq!(table.lookup(2, true).unwrap().total(), 140_000);
    }

    #[test]
    fn accepts_spaced_end_epoch_header() {
        let csv = "k;alpha;nPayments;End Epoch;StartConfirmGas;PayGas\n1;1;1;Yes;5;6\n";
        let table = GasCostTable::from_reader(csv.as_bytes(), 1, 1).unwrap();
        assert_eq!(table.lookup(1, true).unwrap(), GasCost::new(5, 6));
    }

    #[test]
    fn missing_column_is_an_error() {
        let csv = "k;alpha;nPayments;StartConfirmGas;PayGas\n";
        let err = GasTableError::MissingColumn(COL_END_EPOCH_SPACED);
        let got = GasCostTable::from_reader(csv.as_bytes(), 1, 1).unwrap_err();
        assert_eq!(got.to_string(), err.to_string());
    }

    #[test]
    fn unknown_population_has_no_rows() {
        let err = GasCostTable::from_reader(SAMPLE.as_bytes(), 9, 9).unwrap_err();
        assert!(matches!(err, GasTableError::NoRows { k: 9, alpha: 9 }));
    }

    #[test]
    fn lookup_miss_names_the_key() {
        let table = GasCostTable::from_reader(SAMPLE.as_bytes(), 2, 1).unwrap();
        let err = table.lookup(3, true).unwrap_err();
        assert!(matches!(err, GasTableError::MissingEntry { payments: 3, epoch_end: true }));
    }

    #[test]
    fn density_check() {
        let table = GasCostTable::from_reader(SAMPLE.as_bytes(), 2, 1).unwrap();
        assert!(table.ensure_dense(2).is_ok());
        assert!(table.ensure_dense(3).is_err());
    }

    #[test]
    fn usd_conversion() {
        let cost = GasCost::new(1_000, 3_000);
        assert!((cost.usd(0.5) - 2_000.0).abs() < 1e-9);
    }
}
