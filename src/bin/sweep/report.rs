// Sweep Report Writers
// Semicolon CSV (one row per configuration) and a pretty JSON document

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use bus_ring_sim::ConfigurationReport;
use serde::Serialize;

pub const CSV_HEADER: &str = "T_hop;deposit_percentage;collaboration_level;mean_waiting_time;sd_waiting_time;\
mean_expense_coll;sd_expense_coll;mean_expense_non_coll;sd_expense_non_coll;\
theoretical_deposit;theoretical_deposit_percentage";

// ─── CSV ────────────────────────────────────────────────────────────────────

pub struct CsvReportWriter<W: Write> {
    writer: W,
}

impl CsvReportWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> CsvReportWriter<W> {
    pub fn new(mut writer: W) -> io::Result<Self> {
        writeln!(writer, "{}", CSV_HEADER)?;
        Ok(Self { writer })
    }

    pub fn write_row(&mut self, r: &ConfigurationReport) -> io::Result<()> {
        writeln!(
            self.writer,
            "{};{};{};{};{};{};{};{};{};{};{}",
            r.hop_time_ms,
            r.deposit_percentage,
            r.collaboration_level,
            r.waiting_time.mean,
            r.waiting_time.std_dev,
            r.expense_cooperative.mean,
            r.expense_cooperative.std_dev,
            r.expense_non_cooperative.mean,
            r.expense_non_cooperative.std_dev,
            r.theoretical_deposit,
            r.theoretical_deposit_percentage,
        )
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

// ─── JSON ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SweepReport<'a> {
    pub timestamp: String,
    pub version: &'static str,
    pub prng: &'static str,
    pub base_seed: u64,
    pub runs_per_configuration: u64,
    pub configurations: &'a [ConfigurationReport],
}

pub fn write_json(path: &Path, report: &SweepReport<'_>) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    writer.flush()
}
