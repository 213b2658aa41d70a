#[cfg(test)]
mod tests {
    use std::fmt::Write as _;
    use std::fs;
    use std::path::Path;

    use bus_ring_sim::campaign::{self, GasCostFile};
    use bus_ring_sim::*;

    /// Measurements for populations (4, 2) and (4, 0), 1..=6 payments.
    fn write_gas_csv(path: &Path) {
        let mut csv = String::from("k;alpha;nPayments;EndEpoch;DeployGas;StartConfirmGas;MaxConfirmGas;MinConfirmGas;PayGas\n");
        for alpha in [0, 2] {
            for n in 1..=6 {
                for (flag, pay) in [("No", 30_000), ("Yes", 45_000)] {
                    writeln!(csv, "4;{alpha};{n};{flag};2000000;40000;50056;50000;{}", pay + 5_000 * n)
                        .expect("test: format row");
                }
            }
        }
        fs::write(path, csv).expect("test: write gas csv");
    }

    /// Eight users spending their 50 USD wallet in five payments of 10.
    fn write_dataset_csv(path: &Path) {
        let mut csv = String::from("User,pairs_json\n");
        for u in 0..8u64 {
            let pairs: Vec<String> = (0..5u64)
                .map(|i| format!("[{},10.0]", 1_000 * (u + 7 * i)))
                .collect();
            writeln!(csv, "0x{u:02x},\"[{}]\"", pairs.join(",")).expect("test: format row");
        }
        fs::write(path, csv).expect("test: write dataset");
    }

    fn config() -> SweepConfig {
        SweepConfig::from_yaml_str(
            "
cooperative_users: [4]
non_cooperative_percent: [50]
collaboration_levels: [0.0, 0.5, 1.0]
hop_times_ms: [200, 400]
deposit_percentages: [0, 25]
runs: 2
epochs: 1
wallet_per_user: 50.0
gas_price: 0.0001
confirmation_gas: 50056
base_seed: 3
threads: 2
",
        )
        .expect("test: sweep config")
    }

    #[test]
    fn test_sweep_from_files() {
        let dir = tempfile::tempdir().expect("test: tempdir");
        let gas_path = dir.path().join("gas.csv");
        let data_path = dir.path().join("users.csv");
        write_gas_csv(&gas_path);
        write_dataset_csv(&data_path);

        let dataset = PaymentDataset::load(&data_path).expect("test: dataset");
        assert_eq!(dataset.len(), 8);

        let config = config();
        let reports = campaign::run_sweep(&config, &GasCostFile(gas_path), &dataset, &CancelToken::new())
            .expect("sweep should complete");

        assert_eq!(reports.len(), config.configuration_count());
        assert_eq!(reports.len(), 12);

        // Sweep order: level, then hop time, then deposit.
        assert_eq!(reports[0].collaboration_level, 0.0);
        assert_eq!(reports[0].hop_time_ms, 200.0);
        assert_eq!(reports[0].deposit_percentage, 0.0);
        assert_eq!(reports[1].deposit_percentage, 25.0);
        assert_eq!(reports[2].hop_time_ms, 400.0);
        assert_eq!(reports[11].collaboration_level, 1.0);

        for r in &reports {
            assert_eq!(r.population.total(), 6);
            // 6 users x 2 runs
            assert_eq!(r.waiting_time.n, 12);
            assert_eq!(r.expense_cooperative.n + r.expense_non_cooperative.n, 12);
            assert!(r.waiting_time.mean >= 0.0);
            assert!(r.theoretical_deposit > 0.0);
        }

        // Fully collaborating rings have no non-cooperative users at all.
        assert_eq!(reports[11].expense_non_cooperative.n, 0);
        assert_eq!(reports[0].expense_non_cooperative.n, 4);
    }

    #[test]
    fn test_theoretical_deposit_shared_across_deposit_axis() {
        let dir = tempfile::tempdir().expect("test: tempdir");
        let gas_path = dir.path().join("gas.csv");
        let data_path = dir.path().join("users.csv");
        write_gas_csv(&gas_path);
        write_dataset_csv(&data_path);

        let dataset = PaymentDataset::load(&data_path).expect("test: dataset");
        let plan = campaign::plan_sweep(&config(), &GasCostFile(gas_path), &dataset).expect("test: plan");
        assert_eq!(plan[0].theory, plan[1].theory);
        // Longer hops mean fewer, fuller rounds.
        assert!(plan[2].theory.round_time > plan[0].theory.round_time);
    }

    #[test]
    fn test_unknown_population_fails_planning() {
        let dir = tempfile::tempdir().expect("test: tempdir");
        let gas_path = dir.path().join("gas.csv");
        let data_path = dir.path().join("users.csv");
        write_gas_csv(&gas_path);
        write_dataset_csv(&data_path);

        let mut config = config();
        config.cooperative_users = vec![10];
        let dataset = PaymentDataset::load(&data_path).expect("test: dataset");
        let err = campaign::run_sweep(&config, &GasCostFile(gas_path), &dataset, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, CampaignError::Gas(GasTableError::NoRows { k: 10, alpha: 5 })));
    }

    #[test]
    fn test_sparse_gas_table_fails_planning() {
        // Rows only up to 3 payments, but a ring of 4 + 2 can settle 6 at once.
        let mut sparse = GasCostTable::new();
        for n in 1..=3 {
            sparse.insert(n, false, GasCost::new(40_000, 30_000));
            sparse.insert(n, true, GasCost::new(40_000, 45_000));
        }
        let users = (0..6)
            .map(|u| SourceUser {
                label: format!("u{u}"),
                payments: vec![Payment::new(0.0, 10.0), Payment::new(7_000.0, 10.0)],
            })
            .collect();
        let dataset = PaymentDataset::from_users(users);

        let err = campaign::plan_sweep(&config(), &sparse, &dataset).unwrap_err();
        assert!(matches!(
            err,
            CampaignError::Gas(GasTableError::MissingEntry { payments: 4, .. })
        ));
    }

    #[test]
    fn test_missing_dataset_file() {
        let dir = tempfile::tempdir().expect("test: tempdir");
        let err = PaymentDataset::load(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, DatasetError::Io(_)));
    }
}
