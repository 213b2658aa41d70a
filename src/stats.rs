// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Bus Ring Payment Simulator - Sample Statistics
//
// Pooled per-user samples of one configuration reduce to a mean and a
// sample standard deviation; nothing downstream reads anything else.

use serde::Serialize;

/// Mean and spread of one metric over every user of every run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleStats {
    pub n: usize,
    pub mean: f64,
    pub std_dev: f64,
}

impl SampleStats {
    pub fn of(samples: &[f64]) -> Self {
        let (mean, std_dev) = mean_sd(samples);
        Self { n: samples.len(), mean, std_dev }
    }
}

/// `(mean, sample standard deviation)` with the `n - 1` denominator.
///
/// No samples give `(0, 0)`; a single sample has zero deviation.
pub fn mean_sd(samples: &[f64]) -> (f64, f64) {
    match samples {
        [] => (0.0, 0.0),
        [only] => (*only, 0.0),
        _ => {
            let n = samples.len() as f64;
            let mean = samples.iter().sum::<f64>() / n;
            let squares: f64 = samples.iter().map(|x| (x - mean) * (x - mean)).sum();
            (mean, (squares / (n - 1.0)).sqrt())
        }
    }
}
