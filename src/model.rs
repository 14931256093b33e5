//! Gradient-boosted regression model and held-out evaluation.
//!
//! The model is fit on `ln(1 + target)` to stabilize variance for the
//! skewed non-negative target; predictions are inverse-transformed with
//! `exp(x) - 1` before any metric or write-back. The model lives only for
//! the duration of one pipeline invocation and is never persisted.

use crate::config::ImputerConfig;
use crate::error::{ImputeError, Result};
use crate::types::EvalMetrics;
use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

/// Deterministically split `n` rows into (train, test) index sets.
///
/// The held-out set holds `round(test_fraction * n)` rows.
pub fn split_indices(n: usize, test_fraction: f64, seed: u64) -> (Vec<u32>, Vec<u32>) {
    let mut indices: Vec<u32> = (0..n as u32).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_size = ((n as f64) * test_fraction).round() as usize;
    let test = indices[..test_size].to_vec();
    let train = indices[test_size..].to_vec();
    (train, test)
}

/// A fitted gradient-boosted regressor over log-transformed targets.
pub struct GbtRegressor {
    model: GBDT,
}

impl std::fmt::Debug for GbtRegressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GbtRegressor").finish_non_exhaustive()
    }
}

impl GbtRegressor {
    /// Fit on an encoded matrix and targets in the original (meter)
    /// scale. The log transform happens here.
    pub fn fit(matrix: &DataFrame, target: &[f64], config: &ImputerConfig) -> Result<Self> {
        if matrix.height() == 0 {
            return Err(ImputeError::EmptyFeatureMatrix(
                "cannot fit on zero rows".to_string(),
            ));
        }
        if matrix.height() != target.len() {
            return Err(ImputeError::Internal(format!(
                "feature/target length mismatch: {} vs {}",
                matrix.height(),
                target.len()
            )));
        }

        let log_target: Vec<f64> = target.iter().map(|&y| y.ln_1p()).collect();
        let mut train_data = to_datavec(matrix, Some(&log_target))?;

        let mut gbdt_config = Config::new();
        gbdt_config.set_feature_size(matrix.width());
        gbdt_config.set_max_depth(config.max_depth);
        gbdt_config.set_iterations(config.iterations);
        gbdt_config.set_shrinkage(config.shrinkage as f32);
        gbdt_config.set_loss("SquaredError");
        gbdt_config.set_debug(false);
        // Full sample ratios keep training deterministic.
        gbdt_config.set_data_sample_ratio(1.0);
        gbdt_config.set_feature_sample_ratio(1.0);
        gbdt_config.set_training_optimization_level(2);

        debug!(
            "Fitting GBT: {} rows, {} features, {} iterations",
            matrix.height(),
            matrix.width(),
            config.iterations
        );
        let mut model = GBDT::new(&gbdt_config);
        model.fit(&mut train_data);

        Ok(Self { model })
    }

    /// Predict in the original (meter) scale for an encoded matrix that
    /// has been reconciled to the training column set.
    pub fn predict(&self, matrix: &DataFrame) -> Result<Vec<f64>> {
        let data = to_datavec(matrix, None)?;
        let predictions = self.model.predict(&data);
        Ok(predictions
            .into_iter()
            .map(|p| (p as f64).exp_m1())
            .collect())
    }
}

/// Convert an all-Float64 DataFrame into the model library's row format.
fn to_datavec(matrix: &DataFrame, targets: Option<&[f64]>) -> Result<DataVec> {
    let mut data_vec: DataVec = Vec::with_capacity(matrix.height());

    for row_idx in 0..matrix.height() {
        let mut feature = Vec::with_capacity(matrix.width());
        for col in matrix.get_columns() {
            let value = col
                .as_materialized_series()
                .f64()?
                .get(row_idx)
                .unwrap_or(0.0);
            feature.push(value as f32);
        }

        let label = targets.map(|t| t[row_idx] as f32).unwrap_or(0.0);
        data_vec.push(Data {
            feature,
            target: label,
            weight: 1.0,
            label,
            residual: label,
            initial_guess: 0.0,
        });
    }

    Ok(data_vec)
}

/// Held-out error metrics in the original scale.
pub fn evaluate(actual: &[f64], predicted: &[f64]) -> EvalMetrics {
    debug_assert_eq!(actual.len(), predicted.len());
    let n = actual.len() as f64;

    let mae = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / n;

    let mse = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / n;
    let rmse = mse.sqrt();

    let mean = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    let r2 = if ss_tot == 0.0 {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    };

    EvalMetrics { mae, rmse, r2 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_indices_sizes() {
        let (train, test) = split_indices(60, 0.2, 42);
        assert_eq!(test.len(), 12);
        assert_eq!(train.len(), 48);

        let mut all: Vec<u32> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..60).collect::<Vec<u32>>());
    }

    #[test]
    fn test_split_indices_rounding() {
        // round(0.2 * 53) = 11
        let (train, test) = split_indices(53, 0.2, 42);
        assert_eq!(test.len(), 11);
        assert_eq!(train.len(), 42);
    }

    #[test]
    fn test_split_indices_deterministic() {
        let a = split_indices(100, 0.2, 7);
        let b = split_indices(100, 0.2, 7);
        assert_eq!(a, b);

        let c = split_indices(100, 0.2, 8);
        assert_ne!(a, c);
    }

    #[test]
    fn test_log_transform_round_trip() {
        for x in [0.0f64, 0.5, 1.0, 2.5, 5.0, 12.0] {
            let round_tripped = x.ln_1p().exp_m1();
            assert!((round_tripped - x).abs() < 1e-12);
        }
    }

    #[test]
    fn test_evaluate_perfect_predictions() {
        let actual = vec![1.0, 2.0, 3.0, 4.0];
        let metrics = evaluate(&actual, &actual);
        assert_eq!(metrics.mae, 0.0);
        assert_eq!(metrics.rmse, 0.0);
        assert_eq!(metrics.r2, 1.0);
    }

    #[test]
    fn test_evaluate_known_values() {
        let actual = vec![1.0, 2.0, 3.0];
        let predicted = vec![2.0, 2.0, 2.0];
        let metrics = evaluate(&actual, &predicted);
        // |1-2| + |2-2| + |3-2| = 2 over 3 rows
        assert!((metrics.mae - 2.0 / 3.0).abs() < 1e-12);
        // mse = 2/3
        assert!((metrics.rmse - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
        // ss_tot = 2, ss_res = 2
        assert!((metrics.r2 - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_and_predict_recovers_simple_signal() {
        // Width grows with the first feature; the model should rank a
        // high-feature row above a low-feature one.
        let n = 80usize;
        let f1: Vec<f64> = (0..n).map(|i| i as f64 / 10.0).collect();
        let f2: Vec<f64> = (0..n).map(|i| ((i * 7) % 13) as f64).collect();
        let target: Vec<f64> = f1.iter().map(|v| 0.5 + v * 0.4).collect();

        let matrix = df![
            "f1" => f1,
            "f2" => f2,
        ]
        .unwrap();

        let config = ImputerConfig::default();
        let model = GbtRegressor::fit(&matrix, &target, &config).unwrap();

        let probe = df![
            "f1" => [0.5f64, 7.5],
            "f2" => [3.0f64, 3.0],
        ]
        .unwrap();
        let preds = model.predict(&probe).unwrap();
        assert_eq!(preds.len(), 2);
        assert!(preds.iter().all(|p| p.is_finite()));
        assert!(preds[1] > preds[0]);
    }

    #[test]
    fn test_fit_rejects_empty_matrix() {
        let matrix = df!["f1" => Vec::<f64>::new()].unwrap();
        let config = ImputerConfig::default();
        let err = GbtRegressor::fit(&matrix, &[], &config).unwrap_err();
        assert_eq!(err.error_code(), "EMPTY_FEATURE_MATRIX");
    }
}
