//! Pipeline orchestration: assemble, build features, encode, fit,
//! evaluate, impute.
//!
//! One call of [`AlleyWidthImputer::impute`] runs the stages in a fixed
//! order and returns either the filled dataset with a report or the
//! input unchanged (no missing targets, or not enough training data).
//! Nothing outlives the call: the model, the median table and the
//! training column set are all per-invocation.

use crate::assemble::assemble_training_corpus;
use crate::config::ImputerConfig;
use crate::encode::{encode_features, reconcile_columns};
use crate::error::{Result, ResultExt};
use crate::features::{build_inference_features, build_training_features};
use crate::model::{evaluate, split_indices, GbtRegressor};
use crate::schema::{self, TARGET};
use crate::types::{ImputationOutcome, ImputationReport, SkipReason};
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Imputes missing minimum alley/laneway widths in a property dataset.
#[derive(Debug, Clone)]
pub struct AlleyWidthImputer {
    config: ImputerConfig,
}

impl AlleyWidthImputer {
    /// Create an imputer with the given configuration.
    pub fn new(config: ImputerConfig) -> Self {
        Self { config }
    }

    /// Create an imputer with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ImputerConfig::default())
    }

    /// The active configuration.
    pub fn config(&self) -> &ImputerConfig {
        &self.config
    }

    /// Fill the gaps in the target column of `data`.
    ///
    /// `reference` is the externally loaded training table; pass `None`
    /// when it is unavailable and the pipeline degrades to internal-only
    /// training. The input is consumed and returned (filled or unchanged)
    /// inside the outcome; all cells other than previously-missing target
    /// values are untouched and row order is preserved.
    pub fn impute(
        &self,
        data: DataFrame,
        reference: Option<DataFrame>,
    ) -> Result<ImputationOutcome> {
        schema::validate_schema(&data, "dataset")?;
        if let Some(ref reference) = reference {
            schema::validate_schema(reference, "reference table")?;
        }

        // Stage 5 precondition: find the gaps first so the no-op path can
        // short-circuit before any training work.
        let missing_idx = missing_target_rows(&data)?;
        if missing_idx.is_empty() {
            info!("No missing '{}' values; returning input unchanged", TARGET);
            return Ok(ImputationOutcome::Unchanged {
                data,
                reason: SkipReason::NoMissingTargets,
            });
        }
        info!(
            "{} of {} rows are missing '{}'",
            missing_idx.len(),
            data.height(),
            TARGET
        );

        // Stage 1: training-set assembly.
        let (corpus, assembly) = assemble_training_corpus(&data, reference.as_ref())?;
        if assembly.clean_rows < self.config.min_training_rows {
            warn!(
                "Only {} clean training rows (minimum {}); skipping imputation",
                assembly.clean_rows, self.config.min_training_rows
            );
            return Ok(ImputationOutcome::Unchanged {
                data,
                reason: SkipReason::InsufficientTrainingData {
                    clean_rows: assembly.clean_rows,
                    required: self.config.min_training_rows,
                },
            });
        }

        // Stage 2: feature building (training path) with frozen medians.
        let training = build_training_features(&corpus)
            .context("Building training features")?;
        let clean_training_rows = training.features.height();
        if clean_training_rows < self.config.min_training_rows {
            warn!(
                "Only {} rows left after dropping missing categoricals (minimum {}); \
                 skipping imputation",
                clean_training_rows, self.config.min_training_rows
            );
            return Ok(ImputationOutcome::Unchanged {
                data,
                reason: SkipReason::InsufficientTrainingData {
                    clean_rows: clean_training_rows,
                    required: self.config.min_training_rows,
                },
            });
        }

        // Stage 4 split happens on raw feature rows; each side is encoded
        // separately and reconciled so unseen categories cannot leak a
        // schema mismatch into the model.
        let (train_idx, test_idx) = split_indices(
            clean_training_rows,
            self.config.test_fraction,
            self.config.seed,
        );
        debug!(
            "Split: {} fit rows, {} held-out rows",
            train_idx.len(),
            test_idx.len()
        );

        let fit_features = take_rows(&training.features, &train_idx)?;
        let fit_target: Vec<f64> = train_idx
            .iter()
            .map(|&i| training.target[i as usize])
            .collect();

        // Stage 3 (train): the encoded fit matrix defines the training
        // column set every later matrix reconciles to.
        let encoded_fit = encode_features(&fit_features)?;
        let mut unknown_ordinal_levels = encoded_fit.unknown_ordinal_levels;
        let train_columns: Vec<String> = encoded_fit
            .matrix
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        info!(
            "Encoded training matrix: {} rows x {} columns",
            encoded_fit.matrix.height(),
            train_columns.len()
        );

        // Stage 4: fit and evaluate.
        let model = GbtRegressor::fit(&encoded_fit.matrix, &fit_target, &self.config)?;

        let metrics = if test_idx.is_empty() {
            debug!("Empty held-out split; skipping evaluation");
            None
        } else {
            let test_features = take_rows(&training.features, &test_idx)?;
            let test_target: Vec<f64> = test_idx
                .iter()
                .map(|&i| training.target[i as usize])
                .collect();
            let encoded_test = encode_features(&test_features)?;
            unknown_ordinal_levels += encoded_test.unknown_ordinal_levels;
            let reconciled_test = reconcile_columns(&train_columns, &encoded_test.matrix)?;
            let predictions = model.predict(&reconciled_test)?;
            let metrics = evaluate(&test_target, &predictions);
            info!(
                "Held-out metrics over {} rows: MAE={:.4} RMSE={:.4} R2={:.4}",
                test_idx.len(),
                metrics.mae,
                metrics.rmse,
                metrics.r2
            );
            Some(metrics)
        };

        // Stage 3 (inference) + stage 5: predict the gaps and write back.
        let gap_rows = take_rows(&data, &missing_idx)?;
        let inference_features = build_inference_features(&gap_rows, &training.medians)
            .context("Building inference features")?;
        let encoded_inference = encode_features(&inference_features)?;
        unknown_ordinal_levels += encoded_inference.unknown_ordinal_levels;
        let reconciled_inference = reconcile_columns(&train_columns, &encoded_inference.matrix)?;

        let raw_predictions = model.predict(&reconciled_inference)?;
        // A regression model has no non-negativity constraint; clamp as a
        // domain-validity correction, then round to centimeters.
        let predictions: Vec<f64> = raw_predictions
            .into_iter()
            .map(|p| (p.max(0.0) * 100.0).round() / 100.0)
            .collect();

        let filled = write_back(&data, &missing_idx, &predictions)?;
        info!("Imputed {} '{}' values", predictions.len(), TARGET);

        let report = ImputationReport {
            internal_rows: assembly.internal_rows,
            external_rows: assembly.external_rows,
            dropped_unusable_rows: assembly.dropped_unusable_rows,
            dropped_missing_categorical: training.dropped_missing_categorical,
            clean_training_rows,
            train_rows: train_idx.len(),
            test_rows: test_idx.len(),
            missing_by_column: training.missing_by_column,
            encoded_columns: train_columns.len(),
            unknown_ordinal_levels,
            metrics,
            imputed_rows: predictions.len(),
        };

        Ok(ImputationOutcome::Filled {
            data: filled,
            report,
        })
    }
}

/// Indices of rows where the target is null.
fn missing_target_rows(data: &DataFrame) -> Result<Vec<u32>> {
    let target = data.column(TARGET)?.as_materialized_series();
    let mask = target.is_null();
    Ok(mask
        .into_iter()
        .enumerate()
        .filter(|(_, is_null)| is_null.unwrap_or(false))
        .map(|(i, _)| i as u32)
        .collect())
}

/// Take rows by position.
fn take_rows(df: &DataFrame, indices: &[u32]) -> Result<DataFrame> {
    let idx = UInt32Chunked::from_vec("idx".into(), indices.to_vec());
    Ok(df.take(&idx)?)
}

/// Produce a new frame equal to `data` except for the target column,
/// which gets `predictions` written at `missing_idx` positions.
///
/// The input is never mutated; aliasing between input and output is
/// limited to untouched columns.
fn write_back(data: &DataFrame, missing_idx: &[u32], predictions: &[f64]) -> Result<DataFrame> {
    debug_assert_eq!(missing_idx.len(), predictions.len());

    let target = data
        .column(TARGET)?
        .cast(&DataType::Float64)
        .context("Casting target for write-back")?
        .take_materialized_series();
    let target_ca = target.f64()?;

    let mut values: Vec<Option<f64>> = target_ca.into_iter().collect();
    for (&row, &prediction) in missing_idx.iter().zip(predictions) {
        values[row as usize] = Some(prediction);
    }

    let mut filled = data.clone();
    filled.replace(TARGET, Series::new(TARGET.into(), values))?;
    Ok(filled)
}
