//! Feature-matrix construction and the frozen median table.
//!
//! Training and inference share the same column selection and the same
//! median table, but differ in missing-value policy: training drops rows
//! with a missing categorical (together with their target values) to keep
//! the fitted relationship free of placeholder categories, while
//! inference fills them with the `"Missing"` sentinel so that every input
//! row yields a prediction.

use crate::error::{ImputeError, Result, ResultExt};
use crate::schema::{self, MISSING_CATEGORY, NUMERIC_FEATURES, TARGET};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Per-column medians computed once from the training feature matrix.
///
/// Frozen after construction and reused verbatim for the evaluation split
/// and the inference batch; recomputing against a different row subset
/// would break train/inference consistency.
#[derive(Debug, Clone)]
pub struct MedianTable {
    medians: BTreeMap<String, f64>,
}

impl MedianTable {
    /// Compute medians for every numeric predictor in `features`.
    pub fn compute(features: &DataFrame) -> Result<Self> {
        let mut medians = BTreeMap::new();
        for col in NUMERIC_FEATURES {
            let series = features.column(col)?.as_materialized_series();
            let median = match series.median() {
                Some(m) => m,
                None => {
                    warn!("Column '{}' has no non-null values; median falls back to 0", col);
                    0.0
                }
            };
            medians.insert(col.to_string(), median);
        }
        Ok(Self { medians })
    }

    /// Median for a column, if it is a known numeric predictor.
    pub fn get(&self, column: &str) -> Option<f64> {
        self.medians.get(column).copied()
    }
}

/// Output of the training-path feature builder.
#[derive(Debug)]
pub struct TrainingFeatures {
    /// Feature matrix with all missing values resolved.
    pub features: DataFrame,
    /// Target vector, row-aligned with `features`.
    pub target: Vec<f64>,
    /// Frozen medians for reuse at inference time.
    pub medians: MedianTable,
    /// Rows dropped for a missing categorical.
    pub dropped_missing_categorical: usize,
    /// Missing-value count per predictor, before imputation.
    pub missing_by_column: BTreeMap<String, usize>,
}

/// Build the training feature matrix and target vector from the clean
/// corpus.
pub fn build_training_features(corpus: &DataFrame) -> Result<TrainingFeatures> {
    let selected = select_feature_columns(corpus)?;

    let mut missing_by_column = BTreeMap::new();
    for col in schema::feature_columns() {
        missing_by_column.insert(col.to_string(), selected.column(col)?.null_count());
    }

    let medians = MedianTable::compute(&selected)?;
    let mut features = fill_numeric_medians(&selected, &medians)?;

    // Rows with a missing categorical are dropped jointly with their
    // target values to keep the two aligned.
    let keep = complete_categorical_mask(&features)?;
    let kept = keep.iter().filter(|&&k| k).count();
    let dropped_missing_categorical = features.height() - kept;
    if dropped_missing_categorical > 0 {
        debug!(
            "Dropping {} training rows with a missing categorical",
            dropped_missing_categorical
        );
    }

    let target = corpus
        .column(TARGET)?
        .cast(&DataType::Float64)
        .context("Casting target for training")?
        .take_materialized_series();
    let target_ca = target.f64()?;
    let target: Vec<f64> = target_ca
        .into_iter()
        .zip(keep.iter())
        .filter(|&(_, &k)| k)
        .map(|(v, _)| {
            v.ok_or_else(|| ImputeError::Internal("null target in clean corpus".to_string()))
        })
        .collect::<Result<_>>()?;

    let mask_series = Series::new("keep".into(), keep);
    features = features.filter(mask_series.bool()?)?;

    Ok(TrainingFeatures {
        features,
        target,
        medians,
        dropped_missing_categorical,
        missing_by_column,
    })
}

/// Build the inference feature matrix for `rows` (the records missing the
/// target), reusing the frozen training medians.
///
/// Always produces exactly one output row per input row.
pub fn build_inference_features(rows: &DataFrame, medians: &MedianTable) -> Result<DataFrame> {
    let selected = select_feature_columns(rows)?;
    let mut features = fill_numeric_medians(&selected, medians)?;

    for col in schema::categorical_features() {
        let series = features.column(col)?.as_materialized_series().clone();
        if series.null_count() > 0 {
            features.replace(col, fill_string_with(&series, MISSING_CATEGORY)?)?;
        }
    }

    Ok(features)
}

/// Restrict to the predictor columns, casting numerics to Float64 and
/// categoricals to String.
fn select_feature_columns(df: &DataFrame) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(schema::feature_columns().len());

    for col in NUMERIC_FEATURES {
        let cast = df.column(col)?.cast(&DataType::Float64).map_err(|e| {
            ImputeError::TypeConversionFailed {
                column: col.to_string(),
                target_type: "Float64".to_string(),
                reason: e.to_string(),
            }
        })?;
        columns.push(cast);
    }
    for col in schema::categorical_features() {
        let cast = df.column(col)?.cast(&DataType::String).map_err(|e| {
            ImputeError::TypeConversionFailed {
                column: col.to_string(),
                target_type: "String".to_string(),
                reason: e.to_string(),
            }
        })?;
        columns.push(cast);
    }

    Ok(DataFrame::new(columns)?)
}

/// Fill numeric nulls with the frozen per-column medians.
fn fill_numeric_medians(df: &DataFrame, medians: &MedianTable) -> Result<DataFrame> {
    let mut df = df.clone();
    for col in NUMERIC_FEATURES {
        let median = medians
            .get(col)
            .ok_or_else(|| ImputeError::Internal(format!("no median for column '{col}'")))?;
        let series = df.column(col)?.as_materialized_series().clone();
        if series.null_count() > 0 {
            df.replace(col, fill_f64_with(&series, median)?)?;
        }
    }
    Ok(df)
}

/// Mask of rows where every categorical predictor is present.
fn complete_categorical_mask(df: &DataFrame) -> Result<Vec<bool>> {
    let mut keep = vec![true; df.height()];
    for col in schema::categorical_features() {
        let series = df.column(col)?.as_materialized_series();
        for (i, is_null) in series.is_null().into_iter().enumerate() {
            if is_null.unwrap_or(true) {
                keep[i] = false;
            }
        }
    }
    Ok(keep)
}

fn fill_f64_with(series: &Series, fill: f64) -> Result<Series> {
    let ca = series.f64()?;
    let filled: Vec<f64> = ca.into_iter().map(|v| v.unwrap_or(fill)).collect();
    Ok(Series::new(series.name().clone(), filled))
}

fn fill_string_with(series: &Series, fill: &str) -> Result<Series> {
    let ca = series.str()?;
    let filled: Vec<String> = ca
        .into_iter()
        .map(|v| v.unwrap_or(fill).to_string())
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}
