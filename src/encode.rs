//! Categorical encoding and column reconciliation.
//!
//! The ordinal predictor is mapped through the fixed 5-level scale, the
//! remaining categoricals are one-hot expanded, and every resulting
//! column name is passed through [`sanitize_column_name`]. Reconciliation
//! then guarantees that any matrix handed to the model carries exactly
//! the column set the model was fit on.

use crate::error::{ImputeError, Result};
use crate::schema::{self, NUMERIC_FEATURES, ONE_HOT_FEATURES, ORDINAL_FEATURE};
use polars::prelude::*;
use std::collections::BTreeSet;
use tracing::warn;

/// Characters the model library does not accept in column names.
/// Each is replaced by `_`.
pub const DISALLOWED_NAME_CHARS: [char; 9] = ['[', ']', '{', '}', ',', ':', '"', '\\', '/'];

/// Replace every disallowed character in a column name with `_`.
pub fn sanitize_column_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if DISALLOWED_NAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// An encoded, all-Float64 feature matrix.
#[derive(Debug)]
pub struct EncodedFeatures {
    /// The matrix; every column is Float64 and carries a sanitized name.
    pub matrix: DataFrame,
    /// Ordinal levels encountered outside the known scale. These encode
    /// as the `Missing` code (0) and are surfaced rather than silently
    /// absorbed.
    pub unknown_ordinal_levels: usize,
}

/// Encode a feature matrix produced by [`crate::features`].
///
/// Output column order: numeric predictors, the ordinal predictor, then
/// one-hot indicator columns per categorical with levels in sorted order.
pub fn encode_features(features: &DataFrame) -> Result<EncodedFeatures> {
    let height = features.height();
    let mut names: Vec<String> = Vec::new();
    let mut values: Vec<Vec<f64>> = Vec::new();

    for col in NUMERIC_FEATURES {
        let ca = features.column(col)?.as_materialized_series().f64()?.clone();
        names.push(sanitize_column_name(col));
        values.push(ca.into_iter().map(|v| v.unwrap_or(0.0)).collect());
    }

    let mut unknown_ordinal_levels = 0usize;
    let ordinal = features
        .column(ORDINAL_FEATURE)?
        .as_materialized_series()
        .str()?
        .clone();
    let encoded_ordinal: Vec<f64> = ordinal
        .into_iter()
        .map(|level| match level {
            Some(level) => schema::ordinal_level(level).unwrap_or_else(|| {
                unknown_ordinal_levels += 1;
                0.0
            }),
            None => 0.0,
        })
        .collect();
    if unknown_ordinal_levels > 0 {
        warn!(
            "{} '{}' values outside the known scale; encoded as Missing",
            unknown_ordinal_levels, ORDINAL_FEATURE
        );
    }
    names.push(sanitize_column_name(ORDINAL_FEATURE));
    values.push(encoded_ordinal);

    for col in ONE_HOT_FEATURES {
        let ca = features.column(col)?.as_materialized_series().str()?.clone();
        let levels: BTreeSet<String> = ca
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect();

        for level in levels {
            let indicator: Vec<f64> = ca
                .into_iter()
                .map(|v| if v == Some(level.as_str()) { 1.0 } else { 0.0 })
                .collect();
            let name = sanitize_column_name(&format!("{col}_{level}"));

            // Two levels can collapse to the same sanitized name; merge
            // their indicators instead of producing a duplicate column.
            if let Some(pos) = names.iter().position(|n| n == &name) {
                for (acc, v) in values[pos].iter_mut().zip(indicator) {
                    *acc = acc.max(v);
                }
            } else {
                names.push(name);
                values.push(indicator);
            }
        }
    }

    let columns: Vec<Column> = names
        .into_iter()
        .zip(values)
        .map(|(name, v)| {
            debug_assert_eq!(v.len(), height);
            Series::new(name.as_str().into(), v).into_column()
        })
        .collect();

    Ok(EncodedFeatures {
        matrix: DataFrame::new(columns)?,
        unknown_ordinal_levels,
    })
}

/// Reconcile `matrix` against the training column set.
///
/// Columns in the training set absent from `matrix` are materialized as
/// constant 0; columns unknown to the training set are dropped; the
/// result is reordered to exactly `train_columns`.
pub fn reconcile_columns(train_columns: &[String], matrix: &DataFrame) -> Result<DataFrame> {
    if train_columns.is_empty() {
        return Err(ImputeError::EmptyFeatureMatrix(
            "training column set is empty".to_string(),
        ));
    }

    let height = matrix.height();
    let mut columns: Vec<Column> = Vec::with_capacity(train_columns.len());
    for name in train_columns {
        match matrix.column(name) {
            Ok(col) => columns.push(col.clone()),
            Err(_) => {
                columns.push(Series::new(name.as_str().into(), vec![0.0f64; height]).into_column())
            }
        }
    }

    Ok(DataFrame::new(columns)?)
}
