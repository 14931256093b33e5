//! Result and report types for the imputation pipeline.
//!
//! The pipeline never prints diagnostics; everything an operator might
//! want to know is collected into [`ImputationReport`] and returned with
//! the data.

use polars::prelude::DataFrame;
use serde::Serialize;
use std::collections::BTreeMap;

/// Held-out evaluation metrics, reported in the target's original units
/// (meters).
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct EvalMetrics {
    /// Mean absolute error.
    pub mae: f64,
    /// Root-mean-squared error.
    pub rmse: f64,
    /// Coefficient of determination.
    pub r2: f64,
}

/// Why the pipeline returned the input unchanged.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum SkipReason {
    /// No record had a missing target value; imputation is a no-op.
    NoMissingTargets,
    /// Fewer clean training rows than the configured minimum.
    InsufficientTrainingData {
        /// Clean rows found after filtering.
        clean_rows: usize,
        /// Configured minimum.
        required: usize,
    },
}

/// Structured diagnostics for one pipeline invocation.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ImputationReport {
    /// Rows in the input dataset.
    pub internal_rows: usize,
    /// Rows contributed by the external reference table (0 when absent).
    pub external_rows: usize,
    /// Rows dropped for missing land-unit-price, missing target, or
    /// target = 0.
    pub dropped_unusable_rows: usize,
    /// Rows dropped at feature-building time for a missing categorical.
    pub dropped_missing_categorical: usize,
    /// Clean rows that reached the model.
    pub clean_training_rows: usize,
    /// Rows in the fit split.
    pub train_rows: usize,
    /// Rows in the held-out split.
    pub test_rows: usize,
    /// Missing-value count per predictor column, measured on the training
    /// corpus before imputation.
    pub missing_by_column: BTreeMap<String, usize>,
    /// Width of the encoded training matrix.
    pub encoded_columns: usize,
    /// Ordinal levels encountered outside the known 5-level scale
    /// (encoded as the `Missing` code).
    pub unknown_ordinal_levels: usize,
    /// Held-out error metrics. Diagnostic only; never gates imputation.
    pub metrics: Option<EvalMetrics>,
    /// Target gaps filled in the output.
    pub imputed_rows: usize,
}

/// The result of one imputation call.
///
/// Callers receive either the filled dataset or the original dataset
/// unchanged; no partial state is possible.
#[derive(Debug)]
pub enum ImputationOutcome {
    /// Gaps were filled; `data` differs from the input only in the target
    /// column at previously-missing positions.
    Filled {
        data: DataFrame,
        report: ImputationReport,
    },
    /// The input is returned unchanged.
    Unchanged {
        data: DataFrame,
        reason: SkipReason,
    },
}

impl ImputationOutcome {
    /// The resulting dataset, filled or unchanged.
    pub fn data(&self) -> &DataFrame {
        match self {
            Self::Filled { data, .. } => data,
            Self::Unchanged { data, .. } => data,
        }
    }

    /// Consume the outcome, yielding the dataset.
    pub fn into_data(self) -> DataFrame {
        match self {
            Self::Filled { data, .. } => data,
            Self::Unchanged { data, .. } => data,
        }
    }

    /// The diagnostics report, when imputation ran to completion.
    pub fn report(&self) -> Option<&ImputationReport> {
        match self {
            Self::Filled { report, .. } => Some(report),
            Self::Unchanged { .. } => None,
        }
    }

    /// Whether any gap was filled.
    pub fn is_filled(&self) -> bool {
        matches!(self, Self::Filled { .. })
    }
}
