//! Alley-Width Imputation Pipeline
//!
//! Imputes missing values of the minimum alley/laneway width attribute in
//! property-valuation datasets with a gradient-boosted regression model,
//! built on Polars.
//!
//! # Overview
//!
//! One call runs five stages in a fixed order:
//!
//! 1. **Training-set assembly**: in-sample valid records merged with an
//!    optional external reference table.
//! 2. **Feature building**: 7 numeric + 6 categorical predictors with a
//!    frozen median table for numeric gaps.
//! 3. **Categorical encoding**: one ordinal scale, one-hot expansion for
//!    the rest, sanitized column names, and train/test/inference column
//!    reconciliation.
//! 4. **Model fit & evaluation**: gradient-boosted trees on a
//!    log-transformed target with held-out MAE/RMSE/R².
//! 5. **Imputation**: predictions inverse-transformed, clamped to be
//!    non-negative, rounded to two decimals, and written back only at the
//!    previously-missing positions.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use alley_impute::{AlleyWidthImputer, ImputerConfig, ImputationOutcome};
//! use polars::prelude::*;
//!
//! let dataset = CsvReadOptions::default()
//!     .with_has_header(true)
//!     .try_into_reader_with_file_path(Some("listings.csv".into()))?
//!     .finish()?;
//!
//! let imputer = AlleyWidthImputer::new(ImputerConfig::builder().seed(42).build()?);
//! match imputer.impute(dataset, None)? {
//!     ImputationOutcome::Filled { data, report } => {
//!         println!("Filled {} gaps", report.imputed_rows);
//!     }
//!     ImputationOutcome::Unchanged { reason, .. } => {
//!         println!("Skipped: {:?}", reason);
//!     }
//! }
//! ```
//!
//! The two recoverable conditions (no missing targets, insufficient
//! training data) return the input unchanged rather than erroring; schema
//! drift is a fatal [`ImputeError::ColumnNotFound`].

pub mod assemble;
pub mod config;
pub mod encode;
pub mod error;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod schema;
pub mod types;

// Re-exports for convenient access
pub use config::{ConfigValidationError, ImputerConfig, ImputerConfigBuilder};
pub use encode::sanitize_column_name;
pub use error::{ImputeError, Result as ImputeResult, ResultExt};
pub use features::MedianTable;
pub use pipeline::AlleyWidthImputer;
pub use types::{EvalMetrics, ImputationOutcome, ImputationReport, SkipReason};
