//! Training-set assembly.
//!
//! Merges the in-sample records with the externally supplied reference
//! table into one training corpus, then drops rows that cannot train the
//! model (missing land-unit-price, missing target, target = 0).

use crate::error::{Result, ResultExt};
use crate::schema::{LAND_UNIT_PRICE, LISTING_AGE, TARGET};
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Row accounting for the assembly stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssemblyReport {
    /// Rows taken from the input dataset.
    pub internal_rows: usize,
    /// Rows taken from the reference table.
    pub external_rows: usize,
    /// Rows dropped by the clean-row filter.
    pub dropped_unusable_rows: usize,
    /// Rows surviving the filter.
    pub clean_rows: usize,
}

/// Assemble the training corpus from the input dataset and the optional
/// reference table.
///
/// All columns of both sources are preserved; a column present in only
/// one source becomes null in the other. Reference rows get
/// `listing_age_days` defaulted to 0, since they carry no listing date.
pub fn assemble_training_corpus(
    internal: &DataFrame,
    external: Option<&DataFrame>,
) -> Result<(DataFrame, AssemblyReport)> {
    let mut report = AssemblyReport {
        internal_rows: internal.height(),
        ..Default::default()
    };

    let combined = match external {
        Some(ext) => {
            report.external_rows = ext.height();
            let ext = default_listing_age(ext)?;
            let merged = align_concat(internal, &ext)
                .context("Concatenating dataset with reference table")?;
            info!(
                "Merged {} internal and {} reference rows",
                report.internal_rows, report.external_rows
            );
            merged
        }
        None => {
            warn!("No reference table supplied; training on internal data only");
            internal.clone()
        }
    };

    let clean = filter_trainable_rows(&combined)?;
    report.clean_rows = clean.height();
    report.dropped_unusable_rows = combined.height() - clean.height();
    info!(
        "Clean-row filter kept {} of {} rows ({} dropped)",
        report.clean_rows,
        combined.height(),
        report.dropped_unusable_rows
    );

    Ok((clean, report))
}

/// Ensure the reference table carries `listing_age_days` = 0 on every row.
fn default_listing_age(external: &DataFrame) -> Result<DataFrame> {
    let mut df = external.clone();
    let zeros = Series::new(LISTING_AGE.into(), vec![0.0f64; df.height()]);

    let has_column = df
        .get_column_names()
        .iter()
        .any(|name| name.as_str() == LISTING_AGE);
    if has_column {
        df.replace(LISTING_AGE, zeros)?;
    } else {
        debug!("Reference table lacks '{}'; adding zeros", LISTING_AGE);
        df.with_column(zeros)?;
    }
    Ok(df)
}

/// Row-concatenate two frames with differing column sets.
///
/// The result carries the union of columns, `a`'s columns first. A column
/// absent from one frame is null-padded there; where both frames carry a
/// column, `b`'s is cast to `a`'s dtype.
fn align_concat(a: &DataFrame, b: &DataFrame) -> Result<DataFrame> {
    let a_names: Vec<String> = a.get_column_names().iter().map(|s| s.to_string()).collect();
    let b_only: Vec<String> = b
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .filter(|name| !a_names.contains(name))
        .collect();

    let mut a_cols: Vec<Column> = a.get_columns().to_vec();
    for name in &b_only {
        let dtype = b.column(name)?.dtype().clone();
        a_cols.push(Column::full_null(name.as_str().into(), a.height(), &dtype));
    }

    let mut b_cols: Vec<Column> = Vec::with_capacity(a_names.len() + b_only.len());
    for name in a_names.iter().chain(b_only.iter()) {
        match b.column(name) {
            Ok(col) => {
                let target_dtype = a
                    .column(name)
                    .map(|c| c.dtype().clone())
                    .unwrap_or_else(|_| col.dtype().clone());
                let col = if col.dtype() != &target_dtype {
                    col.cast(&target_dtype).map_err(|e| {
                        crate::error::ImputeError::TypeConversionFailed {
                            column: name.clone(),
                            target_type: format!("{}", target_dtype),
                            reason: e.to_string(),
                        }
                    })?
                } else {
                    col.clone()
                };
                b_cols.push(col);
            }
            Err(_) => {
                let dtype = a.column(name)?.dtype().clone();
                b_cols.push(Column::full_null(name.as_str().into(), b.height(), &dtype));
            }
        }
    }

    let a_aligned = DataFrame::new(a_cols)?;
    let b_aligned = DataFrame::new(b_cols)?;
    Ok(a_aligned.vstack(&b_aligned)?)
}

/// Keep only rows usable for training: target present and non-zero,
/// land-unit-price present.
fn filter_trainable_rows(df: &DataFrame) -> Result<DataFrame> {
    let target = df
        .column(TARGET)?
        .cast(&DataType::Float64)
        .context("Casting target for clean-row filter")?
        .take_materialized_series();
    let price = df
        .column(LAND_UNIT_PRICE)?
        .cast(&DataType::Float64)
        .context("Casting land unit price for clean-row filter")?
        .take_materialized_series();

    let target_ca = target.f64()?;
    let price_ca = price.f64()?;

    let keep: Vec<bool> = target_ca
        .into_iter()
        .zip(price_ca)
        .map(|(t, p)| matches!((t, p), (Some(tv), Some(_)) if tv != 0.0))
        .collect();

    let mask_series = Series::new("keep".into(), keep);
    Ok(df.filter(mask_series.bool()?)?)
}
