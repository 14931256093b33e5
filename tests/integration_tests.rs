//! Integration tests for the alley-width imputation pipeline.
//!
//! These tests verify end-to-end behavior on synthetic property datasets.

use alley_impute::schema::{
    LAND_UNIT_PRICE, LISTING_AGE, NUMERIC_FEATURES, ONE_HOT_FEATURES, ORDINAL_FEATURE, TARGET,
};
use alley_impute::{AlleyWidthImputer, ImputationOutcome, ImputerConfig, SkipReason};
use polars::prelude::*;
use pretty_assertions::assert_eq;

// ============================================================================
// Helper Functions
// ============================================================================

const ADVANTAGE_LEVELS: [&str; 4] = ["Good", "Fair", "Average", "Poor"];

/// Build a synthetic property dataset with `n` rows; rows listed in
/// `missing_targets` get a null alley width. All other columns are fully
/// populated except `facade_width_m`, which is null on every 7th row to
/// exercise median imputation.
fn make_dataset(n: usize, missing_targets: &[usize]) -> DataFrame {
    let mut columns: Vec<Column> = Vec::new();

    let target: Vec<Option<f64>> = (0..n)
        .map(|i| {
            if missing_targets.contains(&i) {
                None
            } else {
                // Width loosely follows the unit price, inside [0.5, 5.0].
                Some(0.5 + ((i * 13) % 90) as f64 / 20.0)
            }
        })
        .collect();
    columns.push(Series::new(TARGET.into(), target).into_column());

    for col in NUMERIC_FEATURES {
        let values: Vec<Option<f64>> = (0..n)
            .map(|i| match col {
                "facade_width_m" if i % 7 == 0 => None,
                LAND_UNIT_PRICE => Some(20.0 + ((i * 13) % 90) as f64 * 3.7),
                LISTING_AGE => Some((i % 365) as f64),
                _ => Some(10.0 + ((i * 5) % 40) as f64),
            })
            .collect();
        columns.push(Series::new(col.into(), values).into_column());
    }

    for (k, col) in ONE_HOT_FEATURES.iter().enumerate() {
        let values: Vec<String> = (0..n).map(|i| format!("{}_{}", col, i % (k + 2))).collect();
        columns.push(Series::new((*col).into(), values).into_column());
    }

    let advantage: Vec<&str> = (0..n).map(|i| ADVANTAGE_LEVELS[i % 4]).collect();
    columns.push(Series::new(ORDINAL_FEATURE.into(), advantage).into_column());

    // Unrelated column the pipeline must ignore but preserve.
    let notes: Vec<String> = (0..n).map(|i| format!("listing #{i}")).collect();
    columns.push(Series::new("listing_url".into(), notes).into_column());

    DataFrame::new(columns).unwrap()
}

fn target_values(df: &DataFrame) -> Vec<Option<f64>> {
    df.column(TARGET)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect()
}

// ============================================================================
// No-op and Guard Paths
// ============================================================================

#[test]
fn test_no_missing_targets_is_identity() {
    let df = make_dataset(80, &[]);
    let outcome = AlleyWidthImputer::with_defaults()
        .impute(df.clone(), None)
        .unwrap();

    match outcome {
        ImputationOutcome::Unchanged { data, reason } => {
            assert_eq!(reason, SkipReason::NoMissingTargets);
            assert!(data.equals_missing(&df));
        }
        ImputationOutcome::Filled { .. } => panic!("expected the no-op path"),
    }
}

#[test]
fn test_insufficient_training_data_returns_input_exactly() {
    // 30 rows minus 3 missing = 27 clean, below the default minimum of 50.
    let df = make_dataset(30, &[2, 11, 25]);
    let outcome = AlleyWidthImputer::with_defaults()
        .impute(df.clone(), None)
        .unwrap();

    match outcome {
        ImputationOutcome::Unchanged { data, reason } => {
            assert!(matches!(
                reason,
                SkipReason::InsufficientTrainingData {
                    clean_rows: 27,
                    required: 50
                }
            ));
            assert!(data.equals_missing(&df));
        }
        ImputationOutcome::Filled { .. } => panic!("expected the insufficient-data guard"),
    }
}

#[test]
fn test_schema_drift_fails_loudly() {
    let df = make_dataset(80, &[1]).drop("district").unwrap();
    let err = AlleyWidthImputer::with_defaults()
        .impute(df, None)
        .unwrap_err();
    assert!(err.is_schema_drift());
    assert!(err.to_string().contains("district"));
}

// ============================================================================
// End-to-End Imputation
// ============================================================================

#[test]
fn test_end_to_end_fills_gaps() {
    let missing = [3, 17, 29, 44, 61];
    let df = make_dataset(70, &missing);
    let outcome = AlleyWidthImputer::with_defaults()
        .impute(df.clone(), None)
        .unwrap();

    let (filled, report) = match outcome {
        ImputationOutcome::Filled { data, report } => (data, report),
        ImputationOutcome::Unchanged { reason, .. } => panic!("unexpected skip: {reason:?}"),
    };

    // Shape, row order, and column set preserved.
    assert_eq!(filled.height(), df.height());
    assert_eq!(filled.get_column_names(), df.get_column_names());
    assert!(
        filled
            .column("listing_url")
            .unwrap()
            .as_materialized_series()
            .equals(df.column("listing_url").unwrap().as_materialized_series())
    );

    let before = target_values(&df);
    let after = target_values(&filled);
    for (i, (b, a)) in before.iter().zip(&after).enumerate() {
        if missing.contains(&i) {
            let v = a.expect("gap should be filled");
            assert!(v.is_finite());
            assert!(v >= 0.0, "imputed value must be non-negative");
            // Rounded to two decimals.
            assert_eq!((v * 100.0).round() / 100.0, v);
        } else {
            assert_eq!(a, b, "present value at row {i} must be untouched");
        }
    }

    // 65 clean rows; held-out set is round(0.2 * 65) = 13.
    assert_eq!(report.clean_training_rows, 65);
    assert_eq!(report.test_rows, 13);
    assert_eq!(report.train_rows, 52);
    assert_eq!(report.imputed_rows, missing.len());
    assert_eq!(report.unknown_ordinal_levels, 0);

    let metrics = report.metrics.expect("held-out metrics should be reported");
    assert!(metrics.mae.is_finite() && metrics.mae >= 0.0);
    assert!(metrics.rmse.is_finite() && metrics.rmse >= metrics.mae);

    // The numeric column with injected nulls shows up in diagnostics.
    assert!(report.missing_by_column["facade_width_m"] > 0);
}

#[test]
fn test_external_reference_tops_up_training_data() {
    // 20 internal valid rows alone would trip the guard; the reference
    // table pushes the corpus past the minimum.
    let internal = make_dataset(23, &[5, 9, 20]);
    let reference = make_dataset(60, &[]).drop("listing_url").unwrap();

    let outcome = AlleyWidthImputer::with_defaults()
        .impute(internal.clone(), Some(reference))
        .unwrap();

    let report = match &outcome {
        ImputationOutcome::Filled { report, .. } => report,
        ImputationOutcome::Unchanged { reason, .. } => panic!("unexpected skip: {reason:?}"),
    };
    assert_eq!(report.internal_rows, 23);
    assert_eq!(report.external_rows, 60);
    assert_eq!(report.imputed_rows, 3);

    // Output shape follows the internal dataset, not the corpus.
    assert_eq!(outcome.data().height(), 23);
    assert_eq!(
        outcome.data().get_column_names(),
        internal.get_column_names()
    );
}

#[test]
fn test_determinism_across_runs() {
    let missing = [4, 40];
    let df = make_dataset(64, &missing);

    let run = || {
        let outcome = AlleyWidthImputer::with_defaults()
            .impute(df.clone(), None)
            .unwrap();
        target_values(outcome.data())
    };

    assert_eq!(run(), run());
}

#[test]
fn test_unseen_inference_category_reconciled() {
    let missing = [0];
    let mut df = make_dataset(66, &missing);

    // Give the gap row a street never seen among training rows; the
    // encoder must reconcile it away rather than fail.
    let streets = df
        .column("street")
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            if i == 0 {
                Some("street_never_seen".to_string())
            } else {
                v.map(str::to_string)
            }
        })
        .collect::<Vec<_>>();
    df.replace("street", Series::new("street".into(), streets))
        .unwrap();

    let outcome = AlleyWidthImputer::with_defaults().impute(df, None).unwrap();
    assert!(outcome.is_filled());
    let after = target_values(outcome.data());
    assert!(after[0].unwrap() >= 0.0);
}

#[test]
fn test_custom_threshold_allows_small_corpus() {
    let df = make_dataset(30, &[2]);
    let config = ImputerConfig::builder()
        .min_training_rows(20)
        .build()
        .unwrap();

    let outcome = AlleyWidthImputer::new(config).impute(df, None).unwrap();
    assert!(outcome.is_filled());
    assert_eq!(outcome.report().unwrap().imputed_rows, 1);
}
