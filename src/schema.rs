//! Column schema for the property-valuation dataset.
//!
//! Column names, predictor lists and the ordinal business-advantage scale
//! live here so that every stage of the pipeline agrees on the schema.
//! Validation fails loudly when a configured column is absent from an
//! input table, since downstream column reconciliation assumes both
//! sources conform.

use crate::error::{ImputeError, Result};
use once_cell::sync::Lazy;
use polars::prelude::*;
use std::collections::HashMap;

/// The attribute being imputed: minimum alley/laneway width in meters.
pub const TARGET: &str = "min_alley_width_m";

/// Required numeric predictor; rows without it are excluded from training.
pub const LAND_UNIT_PRICE: &str = "land_unit_price";

/// Days since the listing was published. Defaulted to 0 for reference-table
/// rows, which carry no listing date.
pub const LISTING_AGE: &str = "listing_age_days";

/// Numeric predictor columns (7).
pub const NUMERIC_FEATURES: [&str; 7] = [
    "land_area_m2",
    "facade_width_m",
    "land_length_m",
    "facade_count",
    "distance_to_main_road_m",
    LAND_UNIT_PRICE,
    LISTING_AGE,
];

/// Categorical predictors that are one-hot expanded (5).
pub const ONE_HOT_FEATURES: [&str; 5] = ["province", "district", "ward", "street", "land_shape"];

/// The ordered categorical predictor, mapped to integers instead of
/// one-hot expanded.
pub const ORDINAL_FEATURE: &str = "business_advantage";

/// Sentinel category for missing categorical values at inference time.
pub const MISSING_CATEGORY: &str = "Missing";

/// Fixed 5-level scale for the ordinal predictor.
static ORDINAL_SCALE: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("Good", 4.0),
        ("Fair", 3.0),
        ("Average", 2.0),
        ("Poor", 1.0),
        (MISSING_CATEGORY, 0.0),
    ])
});

/// Map an ordinal level to its encoded value, or `None` for a level
/// outside the known scale.
pub fn ordinal_level(value: &str) -> Option<f64> {
    ORDINAL_SCALE.get(value).copied()
}

/// All categorical predictor columns (6), ordinal last.
pub fn categorical_features() -> Vec<&'static str> {
    let mut cols = ONE_HOT_FEATURES.to_vec();
    cols.push(ORDINAL_FEATURE);
    cols
}

/// All predictor columns, numeric first.
pub fn feature_columns() -> Vec<&'static str> {
    let mut cols = NUMERIC_FEATURES.to_vec();
    cols.extend(categorical_features());
    cols
}

/// Validate that `df` carries every configured predictor plus the target.
///
/// `source_table` names the table in error messages (e.g. "dataset",
/// "reference table").
pub fn validate_schema(df: &DataFrame, source_table: &str) -> Result<()> {
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut required: Vec<&str> = feature_columns();
    required.push(TARGET);

    for col in required {
        // The listing age is derived for reference rows, so the reference
        // table may legitimately omit it.
        if col == LISTING_AGE && source_table != "dataset" {
            continue;
        }
        if !present.iter().any(|name| name == col) {
            return Err(ImputeError::ColumnNotFound {
                column: col.to_string(),
                source_table: source_table.to_string(),
            });
        }
    }

    Ok(())
}
