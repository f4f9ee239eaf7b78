//! Fallback values for partial prediction inputs.
//!
//! Defaults are derived from the training split only:
//! - numeric columns use the median of the observed values;
//! - ordinal and nominal columns use the most frequent value, then the first
//!   declared category (ordinal only), then [`ColumnDefault::Missing`].

use polars::prelude::DataFrame;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::FeatureConfig;
use crate::error::Result;
use crate::frame::{categorical_values, has_column, numeric_values};
use crate::types::ColumnDefault;

/// Median of the non-missing values; the mean of the two middle values for
/// an even count.
pub fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(f64::total_cmp);

    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        Some((present[mid - 1] + present[mid]) / 2.0)
    } else {
        Some(present[mid])
    }
}

/// Most frequent non-missing value; ties go to the smallest value.
pub fn mode(values: &[Option<String>]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values.iter().flatten() {
        *counts.entry(value.as_str()).or_insert(0) += 1;
    }

    // BTreeMap iterates in ascending key order, so keeping only strictly
    // larger counts lets the smallest value win a tie.
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.to_string())
}

/// Compute the default of every declared column present in `train`.
pub fn compute_defaults(
    config: &FeatureConfig,
    train: &DataFrame,
) -> Result<BTreeMap<String, ColumnDefault>> {
    let mut defaults = BTreeMap::new();

    for column in config.numeric_columns() {
        if !has_column(train, column) {
            continue;
        }
        let default = median(&numeric_values(train, column)?)
            .map(ColumnDefault::Number)
            .unwrap_or(ColumnDefault::Missing);
        debug!("Default for '{}': median {}", column, default);
        defaults.insert(column.clone(), default);
    }

    for column in config.ordinal_columns().iter().chain(config.nominal_columns()) {
        if !has_column(train, column) {
            continue;
        }
        let default = match mode(&categorical_values(train, column)?) {
            Some(value) => ColumnDefault::Category(value),
            None => config
                .category_order(column)
                .and_then(|order| order.first())
                .map(|first| ColumnDefault::Category(first.clone()))
                .unwrap_or(ColumnDefault::Missing),
        };
        debug!("Default for '{}': mode {}", column, default);
        defaults.insert(column.clone(), default);
    }

    Ok(defaults)
}
