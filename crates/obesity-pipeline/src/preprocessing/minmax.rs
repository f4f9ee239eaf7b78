//! Min-max scaling to the training range.

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::frame::numeric_values;

/// Observed range of one column. `None` when the training split had no
/// values for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Fitted min-max scaler: `(x - min) / (max - min)`.
///
/// A zero range divides by one instead. Values outside the training range
/// are not clipped; missing values stay NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    ranges: Vec<ColumnRange>,
}

impl MinMaxScaler {
    pub fn fit(columns: &[String], df: &DataFrame) -> Result<Self> {
        let ranges = columns
            .iter()
            .map(|column| {
                let values = numeric_values(df, column)?;
                let present = values.iter().flatten().copied();
                Ok(ColumnRange {
                    min: present.clone().reduce(f64::min),
                    max: present.reduce(f64::max),
                })
            })
            .collect::<Result<_>>()?;
        Ok(Self { ranges })
    }

    pub fn ranges(&self) -> &[ColumnRange] {
        &self.ranges
    }

    pub fn n_features(&self) -> usize {
        self.ranges.len()
    }

    pub fn transform(&self, columns: &[String], df: &DataFrame) -> Result<Vec<Vec<f64>>> {
        columns
            .iter()
            .zip(&self.ranges)
            .map(|(column, range)| {
                let scaled = numeric_values(df, column)?
                    .into_iter()
                    .map(|value| match (value, range.min, range.max) {
                        (Some(x), Some(min), Some(max)) => {
                            let span = if max - min == 0.0 { 1.0 } else { max - min };
                            (x - min) / span
                        }
                        _ => f64::NAN,
                    })
                    .collect();
                Ok(scaled)
            })
            .collect()
    }
}
