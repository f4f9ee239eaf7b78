//! Ordinal encoding with a declared category order.

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::frame::categorical_values;

/// Encoded value of a category outside the declared order, or of a missing
/// value.
pub const UNKNOWN_SENTINEL: f64 = -1.0;

/// Fitted ordinal encoder: one declared order per column.
///
/// The `i`-th category of a column encodes as `i as f64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdinalEncoder {
    categories: Vec<Vec<String>>,
}

impl OrdinalEncoder {
    /// Check the training values of each column against its declared order.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnknownCategory`] for a non-missing training value
    /// that the declared order does not contain.
    pub fn fit(columns: &[String], categories: Vec<Vec<String>>, df: &DataFrame) -> Result<Self> {
        for (column, order) in columns.iter().zip(&categories) {
            for value in categorical_values(df, column)?.into_iter().flatten() {
                if !order.contains(&value) {
                    return Err(PipelineError::UnknownCategory {
                        column: column.clone(),
                        value,
                    });
                }
            }
        }
        Ok(Self { categories })
    }

    pub fn categories(&self) -> &[Vec<String>] {
        &self.categories
    }

    pub fn n_features(&self) -> usize {
        self.categories.len()
    }

    /// Encode each column; unknown and missing values become
    /// [`UNKNOWN_SENTINEL`].
    pub fn transform(&self, columns: &[String], df: &DataFrame) -> Result<Vec<Vec<f64>>> {
        columns
            .iter()
            .zip(&self.categories)
            .map(|(column, order)| {
                let encoded = categorical_values(df, column)?
                    .iter()
                    .map(|value| {
                        value
                            .as_ref()
                            .and_then(|v| order.iter().position(|c| c == v))
                            .map_or(UNKNOWN_SENTINEL, |i| i as f64)
                    })
                    .collect();
                Ok(encoded)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn order() -> Vec<Vec<String>> {
        vec![["low", "medium", "high"].map(String::from).to_vec()]
    }

    #[test]
    fn test_encodes_declared_order() {
        let columns = vec!["freq".to_string()];
        let train = df!["freq" => ["high", "low", "medium"]].unwrap();
        let encoder = OrdinalEncoder::fit(&columns, order(), &train).unwrap();

        assert_eq!(encoder.transform(&columns, &train).unwrap(), vec![vec![2.0, 0.0, 1.0]]);
    }

    #[test]
    fn test_unseen_and_missing_use_sentinel() {
        let columns = vec!["freq".to_string()];
        let train = df!["freq" => ["low", "high"]].unwrap();
        let encoder = OrdinalEncoder::fit(&columns, order(), &train).unwrap();

        let input = df!["freq" => [Some("extreme"), None, Some("medium")]].unwrap();
        assert_eq!(
            encoder.transform(&columns, &input).unwrap(),
            vec![vec![UNKNOWN_SENTINEL, UNKNOWN_SENTINEL, 1.0]]
        );
    }

    #[test]
    fn test_fit_rejects_undeclared_training_value() {
        let columns = vec!["freq".to_string()];
        let train = df!["freq" => ["low", "sometimes"]].unwrap();
        let err = OrdinalEncoder::fit(&columns, order(), &train).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_CATEGORY");
    }
}
