//! One-hot encoding with the first category dropped.

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::Result;
use crate::frame::categorical_values;

/// Fitted one-hot encoder.
///
/// Each column keeps its sorted distinct training categories. The first one
/// is the reference level and gets no indicator, so a column with `k`
/// categories emits `k - 1` features. A value not seen during fit, or a
/// missing one, encodes as all zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    pub fn fit(columns: &[String], df: &DataFrame) -> Result<Self> {
        let categories = columns
            .iter()
            .map(|column| {
                let distinct: BTreeSet<String> =
                    categorical_values(df, column)?.into_iter().flatten().collect();
                Ok(distinct.into_iter().collect())
            })
            .collect::<Result<Vec<Vec<String>>>>()?;
        Ok(Self { categories })
    }

    pub fn categories(&self) -> &[Vec<String>] {
        &self.categories
    }

    pub fn n_features(&self) -> usize {
        self.categories.iter().map(|c| c.len().saturating_sub(1)).sum()
    }

    /// Output names in `<column>_<category>` form.
    pub fn feature_names(&self, columns: &[String]) -> Vec<String> {
        columns
            .iter()
            .zip(&self.categories)
            .flat_map(|(column, categories)| {
                categories.iter().skip(1).map(move |c| format!("{column}_{c}"))
            })
            .collect()
    }

    pub fn transform(&self, columns: &[String], df: &DataFrame) -> Result<Vec<Vec<f64>>> {
        let mut features = Vec::with_capacity(self.n_features());
        for (column, categories) in columns.iter().zip(&self.categories) {
            let values = categorical_values(df, column)?;
            for category in categories.iter().skip(1) {
                features.push(
                    values
                        .iter()
                        .map(|v| if v.as_ref() == Some(category) { 1.0 } else { 0.0 })
                        .collect(),
                );
            }
        }
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_drops_first_sorted_category() {
        let columns = vec!["MTRANS".to_string()];
        let train = df!["MTRANS" => ["Walking", "Bike", "Automobile", "Bike"]].unwrap();
        let encoder = OneHotEncoder::fit(&columns, &train).unwrap();

        assert_eq!(encoder.categories()[0], ["Automobile", "Bike", "Walking"]);
        assert_eq!(encoder.n_features(), 2);
        assert_eq!(encoder.feature_names(&columns), ["MTRANS_Bike", "MTRANS_Walking"]);

        let encoded = encoder.transform(&columns, &train).unwrap();
        assert_eq!(encoded, vec![vec![0.0, 1.0, 0.0, 1.0], vec![1.0, 0.0, 0.0, 0.0]]);
    }

    #[test]
    fn test_unseen_and_missing_encode_as_zeros() {
        let columns = vec!["SCC".to_string()];
        let train = df!["SCC" => ["no", "yes"]].unwrap();
        let encoder = OneHotEncoder::fit(&columns, &train).unwrap();

        let input = df!["SCC" => [Some("maybe"), None, Some("yes")]].unwrap();
        assert_eq!(encoder.transform(&columns, &input).unwrap(), vec![vec![0.0, 0.0, 1.0]]);
    }

    #[test]
    fn test_single_category_column_emits_nothing() {
        let columns = vec!["FAVC".to_string()];
        let train = df!["FAVC" => ["yes", "yes"]].unwrap();
        let encoder = OneHotEncoder::fit(&columns, &train).unwrap();
        assert_eq!(encoder.n_features(), 0);
        assert!(encoder.transform(&columns, &train).unwrap().is_empty());
    }
}
