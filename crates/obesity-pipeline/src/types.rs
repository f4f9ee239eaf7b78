//! Common types shared by the pipeline, its artifacts, and the CLI.

use polars::prelude::{DataFrame, Series};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::metrics::ClassificationReport;

/// Fallback value used for a column absent from a prediction input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnDefault {
    /// Median of a numeric column in the training split.
    Number(f64),
    /// Mode of a categorical column, or the first declared category.
    Category(String),
    /// Neither a median nor a mode could be computed.
    ///
    /// Flows into the encoders as a missing value.
    Missing,
}

impl ColumnDefault {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl fmt::Display for ColumnDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Category(value) => write!(f, "{value}"),
            Self::Missing => write!(f, "<missing>"),
        }
    }
}

/// Result of [`ObesityPipeline::train`](crate::ObesityPipeline::train).
///
/// Carries the evaluation on the held-out split together with the split
/// itself, for external diagnostics.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Fraction of correctly classified held-out rows.
    pub accuracy: f64,
    /// Per-class precision / recall / F1 on the held-out rows.
    pub report: ClassificationReport,
    /// Held-out feature columns (target removed).
    pub x_test: DataFrame,
    /// Held-out target labels, aligned with `x_test`.
    pub y_test: Series,
    /// Number of rows the pipeline was fitted on.
    pub train_rows: usize,
}
