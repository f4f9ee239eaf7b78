//! Ordered list of fitted preprocessing stages.

use ndarray::Array2;
use polars::prelude::DataFrame;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use tracing::{debug, warn};

use super::{MinMaxScaler, OneHotEncoder, OrdinalEncoder};
use crate::compat;
use crate::config::FeatureConfig;
use crate::error::{PipelineError, Result};
use crate::frame::has_column;

/// Role of a stage. Stored in artifacts by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Ordinal,
    Nominal,
    Numeric,
    /// Training columns without a role; emits no features.
    Remainder,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ordinal => "ordinal",
            Self::Nominal => "nominal",
            Self::Numeric => "numeric",
            Self::Remainder => "remainder",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StageKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StageKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        match name.as_str() {
            "ordinal" => Ok(Self::Ordinal),
            "nominal" => Ok(Self::Nominal),
            "numeric" => Ok(Self::Numeric),
            "remainder" if compat::remainder_registered() => Ok(Self::Remainder),
            "remainder" => Err(de::Error::custom(
                "stage kind 'remainder' is not registered; call compat::ensure_legacy_symbols() first",
            )),
            other => Err(de::Error::unknown_variant(
                other,
                &["ordinal", "nominal", "numeric", "remainder"],
            )),
        }
    }
}

/// Fitted parameters of a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageParams {
    Ordinal(OrdinalEncoder),
    OneHot(OneHotEncoder),
    MinMax(MinMaxScaler),
    Drop,
}

/// One stage: its kind, the columns it consumes, and what it learned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedStage {
    pub kind: StageKind,
    pub columns: Vec<String>,
    pub params: StageParams,
}

impl FittedStage {
    pub fn n_features(&self) -> usize {
        match &self.params {
            StageParams::Ordinal(encoder) => encoder.n_features(),
            StageParams::OneHot(encoder) => encoder.n_features(),
            StageParams::MinMax(scaler) => scaler.n_features(),
            StageParams::Drop => 0,
        }
    }

    fn transform(&self, df: &DataFrame) -> Result<Vec<Vec<f64>>> {
        match &self.params {
            StageParams::Ordinal(encoder) => encoder.transform(&self.columns, df),
            StageParams::OneHot(encoder) => encoder.transform(&self.columns, df),
            StageParams::MinMax(scaler) => scaler.transform(&self.columns, df),
            StageParams::Drop => Ok(Vec::new()),
        }
    }

    fn feature_names(&self) -> Vec<String> {
        match &self.params {
            StageParams::OneHot(encoder) => encoder.feature_names(&self.columns),
            StageParams::Drop => Vec::new(),
            _ => self.columns.clone(),
        }
    }
}

/// Applies the stages in order and concatenates their outputs:
/// ordinal, then nominal, then numeric features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    stages: Vec<FittedStage>,
}

impl ColumnTransformer {
    /// Fit every stage on the feature columns of `df`.
    ///
    /// Declared columns absent from `df` are skipped, and a role left with no
    /// columns gets no stage. Any other column except the target goes to the
    /// remainder stage and is dropped.
    pub fn fit(config: &FeatureConfig, df: &DataFrame) -> Result<Self> {
        let present = |role: &str, declared: &[String]| -> Vec<String> {
            declared
                .iter()
                .filter(|column| {
                    let found = has_column(df, column);
                    if !found {
                        warn!("Declared {} column '{}' is not in the training table", role, column);
                    }
                    found
                })
                .cloned()
                .collect()
        };

        let mut stages = Vec::new();

        let ordinal = present("ordinal", config.ordinal_columns());
        if !ordinal.is_empty() {
            let orders = ordinal
                .iter()
                .map(|c| config.category_order(c).map(<[String]>::to_vec).unwrap_or_default())
                .collect();
            let encoder = OrdinalEncoder::fit(&ordinal, orders, df)?;
            stages.push(FittedStage {
                kind: StageKind::Ordinal,
                columns: ordinal,
                params: StageParams::Ordinal(encoder),
            });
        }

        let nominal = present("nominal", config.nominal_columns());
        if !nominal.is_empty() {
            let encoder = OneHotEncoder::fit(&nominal, df)?;
            stages.push(FittedStage {
                kind: StageKind::Nominal,
                columns: nominal,
                params: StageParams::OneHot(encoder),
            });
        }

        let numeric = present("numeric", config.numeric_columns());
        if !numeric.is_empty() {
            let scaler = MinMaxScaler::fit(&numeric, df)?;
            stages.push(FittedStage {
                kind: StageKind::Numeric,
                columns: numeric,
                params: StageParams::MinMax(scaler),
            });
        }

        let declared = config.expected_columns();
        let remainder: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .filter(|name| name != config.target() && !declared.contains(name))
            .collect();
        if !remainder.is_empty() {
            debug!("Dropping columns without a role: {:?}", remainder);
            stages.push(FittedStage {
                kind: StageKind::Remainder,
                columns: remainder,
                params: StageParams::Drop,
            });
        }

        let transformer = Self { stages };
        if transformer.n_features() == 0 {
            return Err(PipelineError::InvalidData(
                "no feature columns left to train on".to_string(),
            ));
        }
        Ok(transformer)
    }

    pub fn stages(&self) -> &[FittedStage] {
        &self.stages
    }

    /// Width of the transformed matrix.
    pub fn n_features(&self) -> usize {
        self.stages.iter().map(FittedStage::n_features).sum()
    }

    /// Names of the transformed features, in matrix column order.
    pub fn feature_names(&self) -> Vec<String> {
        self.stages.iter().flat_map(FittedStage::feature_names).collect()
    }

    /// Columns read by the feature-producing stages, in stage order.
    pub fn input_columns(&self) -> Vec<String> {
        self.stages
            .iter()
            .filter(|stage| stage.kind != StageKind::Remainder)
            .flat_map(|stage| stage.columns.iter().cloned())
            .collect()
    }

    /// Build the `(rows, n_features)` design matrix.
    ///
    /// Every input column must be present; remainder columns are ignored.
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let mut features = Vec::with_capacity(self.n_features());
        for stage in &self.stages {
            features.extend(stage.transform(df)?);
        }
        Ok(Array2::from_shape_fn((df.height(), features.len()), |(row, col)| {
            features[col][row]
        }))
    }
}
