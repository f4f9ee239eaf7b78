//! Configuration types for the prediction pipeline.
//!
//! - [`FeatureConfig`] declares, once, the role of every feature column and
//!   the category order of each ordinal column.
//! - [`TrainingConfig`] holds the split and classifier settings used by
//!   [`ObesityPipeline::train`](crate::ObesityPipeline::train).
//!
//! Both are built with a validating builder and can be (de)serialized as JSON
//! so they can also be supplied from a file.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Default name of the target column in the obesity dataset.
pub const DEFAULT_TARGET: &str = "Obesity";

/// Default random seed for the split and the classifier.
pub const DEFAULT_RANDOM_SEED: u64 = 4242;

/// Default held-out fraction.
pub const DEFAULT_TEST_SIZE: f64 = 0.3;

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Column '{column}' is declared in both '{first}' and '{second}'")]
    OverlappingRoles {
        column: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("Column '{column}' is declared twice in '{role}'")]
    DuplicateColumn { column: String, role: &'static str },

    #[error("Target column '{0}' cannot also be a feature")]
    TargetIsFeature(String),

    #[error("Target column name cannot be empty")]
    EmptyTarget,

    #[error("Ordinal column '{0}' has no category order")]
    MissingCategoryOrder(String),

    #[error("Category order for '{0}' is empty")]
    EmptyCategoryOrder(String),

    #[error("Category '{category}' appears twice in the order of '{column}'")]
    DuplicateCategory { column: String, category: String },

    #[error("Category order declared for '{0}', which is not an ordinal column")]
    OrphanCategoryOrder(String),

    #[error("Invalid test size: {0} (must be strictly between 0.0 and 1.0)")]
    InvalidTestSize(f64),

    #[error("Invalid number of trees: {0} (must be at least 1)")]
    InvalidEstimators(usize),

    #[error("Invalid max depth: {0} (must be at least 1)")]
    InvalidMaxDepth(usize),
}

/// Immutable declaration of the column roles.
///
/// Use [`FeatureConfig::builder()`] or [`FeatureConfig::new`]. The three role
/// lists are pairwise disjoint; any of them may be empty, in which case the
/// corresponding preprocessing stage is skipped.
///
/// # Example
///
/// ```rust
/// use obesity_pipeline::FeatureConfig;
///
/// let config = FeatureConfig::builder()
///     .ordinal("freq", ["low", "medium", "high"])
///     .numeric(["age"])
///     .target("label")
///     .build()
///     .unwrap();
///
/// assert_eq!(config.expected_columns(), vec!["freq", "age"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FeatureConfigRaw", into = "FeatureConfigRaw")]
pub struct FeatureConfig {
    ordinal_columns: Vec<String>,
    ordinal_order: BTreeMap<String, Vec<String>>,
    nominal_columns: Vec<String>,
    numeric_columns: Vec<String>,
    target: String,
}

/// Unvalidated, serializable form of [`FeatureConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfigRaw {
    #[serde(default)]
    pub ordinal_columns: Vec<String>,
    #[serde(default)]
    pub ordinal_order: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub nominal_columns: Vec<String>,
    #[serde(default)]
    pub numeric_columns: Vec<String>,
    #[serde(default = "default_target")]
    pub target: String,
}

fn default_target() -> String {
    DEFAULT_TARGET.to_string()
}

impl TryFrom<FeatureConfigRaw> for FeatureConfig {
    type Error = ConfigValidationError;

    fn try_from(raw: FeatureConfigRaw) -> Result<Self, Self::Error> {
        let config = FeatureConfig {
            ordinal_columns: raw.ordinal_columns,
            ordinal_order: raw.ordinal_order,
            nominal_columns: raw.nominal_columns,
            numeric_columns: raw.numeric_columns,
            target: raw.target,
        };
        config.validate()?;
        Ok(config)
    }
}

impl From<FeatureConfig> for FeatureConfigRaw {
    fn from(config: FeatureConfig) -> Self {
        FeatureConfigRaw {
            ordinal_columns: config.ordinal_columns,
            ordinal_order: config.ordinal_order,
            nominal_columns: config.nominal_columns,
            numeric_columns: config.numeric_columns,
            target: config.target,
        }
    }
}

impl FeatureConfig {
    /// Create a validated configuration from the four role declarations.
    ///
    /// Inputs are copied, so later changes to the caller's collections do not
    /// affect the configuration.
    pub fn new<S: AsRef<str>>(
        ordinal_columns: &[S],
        ordinal_order: &BTreeMap<String, Vec<String>>,
        nominal_columns: &[S],
        numeric_columns: &[S],
        target: &str,
    ) -> Result<Self, ConfigValidationError> {
        let to_owned = |cols: &[S]| cols.iter().map(|c| c.as_ref().to_string()).collect();
        FeatureConfig::try_from(FeatureConfigRaw {
            ordinal_columns: to_owned(ordinal_columns),
            ordinal_order: ordinal_order.clone(),
            nominal_columns: to_owned(nominal_columns),
            numeric_columns: to_owned(numeric_columns),
            target: target.to_string(),
        })
    }

    /// Create a new configuration builder.
    pub fn builder() -> FeatureConfigBuilder {
        FeatureConfigBuilder::default()
    }

    /// The declaration used for the obesity risk-factor dataset.
    pub fn obesity() -> Self {
        let frequency = ["no", "Sometimes", "Frequently", "Always"];
        FeatureConfig {
            ordinal_columns: vec!["CAEC".to_string(), "CALC".to_string()],
            ordinal_order: ["CAEC", "CALC"]
                .iter()
                .map(|c| (c.to_string(), frequency.iter().map(|s| s.to_string()).collect()))
                .collect(),
            nominal_columns: ["FAVC", "SCC", "MTRANS", "family_history"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            numeric_columns: ["Age", "Height", "Weight", "FCVC", "FAF", "CH2O", "TUE"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            target: DEFAULT_TARGET.to_string(),
        }
    }

    pub fn ordinal_columns(&self) -> &[String] {
        &self.ordinal_columns
    }

    /// Declared category order of an ordinal column.
    pub fn category_order(&self, column: &str) -> Option<&[String]> {
        self.ordinal_order.get(column).map(Vec::as_slice)
    }

    pub fn nominal_columns(&self) -> &[String] {
        &self.nominal_columns
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Canonical input order before any training-derived filtering:
    /// ordinal, then nominal, then numeric columns.
    pub fn expected_columns(&self) -> Vec<String> {
        self.ordinal_columns
            .iter()
            .chain(&self.nominal_columns)
            .chain(&self.numeric_columns)
            .cloned()
            .collect()
    }

    /// Whether the column has a categorical (ordinal or nominal) role.
    pub fn is_categorical(&self, column: &str) -> bool {
        self.ordinal_columns.iter().any(|c| c == column)
            || self.nominal_columns.iter().any(|c| c == column)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.target.trim().is_empty() {
            return Err(ConfigValidationError::EmptyTarget);
        }

        let roles: [(&'static str, &[String]); 3] = [
            ("ordinal", &self.ordinal_columns),
            ("nominal", &self.nominal_columns),
            ("numeric", &self.numeric_columns),
        ];

        let mut owner: BTreeMap<&str, &'static str> = BTreeMap::new();
        for (role, columns) in roles {
            for column in columns {
                if column == &self.target {
                    return Err(ConfigValidationError::TargetIsFeature(column.clone()));
                }
                match owner.get(column.as_str()) {
                    Some(&first) if first == role => {
                        return Err(ConfigValidationError::DuplicateColumn {
                            column: column.clone(),
                            role,
                        });
                    }
                    Some(&first) => {
                        return Err(ConfigValidationError::OverlappingRoles {
                            column: column.clone(),
                            first,
                            second: role,
                        });
                    }
                    None => {
                        owner.insert(column.as_str(), role);
                    }
                }
            }
        }

        for column in &self.ordinal_columns {
            let order = self
                .ordinal_order
                .get(column)
                .ok_or_else(|| ConfigValidationError::MissingCategoryOrder(column.clone()))?;
            if order.is_empty() {
                return Err(ConfigValidationError::EmptyCategoryOrder(column.clone()));
            }
            let mut seen = HashSet::new();
            for category in order {
                if !seen.insert(category.as_str()) {
                    return Err(ConfigValidationError::DuplicateCategory {
                        column: column.clone(),
                        category: category.clone(),
                    });
                }
            }
        }

        if let Some(orphan) = self
            .ordinal_order
            .keys()
            .find(|c| !self.ordinal_columns.contains(*c))
        {
            return Err(ConfigValidationError::OrphanCategoryOrder(orphan.clone()));
        }

        Ok(())
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self::obesity()
    }
}

/// Builder for [`FeatureConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct FeatureConfigBuilder {
    ordinal_columns: Vec<String>,
    ordinal_order: BTreeMap<String, Vec<String>>,
    nominal_columns: Vec<String>,
    numeric_columns: Vec<String>,
    target: Option<String>,
}

impl FeatureConfigBuilder {
    /// Declare an ordinal column together with its category order (lowest first).
    pub fn ordinal<I, S>(mut self, column: impl Into<String>, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let column = column.into();
        self.ordinal_order
            .insert(column.clone(), order.into_iter().map(Into::into).collect());
        self.ordinal_columns.push(column);
        self
    }

    /// Declare nominal (one-hot encoded) columns.
    pub fn nominal<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nominal_columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Declare numeric (min-max scaled) columns.
    pub fn numeric<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.numeric_columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Set the target column. Defaults to [`DEFAULT_TARGET`].
    pub fn target(mut self, column: impl Into<String>) -> Self {
        self.target = Some(column.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `FeatureConfig` or an error if validation fails.
    pub fn build(self) -> Result<FeatureConfig, ConfigValidationError> {
        FeatureConfig::try_from(FeatureConfigRaw {
            ordinal_columns: self.ordinal_columns,
            ordinal_order: self.ordinal_order,
            nominal_columns: self.nominal_columns,
            numeric_columns: self.numeric_columns,
            target: self.target.unwrap_or_else(default_target),
        })
    }
}

/// Settings for a training run.
///
/// Use [`TrainingConfig::builder()`] to create a new configuration with
/// fluent API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fraction of rows held out for evaluation (0.0 - 1.0, exclusive).
    /// Default: 0.3
    pub test_size: f64,

    /// Seed for the split and for the forest.
    /// Default: 4242
    pub random_seed: u64,

    /// Whether the split preserves the class proportions.
    /// Default: true
    pub stratify: bool,

    /// Number of trees in the forest.
    /// Default: 100
    pub n_estimators: usize,

    /// Maximum depth of each tree; `None` grows until leaves are pure.
    /// Default: None
    pub max_depth: Option<usize>,

    /// Weight classes inversely to their frequency in the training split.
    /// Default: true
    pub balanced_class_weight: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: DEFAULT_TEST_SIZE,
            random_seed: DEFAULT_RANDOM_SEED,
            stratify: true,
            n_estimators: 100,
            max_depth: None,
            balanced_class_weight: true,
        }
    }
}

impl TrainingConfig {
    /// Create a new configuration builder.
    pub fn builder() -> TrainingConfigBuilder {
        TrainingConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ConfigValidationError::InvalidTestSize(self.test_size));
        }
        if self.n_estimators == 0 {
            return Err(ConfigValidationError::InvalidEstimators(self.n_estimators));
        }
        if self.max_depth == Some(0) {
            return Err(ConfigValidationError::InvalidMaxDepth(0));
        }
        Ok(())
    }
}

/// Builder for [`TrainingConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct TrainingConfigBuilder {
    test_size: Option<f64>,
    random_seed: Option<u64>,
    stratify: Option<bool>,
    n_estimators: Option<usize>,
    max_depth: Option<usize>,
    balanced_class_weight: Option<bool>,
}

impl TrainingConfigBuilder {
    /// Set the held-out fraction.
    pub fn test_size(mut self, test_size: f64) -> Self {
        self.test_size = Some(test_size);
        self
    }

    /// Set the random seed.
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Enable or disable the stratified split.
    pub fn stratify(mut self, stratify: bool) -> Self {
        self.stratify = Some(stratify);
        self
    }

    /// Set the number of trees.
    pub fn n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = Some(n);
        self
    }

    /// Limit the depth of each tree.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Enable or disable balanced class weights.
    pub fn balanced_class_weight(mut self, balanced: bool) -> Self {
        self.balanced_class_weight = Some(balanced);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<TrainingConfig, ConfigValidationError> {
        let defaults = TrainingConfig::default();
        let config = TrainingConfig {
            test_size: self.test_size.unwrap_or(defaults.test_size),
            random_seed: self.random_seed.unwrap_or(defaults.random_seed),
            stratify: self.stratify.unwrap_or(defaults.stratify),
            n_estimators: self.n_estimators.unwrap_or(defaults.n_estimators),
            max_depth: self.max_depth.or(defaults.max_depth),
            balanced_class_weight: self
                .balanced_class_weight
                .unwrap_or(defaults.balanced_class_weight),
        };

        config.validate()?;
        Ok(config)
    }
}
