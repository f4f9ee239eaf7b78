//! The trainable prediction pipeline.
//!
//! [`ObesityPipeline`] owns the whole lifecycle of one classification task:
//!
//! 1. **Train**: split the table, fit the column transformer and the forest
//!    on the training rows, derive column defaults and the expected column
//!    order, then evaluate on the held-out rows.
//! 2. **Predict**: complete partial inputs with the defaults, reorder them to
//!    the expected columns, transform and classify.
//! 3. **Persist / restore**: write or read the trained bundle in either
//!    artifact encoding.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::artifact::{self, ArtifactFormat};
use crate::config::{FeatureConfig, TrainingConfig};
use crate::defaults::compute_defaults;
use crate::error::{PipelineError, Result, ResultExt};
use crate::forest::{ForestParams, RandomForest};
use crate::frame::{constant_categorical, constant_numeric, has_column, label_values, take_rows};
use crate::input::PredictionInput;
use crate::metrics::{ClassificationReport, accuracy};
use crate::preprocessing::ColumnTransformer;
use crate::split::train_test_split;
use crate::types::{ColumnDefault, TrainingOutcome};

/// Fitted preprocessing stages followed by the fitted classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    transformer: ColumnTransformer,
    classifier: RandomForest,
}

impl FittedPipeline {
    /// Fit the transformer and the classifier on feature rows `x` and their
    /// labels.
    pub fn fit(
        config: &FeatureConfig,
        training: &TrainingConfig,
        x: &DataFrame,
        labels: &[String],
    ) -> Result<Self> {
        let transformer = ColumnTransformer::fit(config, x)?;
        let matrix = transformer.transform(x)?;
        debug!("Design matrix: {:?} ({:?})", matrix.dim(), transformer.feature_names());

        let params = ForestParams {
            n_estimators: training.n_estimators,
            max_depth: training.max_depth,
            balanced_class_weight: training.balanced_class_weight,
            seed: training.random_seed,
        };
        let classifier = RandomForest::fit(&matrix, labels, &params)?;

        Ok(Self { transformer, classifier })
    }

    pub fn transformer(&self) -> &ColumnTransformer {
        &self.transformer
    }

    pub fn classifier(&self) -> &RandomForest {
        &self.classifier
    }

    /// Class labels the classifier can predict.
    pub fn classes(&self) -> &[String] {
        self.classifier.classes()
    }

    /// One label per row of `x`.
    pub fn predict(&self, x: &DataFrame) -> Result<Vec<String>> {
        let matrix = self.transformer.transform(x)?;
        self.classifier.predict(&matrix)
    }
}

/// The unit of persistence: fitted pipeline, defaults and column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedBundle {
    pub pipeline: FittedPipeline,
    /// Fallbacks for columns absent from a prediction input. Keys are a
    /// subset of `expected_columns`.
    pub column_defaults: BTreeMap<String, ColumnDefault>,
    /// Columns the pipeline reads, in role order.
    pub expected_columns: Vec<String>,
}

static_assertions::assert_impl_all!(TrainedBundle: Send, Sync);

/// Trainable obesity-level classifier.
///
/// # Example
///
/// ```rust,no_run
/// use obesity_pipeline::{FeatureConfig, ObesityPipeline};
/// use polars::prelude::*;
/// use serde_json::json;
///
/// let df = CsvReadOptions::default()
///     .with_has_header(true)
///     .try_into_reader_with_file_path(Some("Obesity.csv".into()))?
///     .finish()?;
///
/// let mut pipeline = ObesityPipeline::new(FeatureConfig::obesity());
/// let outcome = pipeline.train(&df)?;
/// println!("accuracy: {:.3}", outcome.accuracy);
///
/// let record = json!({"Age": 30, "Height": 1.70, "Weight": 82.0});
/// let labels = pipeline.predict(obesity_pipeline::PredictionInput::from_json(record)?)?;
/// println!("{}", labels[0]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct ObesityPipeline {
    config: FeatureConfig,
    training: TrainingConfig,
    bundle: Option<TrainedBundle>,
}

impl ObesityPipeline {
    /// Create an unfitted pipeline with default training settings.
    pub fn new(config: FeatureConfig) -> Self {
        Self {
            config,
            training: TrainingConfig::default(),
            bundle: None,
        }
    }

    /// Replace the training settings.
    pub fn with_training_config(mut self, training: TrainingConfig) -> Self {
        self.training = training;
        self
    }

    /// Create a pipeline and restore its bundle from `path`.
    pub fn load(config: FeatureConfig, path: impl AsRef<Path>) -> Result<Self> {
        let mut pipeline = Self::new(config);
        pipeline.restore(path)?;
        Ok(pipeline)
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn training_config(&self) -> &TrainingConfig {
        &self.training
    }

    pub fn is_fitted(&self) -> bool {
        self.bundle.is_some()
    }

    pub fn bundle(&self) -> Option<&TrainedBundle> {
        self.bundle.as_ref()
    }

    /// Expected input columns of the current bundle.
    pub fn expected_columns(&self) -> Option<&[String]> {
        self.bundle.as_ref().map(|b| b.expected_columns.as_slice())
    }

    pub fn column_defaults(&self) -> Option<&BTreeMap<String, ColumnDefault>> {
        self.bundle.as_ref().map(|b| &b.column_defaults)
    }

    fn fitted(&self) -> Result<&TrainedBundle> {
        self.bundle.as_ref().ok_or(PipelineError::NotFitted)
    }

    /// Fit a fresh pipeline on the feature columns of `x`, without touching
    /// the current bundle.
    pub fn build_pipeline(&self, x: &DataFrame, labels: &[String]) -> Result<FittedPipeline> {
        FittedPipeline::fit(&self.config, &self.training, x, labels)
    }

    /// Split `df`, fit on the training rows and evaluate on the rest.
    ///
    /// On success the previous bundle, if any, is replaced. `df` is not
    /// modified.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::TargetNotFound`] if the target column is absent
    /// - [`PipelineError::InvalidConfig`] for invalid training settings
    /// - [`PipelineError::InvalidData`] if the split or the fit is impossible
    pub fn train(&mut self, df: &DataFrame) -> Result<TrainingOutcome> {
        self.training.validate()?;

        let target = self.config.target();
        if !has_column(df, target) {
            return Err(PipelineError::TargetNotFound(target.to_string()));
        }

        info!(
            "Training on {} rows (test_size={}, seed={}, stratify={})",
            df.height(),
            self.training.test_size,
            self.training.random_seed,
            self.training.stratify
        );

        let labels = label_values(df, target)?;
        let split = train_test_split(
            &labels,
            self.training.test_size,
            self.training.random_seed,
            self.training.stratify,
        )?;

        let x_train = take_rows(df, &split.train)?.drop(target)?;
        let x_test = take_rows(df, &split.test)?.drop(target)?;
        let y_train: Vec<String> = split.train.iter().map(|&i| labels[i].clone()).collect();
        let y_test: Vec<String> = split.test.iter().map(|&i| labels[i].clone()).collect();
        debug!("Split: {} train rows, {} test rows", y_train.len(), y_test.len());

        let pipeline = self.build_pipeline(&x_train, &y_train).context("Fitting pipeline")?;
        let column_defaults = compute_defaults(&self.config, &x_train).context("Computing defaults")?;
        let expected_columns: Vec<String> = self
            .config
            .expected_columns()
            .into_iter()
            .filter(|c| has_column(&x_train, c))
            .collect();

        let y_pred = pipeline.predict(&x_test).context("Evaluating on held-out rows")?;
        let accuracy = accuracy(&y_test, &y_pred)?;
        let report = ClassificationReport::new(&y_test, &y_pred)?;
        info!("Held-out accuracy: {:.4}", accuracy);

        self.bundle = Some(TrainedBundle {
            pipeline,
            column_defaults,
            expected_columns,
        });

        Ok(TrainingOutcome {
            accuracy,
            report,
            x_test,
            y_test: Series::new(target.into(), y_test),
            train_rows: y_train.len(),
        })
    }

    /// Predict one label per input row, in input order.
    ///
    /// Expected columns missing from the input are filled with their
    /// default; columns that are not expected are ignored.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::NotFitted`] before any train/restore
    /// - [`PipelineError::MalformedInput`] for unusable input
    pub fn predict(&self, input: impl Into<PredictionInput>) -> Result<Vec<String>> {
        let bundle = self.fitted()?;
        let input = input.into();
        let height = input.height();
        let df = input.into_frame()?;

        let mut filled = Vec::new();
        for column in &bundle.expected_columns {
            if has_column(&df, column) {
                continue;
            }
            let series = match bundle.column_defaults.get(column) {
                Some(ColumnDefault::Number(value)) => constant_numeric(column, Some(*value), height),
                Some(ColumnDefault::Category(value)) => {
                    constant_categorical(column, Some(value.as_str()), height)
                }
                Some(ColumnDefault::Missing) | None => {
                    if self.config.is_categorical(column) {
                        constant_categorical(column, None, height)
                    } else {
                        constant_numeric(column, None, height)
                    }
                }
            };
            debug!("Filled missing column '{}'", column);
            filled.push(Column::from(series));
        }

        // An empty record has no columns, hence no height of its own.
        let df = match (filled.is_empty(), df.width()) {
            (true, _) => df,
            (false, 0) => DataFrame::new(filled)?,
            (false, _) => df.hstack(&filled)?,
        };
        let df = df.select(bundle.expected_columns.iter().map(String::as_str))?;
        bundle.pipeline.predict(&df)
    }

    /// Write the bundle to `path`; the encoding follows the file name.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.persist_as(path, ArtifactFormat::from_path(path))
    }

    /// Write the bundle to `path` in the given encoding.
    pub fn persist_as(&self, path: impl AsRef<Path>, format: ArtifactFormat) -> Result<()> {
        let path = path.as_ref();
        let bundle = self.fitted()?;
        artifact::write(path, bundle, format)?;
        info!("Saved {:?} artifact to {}", format, path.display());
        Ok(())
    }

    /// Replace the bundle with the one stored at `path`; the encoding follows
    /// the file name.
    pub fn restore(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.restore_as(path, ArtifactFormat::from_path(path))
    }

    /// Replace the bundle with the one stored at `path` in the given encoding.
    pub fn restore_as(&mut self, path: impl AsRef<Path>, format: ArtifactFormat) -> Result<()> {
        let path = path.as_ref();
        let restored = artifact::read(path, format, &self.config)?;
        if restored.legacy {
            warn!("Restored legacy artifact from {}", path.display());
        } else {
            info!("Restored artifact from {}", path.display());
        }
        self.bundle = Some(restored.bundle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> FeatureConfig {
        FeatureConfig::builder()
            .ordinal("freq", ["low", "medium", "high"])
            .nominal(["city"])
            .numeric(["age"])
            .target("label")
            .build()
            .unwrap()
    }

    fn table(rows: usize) -> DataFrame {
        let freq = ["low", "medium", "high"];
        let city = ["Lima", "Oslo"];
        let age: Vec<f64> = (0..rows).map(|i| 18.0 + (i % 40) as f64).collect();
        let label: Vec<&str> = age.iter().map(|&a| if a < 38.0 { "young" } else { "old" }).collect();
        df![
            "freq" => (0..rows).map(|i| freq[i % 3]).collect::<Vec<_>>(),
            "city" => (0..rows).map(|i| city[i % 2]).collect::<Vec<_>>(),
            "age" => age,
            "label" => label,
        ]
        .unwrap()
    }

    fn small_training() -> TrainingConfig {
        TrainingConfig::builder().n_estimators(15).build().unwrap()
    }

    #[test]
    fn test_predict_before_training_fails() {
        let pipeline = ObesityPipeline::new(config());
        let err = pipeline.predict(PredictionInput::from_json(json!({"age": 30})).unwrap()).unwrap_err();
        assert!(err.is_not_fitted());
        assert!(pipeline.persist("unused.bin").unwrap_err().is_not_fitted());
    }

    #[test]
    fn test_train_sets_bundle() {
        let mut pipeline = ObesityPipeline::new(config()).with_training_config(small_training());
        let outcome = pipeline.train(&table(60)).unwrap();

        assert_eq!(outcome.x_test.height(), 18);
        assert_eq!(outcome.y_test.len(), 18);
        assert_eq!(outcome.train_rows, 42);
        assert!(outcome.x_test.column("label").is_err());
        assert!(outcome.accuracy > 0.5);

        assert_eq!(pipeline.expected_columns().unwrap(), ["freq", "city", "age"]);
        let defaults = pipeline.column_defaults().unwrap();
        assert!(defaults.keys().all(|k| pipeline.expected_columns().unwrap().contains(k)));
    }

    #[test]
    fn test_missing_target_is_reported() {
        let mut pipeline = ObesityPipeline::new(config());
        let df = table(10).drop("label").unwrap();
        assert_eq!(pipeline.train(&df).unwrap_err().error_code(), "TARGET_NOT_FOUND");
        assert!(!pipeline.is_fitted());
    }

    #[test]
    fn test_predict_table_keeps_row_order() {
        let mut pipeline = ObesityPipeline::new(config()).with_training_config(small_training());
        pipeline.train(&table(80)).unwrap();

        let rows = df![
            "age" => [20.0, 56.0, 19.0],
            "extra" => ["x", "y", "z"],
        ]
        .unwrap();
        let labels = pipeline.predict(rows).unwrap();
        assert_eq!(labels, ["young", "old", "young"]);
    }

    #[test]
    fn test_labeled_row_input() {
        let mut pipeline = ObesityPipeline::new(config()).with_training_config(small_training());
        pipeline.train(&table(80)).unwrap();

        let row = PredictionInput::Row(vec![
            ("age".to_string(), json!(57.0)),
            ("freq".to_string(), json!("medium")),
        ]);
        assert_eq!(pipeline.predict(row).unwrap(), ["old"]);
    }
}
