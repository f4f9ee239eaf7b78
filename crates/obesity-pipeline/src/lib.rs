//! Obesity Risk Prediction Pipeline
//!
//! A trainable classification pipeline for the self-reported obesity
//! risk-factor dataset, built with Rust and Polars.
//!
//! # Overview
//!
//! - **Feature configuration**: a validated declaration of ordinal, nominal
//!   and numeric columns plus the target
//! - **Preprocessing**: ordinal encoding with a declared order, one-hot
//!   encoding, min-max scaling, applied as an ordered list of stages
//! - **Classifier**: a seeded random forest with balanced class weights
//! - **Defaults**: per-column medians and modes from the training split, so
//!   partial records can still be classified
//! - **Artifacts**: versioned bundles in a binary or a portable JSON encoding
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use obesity_pipeline::{FeatureConfig, ObesityPipeline, PredictionInput, read_csv};
//! use serde_json::json;
//! use std::path::Path;
//!
//! let df = read_csv(Path::new("Obesity.csv"))?;
//!
//! let mut pipeline = ObesityPipeline::new(FeatureConfig::obesity());
//! let outcome = pipeline.train(&df)?;
//! println!("{}", outcome.report);
//!
//! pipeline.persist("pipeline_obesidade.bin")?;
//! pipeline.persist("pipeline_obesidade.json")?;
//!
//! let restored = ObesityPipeline::load(FeatureConfig::obesity(), "pipeline_obesidade.bin")?;
//! let labels = restored.predict(PredictionInput::from_json(json!({"Age": 23, "CAEC": "Sometimes"}))?)?;
//! println!("{}", labels[0]);
//! # Ok::<(), obesity_pipeline::PipelineError>(())
//! ```
//!
//! # Configuration
//!
//! [`FeatureConfig`] can be built in code or read from JSON:
//!
//! ```rust
//! use obesity_pipeline::FeatureConfig;
//!
//! let config: FeatureConfig = serde_json::from_str(r#"{
//!     "ordinal_columns": ["freq"],
//!     "ordinal_order": {"freq": ["low", "medium", "high"]},
//!     "numeric_columns": ["age"],
//!     "target": "label"
//! }"#).unwrap();
//!
//! assert_eq!(config.expected_columns(), vec!["freq", "age"]);
//! ```
//!
//! Training settings (split, seed, forest size) live in [`TrainingConfig`].

pub mod artifact;
pub mod compat;
pub mod config;
pub mod defaults;
pub mod error;
pub mod forest;
pub mod frame;
pub mod input;
pub mod metrics;
pub mod pipeline;
pub mod preprocessing;
pub mod split;
pub mod types;

pub use artifact::ArtifactFormat;
pub use config::{
    ConfigValidationError, FeatureConfig, FeatureConfigBuilder, TrainingConfig,
    TrainingConfigBuilder, DEFAULT_RANDOM_SEED, DEFAULT_TARGET, DEFAULT_TEST_SIZE,
};
pub use error::{PipelineError, Result, ResultExt};
pub use frame::read_csv;
pub use input::PredictionInput;
pub use metrics::{ClassMetrics, ClassificationReport};
pub use pipeline::{FittedPipeline, ObesityPipeline, TrainedBundle};
pub use types::{ColumnDefault, TrainingOutcome};
