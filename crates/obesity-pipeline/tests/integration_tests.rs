//! Integration tests for the obesity prediction pipeline.
//!
//! These tests verify end-to-end behavior: training, partial-record
//! prediction, and persistence in both artifact encodings.

use obesity_pipeline::artifact::{self, ArtifactFormat};
use obesity_pipeline::{
    ColumnDefault, FeatureConfig, ObesityPipeline, PipelineError, PredictionInput, TrainingConfig,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::{Map, Value, json};
use std::path::PathBuf;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_csv(filename: &str) -> DataFrame {
    let path = fixtures_path().join(filename);
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path))
        .expect("Failed to create CSV reader")
        .finish()
        .expect("Failed to read CSV file")
}

fn fast_training() -> TrainingConfig {
    TrainingConfig::builder().n_estimators(30).build().unwrap()
}

fn trained_on_sample() -> (ObesityPipeline, DataFrame) {
    let mut pipeline =
        ObesityPipeline::new(FeatureConfig::obesity()).with_training_config(fast_training());
    let outcome = pipeline
        .train(&load_csv("obesity_sample.csv"))
        .expect("Training should succeed");
    (pipeline, outcome.x_test)
}

fn record(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

fn full_record() -> Map<String, Value> {
    record(json!({
        "Age": 26.0,
        "Height": 1.71,
        "Weight": 84.0,
        "FCVC": 2,
        "FAF": 1.0,
        "CH2O": 2.0,
        "TUE": 0.5,
        "CAEC": "Sometimes",
        "CALC": "no",
        "FAVC": "yes",
        "SCC": "no",
        "MTRANS": "Public_Transportation",
        "family_history": "yes"
    }))
}

fn default_as_json(default: &ColumnDefault) -> Value {
    match default {
        ColumnDefault::Number(v) => json!(v),
        ColumnDefault::Category(v) => json!(v),
        ColumnDefault::Missing => Value::Null,
    }
}

/// 100 rows: `freq` is mostly "medium", `label` follows `age`.
fn freq_age_table() -> DataFrame {
    let freq: Vec<&str> = (0..100)
        .map(|i| match i % 5 {
            3 => "low",
            4 => "high",
            _ => "medium",
        })
        .collect();
    let age: Vec<f64> = (0..100).map(|i| 18.0 + ((i * 7) % 50) as f64).collect();
    let label: Vec<&str> = age.iter().map(|&a| if a < 35.0 { "young" } else { "old" }).collect();
    df![
        "freq" => freq,
        "age" => age,
        "label" => label,
    ]
    .unwrap()
}

fn freq_age_config() -> FeatureConfig {
    FeatureConfig::builder()
        .ordinal("freq", ["low", "medium", "high"])
        .numeric(["age"])
        .target("label")
        .build()
        .unwrap()
}

// ============================================================================
// Training
// ============================================================================

#[test]
fn test_train_on_sample_dataset() {
    let mut pipeline =
        ObesityPipeline::new(FeatureConfig::obesity()).with_training_config(fast_training());
    let outcome = pipeline.train(&load_csv("obesity_sample.csv")).unwrap();

    assert_eq!(outcome.x_test.height(), 36);
    assert_eq!(outcome.train_rows, 84);
    assert_eq!(outcome.report.macro_avg.support, 36);
    assert!(outcome.accuracy > 0.4, "accuracy too low: {}", outcome.accuracy);

    let expected = pipeline.expected_columns().unwrap();
    assert_eq!(expected, FeatureConfig::obesity().expected_columns().as_slice());

    // Gender has no role and is dropped
    let stages = pipeline.bundle().unwrap().pipeline.transformer().stages();
    let remainder = stages.last().unwrap();
    assert_eq!(remainder.columns, ["Gender"]);
    assert_eq!(remainder.n_features(), 0);
}

#[test]
fn test_training_is_deterministic() {
    let df = load_csv("obesity_sample.csv");

    let mut first = ObesityPipeline::new(FeatureConfig::obesity()).with_training_config(fast_training());
    let mut second = ObesityPipeline::new(FeatureConfig::obesity()).with_training_config(fast_training());
    let a = first.train(&df).unwrap();
    let b = second.train(&df).unwrap();

    assert_eq!(a.report, b.report);
    assert_eq!(a.accuracy, b.accuracy);
    assert_eq!(first.bundle(), second.bundle());
}

#[test]
fn test_expected_columns_skip_missing_declared_column() {
    let df = load_csv("obesity_sample.csv").drop("SCC").unwrap();
    let mut pipeline =
        ObesityPipeline::new(FeatureConfig::obesity()).with_training_config(fast_training());
    pipeline.train(&df).unwrap();

    let expected: Vec<String> = FeatureConfig::obesity()
        .expected_columns()
        .into_iter()
        .filter(|c| c != "SCC")
        .collect();
    assert_eq!(pipeline.expected_columns().unwrap(), expected.as_slice());
    assert!(!pipeline.column_defaults().unwrap().contains_key("SCC"));

    // still predicts when the caller sends the column anyway
    let labels = pipeline.predict(full_record()).unwrap();
    assert_eq!(labels.len(), 1);
}

#[test]
fn test_train_does_not_modify_input() {
    let df = load_csv("obesity_sample.csv");
    let before = df.clone();
    let mut pipeline =
        ObesityPipeline::new(FeatureConfig::obesity()).with_training_config(fast_training());
    pipeline.train(&df).unwrap();
    assert!(df.equals_missing(&before));
}

#[test]
fn test_missing_dataset_file() {
    let err = obesity_pipeline::read_csv(&fixtures_path().join("Obesity.csv")).unwrap_err();
    assert!(matches!(err, PipelineError::DatasetNotFound { .. }));
}

// ============================================================================
// Prediction
// ============================================================================

#[test]
fn test_predict_before_fit() {
    let pipeline = ObesityPipeline::new(FeatureConfig::obesity());
    let err = pipeline.predict(full_record()).unwrap_err();
    assert_eq!(err.error_code(), "NOT_FITTED");
}

#[test]
fn test_omitted_column_uses_default() {
    let (pipeline, _) = trained_on_sample();
    let defaults = pipeline.column_defaults().unwrap().clone();

    for column in ["CAEC", "MTRANS", "Age", "Weight"] {
        let mut omitted = full_record();
        omitted.remove(column);

        let mut explicit = full_record();
        explicit.insert(column.to_string(), default_as_json(&defaults[column]));

        assert_eq!(
            pipeline.predict(omitted).unwrap(),
            pipeline.predict(explicit).unwrap(),
            "column {column}"
        );
    }
}

#[test]
fn test_empty_record_uses_all_defaults() {
    let (pipeline, _) = trained_on_sample();
    let labels = pipeline.predict(Map::new()).unwrap();
    assert_eq!(labels.len(), 1);
}

#[test]
fn test_unseen_categories_do_not_fail() {
    let (pipeline, _) = trained_on_sample();

    let mut unseen = full_record();
    unseen.insert("CAEC".to_string(), json!("Never"));
    unseen.insert("CALC".to_string(), json!("Daily"));
    unseen.insert("MTRANS".to_string(), json!("Spaceship"));
    unseen.insert("FAVC".to_string(), Value::Null);

    let labels = pipeline.predict(unseen).unwrap();
    assert_eq!(labels.len(), 1);
    assert!(pipeline.bundle().unwrap().pipeline.classes().contains(&labels[0]));
}

#[test]
fn test_batch_input_from_json_array() {
    let (pipeline, _) = trained_on_sample();

    let batch = PredictionInput::from_json(json!([
        {"Age": 21.0, "Height": 1.80, "Weight": 55.0},
        {"Age": 45.0, "Height": 1.60, "Weight": 95.0, "CAEC": "Frequently"},
        {"Weight": 70.0}
    ]))
    .unwrap();
    assert_eq!(pipeline.predict(batch).unwrap().len(), 3);

    let err = PredictionInput::from_json(json!("Age=21")).unwrap_err();
    assert_eq!(err.error_code(), "MALFORMED_INPUT");
}

#[test]
fn test_freq_age_scenario() {
    let mut pipeline = ObesityPipeline::new(freq_age_config());
    pipeline.train(&freq_age_table()).unwrap();

    assert_eq!(pipeline.expected_columns().unwrap(), ["freq", "age"]);
    let mode = match &pipeline.column_defaults().unwrap()["freq"] {
        ColumnDefault::Category(value) => value.clone(),
        other => panic!("expected a category default, got {other:?}"),
    };
    assert_eq!(mode, "medium");

    let omitted = pipeline.predict(record(json!({"age": 30}))).unwrap();
    let explicit = pipeline.predict(record(json!({"age": 30, "freq": mode}))).unwrap();
    assert_eq!(omitted, explicit);
    assert_eq!(omitted, ["young"]);
}

#[test]
fn test_all_null_numeric_column_predicts_with_missing_default() {
    let mut table = freq_age_table();
    table
        .with_column(Series::new("bmi".into(), vec![None::<f64>; 100]))
        .unwrap();
    let config = FeatureConfig::builder()
        .ordinal("freq", ["low", "medium", "high"])
        .numeric(["age", "bmi"])
        .target("label")
        .build()
        .unwrap();

    let mut pipeline = ObesityPipeline::new(config);
    pipeline.train(&table).unwrap();
    assert_eq!(pipeline.column_defaults().unwrap()["bmi"], ColumnDefault::Missing);
    assert_eq!(pipeline.expected_columns().unwrap(), ["freq", "age", "bmi"]);

    let omitted = pipeline.predict(record(json!({"age": 20, "freq": "low"}))).unwrap();
    assert_eq!(omitted, ["young"]);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_persist_restore_round_trip_both_formats() {
    let (pipeline, x_test) = trained_on_sample();
    let before = pipeline.predict(x_test.clone()).unwrap();
    let dir = tempfile::tempdir().unwrap();

    for name in ["pipeline_obesidade.bin", "pipeline_obesidade.json"] {
        let path = dir.path().join(name);
        pipeline.persist(&path).unwrap();

        let restored = ObesityPipeline::load(FeatureConfig::obesity(), &path).unwrap();
        assert_eq!(restored.bundle(), pipeline.bundle(), "{name}");
        assert_eq!(restored.predict(x_test.clone()).unwrap(), before, "{name}");
    }
}

#[test]
fn test_portable_artifact_is_tagged_json() {
    let (pipeline, _) = trained_on_sample();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline_obesidade.json");
    pipeline.persist(&path).unwrap();

    let value: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(value["format"], artifact::FORMAT_TAG);
    assert_eq!(value["version"], artifact::FORMAT_VERSION);
    assert!(value["bundle"]["expected_columns"].is_array());
}

#[test]
fn test_restore_replaces_bundle() {
    let (first, _) = trained_on_sample();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    first.persist(&path).unwrap();

    let mut other = ObesityPipeline::new(freq_age_config());
    other.train(&freq_age_table()).unwrap();
    other.restore(&path).unwrap();

    assert_eq!(other.bundle(), first.bundle());
}

#[test]
fn test_restore_legacy_pipeline_only_artifact() {
    let (pipeline, x_test) = trained_on_sample();
    let bundle = pipeline.bundle().unwrap();
    let dir = tempfile::tempdir().unwrap();

    for format in [ArtifactFormat::Binary, ArtifactFormat::Portable] {
        let path = dir.path().join(format!("legacy.{}", format.extension()));
        std::fs::write(&path, artifact::encode_legacy(&bundle.pipeline, format).unwrap()).unwrap();

        let restored = ObesityPipeline::load(FeatureConfig::obesity(), &path).unwrap();
        assert!(restored.column_defaults().unwrap().is_empty());
        assert_eq!(
            restored.expected_columns().unwrap(),
            FeatureConfig::obesity().expected_columns().as_slice()
        );
        assert_eq!(
            restored.predict(x_test.clone()).unwrap(),
            pipeline.predict(x_test.clone()).unwrap()
        );
    }
}

#[test]
fn test_restore_missing_file() {
    let mut pipeline = ObesityPipeline::new(FeatureConfig::obesity());
    let err = pipeline.restore(fixtures_path().join("absent.bin")).unwrap_err();
    assert_eq!(err.error_code(), "IO_ERROR");
    assert!(!pipeline.is_fitted());
}
