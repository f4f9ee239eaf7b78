//! Polars helpers used across the pipeline.
//!
//! The encoders and the forest work on plain vectors; this module is the
//! single place where DataFrame columns are turned into those vectors.

use polars::prelude::*;
use std::path::Path;

use crate::error::{PipelineError, Result};

/// Load a headed CSV file.
///
/// # Errors
///
/// [`PipelineError::DatasetNotFound`] if `path` does not exist.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(PipelineError::DatasetNotFound {
            path: path.display().to_string(),
        });
    }
    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Check whether the frame has a column with this name.
#[inline]
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

fn series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|c| c.as_materialized_series())
        .map_err(|_| PipelineError::ColumnNotFound(name.to_string()))
}

/// Read a column as optional floats.
///
/// Values that cannot be cast (e.g. free text) and NaN both read as `None`.
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let casted = series(df, name)?.cast(&DataType::Float64)?;
    let values = casted
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(values)
}

/// Read a column as optional strings, whatever its dtype.
pub fn categorical_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let casted = series(df, name)?.cast(&DataType::String)?;
    let values = casted
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_owned))
        .collect();
    Ok(values)
}

/// Read the target column as labels; missing labels are rejected.
pub fn label_values(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    categorical_values(df, name)?
        .into_iter()
        .enumerate()
        .map(|(row, label)| {
            label.ok_or_else(|| {
                PipelineError::InvalidData(format!("missing label in '{name}' at row {row}"))
            })
        })
        .collect()
}

/// Select rows by position, preserving the given order.
pub fn take_rows(df: &DataFrame, rows: &[usize]) -> Result<DataFrame> {
    let idx: Vec<IdxSize> = rows.iter().map(|&r| r as IdxSize).collect();
    let idx = IdxCa::from_vec(PlSmallStr::from_static("row"), idx);
    Ok(df.take(&idx)?)
}

/// A constant column of `height` rows.
pub fn constant_numeric(name: &str, value: Option<f64>, height: usize) -> Series {
    Series::new(name.into(), vec![value; height])
}

/// A constant string column of `height` rows.
pub fn constant_categorical(name: &str, value: Option<&str>, height: usize) -> Series {
    Series::new(name.into(), vec![value; height])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_values_casts_integers_and_masks_nan() {
        let df = df![
            "age" => [Some(21i64), None, Some(35)],
            "bmi" => [Some(f64::NAN), Some(22.5), None],
        ]
        .unwrap();

        assert_eq!(numeric_values(&df, "age").unwrap(), vec![Some(21.0), None, Some(35.0)]);
        assert_eq!(numeric_values(&df, "bmi").unwrap(), vec![None, Some(22.5), None]);
    }

    #[test]
    fn test_categorical_values_from_strings() {
        let df = df!["MTRANS" => [Some("Walking"), None, Some("Bike")]].unwrap();
        assert_eq!(
            categorical_values(&df, "MTRANS").unwrap(),
            vec![Some("Walking".to_string()), None, Some("Bike".to_string())]
        );
    }

    #[test]
    fn test_missing_column_is_reported() {
        let df = df!["a" => [1.0]].unwrap();
        let err = numeric_values(&df, "b").unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
        assert!(!has_column(&df, "b"));
    }

    #[test]
    fn test_label_values_rejects_nulls() {
        let df = df!["y" => [Some("a"), None]].unwrap();
        assert_eq!(label_values(&df, "y").unwrap_err().error_code(), "INVALID_DATA");
    }

    #[test]
    fn test_read_csv_missing_file() {
        let err = read_csv(Path::new("definitely/not/here/Obesity.csv")).unwrap_err();
        assert_eq!(err.error_code(), "DATASET_NOT_FOUND");
    }

    #[test]
    fn test_take_rows_keeps_order() {
        let df = df!["x" => [10.0, 20.0, 30.0]].unwrap();
        let taken = take_rows(&df, &[2, 0]).unwrap();
        assert_eq!(numeric_values(&taken, "x").unwrap(), vec![Some(30.0), Some(10.0)]);
    }
}
