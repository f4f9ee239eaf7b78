//! Accepted shapes of prediction input.
//!
//! Whatever the caller supplies is turned into a [`DataFrame`] before
//! defaults are applied, so single records and batches share one code path.

use polars::prelude::*;
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::error::{PipelineError, Result};

/// Input to [`ObesityPipeline::predict`](crate::ObesityPipeline::predict).
#[derive(Debug, Clone)]
pub enum PredictionInput {
    /// A single key-value record, e.g. `{"Age": 30, "CAEC": "Sometimes"}`.
    Record(Map<String, Value>),
    /// A single row given as ordered `(column, value)` pairs.
    Row(Vec<(String, Value)>),
    /// Any number of rows.
    Table(DataFrame),
}

impl PredictionInput {
    /// Interpret a JSON value: an object is a record, an array of objects
    /// is a table.
    ///
    /// # Errors
    ///
    /// [`PipelineError::MalformedInput`] for any other JSON shape.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(record) => Ok(Self::Record(record)),
            Value::Array(items) => {
                let records = items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| match item {
                        Value::Object(record) => Ok(record),
                        other => Err(PipelineError::MalformedInput(format!(
                            "element {i} of the input array is {}, expected an object",
                            json_kind(&other)
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::Table(records_to_frame(&records)?))
            }
            other => Err(PipelineError::MalformedInput(format!(
                "expected an object or an array of objects, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Number of rows this input describes.
    pub fn height(&self) -> usize {
        match self {
            Self::Record(_) | Self::Row(_) => 1,
            Self::Table(df) => df.height(),
        }
    }

    /// Convert into the multi-row table representation.
    pub fn into_frame(self) -> Result<DataFrame> {
        match self {
            Self::Record(record) => records_to_frame(std::slice::from_ref(&record)),
            Self::Row(pairs) => {
                let mut record = Map::with_capacity(pairs.len());
                for (column, value) in pairs {
                    if record.contains_key(&column) {
                        return Err(PipelineError::MalformedInput(format!(
                            "column '{column}' appears twice in the row"
                        )));
                    }
                    record.insert(column, value);
                }
                records_to_frame(std::slice::from_ref(&record))
            }
            Self::Table(df) => Ok(df),
        }
    }
}

impl From<Map<String, Value>> for PredictionInput {
    fn from(record: Map<String, Value>) -> Self {
        Self::Record(record)
    }
}

impl From<DataFrame> for PredictionInput {
    fn from(df: DataFrame) -> Self {
        Self::Table(df)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Build a frame from records; columns appear in first-seen key order and
/// keys missing from a record read as null.
fn records_to_frame(records: &[Map<String, Value>]) -> Result<DataFrame> {
    let mut names: Vec<&str> = Vec::new();
    let mut seen = HashSet::new();
    for record in records {
        for key in record.keys() {
            if seen.insert(key.as_str()) {
                names.push(key.as_str());
            }
        }
    }

    let columns = names
        .into_iter()
        .map(|name| {
            let values: Vec<&Value> = records
                .iter()
                .map(|r| r.get(name).unwrap_or(&Value::Null))
                .collect();
            json_series(name, &values).map(Column::from)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(DataFrame::new(columns)?)
}

/// Pick the narrowest dtype that holds every value of the column.
fn json_series(name: &str, values: &[&Value]) -> Result<Series> {
    let present: Vec<&Value> = values.iter().copied().filter(|v| !v.is_null()).collect();

    if let Some(nested) = present.iter().find(|v| v.is_array() || v.is_object()) {
        return Err(PipelineError::MalformedInput(format!(
            "column '{name}' holds {}, expected a scalar",
            json_kind(nested)
        )));
    }

    let series = if present.is_empty() {
        Series::new(name.into(), vec![None::<&str>; values.len()])
    } else if present.iter().all(|v| v.is_i64()) {
        Series::new(name.into(), values.iter().map(|v| v.as_i64()).collect::<Vec<_>>())
    } else if present.iter().all(|v| v.is_number()) {
        Series::new(name.into(), values.iter().map(|v| v.as_f64()).collect::<Vec<_>>())
    } else if present.iter().all(|v| v.is_boolean()) {
        Series::new(name.into(), values.iter().map(|v| v.as_bool()).collect::<Vec<_>>())
    } else {
        let text: Vec<Option<String>> = values
            .iter()
            .map(|v| match v {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
            .collect();
        Series::new(name.into(), text)
    };

    Ok(series)
}
