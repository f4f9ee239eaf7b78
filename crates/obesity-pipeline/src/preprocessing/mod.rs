//! Feature preprocessing.
//!
//! This module provides the fitted stages of the pipeline:
//! - Ordinal encoding with a declared order
//! - One-hot encoding with the first category dropped
//! - Min-max scaling
//! - The column transformer that runs them in order

mod column_transformer;
mod minmax;
mod one_hot;
mod ordinal;

pub use column_transformer::{ColumnTransformer, FittedStage, StageKind, StageParams};
pub use minmax::{ColumnRange, MinMaxScaler};
pub use one_hot::OneHotEncoder;
pub use ordinal::{OrdinalEncoder, UNKNOWN_SENTINEL};
