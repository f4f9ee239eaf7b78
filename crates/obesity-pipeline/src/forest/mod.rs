//! Random-forest classifier.

mod random_forest;
mod tree;

pub use random_forest::{ForestParams, RandomForest};
pub use tree::{DecisionTree, Node, TreeParams};
