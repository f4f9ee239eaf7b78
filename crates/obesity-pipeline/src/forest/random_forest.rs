//! Bootstrap-aggregated classification trees.

use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::tree::{DecisionTree, TreeParams};
use crate::error::{PipelineError, Result};

/// Growth settings of a [`RandomForest`].
#[derive(Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    /// Weight class `c` by `n / (k * count_c)`.
    pub balanced_class_weight: bool,
    /// Tree `i` is grown from `seed + i`.
    pub seed: u64,
}

/// Random-forest classifier over string labels.
///
/// Each tree sees a bootstrap sample of the rows and `sqrt(n_features)`
/// randomly chosen features per split. Predictions average the trees' leaf
/// distributions; ties go to the class that sorts first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    classes: Vec<String>,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn fit(x: &Array2<f64>, labels: &[String], params: &ForestParams) -> Result<Self> {
        let n_samples = x.nrows();
        if n_samples != labels.len() {
            return Err(PipelineError::InvalidData(format!(
                "{} feature rows but {} labels",
                n_samples,
                labels.len()
            )));
        }
        if n_samples == 0 {
            return Err(PipelineError::InvalidData("cannot fit on zero rows".to_string()));
        }

        let mut class_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for label in labels {
            *class_counts.entry(label.as_str()).or_insert(0) += 1;
        }
        let classes: Vec<String> = class_counts.keys().map(|c| c.to_string()).collect();
        let y: Vec<usize> = labels
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or_default())
            .collect();

        let class_weight: Vec<f64> = class_counts
            .values()
            .map(|&count| {
                if params.balanced_class_weight {
                    n_samples as f64 / (classes.len() as f64 * count as f64)
                } else {
                    1.0
                }
            })
            .collect();

        let n_features = x.ncols();
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            max_features: ((n_features as f64).sqrt() as usize).max(1),
            min_samples_split: 2,
        };

        debug!(
            "Growing {} trees on {} rows x {} features, {} classes",
            params.n_estimators,
            n_samples,
            n_features,
            classes.len()
        );

        // each tree owns its RNG; output is independent of thread count
        let trees = (0..params.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(params.seed.wrapping_add(tree_idx as u64));

                let mut draws = vec![0usize; n_samples];
                for _ in 0..n_samples {
                    draws[rng.gen_range(0..n_samples)] += 1;
                }
                let samples: Vec<usize> = (0..n_samples).filter(|&i| draws[i] > 0).collect();
                let weights: Vec<f64> = (0..n_samples)
                    .map(|i| draws[i] as f64 * class_weight[y[i]])
                    .collect();

                DecisionTree::fit(x, &y, &weights, samples, classes.len(), &tree_params, &mut rng)
            })
            .collect();

        Ok(Self { classes, n_features, trees })
    }

    /// Class labels in probability column order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean leaf distribution over all trees, one row per sample.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features {
            return Err(PipelineError::InvalidData(format!(
                "expected {} features, got {}",
                self.n_features,
                x.ncols()
            )));
        }

        let mut proba = Array2::<f64>::zeros((x.nrows(), self.classes.len()));
        for (row, mut out) in x.rows().into_iter().zip(proba.rows_mut()) {
            for tree in &self.trees {
                for (acc, p) in out.iter_mut().zip(tree.leaf_distribution(row)) {
                    *acc += p;
                }
            }
        }
        if !self.trees.is_empty() {
            proba /= self.trees.len() as f64;
        }
        Ok(proba)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<String>> {
        let proba = self.predict_proba(x)?;
        let labels = proba
            .rows()
            .into_iter()
            .map(|row| {
                let mut best = 0;
                for (class, &p) in row.iter().enumerate() {
                    if p > row[best] {
                        best = class;
                    }
                }
                self.classes[best].clone()
            })
            .collect();
        Ok(labels)
    }
}
