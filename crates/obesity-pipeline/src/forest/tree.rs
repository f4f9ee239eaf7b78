//! Weighted Gini classification tree.
//!
//! Nodes live in a flat arena indexed from the root at 0, and the tree is
//! grown with an explicit work stack, so neither fitting nor (de)serializing
//! recurses with depth.

use ndarray::{Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Weighted class distribution of the training samples that reached it.
    Leaf { distribution: Vec<f64> },
    /// Samples with `x[feature] <= threshold` go left; the rest, including
    /// NaN, go right.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Growth limits of a single tree.
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    /// Features examined per split; further features are only drawn while
    /// every examined one is constant on the node.
    pub max_features: usize,
    pub min_samples_split: usize,
}

/// A fitted classification tree over `n_classes` class indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

struct Candidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl DecisionTree {
    /// Fit on the rows listed in `samples`.
    ///
    /// `y[i]` is the class index of row `i` and `weights[i]` its weight
    /// (bootstrap multiplicity times class weight).
    pub fn fit(
        x: &Array2<f64>,
        y: &[usize],
        weights: &[f64],
        samples: Vec<usize>,
        n_classes: usize,
        params: &TreeParams,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let mut nodes = vec![Node::Leaf { distribution: Vec::new() }];
        let mut stack = vec![(0usize, samples, 0usize)];
        let mut features: Vec<usize> = (0..x.ncols()).collect();

        while let Some((id, samples, depth)) = stack.pop() {
            let counts = class_weights(&samples, y, weights, n_classes);
            let total: f64 = counts.iter().sum();
            let node_impurity = weighted_gini(&counts, total);

            let can_split = samples.len() >= params.min_samples_split
                && params.max_depth.is_none_or(|max| depth < max)
                && node_impurity > 1e-12;

            let candidate = if can_split {
                features.shuffle(rng);
                best_split(x, y, weights, &samples, &features, n_classes, params.max_features)
                    .filter(|c| c.impurity < node_impurity - 1e-12)
            } else {
                None
            };

            match candidate {
                Some(split) => {
                    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = samples
                        .into_iter()
                        .partition(|&row| x[[row, split.feature]] <= split.threshold);

                    let left = nodes.len();
                    let right = left + 1;
                    nodes.push(Node::Leaf { distribution: Vec::new() });
                    nodes.push(Node::Leaf { distribution: Vec::new() });
                    nodes[id] = Node::Split {
                        feature: split.feature,
                        threshold: split.threshold,
                        left,
                        right,
                    };
                    stack.push((right, right_rows, depth + 1));
                    stack.push((left, left_rows, depth + 1));
                }
                None => {
                    let distribution = if total > 0.0 {
                        counts.iter().map(|c| c / total).collect()
                    } else {
                        vec![0.0; n_classes]
                    };
                    nodes[id] = Node::Leaf { distribution };
                }
            }
        }

        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Some(Node::Split { left, right, .. }) = self.nodes.get(id) {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
        }
        deepest
    }

    /// Class distribution of the leaf that `row` falls into.
    pub fn leaf_distribution(&self, row: ArrayView1<'_, f64>) -> &[f64] {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { distribution } => return distribution,
                Node::Split { feature, threshold, left, right } => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

fn class_weights(samples: &[usize], y: &[usize], weights: &[f64], n_classes: usize) -> Vec<f64> {
    let mut counts = vec![0.0; n_classes];
    for &row in samples {
        counts[y[row]] += weights[row];
    }
    counts
}

/// Gini impurity scaled by the node weight: `w * (1 - sum p_k^2)`.
fn weighted_gini(counts: &[f64], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    total - counts.iter().map(|c| c * c).sum::<f64>() / total
}

fn best_split(
    x: &Array2<f64>,
    y: &[usize],
    weights: &[f64],
    samples: &[usize],
    features: &[usize],
    n_classes: usize,
    max_features: usize,
) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    let mut examined = 0;

    for &feature in features {
        if examined >= max_features && best.is_some() {
            break;
        }

        let mut values: Vec<(f64, usize)> = Vec::with_capacity(samples.len());
        let mut right = vec![0.0; n_classes];
        for &row in samples {
            let value = x[[row, feature]];
            if value.is_nan() {
                right[y[row]] += weights[row];
            } else {
                values.push((value, row));
            }
        }
        values.sort_by(|a, b| a.0.total_cmp(&b.0));

        let constant = values.first().map(|v| v.0) == values.last().map(|v| v.0);
        if constant {
            continue;
        }
        examined += 1;

        for &(_, row) in &values {
            right[y[row]] += weights[row];
        }
        let mut left = vec![0.0; n_classes];

        for i in 0..values.len() - 1 {
            let (value, row) = values[i];
            left[y[row]] += weights[row];
            right[y[row]] -= weights[row];

            let next = values[i + 1].0;
            if next <= value {
                continue;
            }

            let left_total: f64 = left.iter().sum();
            let right_total: f64 = right.iter().sum();
            let impurity = weighted_gini(&left, left_total) + weighted_gini(&right, right_total);

            if best.as_ref().is_none_or(|b| impurity < b.impurity) {
                let mid = value + (next - value) / 2.0;
                let threshold = if mid >= next { value } else { mid };
                best = Some(Candidate { feature, threshold, impurity });
            }
        }
    }

    best
}
