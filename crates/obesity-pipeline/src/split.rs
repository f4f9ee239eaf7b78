//! Seeded train/test split over row positions.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

use crate::error::{PipelineError, Result};

/// Row positions of the two halves of a split, each in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split `labels.len()` rows into train and test positions.
///
/// The test half holds `ceil(test_size * n)` rows. With `stratify`, that
/// count is shared out between classes in proportion to their size (largest
/// remainders first) and every class keeps at least one training row.
///
/// # Errors
///
/// [`PipelineError::InvalidData`] when either half would be empty, or when
/// stratifying and a class has fewer than two rows or the test half is
/// smaller than the number of classes.
pub fn train_test_split(
    labels: &[String],
    test_size: f64,
    seed: u64,
    stratify: bool,
) -> Result<SplitIndices> {
    let n = labels.len();
    // 0.3 * 10.0 is 3.0000000000000004 in f64
    let n_test = (test_size * n as f64 - 1e-9).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(PipelineError::InvalidData(format!(
            "test size {test_size} leaves an empty split for {n} rows"
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut test = if stratify {
        stratified_test_rows(labels, n_test, &mut rng)?
    } else {
        let mut rows: Vec<usize> = (0..n).collect();
        rows.shuffle(&mut rng);
        rows.truncate(n_test);
        rows
    };
    test.sort_unstable();

    let mut is_test = vec![false; n];
    for &row in &test {
        is_test[row] = true;
    }
    let train = (0..n).filter(|&row| !is_test[row]).collect();

    Ok(SplitIndices { train, test })
}

fn stratified_test_rows(labels: &[String], n_test: usize, rng: &mut ChaCha8Rng) -> Result<Vec<usize>> {
    let n = labels.len();
    let mut by_class: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (row, label) in labels.iter().enumerate() {
        by_class.entry(label.as_str()).or_default().push(row);
    }

    if let Some((class, rows)) = by_class.iter().find(|(_, rows)| rows.len() < 2) {
        return Err(PipelineError::InvalidData(format!(
            "class '{class}' has {} row(s); a stratified split needs at least 2",
            rows.len()
        )));
    }
    if n_test < by_class.len() {
        return Err(PipelineError::InvalidData(format!(
            "a test half of {n_test} row(s) cannot hold all {} classes",
            by_class.len()
        )));
    }

    // (class rows, allocated test rows, fractional remainder)
    let mut shares: Vec<(Vec<usize>, usize, f64)> = by_class
        .into_values()
        .map(|rows| {
            let exact = n_test as f64 * rows.len() as f64 / n as f64;
            let cap = rows.len() - 1;
            let floor = (exact.floor() as usize).min(cap);
            (rows, floor, exact - exact.floor())
        })
        .collect();

    let mut allocated: usize = shares.iter().map(|(_, k, _)| k).sum();
    let mut order: Vec<usize> = (0..shares.len()).collect();
    // Stable sort keeps class order among equal remainders.
    order.sort_by(|&a, &b| shares[b].2.total_cmp(&shares[a].2));
    while allocated < n_test {
        let mut progressed = false;
        for &i in &order {
            if allocated == n_test {
                break;
            }
            let (rows, k, _) = &mut shares[i];
            if *k < rows.len() - 1 {
                *k += 1;
                allocated += 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    let mut test = Vec::with_capacity(n_test);
    for (mut rows, k, _) in shares {
        rows.shuffle(rng);
        test.extend_from_slice(&rows[..k]);
    }
    Ok(test)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(counts: &[(&str, usize)]) -> Vec<String> {
        counts
            .iter()
            .flat_map(|(label, count)| std::iter::repeat_n(label.to_string(), *count))
            .collect()
    }

    #[test]
    fn test_split_sizes_and_disjointness() {
        let y = labels(&[("a", 7), ("b", 3)]);
        let split = train_test_split(&y, 0.3, 4242, false).unwrap();

        assert_eq!(split.test.len(), 3);
        assert_eq!(split.train.len(), 7);
        assert!(split.test.iter().all(|r| !split.train.contains(r)));
    }

    #[test]
    fn test_stratified_split_preserves_proportions() {
        let y = labels(&[("a", 60), ("b", 30), ("c", 10)]);
        let split = train_test_split(&y, 0.3, 4242, true).unwrap();

        let count = |class: &str| split.test.iter().filter(|&&r| y[r] == class).count();
        assert_eq!(split.test.len(), 30);
        assert_eq!(count("a"), 18);
        assert_eq!(count("b"), 9);
        assert_eq!(count("c"), 3);
    }

    #[test]
    fn test_split_is_seeded() {
        let y = labels(&[("a", 20), ("b", 20)]);
        let first = train_test_split(&y, 0.25, 7, true).unwrap();
        let second = train_test_split(&y, 0.25, 7, true).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_stratify_rejects_singleton_class() {
        let y = labels(&[("a", 5), ("b", 1)]);
        let err = train_test_split(&y, 0.3, 1, true).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATA");
    }

    #[test]
    fn test_stratify_rejects_test_half_smaller_than_class_count() {
        let y = labels(&[("a", 2), ("b", 2), ("c", 2)]);
        let err = train_test_split(&y, 0.3, 4242, true).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATA");

        // a plain split has no such requirement
        let split = train_test_split(&y, 0.3, 4242, false).unwrap();
        assert_eq!(split.test.len(), 2);
    }

    #[test]
    fn test_rejects_empty_half() {
        let y = labels(&[("a", 1)]);
        assert!(train_test_split(&y, 0.3, 1, false).is_err());
    }
}
