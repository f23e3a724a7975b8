use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{PreprocessError, PreprocessResult};

/// Positions (into the caller's row list) assigned to each side of a split.
/// Both sides are sorted ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitIndices {
    fn sorted(mut train: Vec<usize>, mut test: Vec<usize>) -> Self {
        train.sort_unstable();
        test.sort_unstable();
        SplitIndices { train, test }
    }
}

fn check_fraction(test_fraction: f64) -> PreprocessResult<()> {
    if test_fraction > 0.0 && test_fraction < 1.0 {
        Ok(())
    } else {
        Err(PreprocessError::InvalidFraction(test_fraction))
    }
}

/// Test-side size for a group of `n`, keeping at least one row on each side.
fn test_count(n: usize, test_fraction: f64) -> usize {
    ((n as f64 * test_fraction).round() as usize).clamp(1, n - 1)
}

/// Group positions `0..labels.len()` by class index.
fn by_class(labels: &[usize]) -> Vec<Vec<usize>> {
    let n_classes = labels.iter().max().map_or(0, |m| m + 1);
    let mut groups = vec![Vec::new(); n_classes];
    for (pos, &c) in labels.iter().enumerate() {
        groups[c].push(pos);
    }
    groups
}

/// Shuffled holdout split of `n` positions.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> PreprocessResult<SplitIndices> {
    check_fraction(test_fraction)?;
    if n < 2 {
        return Err(PreprocessError::TooFewRows { n, parts: 2 });
    }
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_size = test_count(n, test_fraction);
    let test = indices.split_off(n - test_size);
    Ok(SplitIndices::sorted(indices, test))
}

/// Holdout split preserving class proportions on both sides.
///
/// Every class needs at least two members so it can appear in both folds.
pub fn stratified_split(
    labels: &[usize],
    test_fraction: f64,
    seed: u64,
) -> PreprocessResult<SplitIndices> {
    check_fraction(test_fraction)?;
    let groups = by_class(labels);
    if groups.iter().filter(|g| !g.is_empty()).count() < 2 {
        return Err(PreprocessError::SingleClass);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for (class, mut members) in groups.into_iter().enumerate() {
        if members.is_empty() {
            continue;
        }
        if members.len() < 2 {
            return Err(PreprocessError::ClassTooSmall {
                class,
                count: members.len(),
                needed: 2,
            });
        }
        members.shuffle(&mut rng);
        let k = test_count(members.len(), test_fraction);
        test.extend(members.split_off(members.len() - k));
        train.extend(members);
    }
    Ok(SplitIndices::sorted(train, test))
}

fn folds_from_assignment(fold_of: &[usize], k: usize) -> Vec<SplitIndices> {
    (0..k)
        .map(|f| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..fold_of.len()).partition(|&pos| fold_of[pos] == f);
            SplitIndices::sorted(train, test)
        })
        .collect()
}

/// Shuffled k-fold partition of `n` positions; fold sizes differ by at most one.
pub fn k_fold(n: usize, k: usize, seed: u64) -> PreprocessResult<Vec<SplitIndices>> {
    if k < 2 || n < k {
        return Err(PreprocessError::TooFewRows { n, parts: k });
    }
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let mut fold_of = vec![0; n];
    for (i, &pos) in order.iter().enumerate() {
        fold_of[pos] = i % k;
    }
    Ok(folds_from_assignment(&fold_of, k))
}

/// Stratified k-fold: each class is dealt round-robin across the folds.
///
/// Fails when a present class has fewer than `k` members.
pub fn stratified_k_fold(
    labels: &[usize],
    k: usize,
    seed: u64,
) -> PreprocessResult<Vec<SplitIndices>> {
    if k < 2 || labels.len() < k {
        return Err(PreprocessError::TooFewRows {
            n: labels.len(),
            parts: k,
        });
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut fold_of = vec![0; labels.len()];
    let mut offset = 0;
    for (class, mut members) in by_class(labels).into_iter().enumerate() {
        if members.is_empty() {
            continue;
        }
        if members.len() < k {
            return Err(PreprocessError::ClassTooSmall {
                class,
                count: members.len(),
                needed: k,
            });
        }
        members.shuffle(&mut rng);
        for (i, &pos) in members.iter().enumerate() {
            fold_of[pos] = (offset + i) % k;
        }
        offset += members.len();
    }
    Ok(folds_from_assignment(&fold_of, k))
}
