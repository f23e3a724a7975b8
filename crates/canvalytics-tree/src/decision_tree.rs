use canvalytics_core::estimator::{check_fit_input, class_indices};
use canvalytics_core::{Estimator, Matrix, ModelError};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// How many features are considered at each split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    All,
    Sqrt,
    Log2,
    Count(usize),
    Fraction(f64),
}

impl MaxFeatures {
    /// Resolve against the number of available features; always in `1..=p` for `p > 0`.
    pub fn resolve(self, p: usize) -> usize {
        let k = match self {
            MaxFeatures::All => p,
            MaxFeatures::Sqrt => (p as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (p as f64).log2().floor() as usize,
            MaxFeatures::Count(k) => k,
            MaxFeatures::Fraction(f) => (p as f64 * f).floor() as usize,
        };
        k.clamp(1, p.max(1))
    }
}

/// Growth limits shared by every tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeParams {
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
}

impl Default for TreeParams {
    fn default() -> Self {
        TreeParams {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
        }
    }
}

/// A node in the decision tree. Children are indices into the node arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    /// Internal node: rows with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Leaf: predicts a class index or regression value. Classification
    /// leaves also keep the class frequencies of their training rows.
    Leaf {
        value: f64,
        #[serde(default)]
        distribution: Vec<f64>,
    },
}

#[derive(Debug, Clone, Copy)]
enum Criterion {
    Gini { n_classes: usize },
    Mse,
}

/// A fitted tree stored as a flat arena rooted at node 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GrownTree {
    nodes: Vec<TreeNode>,
    n_features: usize,
    importances: Vec<f64>,
}

impl GrownTree {
    fn leaf(&self, row: &[f64]) -> (f64, &[f64]) {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf {
                    value,
                    distribution,
                } => return (*value, distribution.as_slice()),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    fn check_width(&self, x: &Matrix) -> Result<(), ModelError> {
        if x.cols() != self.n_features {
            return Err(ModelError::FeatureMismatch {
                expected: self.n_features,
                got: x.cols(),
            });
        }
        Ok(())
    }

    pub(crate) fn predict(&self, x: &Matrix) -> Result<Vec<f64>, ModelError> {
        self.check_width(x)?;
        Ok((0..x.rows()).map(|i| self.leaf(x.row(i)).0).collect())
    }

    /// Leaf class frequencies per row; empty rows for regression trees.
    pub(crate) fn predict_distribution(&self, x: &Matrix) -> Result<Vec<Vec<f64>>, ModelError> {
        self.check_width(x)?;
        Ok((0..x.rows()).map(|i| self.leaf(x.row(i)).1.to_vec()).collect())
    }

    /// Unnormalized impurity decrease per feature.
    pub(crate) fn raw_importances(&self) -> &[f64] {
        &self.importances
    }
}

/// Scale to sum to one; all-zero input stays zero.
pub(crate) fn normalize(mut v: Vec<f64>) -> Vec<f64> {
    let total: f64 = v.iter().sum();
    if total > 0.0 {
        v.iter_mut().for_each(|x| *x /= total);
    }
    v
}

/// Impurity and leaf value of a node, from running sufficient statistics.
#[derive(Clone)]
enum Stats {
    Counts(Vec<usize>),
    Moments { sum: f64, sum_sq: f64 },
}

impl Stats {
    fn empty(criterion: Criterion) -> Self {
        match criterion {
            Criterion::Gini { n_classes } => Stats::Counts(vec![0; n_classes]),
            Criterion::Mse => Stats::Moments { sum: 0.0, sum_sq: 0.0 },
        }
    }

    fn add(&mut self, y: f64) {
        match self {
            Stats::Counts(c) => c[y as usize] += 1,
            Stats::Moments { sum, sum_sq } => {
                *sum += y;
                *sum_sq += y * y;
            }
        }
    }

    fn remove(&mut self, y: f64) {
        match self {
            Stats::Counts(c) => c[y as usize] -= 1,
            Stats::Moments { sum, sum_sq } => {
                *sum -= y;
                *sum_sq -= y * y;
            }
        }
    }

    fn impurity(&self, n: usize) -> f64 {
        if n == 0 {
            return 0.0;
        }
        let n = n as f64;
        match self {
            Stats::Counts(c) => 1.0 - c.iter().map(|&k| (k as f64 / n).powi(2)).sum::<f64>(),
            Stats::Moments { sum, sum_sq } => (sum_sq / n - (sum / n).powi(2)).max(0.0),
        }
    }

    fn distribution(&self, n: usize) -> Vec<f64> {
        match self {
            Stats::Counts(c) if n > 0 => c.iter().map(|&k| k as f64 / n as f64).collect(),
            _ => Vec::new(),
        }
    }

    /// Majority class (lowest index on ties) or the mean.
    fn leaf_value(&self, n: usize) -> f64 {
        match self {
            Stats::Counts(c) => c
                .iter()
                .enumerate()
                .fold((0, 0), |best, (k, &cnt)| if cnt > best.1 { (k, cnt) } else { best })
                .0 as f64,
            Stats::Moments { sum, .. } => {
                if n == 0 {
                    0.0
                } else {
                    sum / n as f64
                }
            }
        }
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    child_impurity: f64,
}

/// CART growth over a (possibly bootstrapped) index set.
struct Grower<'a> {
    x: &'a Matrix,
    y: &'a [f64],
    criterion: Criterion,
    params: &'a TreeParams,
    n_split_features: usize,
    n_total: f64,
    rng: StdRng,
    nodes: Vec<TreeNode>,
    importances: Vec<f64>,
}

impl<'a> Grower<'a> {
    fn node_stats(&self, indices: &[usize]) -> Stats {
        let mut stats = Stats::empty(self.criterion);
        for &i in indices {
            stats.add(self.y[i]);
        }
        stats
    }

    fn grow(&mut self, indices: &mut [usize], depth: usize) -> usize {
        let stats = self.node_stats(indices);
        let n = indices.len();
        let impurity = stats.impurity(n);
        let id = self.nodes.len();
        self.nodes.push(TreeNode::Leaf {
            value: stats.leaf_value(n),
            distribution: stats.distribution(n),
        });

        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        if depth_reached || n < self.params.min_samples_split || n < 2 || impurity <= 1e-12 {
            return id;
        }

        let Some(best) = self.best_split(indices, &stats) else {
            return id;
        };

        // Partition in place: left block first
        let mut mid = 0;
        for k in 0..n {
            if self.x.get(indices[k], best.feature) <= best.threshold {
                indices.swap(k, mid);
                mid += 1;
            }
        }
        if mid == 0 || mid == n {
            return id;
        }

        let weight = n as f64 / self.n_total;
        self.importances[best.feature] += weight * (impurity - best.child_impurity);

        let (left_idx, right_idx) = indices.split_at_mut(mid);
        let left = self.grow(left_idx, depth + 1);
        let right = self.grow(right_idx, depth + 1);
        self.nodes[id] = TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        id
    }

    fn best_split(&mut self, indices: &[usize], parent: &Stats) -> Option<BestSplit> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let mut features: Vec<usize> = (0..self.x.cols()).collect();
        if self.n_split_features < features.len() {
            features.shuffle(&mut self.rng);
            features.truncate(self.n_split_features);
        }

        let mut best: Option<BestSplit> = None;
        let mut sorted = indices.to_vec();
        for &feature in &features {
            sorted.sort_by(|&a, &b| self.x.get(a, feature).total_cmp(&self.x.get(b, feature)));

            let mut left = Stats::empty(self.criterion);
            let mut right = parent.clone();
            for k in 0..n - 1 {
                let yi = self.y[sorted[k]];
                left.add(yi);
                right.remove(yi);

                let here = self.x.get(sorted[k], feature);
                let next = self.x.get(sorted[k + 1], feature);
                if here == next {
                    continue;
                }
                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let child = (n_left as f64 * left.impurity(n_left)
                    + n_right as f64 * right.impurity(n_right))
                    / n as f64;
                if best.as_ref().map_or(true, |b| child < b.child_impurity) {
                    // the midpoint of adjacent floats can round up to `next`
                    let mid = (here + next) / 2.0;
                    best = Some(BestSplit {
                        feature,
                        threshold: if mid < next { mid } else { here },
                        child_impurity: child,
                    });
                }
            }
        }
        best
    }
}

fn grow_tree(
    x: &Matrix,
    y: &[f64],
    indices: &[usize],
    criterion: Criterion,
    params: &TreeParams,
    seed: u64,
) -> GrownTree {
    let mut grower = Grower {
        x,
        y,
        criterion,
        params,
        n_split_features: params.max_features.resolve(x.cols()),
        n_total: indices.len() as f64,
        rng: StdRng::seed_from_u64(seed),
        nodes: Vec::new(),
        importances: vec![0.0; x.cols()],
    };
    let mut work = indices.to_vec();
    grower.grow(&mut work, 0);
    GrownTree {
        nodes: grower.nodes,
        n_features: x.cols(),
        importances: grower.importances,
    }
}

/// Grow a classification tree on `indices` (may repeat) with labels in `0..n_classes`.
pub(crate) fn grow_classifier(
    x: &Matrix,
    y: &[f64],
    indices: &[usize],
    n_classes: usize,
    params: &TreeParams,
    seed: u64,
) -> GrownTree {
    grow_tree(x, y, indices, Criterion::Gini { n_classes }, params, seed)
}

/// Grow a regression tree on `indices` (may repeat).
pub(crate) fn grow_regressor(
    x: &Matrix,
    y: &[f64],
    indices: &[usize],
    params: &TreeParams,
    seed: u64,
) -> GrownTree {
    grow_tree(x, y, indices, Criterion::Mse, params, seed)
}

/// Decision Tree Classifier using CART algorithm (Gini impurity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    pub params: TreeParams,
    pub seed: u64,
    pub n_classes: usize,
    tree: Option<GrownTree>,
}

impl DecisionTreeClassifier {
    pub fn new(params: TreeParams) -> Self {
        DecisionTreeClassifier {
            params,
            seed: 42,
            n_classes: 0,
            tree: None,
        }
    }
}

impl DecisionTreeClassifier {
    /// Class frequencies of the leaf each row falls in, shape `[n_rows][n_classes]`.
    pub fn predict_proba(&self, x: &Matrix) -> Result<Vec<Vec<f64>>, ModelError> {
        self.tree
            .as_ref()
            .ok_or(ModelError::NotFitted)?
            .predict_distribution(x)
    }
}

impl Estimator for DecisionTreeClassifier {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<(), ModelError> {
        check_fit_input(x, y)?;
        let (_, n_classes) = class_indices(y)?;
        self.n_classes = n_classes;
        let indices: Vec<usize> = (0..x.rows()).collect();
        self.tree = Some(grow_classifier(x, y, &indices, n_classes, &self.params, self.seed));
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Vec<f64>, ModelError> {
        self.tree.as_ref().ok_or(ModelError::NotFitted)?.predict(x)
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.tree.as_ref().map(|t| normalize(t.raw_importances().to_vec()))
    }

    fn class_probabilities(&self, x: &Matrix) -> Result<Option<Vec<Vec<f64>>>, ModelError> {
        self.predict_proba(x).map(Some)
    }
}

/// Decision Tree Regressor using CART (MSE criterion).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    pub params: TreeParams,
    pub seed: u64,
    tree: Option<GrownTree>,
}

impl DecisionTreeRegressor {
    pub fn new(params: TreeParams) -> Self {
        DecisionTreeRegressor {
            params,
            seed: 42,
            tree: None,
        }
    }
}

impl Estimator for DecisionTreeRegressor {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<(), ModelError> {
        check_fit_input(x, y)?;
        let indices: Vec<usize> = (0..x.rows()).collect();
        self.tree = Some(grow_regressor(x, y, &indices, &self.params, self.seed));
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Vec<f64>, ModelError> {
        self.tree.as_ref().ok_or(ModelError::NotFitted)?.predict(x)
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.tree.as_ref().map(|t| normalize(t.raw_importances().to_vec()))
    }
}
