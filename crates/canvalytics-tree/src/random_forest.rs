use canvalytics_core::estimator::{check_fit_input, class_indices};
use canvalytics_core::{Estimator, Matrix, ModelError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::decision_tree::{
    grow_classifier, grow_regressor, normalize, GrownTree, MaxFeatures, TreeParams,
};

/// Bootstrap sample of `n` row indices, drawn with replacement.
fn bootstrap(rng: &mut StdRng, n: usize) -> Vec<usize> {
    (0..n).map(|_| rng.gen_range(0..n)).collect()
}

fn mean_importances(trees: &[GrownTree]) -> Option<Vec<f64>> {
    let first = trees.first()?;
    let mut acc = vec![0.0; first.raw_importances().len()];
    for tree in trees {
        // each tree contributes equally, as a normalized vector
        for (a, v) in acc.iter_mut().zip(normalize(tree.raw_importances().to_vec())) {
            *a += v;
        }
    }
    Some(normalize(acc))
}

/// Random forest classifier: bagged decision trees voting by majority.
///
/// Each tree is grown on a bootstrap sample and considers a random subset of
/// features at every split. Prediction is a majority vote, ties going to the
/// lower class index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    pub n_estimators: usize,
    pub params: TreeParams,
    pub bootstrap: bool,
    pub seed: u64,
    pub n_classes: usize,
    trees: Vec<GrownTree>,
}

impl RandomForestClassifier {
    pub fn new(n_estimators: usize) -> Self {
        RandomForestClassifier {
            n_estimators,
            params: TreeParams {
                max_features: MaxFeatures::Sqrt,
                ..TreeParams::default()
            },
            bootstrap: true,
            seed: 42,
            n_classes: 0,
            trees: Vec::new(),
        }
    }

    /// Leaf class frequencies averaged over the trees.
    pub fn predict_proba(&self, x: &Matrix) -> Result<Vec<Vec<f64>>, ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::NotFitted);
        }
        let k = self.trees.len() as f64;
        let mut proba = vec![vec![0.0; self.n_classes]; x.rows()];
        for tree in &self.trees {
            for (acc, dist) in proba.iter_mut().zip(tree.predict_distribution(x)?) {
                for (a, p) in acc.iter_mut().zip(dist) {
                    *a += p / k;
                }
            }
        }
        Ok(proba)
    }
}

impl Estimator for RandomForestClassifier {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<(), ModelError> {
        check_fit_input(x, y)?;
        let (_, n_classes) = class_indices(y)?;
        self.n_classes = n_classes;

        let n = x.rows();
        let mut base_rng = StdRng::seed_from_u64(self.seed);
        let all: Vec<usize> = (0..n).collect();

        self.trees.clear();
        for _ in 0..self.n_estimators.max(1) {
            let sample = if self.bootstrap { bootstrap(&mut base_rng, n) } else { all.clone() };
            let tree_seed = base_rng.gen::<u64>();
            self.trees
                .push(grow_classifier(x, y, &sample, n_classes, &self.params, tree_seed));
        }
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Vec<f64>, ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::NotFitted);
        }
        let per_tree = self
            .trees
            .iter()
            .map(|t| t.predict(x))
            .collect::<Result<Vec<_>, _>>()?;

        let mut predictions = Vec::with_capacity(x.rows());
        for i in 0..x.rows() {
            let mut votes = vec![0usize; self.n_classes.max(1)];
            for preds in &per_tree {
                let cls = preds[i] as usize;
                if cls < votes.len() {
                    votes[cls] += 1;
                }
            }
            let best = votes
                .iter()
                .enumerate()
                .fold((0, 0), |best, (c, &v)| if v > best.1 { (c, v) } else { best })
                .0;
            predictions.push(best as f64);
        }
        Ok(predictions)
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        mean_importances(&self.trees)
    }

    fn class_probabilities(&self, x: &Matrix) -> Result<Option<Vec<Vec<f64>>>, ModelError> {
        self.predict_proba(x).map(Some)
    }
}

/// Random Forest Regressor. Prediction is the mean over trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    pub n_estimators: usize,
    pub params: TreeParams,
    pub bootstrap: bool,
    pub seed: u64,
    trees: Vec<GrownTree>,
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize) -> Self {
        RandomForestRegressor {
            n_estimators,
            params: TreeParams::default(),
            bootstrap: true,
            seed: 42,
            trees: Vec::new(),
        }
    }
}

impl Estimator for RandomForestRegressor {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<(), ModelError> {
        check_fit_input(x, y)?;
        let n = x.rows();
        let mut base_rng = StdRng::seed_from_u64(self.seed);
        let all: Vec<usize> = (0..n).collect();

        self.trees.clear();
        for _ in 0..self.n_estimators.max(1) {
            let sample = if self.bootstrap { bootstrap(&mut base_rng, n) } else { all.clone() };
            let tree_seed = base_rng.gen::<u64>();
            self.trees.push(grow_regressor(x, y, &sample, &self.params, tree_seed));
        }
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Vec<f64>, ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::NotFitted);
        }
        let mut sums = vec![0.0; x.rows()];
        for tree in &self.trees {
            for (s, p) in sums.iter_mut().zip(tree.predict(x)?) {
                *s += p;
            }
        }
        let k = self.trees.len() as f64;
        Ok(sums.into_iter().map(|s| s / k).collect())
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        mean_importances(&self.trees)
    }
}
