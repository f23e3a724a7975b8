use canvalytics_core::estimator::{check_fit_input, class_indices};
use canvalytics_core::{Estimator, Matrix, ModelError};
use serde::{Deserialize, Serialize};

/// One binary logistic unit: weights plus bias.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinaryUnit {
    weights: Vec<f64>,
    bias: f64,
}

impl BinaryUnit {
    fn score(&self, row: &[f64]) -> f64 {
        self.bias + row.iter().zip(&self.weights).map(|(x, w)| x * w).sum::<f64>()
    }
}

/// Logistic Regression via batch gradient descent with an L2 penalty.
///
/// Two classes fit a single unit; more classes fit one unit per class (one-vs-rest)
/// and predict the class with the highest probability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub learning_rate: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub l2: f64,
    units: Vec<BinaryUnit>,
    n_classes: usize,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl LogisticRegression {
    pub fn new(learning_rate: f64, max_iter: usize) -> Self {
        LogisticRegression {
            learning_rate,
            max_iter,
            tol: 1e-6,
            l2: 1e-3,
            units: Vec::new(),
            n_classes: 0,
        }
    }

    pub fn with_l2(mut self, l2: f64) -> Self {
        self.l2 = l2;
        self
    }

    fn fit_unit(&self, x: &Matrix, y: &[f64]) -> BinaryUnit {
        let n = x.rows();
        let p = x.cols();
        let n_f = n as f64;

        let mut w = vec![0.0; p];
        let mut b = 0.0;

        for _iter in 0..self.max_iter {
            let mut dw = vec![0.0; p];
            let mut db = 0.0;

            for i in 0..n {
                let row = x.row(i);
                let z = b + row.iter().zip(&w).map(|(xv, wv)| xv * wv).sum::<f64>();
                let error = sigmoid(z) - y[i];
                for j in 0..p {
                    dw[j] += error * row[j];
                }
                db += error;
            }

            let mut max_grad = (db / n_f).abs();
            for j in 0..p {
                let grad = dw[j] / n_f + self.l2 * w[j];
                w[j] -= self.learning_rate * grad;
                max_grad = max_grad.max(grad.abs());
            }
            b -= self.learning_rate * (db / n_f);

            if max_grad < self.tol {
                break;
            }
        }

        BinaryUnit { weights: w, bias: b }
    }

    /// Probability of each class per row, shape `[n_rows][n_classes]`.
    ///
    /// One-vs-rest scores are normalized so every row sums to one.
    pub fn predict_proba(&self, x: &Matrix) -> Result<Vec<Vec<f64>>, ModelError> {
        let first = self.units.first().ok_or(ModelError::NotFitted)?;
        if x.cols() != first.weights.len() {
            return Err(ModelError::FeatureMismatch {
                expected: first.weights.len(),
                got: x.cols(),
            });
        }
        let out = (0..x.rows())
            .map(|i| {
                let row = x.row(i);
                if self.units.len() == 1 {
                    let p = sigmoid(first.score(row));
                    vec![1.0 - p, p]
                } else {
                    let scores: Vec<f64> = self.units.iter().map(|u| sigmoid(u.score(row))).collect();
                    let total: f64 = scores.iter().sum();
                    if total > 0.0 {
                        scores.iter().map(|s| s / total).collect()
                    } else {
                        vec![1.0 / scores.len() as f64; scores.len()]
                    }
                }
            })
            .collect();
        Ok(out)
    }
}

impl Estimator for LogisticRegression {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<(), ModelError> {
        check_fit_input(x, y)?;
        let (labels, n_classes) = class_indices(y)?;

        self.units = if n_classes <= 2 {
            vec![self.fit_unit(x, y)]
        } else {
            (0..n_classes)
                .map(|c| {
                    let target: Vec<f64> = labels
                        .iter()
                        .map(|&l| if l == c { 1.0 } else { 0.0 })
                        .collect();
                    self.fit_unit(x, &target)
                })
                .collect()
        };
        self.n_classes = n_classes.max(2);
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Vec<f64>, ModelError> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .iter()
            .map(|p| {
                p.iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |best, (c, &v)| {
                        if v > best.1 { (c, v) } else { best }
                    })
                    .0 as f64
            })
            .collect())
    }

    /// Coefficient magnitudes, averaged over the one-vs-rest units.
    fn feature_importances(&self) -> Option<Vec<f64>> {
        let first = self.units.first()?;
        let k = self.units.len() as f64;
        let mut imp = vec![0.0; first.weights.len()];
        for unit in &self.units {
            for (acc, w) in imp.iter_mut().zip(&unit.weights) {
                *acc += w.abs() / k;
            }
        }
        Some(imp)
    }

    fn class_probabilities(&self, x: &Matrix) -> Result<Option<Vec<Vec<f64>>>, ModelError> {
        self.predict_proba(x).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logistic_regression() {
        // Linearly separable data
        let x = Matrix::from_rows(&[
            vec![0.0, 0.0],
            vec![0.5, 0.5],
            vec![1.0, 1.0],
            vec![5.0, 5.0],
            vec![5.5, 5.5],
            vec![6.0, 6.0],
        ])
        .unwrap();
        let y = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut model = LogisticRegression::new(0.1, 1000);
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&x).unwrap();
        assert_eq!(pred, y.to_vec());
        let importances = model.feature_importances().unwrap();
        assert_eq!(importances.len(), 2);
    }

    #[test]
    fn test_one_vs_rest() {
        let x = Matrix::from_rows(&[
            vec![0.0, 0.0],
            vec![0.2, 0.1],
            vec![5.0, 0.0],
            vec![5.2, 0.1],
            vec![0.0, 5.0],
            vec![0.1, 5.2],
        ])
        .unwrap();
        let y = [0.0, 0.0, 1.0, 1.0, 2.0, 2.0];

        let mut model = LogisticRegression::new(0.5, 2000);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y.to_vec());
        let proba = model.predict_proba(&x).unwrap();
        for (row, &label) in proba.iter().zip(&y) {
            assert_eq!(row.len(), 3);
            approx::assert_abs_diff_eq!(row.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
            assert!(row[label as usize] > 1.0 / 3.0);
        }
        assert_eq!(model.class_probabilities(&x).unwrap(), Some(proba));
    }

    #[test]
    fn test_not_fitted() {
        let model = LogisticRegression::new(0.1, 10);
        assert_eq!(model.predict(&Matrix::zeros(1, 2)), Err(ModelError::NotFitted));
    }
}
