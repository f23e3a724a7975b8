use canvalytics_core::estimator::check_fit_input;
use canvalytics_core::{Estimator, Matrix, ModelError};
use canvalytics_linalg::{solve, solve_regularized, LinalgError};
use serde::{Deserialize, Serialize};

/// Ridge added when the normal equations are singular (e.g. one-hot columns plus an intercept).
const SINGULAR_JITTER: f64 = 1e-8;

fn linalg_err(e: LinalgError) -> ModelError {
    match e {
        LinalgError::SingularMatrix => ModelError::SingularMatrix,
        LinalgError::NotSquare { rows, cols } => ModelError::FeatureMismatch {
            expected: rows,
            got: cols,
        },
        LinalgError::DimensionMismatch(_) => ModelError::SingularMatrix,
    }
}

/// Solve the (optionally penalized) normal equations, returning `(weights, bias)`.
fn fit_normal_equations(
    x: &Matrix,
    y: &[f64],
    fit_intercept: bool,
    alpha: f64,
) -> Result<(Vec<f64>, f64), ModelError> {
    check_fit_input(x, y)?;
    let x_aug = if fit_intercept { x.with_intercept() } else { x.clone() };
    let skip = usize::from(fit_intercept);

    let xtx = x_aug.gram();
    let xty = x_aug
        .t_dot(y)
        .map_err(|_| ModelError::TargetLength { expected: x.rows(), got: y.len() })?;

    let w = if alpha > 0.0 {
        solve_regularized(&xtx, &xty, alpha, skip).map_err(linalg_err)?
    } else {
        match solve(&xtx, &xty) {
            Ok(w) => w,
            Err(LinalgError::SingularMatrix) => {
                let scale = (0..xtx.rows()).map(|i| xtx.get(i, i)).fold(1.0, f64::max);
                solve_regularized(&xtx, &xty, SINGULAR_JITTER * scale, skip)
                    .map_err(linalg_err)?
            }
            Err(e) => return Err(linalg_err(e)),
        }
    };

    if fit_intercept {
        Ok((w[1..].to_vec(), w[0]))
    } else {
        Ok((w, 0.0))
    }
}

fn predict_linear(weights: &Option<Vec<f64>>, bias: f64, x: &Matrix) -> Result<Vec<f64>, ModelError> {
    let w = weights.as_ref().ok_or(ModelError::NotFitted)?;
    if x.cols() != w.len() {
        return Err(ModelError::FeatureMismatch {
            expected: w.len(),
            got: x.cols(),
        });
    }
    let pred = x.dot(w).map_err(|_| ModelError::FeatureMismatch {
        expected: w.len(),
        got: x.cols(),
    })?;
    Ok(pred.into_iter().map(|v| v + bias).collect())
}

/// Ordinary Least Squares linear regression.
///
/// Fits `y = Xw + b` using the normal equation: `w = (XᵀX)⁻¹Xᵀy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    pub weights: Option<Vec<f64>>,
    pub bias: f64,
    pub fit_intercept: bool,
}

impl LinearRegression {
    pub fn new(fit_intercept: bool) -> Self {
        LinearRegression {
            weights: None,
            bias: 0.0,
            fit_intercept,
        }
    }
}

impl Estimator for LinearRegression {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<(), ModelError> {
        let (w, b) = fit_normal_equations(x, y, self.fit_intercept, 0.0)?;
        self.weights = Some(w);
        self.bias = b;
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Vec<f64>, ModelError> {
        predict_linear(&self.weights, self.bias, x)
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.weights.as_ref().map(|w| w.iter().map(|v| v.abs()).collect())
    }
}

/// Ridge regression (L2-regularized).
///
/// Fits using: `w = (XᵀX + αI)⁻¹Xᵀy`; the intercept is not penalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ridge {
    pub alpha: f64,
    pub weights: Option<Vec<f64>>,
    pub bias: f64,
    pub fit_intercept: bool,
}

impl Ridge {
    pub fn new(alpha: f64, fit_intercept: bool) -> Self {
        Ridge {
            alpha,
            weights: None,
            bias: 0.0,
            fit_intercept,
        }
    }
}

impl Estimator for Ridge {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<(), ModelError> {
        let (w, b) = fit_normal_equations(x, y, self.fit_intercept, self.alpha)?;
        self.weights = Some(w);
        self.bias = b;
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Vec<f64>, ModelError> {
        predict_linear(&self.weights, self.bias, x)
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.weights.as_ref().map(|w| w.iter().map(|v| v.abs()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_linear_regression() {
        // y = 2x + 1
        let x = Matrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0], vec![4.0]]).unwrap();
        let y = [3.0, 5.0, 7.0, 9.0];
        let mut model = LinearRegression::new(true);
        model.fit(&x, &y).unwrap();
        assert_abs_diff_eq!(model.weights.as_ref().unwrap()[0], 2.0, epsilon = 1e-8);
        assert_abs_diff_eq!(model.bias, 1.0, epsilon = 1e-8);
        let pred = model.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert_abs_diff_eq!(p, t, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_collinear_columns_still_fit() {
        // two one-hot columns always summing to one, plus an intercept
        let x = Matrix::from_rows(&[
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
        ])
        .unwrap();
        let y = [1.0, 3.0, 1.0, 3.0];
        let mut model = LinearRegression::new(true);
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert_abs_diff_eq!(p, t, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_ridge_shrinks_weights() {
        let x = Matrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0], vec![4.0]]).unwrap();
        let y = [3.0, 5.0, 7.0, 9.0];
        let mut ols = LinearRegression::new(true);
        let mut ridge = Ridge::new(10.0, true);
        ols.fit(&x, &y).unwrap();
        ridge.fit(&x, &y).unwrap();
        assert!(ridge.weights.unwrap()[0].abs() < ols.weights.unwrap()[0].abs());
    }

    #[test]
    fn test_predict_before_fit() {
        let model = LinearRegression::new(true);
        assert_eq!(model.predict(&Matrix::zeros(1, 1)), Err(ModelError::NotFitted));
    }
}
