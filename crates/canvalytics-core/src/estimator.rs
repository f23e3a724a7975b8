use crate::error::ModelError;
use crate::matrix::Matrix;

/// Trait for supervised estimators fitted on a dense design matrix.
///
/// Classifiers receive class indices `0..n_classes` encoded as `f64` and predict the same.
pub trait Estimator {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<(), ModelError>;
    fn predict(&self, x: &Matrix) -> Result<Vec<f64>, ModelError>;

    /// Per-feature importance or coefficient magnitude, one entry per input column.
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }

    /// Class probabilities per row, each row summing to one. `None` for
    /// regressors and for models that only produce labels.
    fn class_probabilities(&self, _x: &Matrix) -> Result<Option<Vec<Vec<f64>>>, ModelError> {
        Ok(None)
    }
}

/// Validate that `x` and `y` agree and are non-empty.
pub fn check_fit_input(x: &Matrix, y: &[f64]) -> Result<(), ModelError> {
    if x.rows() == 0 {
        return Err(ModelError::EmptyTrainingSet);
    }
    if x.rows() != y.len() {
        return Err(ModelError::TargetLength {
            expected: x.rows(),
            got: y.len(),
        });
    }
    if x.data().iter().chain(y).any(|v| !v.is_finite()) {
        return Err(ModelError::NonFinite("fit"));
    }
    Ok(())
}

/// Convert encoded labels to class indices, also returning the class count.
pub fn class_indices(y: &[f64]) -> Result<(Vec<usize>, usize), ModelError> {
    let mut out = Vec::with_capacity(y.len());
    for &v in y {
        if v < 0.0 || v.fract() != 0.0 {
            return Err(ModelError::InvalidLabel(v));
        }
        out.push(v as usize);
    }
    let n_classes = out.iter().max().map_or(0, |m| m + 1);
    Ok((out, n_classes))
}
