use canvalytics_core::Matrix;
use serde::{Deserialize, Serialize};

/// Standardize features by removing the mean and scaling to unit variance.
///
/// Uses the population standard deviation; a constant column is scaled by 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Option<Vec<f64>>,
    pub std: Option<Vec<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        StandardScaler {
            mean: None,
            std: None,
        }
    }

    /// Compute mean and std from training data (`[samples, features]`).
    pub fn fit(&mut self, x: &Matrix) {
        let n = x.rows() as f64;
        let mut mean = vec![0.0; x.cols()];
        let mut std = vec![1.0; x.cols()];
        if x.rows() > 0 {
            for j in 0..x.cols() {
                let col = x.column(j);
                let m = col.iter().sum::<f64>() / n;
                let var = col.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / n;
                mean[j] = m;
                std[j] = var.sqrt();
            }
        }
        self.mean = Some(mean);
        self.std = Some(std);
    }

    /// Transform data in place using the fitted mean and std.
    pub fn transform(&self, x: &mut Matrix) {
        let (Some(mean), Some(std)) = (self.mean.as_ref(), self.std.as_ref()) else {
            return;
        };
        for i in 0..x.rows() {
            for j in 0..x.cols().min(mean.len()) {
                let s = if std[j].abs() < f64::EPSILON { 1.0 } else { std[j] };
                x.set(i, j, (x.get(i, j) - mean[j]) / s);
            }
        }
    }

    /// Fit and transform in one step.
    pub fn fit_transform(&mut self, x: &mut Matrix) {
        self.fit(x);
        self.transform(x);
    }
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}
