use canvalytics_core::Matrix;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    Median,
    Mean,
}

/// Median of a non-empty slice; sorts a copy.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    let mid = v.len() / 2;
    Some(if v.len() % 2 == 0 {
        (v[mid - 1] + v[mid]) / 2.0
    } else {
        v[mid]
    })
}

/// Replace missing numeric values (`NaN`) with a per-column statistic.
///
/// A column with no present values at fit time is filled with `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleImputer {
    pub strategy: ImputeStrategy,
    pub statistics: Option<Vec<f64>>,
}

impl SimpleImputer {
    pub fn new(strategy: ImputeStrategy) -> Self {
        SimpleImputer {
            strategy,
            statistics: None,
        }
    }

    /// Compute the fill value of each column from its non-`NaN` entries.
    pub fn fit(&mut self, x: &Matrix) {
        let stats = (0..x.cols())
            .map(|j| {
                let present: Vec<f64> =
                    x.column(j).into_iter().filter(|v| !v.is_nan()).collect();
                let stat = match self.strategy {
                    ImputeStrategy::Median => median(&present),
                    ImputeStrategy::Mean if present.is_empty() => None,
                    ImputeStrategy::Mean => {
                        Some(present.iter().sum::<f64>() / present.len() as f64)
                    }
                };
                stat.unwrap_or(0.0)
            })
            .collect();
        self.statistics = Some(stats);
    }

    /// Fill `NaN` entries in place. Unfitted imputers leave the matrix untouched.
    pub fn transform(&self, x: &mut Matrix) {
        let Some(stats) = self.statistics.as_ref() else {
            return;
        };
        for i in 0..x.rows() {
            for (j, &fill) in stats.iter().enumerate().take(x.cols()) {
                if x.get(i, j).is_nan() {
                    x.set(i, j, fill);
                }
            }
        }
    }
}

/// Replace missing categorical values with a literal placeholder category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantImputer {
    pub fill_value: String,
}

impl ConstantImputer {
    pub fn new(fill_value: impl Into<String>) -> Self {
        ConstantImputer {
            fill_value: fill_value.into(),
        }
    }

    pub fn transform(&self, values: Vec<Option<String>>) -> Vec<String> {
        values
            .into_iter()
            .map(|v| v.unwrap_or_else(|| self.fill_value.clone()))
            .collect()
    }
}
