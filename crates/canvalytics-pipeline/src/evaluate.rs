use canvalytics_metrics as metrics;
use serde::{Deserialize, Serialize};

/// How precision, recall and F1 were aggregated over classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Averaging {
    /// Scores of the positive (second sorted) class.
    Binary,
    /// Per-class scores weighted by class support.
    Weighted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub averaging: Averaging,
    /// Class labels; index `i` is class `i` in the confusion matrix.
    pub classes: Vec<String>,
    /// `confusion_matrix[true][predicted]` on the held-out rows.
    pub confusion_matrix: Vec<Vec<usize>>,
    /// Per-fold accuracy from cross-validation on the training rows.
    pub cv_scores: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub r2: f64,
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    /// Per-fold R² from cross-validation on the training rows.
    pub cv_scores: Option<Vec<f64>>,
}

/// Hold-out evaluation of one trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "lowercase")]
pub enum Metrics {
    Classification(ClassificationMetrics),
    Regression(RegressionMetrics),
}

impl Metrics {
    /// The headline score: accuracy or R².
    pub fn primary(&self) -> f64 {
        match self {
            Metrics::Classification(m) => m.accuracy,
            Metrics::Regression(m) => m.r2,
        }
    }

    pub fn cv_scores(&self) -> Option<&[f64]> {
        match self {
            Metrics::Classification(m) => m.cv_scores.as_deref(),
            Metrics::Regression(m) => m.cv_scores.as_deref(),
        }
    }
}

pub fn classification_metrics(
    y_true: &[usize],
    y_pred: &[usize],
    classes: &[String],
    cv_scores: Option<Vec<f64>>,
) -> ClassificationMetrics {
    let k = classes.len();
    let (precision, recall, f1, averaging) = if k == 2 {
        (
            metrics::precision_class(y_true, y_pred, 1),
            metrics::recall_class(y_true, y_pred, 1),
            metrics::f1_score_class(y_true, y_pred, 1),
            Averaging::Binary,
        )
    } else {
        (
            metrics::precision_weighted(y_true, y_pred, k),
            metrics::recall_weighted(y_true, y_pred, k),
            metrics::f1_weighted(y_true, y_pred, k),
            Averaging::Weighted,
        )
    };
    ClassificationMetrics {
        accuracy: metrics::accuracy(y_true, y_pred),
        precision,
        recall,
        f1,
        averaging,
        classes: classes.to_vec(),
        confusion_matrix: metrics::confusion_matrix(y_true, y_pred, k),
        cv_scores,
    }
}

pub fn regression_metrics(y_true: &[f64], y_pred: &[f64], cv_scores: Option<Vec<f64>>) -> RegressionMetrics {
    RegressionMetrics {
        r2: metrics::r2_score(y_true, y_pred),
        mse: metrics::mse(y_true, y_pred),
        rmse: metrics::rmse(y_true, y_pred),
        mae: metrics::mae(y_true, y_pred),
        cv_scores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_binary_uses_positive_class() {
        let m = classification_metrics(&[0, 0, 1, 1], &[0, 1, 1, 1], &labels(&["no", "yes"]), None);
        assert_eq!(m.averaging, Averaging::Binary);
        assert_abs_diff_eq!(m.accuracy, 0.75);
        assert_abs_diff_eq!(m.precision, 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.recall, 1.0);
        assert_eq!(m.confusion_matrix, vec![vec![1, 1], vec![0, 2]]);
    }

    #[test]
    fn test_multiclass_is_weighted() {
        let y_true = [0, 1, 2, 2];
        let y_pred = [0, 2, 2, 2];
        let m = classification_metrics(&y_true, &y_pred, &labels(&["a", "b", "c"]), None);
        assert_eq!(m.averaging, Averaging::Weighted);
        // recall: a 1.0 (1), b 0.0 (1), c 1.0 (2) → 3/4
        assert_abs_diff_eq!(m.recall, 0.75);
    }

    #[test]
    fn test_metrics_json_is_tagged() {
        let m = Metrics::Regression(regression_metrics(&[1.0, 2.0], &[1.0, 2.0], None));
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["task"], "regression");
        assert_eq!(json["r2"], 1.0);
        assert_eq!(m.primary(), 1.0);
    }
}
