//! Classification metrics over class indices `0..n_classes`.
//!
//! Per-class scores that are undefined (no predicted or no true members) are 0.0.

/// Fraction of correct predictions. Empty input scores 0.0.
pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    debug_assert_eq!(y_true.len(), y_pred.len(), "Length mismatch");
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    correct as f64 / y_true.len() as f64
}

/// Confusion matrix: `matrix[true][pred]`, shape `[n_classes, n_classes]`.
pub fn confusion_matrix(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Vec<Vec<usize>> {
    let mut matrix = vec![vec![0usize; n_classes]; n_classes];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if t < n_classes && p < n_classes {
            matrix[t][p] += 1;
        }
    }
    matrix
}

/// Precision for a specific class.
pub fn precision_class(y_true: &[usize], y_pred: &[usize], class: usize) -> f64 {
    let mut tp = 0usize;
    let mut fp = 0usize;
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if p == class {
            if t == class {
                tp += 1;
            } else {
                fp += 1;
            }
        }
    }
    if tp + fp == 0 {
        0.0
    } else {
        tp as f64 / (tp + fp) as f64
    }
}

/// Recall for a specific class.
pub fn recall_class(y_true: &[usize], y_pred: &[usize], class: usize) -> f64 {
    let mut tp = 0usize;
    let mut fn_ = 0usize;
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if t == class {
            if p == class {
                tp += 1;
            } else {
                fn_ += 1;
            }
        }
    }
    if tp + fn_ == 0 {
        0.0
    } else {
        tp as f64 / (tp + fn_) as f64
    }
}

/// F1 score for a specific class.
pub fn f1_score_class(y_true: &[usize], y_pred: &[usize], class: usize) -> f64 {
    let p = precision_class(y_true, y_pred, class);
    let r = recall_class(y_true, y_pred, class);
    if p + r == 0.0 {
        0.0
    } else {
        2.0 * p * r / (p + r)
    }
}

/// Average a per-class score, weighting each class by its support in `y_true`.
fn support_weighted(
    y_true: &[usize],
    n_classes: usize,
    score: impl Fn(usize) -> f64,
) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let mut support = vec![0usize; n_classes];
    for &t in y_true {
        if t < n_classes {
            support[t] += 1;
        }
    }
    let total: usize = support.iter().sum();
    if total == 0 {
        return 0.0;
    }
    support
        .iter()
        .enumerate()
        .filter(|(_, &s)| s > 0)
        .map(|(c, &s)| score(c) * s as f64)
        .sum::<f64>()
        / total as f64
}

/// Support-weighted precision across all classes.
pub fn precision_weighted(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> f64 {
    support_weighted(y_true, n_classes, |c| precision_class(y_true, y_pred, c))
}

/// Support-weighted recall across all classes.
pub fn recall_weighted(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> f64 {
    support_weighted(y_true, n_classes, |c| recall_class(y_true, y_pred, c))
}

/// Support-weighted F1 across all classes.
pub fn f1_weighted(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> f64 {
    support_weighted(y_true, n_classes, |c| f1_score_class(y_true, y_pred, c))
}
