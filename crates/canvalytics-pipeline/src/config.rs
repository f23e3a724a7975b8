use serde::{Deserialize, Serialize};

/// Fixed choices of the training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fraction of rows held out for evaluation.
    pub test_fraction: f64,
    pub seed: u64,
    /// Categorical features with more distinct training values are dropped.
    pub max_cardinality: usize,
    /// Category that stands in for missing categorical values.
    pub placeholder: String,
    /// How many feature importances a model record keeps.
    pub top_n_importances: usize,
    /// Cross-validation folds on the training split; below 2 disables it.
    pub cv_folds: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            test_fraction: 0.2,
            seed: 42,
            max_cardinality: 50,
            placeholder: "Unknown".to_string(),
            top_n_importances: 15,
            cv_folds: 5,
        }
    }
}
