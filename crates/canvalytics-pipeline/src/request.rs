use std::collections::BTreeMap;
use std::fmt;

use canvalytics_core::DatasetId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Classification,
    Regression,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskType::Classification => "classification",
            TaskType::Regression => "regression",
        })
    }
}

/// One training run: which dataset, which target, which algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRequest {
    pub dataset_id: DatasetId,
    pub target_column: String,
    /// Defaults to every column except the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_columns: Option<Vec<String>>,
    #[serde(alias = "algorithm_name")]
    pub algorithm: String,
    pub task_type: TaskType,
    #[serde(default)]
    pub hyperparameters: BTreeMap<String, Value>,
}

impl TrainingRequest {
    pub fn new(
        dataset_id: DatasetId,
        target_column: impl Into<String>,
        algorithm: impl Into<String>,
        task_type: TaskType,
    ) -> Self {
        TrainingRequest {
            dataset_id,
            target_column: target_column.into(),
            feature_columns: None,
            algorithm: algorithm.into(),
            task_type,
            hyperparameters: BTreeMap::new(),
        }
    }

    pub fn with_features(mut self, features: &[&str]) -> Self {
        self.feature_columns = Some(features.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.hyperparameters.insert(key.to_string(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_json() {
        let request: TrainingRequest = serde_json::from_str(
            r#"{"dataset_id":"d1","target_column":"Survived","algorithm_name":"RandomForest",
                "task_type":"classification","hyperparameters":{"n_estimators":10}}"#,
        )
        .unwrap();
        assert_eq!(request.algorithm, "RandomForest");
        assert_eq!(request.task_type, TaskType::Classification);
        assert_eq!(request.feature_columns, None);
        assert_eq!(request.hyperparameters["n_estimators"], 10);
    }
}
