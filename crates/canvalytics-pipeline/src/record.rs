use canvalytics_core::{DatasetId, ModelId};
use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::evaluate::Metrics;
use crate::request::{TaskType, TrainingRequest};

/// Immutable result of one training run. It owns its serialized artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRecord {
    pub model_id: ModelId,
    pub dataset_id: DatasetId,
    pub request: TrainingRequest,
    /// Registered name of the algorithm that was trained.
    pub algorithm: String,
    pub metrics: Metrics,
    /// Top features by descending importance.
    #[serde(serialize_with = "ranked_map")]
    pub feature_importance: Vec<(String, f64)>,
    /// Model input features after one-hot expansion.
    pub feature_names: Vec<String>,
    /// Categorical features dropped for high cardinality.
    pub dropped_features: Vec<String>,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Rows skipped because the target was missing.
    pub rows_dropped: usize,
    #[serde(skip)]
    pub artifact: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Serialize `(name, score)` pairs as a map, keeping their order.
pub fn ranked_map<S: Serializer>(pairs: &[(String, f64)], s: S) -> Result<S::Ok, S::Error> {
    let mut map = s.serialize_map(Some(pairs.len()))?;
    for (name, score) in pairs {
        map.serialize_entry(name, score)?;
    }
    map.end()
}

/// Listing view of a model record, without the artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub model_id: ModelId,
    pub dataset_id: DatasetId,
    pub algorithm: String,
    pub task_type: TaskType,
    pub target_column: String,
    pub metrics: Metrics,
    pub created_at: DateTime<Utc>,
}

impl ModelRecord {
    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            model_id: self.model_id.clone(),
            dataset_id: self.dataset_id.clone(),
            algorithm: self.algorithm.clone(),
            task_type: self.request.task_type,
            target_column: self.request.target_column.clone(),
            metrics: self.metrics.clone(),
            created_at: self.created_at,
        }
    }
}
