use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use canvalytics_core::{DatasetId, ModelId};
use tracing::info;

use crate::error::{RegistryError, RegistryResult};
use crate::record::{ModelRecord, ModelSummary};

/// Append-only store of trained models. Records are never updated.
pub trait ModelRegistry: Send + Sync {
    fn put(&self, record: ModelRecord) -> ModelId;

    fn get(&self, id: &ModelId) -> RegistryResult<Arc<ModelRecord>>;

    /// Summaries ordered by creation time, oldest first, optionally for one dataset.
    fn list(&self, dataset: Option<&DatasetId>) -> Vec<ModelSummary>;
}

#[derive(Default)]
struct Records {
    by_id: HashMap<ModelId, Arc<ModelRecord>>,
    order: Vec<ModelId>,
}

#[derive(Default)]
pub struct InMemoryModelRegistry {
    records: RwLock<Records>,
}

impl InMemoryModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ModelRegistry for InMemoryModelRegistry {
    fn put(&self, record: ModelRecord) -> ModelId {
        let id = record.model_id.clone();
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        if records.by_id.insert(id.clone(), Arc::new(record)).is_none() {
            records.order.push(id.clone());
        }
        info!(model_id = %id, total = records.order.len(), "model registered");
        id
    }

    fn get(&self, id: &ModelId) -> RegistryResult<Arc<ModelRecord>> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    fn list(&self, dataset: Option<&DatasetId>) -> Vec<ModelSummary> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<ModelSummary> = records
            .order
            .iter()
            .filter_map(|id| records.by_id.get(id))
            .filter(|r| dataset.map_or(true, |d| r.dataset_id == *d))
            .map(|r| r.summary())
            .collect();
        // stable: insertion order breaks timestamp ties
        out.sort_by_key(|s| s.created_at);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::{Metrics, RegressionMetrics};
    use crate::request::{TaskType, TrainingRequest};
    use chrono::{Duration, Utc};

    fn record(dataset: &str, offset_secs: i64) -> ModelRecord {
        let dataset_id = DatasetId::from(dataset);
        ModelRecord {
            model_id: ModelId::generate(),
            dataset_id: dataset_id.clone(),
            request: TrainingRequest::new(dataset_id, "y", "Ridge", TaskType::Regression),
            algorithm: "Ridge".into(),
            metrics: Metrics::Regression(RegressionMetrics {
                r2: 0.5,
                mse: 1.0,
                rmse: 1.0,
                mae: 1.0,
                cv_scores: None,
            }),
            feature_importance: vec![("x".into(), 1.0)],
            feature_names: vec!["x".into()],
            dropped_features: Vec::new(),
            train_rows: 8,
            test_rows: 2,
            rows_dropped: 0,
            artifact: vec![1, 2, 3],
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn test_put_get() {
        let registry = InMemoryModelRegistry::new();
        let id = registry.put(record("d1", 0));
        assert_eq!(registry.get(&id).unwrap().artifact, vec![1, 2, 3]);
        let unknown = ModelId::from("never-issued");
        assert_eq!(registry.get(&unknown).unwrap_err(), RegistryError::NotFound(unknown));
    }

    #[test]
    fn test_list_is_creation_ordered_and_filtered() {
        let registry = InMemoryModelRegistry::new();
        let late = registry.put(record("d1", 10));
        let early = registry.put(record("d1", 0));
        let other = registry.put(record("d2", 5));

        let all: Vec<ModelId> = registry.list(None).into_iter().map(|s| s.model_id).collect();
        assert_eq!(all, vec![early.clone(), other, late.clone()]);

        let d1 = DatasetId::from("d1");
        let only: Vec<ModelId> = registry.list(Some(&d1)).into_iter().map(|s| s.model_id).collect();
        assert_eq!(only, vec![early, late]);
        // re-iterable
        assert_eq!(registry.list(Some(&d1)).len(), 2);
    }
}
