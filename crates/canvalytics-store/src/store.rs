use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};

use canvalytics_core::DatasetId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::dataset::{Dataset, DatasetSummary};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Dataset not found: {0}")]
    NotFound(DatasetId),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Capacity policy for the in-memory store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// When set, inserting beyond this many datasets evicts the oldest first.
    pub max_datasets: Option<usize>,
}

/// Addressable cache of loaded datasets.
///
/// `get` hands out a shared handle: the dataset stays alive for the holder
/// even if the entry is evicted afterwards.
pub trait DatasetStore: Send + Sync {
    /// Publish a fully built dataset and return its id.
    fn put(&self, dataset: Dataset) -> DatasetId;

    fn get(&self, id: &DatasetId) -> StoreResult<Arc<Dataset>>;

    /// Remove an entry. Returns whether it was present; evicting twice is fine.
    fn evict(&self, id: &DatasetId) -> bool;

    /// Remove every dataset bound to `session`, returning how many went.
    fn evict_session(&self, session: &str) -> usize;

    /// Summaries in insertion order.
    fn list(&self) -> Vec<DatasetSummary>;
}

#[derive(Default)]
struct Entries {
    by_id: HashMap<DatasetId, Arc<Dataset>>,
    order: VecDeque<DatasetId>,
}

impl Entries {
    fn remove(&mut self, id: &DatasetId) -> Option<Arc<Dataset>> {
        let removed = self.by_id.remove(id)?;
        self.order.retain(|x| x != id);
        Some(removed)
    }
}

/// `RwLock`-guarded in-memory store with an optional oldest-first capacity limit.
#[derive(Default)]
pub struct InMemoryDatasetStore {
    config: StoreConfig,
    entries: RwLock<Entries>,
}

impl InMemoryDatasetStore {
    pub fn new(config: StoreConfig) -> Self {
        InMemoryDatasetStore {
            config,
            entries: RwLock::new(Entries::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DatasetStore for InMemoryDatasetStore {
    fn put(&self, dataset: Dataset) -> DatasetId {
        let id = dataset.id.clone();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.by_id.insert(id.clone(), Arc::new(dataset));
        entries.order.push_back(id.clone());

        if let Some(max) = self.config.max_datasets {
            while entries.order.len() > max.max(1) {
                if let Some(oldest) = entries.order.pop_front() {
                    entries.by_id.remove(&oldest);
                    info!(dataset_id = %oldest, "evicted oldest dataset at capacity");
                }
            }
        }
        debug!(dataset_id = %id, total = entries.by_id.len(), "dataset stored");
        id
    }

    fn get(&self, id: &DatasetId) -> StoreResult<Arc<Dataset>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn evict(&self, id: &DatasetId) -> bool {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some();
        if removed {
            info!(dataset_id = %id, "dataset evicted");
        }
        removed
    }

    fn evict_session(&self, session: &str) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let doomed: Vec<DatasetId> = entries
            .order
            .iter()
            .filter(|id| {
                entries
                    .by_id
                    .get(*id)
                    .is_some_and(|d| d.session.as_deref() == Some(session))
            })
            .cloned()
            .collect();
        for id in &doomed {
            entries.remove(id);
        }
        info!(session, evicted = doomed.len(), "session torn down");
        doomed.len()
    }

    fn list(&self) -> Vec<DatasetSummary> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .order
            .iter()
            .filter_map(|id| entries.by_id.get(id))
            .map(|d| d.summary())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvalytics_core::{Column, ColumnData, Table};

    fn dataset(name: &str, session: Option<&str>) -> Dataset {
        let table = Table::new(vec![Column::new(
            "x",
            ColumnData::Integer(vec![Some(1), Some(2)]),
        )])
        .unwrap();
        Dataset::new(name, session.map(String::from), table)
    }

    #[test]
    fn test_put_get_evict() {
        let store = InMemoryDatasetStore::default();
        let id = store.put(dataset("a", None));
        assert_eq!(store.get(&id).unwrap().name, "a");

        assert!(store.evict(&id));
        assert!(!store.evict(&id));
        assert_eq!(store.get(&id).unwrap_err(), StoreError::NotFound(id));
    }

    #[test]
    fn test_handle_outlives_eviction() {
        let store = InMemoryDatasetStore::default();
        let id = store.put(dataset("a", None));
        let handle = store.get(&id).unwrap();
        store.evict(&id);
        assert_eq!(handle.table.n_rows(), 2);
    }

    #[test]
    fn test_unknown_id() {
        let store = InMemoryDatasetStore::default();
        assert!(store.get(&DatasetId::from("never-issued")).is_err());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let store = InMemoryDatasetStore::new(StoreConfig {
            max_datasets: Some(2),
        });
        let a = store.put(dataset("a", None));
        let b = store.put(dataset("b", None));
        let c = store.put(dataset("c", None));
        assert!(store.get(&a).is_err());
        assert!(store.get(&b).is_ok());
        assert!(store.get(&c).is_ok());
        let names: Vec<String> = store.list().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_evict_session() {
        let store = InMemoryDatasetStore::default();
        store.put(dataset("a", Some("s1")));
        let keep = store.put(dataset("b", Some("s2")));
        store.put(dataset("c", Some("s1")));
        assert_eq!(store.evict_session("s1"), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get(&keep).is_ok());
    }

    #[test]
    fn test_concurrent_readers_and_writers() {
        let store = Arc::new(InMemoryDatasetStore::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let id = store.put(dataset(&format!("d{i}"), None));
                    store.get(&id).map(|d| d.table.n_rows())
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), Ok(2));
        }
        assert_eq!(store.len(), 8);
    }
}
