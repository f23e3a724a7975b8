pub mod dataset;
pub mod store;

pub use dataset::{ColumnMeta, Dataset, DatasetMetadata, DatasetSummary};
pub use store::{DatasetStore, InMemoryDatasetStore, StoreConfig, StoreError, StoreResult};
