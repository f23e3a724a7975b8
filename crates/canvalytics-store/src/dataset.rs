use canvalytics_core::{DType, DatasetId, Table};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-column load-time metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    pub dtype: DType,
    pub missing: usize,
}

/// Basic counts computed once when a dataset is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub row_count: usize,
    pub column_count: usize,
    pub missing_total: usize,
    pub columns: Vec<ColumnMeta>,
}

impl DatasetMetadata {
    pub fn of(table: &Table) -> Self {
        let columns: Vec<ColumnMeta> = table
            .columns()
            .iter()
            .map(|c| ColumnMeta {
                name: c.name().to_string(),
                dtype: c.dtype(),
                missing: c.missing_count(),
            })
            .collect();
        DatasetMetadata {
            row_count: table.n_rows(),
            column_count: table.n_columns(),
            missing_total: columns.iter().map(|c| c.missing).sum(),
            columns,
        }
    }
}

/// A loaded table with its identity and metadata. Immutable once built.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub id: DatasetId,
    pub name: String,
    pub session: Option<String>,
    pub table: Table,
    pub metadata: DatasetMetadata,
    pub loaded_at: DateTime<Utc>,
}

impl Dataset {
    /// Wrap a fully parsed table under a fresh id.
    pub fn new(name: impl Into<String>, session: Option<String>, table: Table) -> Self {
        Dataset {
            id: DatasetId::generate(),
            name: name.into(),
            session,
            metadata: DatasetMetadata::of(&table),
            table,
            loaded_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            dataset_id: self.id.clone(),
            name: self.name.clone(),
            session: self.session.clone(),
            metadata: self.metadata.clone(),
            loaded_at: self.loaded_at,
        }
    }
}

/// Serializable view of a dataset, as returned by `load` and `list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub dataset_id: DatasetId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(flatten)]
    pub metadata: DatasetMetadata,
    pub loaded_at: DateTime<Utc>,
}
