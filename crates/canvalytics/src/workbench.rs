use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use canvalytics_core::{DatasetId, ModelId, Table};
use canvalytics_eda::{self as eda, ChartData, ChartRequest, ColumnProfile, DatasetStatistics, MissingReport};
use canvalytics_io::{load_table, table_from_json, LoadSource};
use canvalytics_pipeline::{
    ranked_map, InMemoryModelRegistry, Metrics, ModelArtifact, ModelRecord, ModelRegistry,
    ModelSummary, Predictions, Trainer, TrainingRequest,
};
use canvalytics_store::{Dataset, DatasetStore, DatasetSummary, InMemoryDatasetStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};

/// The table an operation works on: a stored dataset or an inline payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "TableArgs")]
pub enum TableRef {
    Dataset(DatasetId),
    Inline(Value),
}

#[derive(Deserialize)]
struct TableArgs {
    #[serde(default)]
    dataset_id: Option<DatasetId>,
    #[serde(default)]
    data: Option<Value>,
}

impl TryFrom<TableArgs> for TableRef {
    type Error = String;

    fn try_from(args: TableArgs) -> std::result::Result<Self, Self::Error> {
        match (args.dataset_id, args.data) {
            (Some(id), None) => Ok(TableRef::Dataset(id)),
            (None, Some(data)) => Ok(TableRef::Inline(data)),
            _ => Err("exactly one of `dataset_id` or `data` is required".to_string()),
        }
    }
}

impl From<DatasetId> for TableRef {
    fn from(id: DatasetId) -> Self {
        TableRef::Dataset(id)
    }
}

enum Resolved {
    Stored(Arc<Dataset>),
    Inline(Table),
}

impl Resolved {
    fn table(&self) -> &Table {
        match self {
            Resolved::Stored(dataset) => &dataset.table,
            Resolved::Inline(table) => table,
        }
    }
}

/// Response of a successful training run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainOutcome {
    pub model_id: ModelId,
    pub metrics: Metrics,
    #[serde(serialize_with = "ranked_map")]
    pub feature_importance: Vec<(String, f64)>,
}

/// Predictions for inline records, with class probabilities when the model has them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictOutcome {
    pub model_id: ModelId,
    #[serde(flatten)]
    pub predicted: Predictions,
}

/// A model artifact encoded for JSON transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelDownload {
    pub model_id: ModelId,
    pub encoding: &'static str,
    pub artifact: String,
}

/// Every core operation, over an injected dataset store and model registry.
pub struct Workbench {
    config: Config,
    datasets: Arc<dyn DatasetStore>,
    models: Arc<dyn ModelRegistry>,
    trainer: Trainer,
}

impl Workbench {
    /// In-memory store and registry built from `config`.
    pub fn new(config: Config) -> Self {
        let datasets = Arc::new(InMemoryDatasetStore::new(config.store.clone()));
        let models = Arc::new(InMemoryModelRegistry::new());
        Self::with_backends(config, datasets, models)
    }

    pub fn with_backends(
        config: Config,
        datasets: Arc<dyn DatasetStore>,
        models: Arc<dyn ModelRegistry>,
    ) -> Self {
        let trainer = Trainer::new(config.training.clone());
        Workbench {
            config,
            datasets,
            models,
            trainer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn trainer(&self) -> &Trainer {
        &self.trainer
    }

    fn resolve(&self, table: &TableRef) -> Result<Resolved> {
        match table {
            TableRef::Dataset(id) => Ok(Resolved::Stored(self.datasets.get(id)?)),
            TableRef::Inline(payload) => Ok(Resolved::Inline(table_from_json(payload)?)),
        }
    }

    // ─── Datasets ───────────────────────────────────────────────────────

    /// Decode `source` and publish it. The dataset is visible only once fully built.
    pub fn load(
        &self,
        source: &LoadSource,
        name: Option<&str>,
        session: Option<&str>,
    ) -> Result<DatasetSummary> {
        let table = load_table(source, &self.config.load)?;
        let name = name.map_or_else(|| source.default_name(), str::to_string);
        let dataset = Dataset::new(name, session.map(str::to_string), table);
        let summary = dataset.summary();
        let id = self.datasets.put(dataset);
        info!(dataset_id = %id, rows = summary.metadata.row_count, "dataset loaded");
        Ok(summary)
    }

    pub fn dataset(&self, id: &DatasetId) -> Result<Arc<Dataset>> {
        Ok(self.datasets.get(id)?)
    }

    pub fn list_datasets(&self) -> Vec<DatasetSummary> {
        self.datasets.list()
    }

    pub fn evict(&self, id: &DatasetId) -> bool {
        self.datasets.evict(id)
    }

    pub fn evict_session(&self, session: &str) -> usize {
        self.datasets.evict_session(session)
    }

    // ─── Exploration ────────────────────────────────────────────────────

    pub fn describe(&self, table: &TableRef) -> Result<DatasetStatistics> {
        let resolved = self.resolve(table)?;
        Ok(eda::profile(resolved.table(), &self.config.profile))
    }

    pub fn profile(&self, table: &TableRef, column: &str) -> Result<ColumnProfile> {
        let resolved = self.resolve(table)?;
        let column = resolved
            .table()
            .column(column)
            .ok_or_else(|| Error::ColumnNotFound(column.to_string()))?;
        Ok(eda::profile_column(column, &self.config.profile))
    }

    pub fn missing(&self, table: &TableRef) -> Result<MissingReport> {
        let resolved = self.resolve(table)?;
        Ok(eda::missing_report(resolved.table()))
    }

    pub fn chart(&self, table: &TableRef, request: &ChartRequest) -> Result<ChartData> {
        let resolved = self.resolve(table)?;
        debug!(?request, "building chart");
        Ok(eda::build_chart(resolved.table(), request, &self.config.charts)?)
    }

    pub fn default_charts(&self, table: &TableRef) -> Result<Vec<ChartData>> {
        let resolved = self.resolve(table)?;
        Ok(eda::default_charts(resolved.table(), &self.config.charts))
    }

    pub fn insights(&self, table: &TableRef) -> Result<Vec<String>> {
        let resolved = self.resolve(table)?;
        Ok(eda::insights(resolved.table()))
    }

    // ─── Models ─────────────────────────────────────────────────────────

    /// Train on a snapshot of the dataset. Only a successful run is registered.
    pub fn train(&self, request: &TrainingRequest) -> Result<TrainOutcome> {
        let dataset = self.datasets.get(&request.dataset_id)?;
        let record = self.trainer.train(&dataset.table, request)?;
        let outcome = TrainOutcome {
            model_id: record.model_id.clone(),
            metrics: record.metrics.clone(),
            feature_importance: record.feature_importance.clone(),
        };
        self.models.put(record);
        Ok(outcome)
    }

    /// Predict inline records with a registered model.
    pub fn predict(&self, model_id: &ModelId, records: &Value) -> Result<PredictOutcome> {
        let record = self.models.get(model_id)?;
        let artifact = ModelArtifact::from_bytes(&record.artifact)?;
        let table = table_from_json(records)?;
        let predicted = artifact.predict(&table)?;
        debug!(
            model_id = %model_id,
            rows = predicted.len(),
            probabilities = predicted.probabilities.is_some(),
            "predicted"
        );
        Ok(PredictOutcome {
            model_id: record.model_id.clone(),
            predicted,
        })
    }

    pub fn get_model(&self, model_id: &ModelId) -> Result<Arc<ModelRecord>> {
        Ok(self.models.get(model_id)?)
    }

    pub fn download_model(&self, model_id: &ModelId) -> Result<ModelDownload> {
        let record = self.models.get(model_id)?;
        Ok(ModelDownload {
            model_id: record.model_id.clone(),
            encoding: "base64",
            artifact: STANDARD.encode(&record.artifact),
        })
    }

    pub fn list_models(&self, dataset: Option<&DatasetId>) -> Vec<ModelSummary> {
        self.models.list(dataset)
    }
}

impl Default for Workbench {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvalytics_eda::ChartData;
    use canvalytics_pipeline::TaskType;
    use serde_json::json;

    fn csv() -> LoadSource {
        LoadSource::Bytes {
            bytes: b"x,y,g\n1,2.0,a\n2,4.1,b\n3,6.2,a\n4,7.9,b\n5,10.1,a\n6,12.2,b\n7,13.8,a\n8,16.1,b\n"
                .to_vec(),
            file_name: "line.csv".into(),
        }
    }

    #[test]
    fn test_load_uses_file_name() {
        let bench = Workbench::default();
        let summary = bench.load(&csv(), None, Some("s1")).unwrap();
        assert_eq!(summary.name, "line.csv");
        assert_eq!(summary.metadata.row_count, 8);
        assert_eq!(bench.list_datasets().len(), 1);
        assert_eq!(bench.evict_session("s1"), 1);
        assert!(matches!(
            bench.describe(&summary.dataset_id.into()),
            Err(Error::Store(_))
        ));
    }

    #[test]
    fn test_inline_table() {
        let bench = Workbench::default();
        let data = TableRef::Inline(json!([{"v": 1}, {"v": 2}, {"v": null}]));
        let chart = bench
            .chart(&data, &ChartRequest::Histogram { column: "v".into(), bins: Some(2) })
            .unwrap();
        match chart {
            ChartData::Histogram { counts, .. } => assert_eq!(counts.iter().sum::<usize>(), 2),
            other => panic!("unexpected chart {other:?}"),
        }
        assert!(matches!(bench.profile(&data, "nope"), Err(Error::ColumnNotFound(_))));
    }

    #[test]
    fn test_train_predict_download() {
        let bench = Workbench::default();
        let id = bench.load(&csv(), None, None).unwrap().dataset_id;
        let request = TrainingRequest::new(id.clone(), "y", "LinearRegression", TaskType::Regression)
            .with_features(&["x"]);
        let outcome = bench.train(&request).unwrap();
        assert_eq!(bench.list_models(Some(&id)).len(), 1);

        let result = bench.predict(&outcome.model_id, &json!([{"x": 10}])).unwrap();
        assert_eq!(result.model_id, outcome.model_id);
        let y = result.predicted.predictions[0].as_f64().unwrap();
        approx::assert_abs_diff_eq!(y, 20.0, epsilon = 1.5);
        assert!(result.predicted.probabilities.is_none());

        let download = bench.download_model(&outcome.model_id).unwrap();
        let bytes = STANDARD.decode(download.artifact).unwrap();
        assert!(ModelArtifact::from_bytes(&bytes).is_ok());
    }

    #[test]
    fn test_failed_training_is_not_registered() {
        let bench = Workbench::default();
        let id = bench.load(&csv(), None, None).unwrap().dataset_id;
        let request = TrainingRequest::new(id, "missing", "Ridge", TaskType::Regression);
        assert!(matches!(bench.train(&request), Err(Error::Train(_))));
        assert!(bench.list_models(None).is_empty());
    }
}
