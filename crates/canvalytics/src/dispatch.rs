use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use canvalytics_core::{Column, DType, DatasetId, ModelId};
use canvalytics_eda::ChartRequest;
use canvalytics_io::{LoadError, LoadSource};
use canvalytics_pipeline::{TaskType, TrainingRequest};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{Error, ErrorCode, Result};
use crate::intent::{classify, IntentKind};
use crate::workbench::{TableRef, Workbench};

/// Algorithm used when a question asks for a model without naming one.
const ASK_ALGORITHM: &str = "RandomForest";

/// Where a `load` request reads its data from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceArgs {
    /// File contents, base64 encoded.
    Upload { file_name: String, content_base64: String },
    /// File contents as plain text.
    Text { file_name: String, content: String },
    Url { url: String },
    Records { data: Value },
    /// A bundled sample dataset such as `titanic`.
    Sample { name: String },
}

impl SourceArgs {
    fn into_source(self) -> Result<LoadSource> {
        Ok(match self {
            SourceArgs::Upload { file_name, content_base64 } => {
                let bytes = STANDARD.decode(content_base64.as_bytes()).map_err(|e| {
                    LoadError::ParseError(format!("content_base64 is not valid base64: {e}"))
                })?;
                LoadSource::Bytes { bytes, file_name }
            }
            SourceArgs::Text { file_name, content } => LoadSource::Bytes {
                bytes: content.into_bytes(),
                file_name,
            },
            SourceArgs::Url { url } => LoadSource::Url(url),
            SourceArgs::Records { data } => LoadSource::Records(data),
            SourceArgs::Sample { name } => LoadSource::Sample(name),
        })
    }
}

/// One inbound request, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    Load {
        source: SourceArgs,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        session: Option<String>,
    },
    Describe {
        #[serde(flatten)]
        table: TableRef,
    },
    Profile {
        #[serde(flatten)]
        table: TableRef,
        column: String,
    },
    Missing {
        #[serde(flatten)]
        table: TableRef,
    },
    Chart {
        #[serde(flatten)]
        table: TableRef,
        chart: ChartRequest,
    },
    DefaultCharts {
        #[serde(flatten)]
        table: TableRef,
    },
    Insights {
        #[serde(flatten)]
        table: TableRef,
    },
    Train(TrainingRequest),
    Predict {
        model_id: ModelId,
        records: Value,
    },
    GetModel {
        model_id: ModelId,
    },
    DownloadModel {
        model_id: ModelId,
    },
    ListModels {
        #[serde(default)]
        dataset_id: Option<DatasetId>,
    },
    ListDatasets,
    Evict {
        dataset_id: DatasetId,
    },
    EvictSession {
        session: String,
    },
    /// Free-text question routed through the intent classifier.
    Ask {
        question: String,
        dataset_id: DatasetId,
        /// Target for a model question; otherwise the column the question mentions.
        #[serde(default)]
        target: Option<String>,
    },
}

/// Success carries the operation's payload; failure carries a stable code.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Success {
        data: Value,
    },
    Error {
        code: ErrorCode,
        http_status: u16,
        message: String,
    },
}

impl Response {
    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success { .. })
    }
}

impl From<&Error> for Response {
    fn from(error: &Error) -> Self {
        Response::Error {
            code: error.code(),
            http_status: error.http_status(),
            message: error.to_string(),
        }
    }
}

fn to_data<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::Internal(e.to_string()))
}

/// Classification unless the target looks continuous.
fn infer_task(target: &Column, category_threshold: usize) -> TaskType {
    match target.dtype() {
        DType::Float => TaskType::Regression,
        DType::Integer if target.unique_count() > category_threshold => TaskType::Regression,
        _ => TaskType::Classification,
    }
}

/// Routes requests to the workbench and shapes every outcome as a `Response`.
pub struct Dispatcher {
    workbench: Workbench,
}

impl Dispatcher {
    pub fn new(workbench: Workbench) -> Self {
        Dispatcher { workbench }
    }

    pub fn workbench(&self) -> &Workbench {
        &self.workbench
    }

    pub fn handle(&self, request: Request) -> Response {
        match self.execute(request) {
            Ok(data) => Response::Success { data },
            Err(error) => {
                warn!(code = ?error.code(), %error, "request failed");
                Response::from(&error)
            }
        }
    }

    /// Parse one JSON request and handle it. Malformed input is an `INVALID_REQUEST`.
    pub fn handle_json(&self, text: &str) -> Response {
        match serde_json::from_str::<Request>(text) {
            Ok(request) => self.handle(request),
            Err(e) => Response::from(&Error::InvalidRequest(e.to_string())),
        }
    }

    fn execute(&self, request: Request) -> Result<Value> {
        let bench = &self.workbench;
        match request {
            Request::Load { source, name, session } => {
                let source = source.into_source()?;
                to_data(&bench.load(&source, name.as_deref(), session.as_deref())?)
            }
            Request::Describe { table } => to_data(&bench.describe(&table)?),
            Request::Profile { table, column } => {
                let profile = bench.profile(&table, &column)?;
                Ok(json!({ "column": column, "profile": to_data(&profile)? }))
            }
            Request::Missing { table } => to_data(&bench.missing(&table)?),
            Request::Chart { table, chart } => to_data(&bench.chart(&table, &chart)?),
            Request::DefaultCharts { table } => to_data(&bench.default_charts(&table)?),
            Request::Insights { table } => to_data(&bench.insights(&table)?),
            Request::Train(request) => to_data(&bench.train(&request)?),
            Request::Predict { model_id, records } => to_data(&bench.predict(&model_id, &records)?),
            Request::GetModel { model_id } => to_data(bench.get_model(&model_id)?.as_ref()),
            Request::DownloadModel { model_id } => to_data(&bench.download_model(&model_id)?),
            Request::ListModels { dataset_id } => to_data(&bench.list_models(dataset_id.as_ref())),
            Request::ListDatasets => to_data(&bench.list_datasets()),
            Request::Evict { dataset_id } => {
                let evicted = bench.evict(&dataset_id);
                Ok(json!({ "dataset_id": dataset_id, "evicted": evicted }))
            }
            Request::EvictSession { session } => {
                let evicted = bench.evict_session(&session);
                Ok(json!({ "session": session, "evicted": evicted }))
            }
            Request::Ask { question, dataset_id, target } => self.ask(&question, dataset_id, target),
        }
    }

    fn ask(&self, question: &str, dataset_id: DatasetId, target: Option<String>) -> Result<Value> {
        let bench = &self.workbench;
        let dataset = bench.dataset(&dataset_id)?;
        let intent = classify(question, &dataset.table.column_names());
        debug!(?intent, "question classified");
        let table = TableRef::Dataset(dataset_id.clone());

        let result = match intent.kind {
            // unrecognised questions get the dataset description
            IntentKind::Describe | IntentKind::Unknown => to_data(&bench.describe(&table)?)?,
            IntentKind::Missing => to_data(&bench.missing(&table)?)?,
            IntentKind::Hist => {
                let column = intent
                    .column
                    .clone()
                    .or_else(|| {
                        dataset
                            .table
                            .numeric_columns()
                            .first()
                            .map(|c| c.name().to_string())
                    })
                    .ok_or_else(|| {
                        Error::InvalidRequest("no numeric column to plot".to_string())
                    })?;
                let chart = ChartRequest::Histogram { column, bins: None };
                to_data(&bench.chart(&table, &chart)?)?
            }
            IntentKind::Model => {
                let target = target.or_else(|| intent.column.clone()).ok_or_else(|| {
                    Error::InvalidRequest("name a target column to train a model".to_string())
                })?;
                let column = dataset
                    .table
                    .column(&target)
                    .ok_or_else(|| Error::ColumnNotFound(target.clone()))?;
                let task = infer_task(column, bench.config().profile.category_threshold);
                let request = TrainingRequest::new(dataset_id, target, ASK_ALGORITHM, task);
                to_data(&bench.train(&request)?)?
            }
        };
        Ok(json!({ "intent": intent, "result": result }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "n,score,group\n1,0.5,a\n2,1.5,b\n3,,a\n4,3.5,b\n";

    fn dispatcher_with_data() -> (Dispatcher, String) {
        let dispatcher = Dispatcher::new(Workbench::default());
        let response = dispatcher.handle_json(
            &json!({
                "action": "load",
                "source": {"type": "text", "file_name": "d.csv", "content": CSV}
            })
            .to_string(),
        );
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "success");
        let id = value["data"]["dataset_id"].as_str().unwrap().to_string();
        (dispatcher, id)
    }

    #[test]
    fn test_success_envelope() {
        let (dispatcher, id) = dispatcher_with_data();
        let response =
            dispatcher.handle_json(&json!({"action": "describe", "dataset_id": id}).to_string());
        assert!(response.is_success());
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["data"]["basic"]["rows"], 4);
        assert_eq!(value["data"]["columns"]["score"]["missing_count"], 1);
    }

    #[test]
    fn test_error_envelope() {
        let dispatcher = Dispatcher::new(Workbench::default());
        let value = serde_json::to_value(
            dispatcher.handle_json(&json!({"action": "describe", "dataset_id": "nope"}).to_string()),
        )
        .unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["code"], "NOT_FOUND");
        assert_eq!(value["http_status"], 404);
        assert!(value.get("data").is_none());

        let value = serde_json::to_value(dispatcher.handle_json("{\"action\": \"fly\"}")).unwrap();
        assert_eq!(value["code"], "INVALID_REQUEST");

        // both table references at once
        let value = serde_json::to_value(dispatcher.handle_json(
            &json!({"action": "missing", "dataset_id": "x", "data": []}).to_string(),
        ))
        .unwrap();
        assert_eq!(value["code"], "INVALID_REQUEST");
    }

    #[test]
    fn test_chart_on_inline_data() {
        let dispatcher = Dispatcher::new(Workbench::default());
        let response = dispatcher.handle_json(
            &json!({
                "action": "chart",
                "data": {"columns": ["k"], "data": [["x"], ["y"], ["x"]]},
                "chart": {"kind": "value_counts", "column": "k"}
            })
            .to_string(),
        );
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value["data"]["labels"], json!(["x", "y"]));
        assert_eq!(value["data"]["counts"], json!([2, 1]));

        let response = dispatcher.handle_json(
            &json!({
                "action": "chart",
                "data": [{"k": "x"}],
                "chart": {"kind": "histogram", "column": "k"}
            })
            .to_string(),
        );
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value["code"], "NOT_NUMERIC");
    }

    #[test]
    fn test_ask_routes_by_intent() {
        let (dispatcher, id) = dispatcher_with_data();
        let ask = |q: &str| {
            serde_json::to_value(dispatcher.handle(Request::Ask {
                question: q.to_string(),
                dataset_id: DatasetId::from(id.as_str()),
                target: None,
            }))
            .unwrap()
        };

        let value = ask("which values are missing?");
        assert_eq!(value["data"]["intent"]["kind"], "missing");
        assert_eq!(value["data"]["result"]["missing_total"], 1);

        let value = ask("plot the score distribution");
        assert_eq!(value["data"]["intent"]["column"], "score");
        assert_eq!(value["data"]["result"]["column"], "score");

        let value = ask("hello");
        assert_eq!(value["data"]["intent"]["kind"], "unknown");
        assert_eq!(value["data"]["result"]["basic"]["columns"], 3);

        let value = ask("train a model");
        assert_eq!(value["code"], "INVALID_REQUEST");
    }

    #[test]
    fn test_predict_reports_class_probabilities() {
        let dispatcher = Dispatcher::new(Workbench::default());
        let csv: String = std::iter::once("n,size".to_string())
            .chain((1..=12).map(|i| format!("{i},{}", if i <= 6 { "small" } else { "large" })))
            .collect::<Vec<_>>()
            .join("\n");
        let call = |request: Value| serde_json::to_value(dispatcher.handle_json(&request.to_string())).unwrap();

        let loaded = call(json!({
            "action": "load",
            "source": {"type": "text", "file_name": "sizes.csv", "content": csv}
        }));
        let trained = call(json!({
            "action": "train",
            "dataset_id": loaded["data"]["dataset_id"],
            "target_column": "size",
            "algorithm": "DecisionTree",
            "task_type": "classification"
        }));
        assert_eq!(trained["status"], "success");

        let value = call(json!({
            "action": "predict",
            "model_id": trained["data"]["model_id"],
            "records": [{"n": 2}, {"n": 11}]
        }));
        let data = &value["data"];
        assert_eq!(data["model_id"], trained["data"]["model_id"]);
        assert_eq!(data["predictions"], json!(["small", "large"]));
        assert_eq!(data["classes"], json!(["large", "small"]));
        let rows = data["probabilities"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        for row in rows {
            let sum: f64 = row.as_array().unwrap().iter().filter_map(Value::as_f64).sum();
            approx::assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_load_sample_dataset() {
        let dispatcher = Dispatcher::new(Workbench::default());
        let value = serde_json::to_value(dispatcher.handle_json(
            &json!({"action": "load", "source": {"type": "sample", "name": "titanic"}}).to_string(),
        ))
        .unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["data"]["name"], "titanic");
        assert_eq!(value["data"]["row_count"], 891);

        let value = serde_json::to_value(dispatcher.handle_json(
            &json!({"action": "load", "source": {"type": "sample", "name": "iris"}}).to_string(),
        ))
        .unwrap();
        assert_eq!(value["status"], "error");
    }

    #[test]
    fn test_evict_is_idempotent() {
        let (dispatcher, id) = dispatcher_with_data();
        let evict = || {
            serde_json::to_value(dispatcher.handle(Request::Evict {
                dataset_id: DatasetId::from(id.as_str()),
            }))
            .unwrap()
        };
        assert_eq!(evict()["data"]["evicted"], true);
        assert_eq!(evict()["data"]["evicted"], false);
    }
}
