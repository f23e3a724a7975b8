use std::collections::HashSet;

use canvalytics_core::{Column, Estimator, ModelId, Table};
use canvalytics_preprocessing::{
    k_fold, stratified_k_fold, stratified_split, train_test_split, FittedPreprocessor,
    LabelEncoder, SplitIndices, TabularPreprocessor,
};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::algorithms::{AlgorithmRegistry, ModelKind};
use crate::artifact::ModelArtifact;
use crate::config::TrainingConfig;
use crate::error::{TrainError, TrainResult, TrainingFailure};
use crate::evaluate::{classification_metrics, regression_metrics, Metrics};
use crate::record::ModelRecord;
use crate::request::{TaskType, TrainingRequest};

/// Encoded target values for the rows that have one.
enum Target {
    Classes { labels: Vec<usize>, encoder: LabelEncoder },
    Values(Vec<f64>),
}

impl Target {
    fn as_f64(&self, positions: &[usize]) -> Vec<f64> {
        match self {
            Target::Classes { labels, .. } => positions.iter().map(|&p| labels[p] as f64).collect(),
            Target::Values(v) => positions.iter().map(|&p| v[p]).collect(),
        }
    }

    fn split(&self, n: usize, test_fraction: f64, seed: u64) -> Result<SplitIndices, TrainingFailure> {
        Ok(match self {
            Target::Classes { labels, .. } => stratified_split(labels, test_fraction, seed)?,
            Target::Values(_) => train_test_split(n, test_fraction, seed)?,
        })
    }

    /// Cross-validation folds over `positions`, or `None` if they cannot all be populated.
    fn folds(&self, positions: &[usize], k: usize, seed: u64) -> Option<Vec<SplitIndices>> {
        let folds = match self {
            Target::Classes { labels, .. } => {
                let sub: Vec<usize> = positions.iter().map(|&p| labels[p]).collect();
                stratified_k_fold(&sub, k, seed)
            }
            Target::Values(_) => k_fold(positions.len(), k, seed),
        };
        folds.map_err(|e| debug!(error = %e, "cross-validation skipped")).ok()
    }

    /// Score predictions: accuracy for classes, R² for values.
    fn score(&self, truth: &[f64], predicted: &[f64]) -> f64 {
        match self {
            Target::Classes { .. } => {
                let (t, p) = (as_classes(truth), as_classes(predicted));
                canvalytics_metrics::accuracy(&t, &p)
            }
            Target::Values(_) => canvalytics_metrics::r2_score(truth, predicted),
        }
    }
}

fn as_classes(values: &[f64]) -> Vec<usize> {
    values.iter().map(|&v| v as usize).collect()
}

fn pick(rows: &[usize], positions: &[usize]) -> Vec<usize> {
    positions.iter().map(|&p| rows[p]).collect()
}

/// Fit preprocessing and model on `train` table rows; return them with predictions for `test`.
fn fit_and_predict(
    table: &Table,
    features: &[String],
    preprocessor: &TabularPreprocessor,
    mut model: ModelKind,
    train: (&[usize], &[f64]),
    test: &[usize],
) -> Result<(FittedPreprocessor, ModelKind, Vec<f64>), TrainingFailure> {
    let fitted = preprocessor.fit(table, features, train.0)?;
    let x_train = fitted.transform(table, train.0)?;
    model.fit(&x_train, train.1)?;
    let x_test = fitted.transform(table, test)?;
    let predicted = model.predict(&x_test)?;
    Ok((fitted, model, predicted))
}

/// Trains models from requests against an algorithm registry.
pub struct Trainer {
    algorithms: AlgorithmRegistry,
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Trainer {
            algorithms: AlgorithmRegistry::default(),
            config,
        }
    }

    pub fn with_algorithms(mut self, algorithms: AlgorithmRegistry) -> Self {
        self.algorithms = algorithms;
        self
    }

    pub fn algorithms(&self) -> &AlgorithmRegistry {
        &self.algorithms
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Validate the request against the table schema and resolve the feature list.
    fn validate<'t>(&self, table: &'t Table, request: &TrainingRequest) -> TrainResult<(&'t Column, Vec<String>)> {
        let target = table
            .column(&request.target_column)
            .ok_or_else(|| TrainError::TargetNotFound(request.target_column.clone()))?;

        let features: Vec<String> = match &request.feature_columns {
            Some(explicit) => {
                let mut seen = HashSet::new();
                for f in explicit {
                    if table.column(f).is_none() {
                        return Err(TrainError::FeatureNotFound(f.clone()));
                    }
                    if *f == request.target_column {
                        return Err(TrainError::InvalidRequest(format!(
                            "target column '{f}' cannot also be a feature"
                        )));
                    }
                    if !seen.insert(f.as_str()) {
                        return Err(TrainError::InvalidRequest(format!("feature '{f}' is listed twice")));
                    }
                }
                explicit.clone()
            }
            None => table
                .column_names()
                .into_iter()
                .filter(|c| *c != request.target_column)
                .map(String::from)
                .collect(),
        };
        if features.is_empty() {
            return Err(TrainError::InvalidRequest("no feature columns to train on".into()));
        }
        if request.task_type == TaskType::Regression && !target.dtype().is_numeric() {
            return Err(TrainError::InvalidRequest(format!(
                "regression target '{}' must be numeric, found {}",
                request.target_column,
                target.dtype()
            )));
        }
        Ok((target, features))
    }

    fn encode_target(task: TaskType, target: &Column) -> Result<(Vec<usize>, Target), TrainingFailure> {
        match task {
            TaskType::Classification => {
                let rows: Vec<usize> = (0..target.len()).filter(|&r| !target.is_missing(r)).collect();
                let mut encoder = LabelEncoder::new();
                encoder.fit(target, &rows);
                let labels = encoder.transform(target, &rows)?;
                Ok((rows, Target::Classes { labels, encoder }))
            }
            TaskType::Regression => {
                let (rows, values) = (0..target.len())
                    .filter_map(|r| target.f64_at(r).map(|v| (r, v)))
                    .unzip();
                Ok((rows, Target::Values(values)))
            }
        }
    }

    /// Run the full pipeline and produce a model record. Nothing is registered here.
    pub fn train(&self, table: &Table, request: &TrainingRequest) -> TrainResult<ModelRecord> {
        let (target, features) = self.validate(table, request)?;
        let (algorithm, model) = self.algorithms.build(
            request.task_type,
            &request.algorithm,
            &request.hyperparameters,
            self.config.seed,
        )?;
        info!(
            dataset_id = %request.dataset_id,
            target = %request.target_column,
            algorithm = %algorithm,
            features = features.len(),
            "training started"
        );
        let record = self
            .run(table, request, target, &features, algorithm, model)
            .map_err(TrainError::failed)?;
        info!(
            model_id = %record.model_id,
            score = record.metrics.primary(),
            train_rows = record.train_rows,
            test_rows = record.test_rows,
            "training finished"
        );
        Ok(record)
    }

    fn run(
        &self,
        table: &Table,
        request: &TrainingRequest,
        target: &Column,
        features: &[String],
        algorithm: String,
        model: ModelKind,
    ) -> Result<ModelRecord, TrainingFailure> {
        let cfg = &self.config;
        let (rows, encoded) = Self::encode_target(request.task_type, target)?;
        let rows_dropped = table.n_rows() - rows.len();
        if rows_dropped > 0 {
            warn!(rows_dropped, "rows with a missing target were dropped");
        }

        let split = encoded.split(rows.len(), cfg.test_fraction, cfg.seed)?;
        let train_rows = pick(&rows, &split.train);
        let test_rows = pick(&rows, &split.test);
        let y_train = encoded.as_f64(&split.train);
        let y_test = encoded.as_f64(&split.test);

        let preprocessor = TabularPreprocessor::new(cfg.max_cardinality, cfg.placeholder.clone());
        let cv_scores = self.cross_validate(table, features, &preprocessor, &model, &rows, &split.train, &encoded)?;
        let (fitted, model, predicted) = fit_and_predict(
            table,
            features,
            &preprocessor,
            model,
            (&train_rows, &y_train),
            &test_rows,
        )?;

        let (metrics, labels) = match encoded {
            Target::Classes { encoder, .. } => {
                let m = classification_metrics(
                    &as_classes(&y_test),
                    &as_classes(&predicted),
                    &encoder.classes,
                    cv_scores,
                );
                (Metrics::Classification(m), Some(encoder))
            }
            Target::Values(_) => (
                Metrics::Regression(regression_metrics(&y_test, &predicted, cv_scores)),
                None,
            ),
        };

        let feature_names = fitted.feature_names().to_vec();
        let feature_importance = rank_importances(&model, &feature_names, cfg.top_n_importances);
        let dropped_features = fitted.dropped().to_vec();
        let artifact = ModelArtifact {
            task_type: request.task_type,
            target_column: request.target_column.clone(),
            preprocessor: fitted,
            model,
            labels,
        }
        .to_bytes()?;

        Ok(ModelRecord {
            model_id: ModelId::generate(),
            dataset_id: request.dataset_id.clone(),
            request: request.clone(),
            algorithm,
            metrics,
            feature_importance,
            feature_names,
            dropped_features,
            train_rows: train_rows.len(),
            test_rows: test_rows.len(),
            rows_dropped,
            artifact,
            created_at: Utc::now(),
        })
    }

    /// K-fold scores on the training split only, refitting preprocessing per fold.
    #[allow(clippy::too_many_arguments)]
    fn cross_validate(
        &self,
        table: &Table,
        features: &[String],
        preprocessor: &TabularPreprocessor,
        template: &ModelKind,
        rows: &[usize],
        train_positions: &[usize],
        encoded: &Target,
    ) -> Result<Option<Vec<f64>>, TrainingFailure> {
        let k = self.config.cv_folds;
        if k < 2 {
            return Ok(None);
        }
        let Some(folds) = encoded.folds(train_positions, k, self.config.seed) else {
            return Ok(None);
        };
        let mut scores = Vec::with_capacity(folds.len());
        for fold in folds {
            // fold indices point into `train_positions`
            let fit_pos = pick(train_positions, &fold.train);
            let eval_pos = pick(train_positions, &fold.test);
            let y_fit = encoded.as_f64(&fit_pos);
            let y_eval = encoded.as_f64(&eval_pos);
            let (_, _, predicted) = fit_and_predict(
                table,
                features,
                preprocessor,
                template.clone(),
                (&pick(rows, &fit_pos), &y_fit),
                &pick(rows, &eval_pos),
            )?;
            scores.push(encoded.score(&y_eval, &predicted));
        }
        Ok(Some(scores))
    }
}

impl Default for Trainer {
    fn default() -> Self {
        Trainer::new(TrainingConfig::default())
    }
}

/// Top `n` features by descending importance; ties keep feature order.
fn rank_importances(model: &ModelKind, names: &[String], n: usize) -> Vec<(String, f64)> {
    let Some(scores) = model.feature_importances() else {
        return Vec::new();
    };
    let mut ranked: Vec<(String, f64)> = names.iter().cloned().zip(scores).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(n);
    ranked
}
