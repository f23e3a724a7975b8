use std::collections::{BTreeMap, BTreeSet};

use canvalytics_core::{Estimator, Matrix, ModelError};
use canvalytics_linear::{LinearRegression, LogisticRegression, Ridge};
use canvalytics_tree::{
    DecisionTreeClassifier, DecisionTreeRegressor, MaxFeatures, RandomForestClassifier,
    RandomForestRegressor, TreeParams,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{TrainError, TrainResult};
use crate::request::TaskType;

// ─── Fitted model state ─────────────────────────────────────────────────────

/// Every estimator the pipeline can train, in serializable form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "estimator", content = "state", rename_all = "snake_case")]
pub enum ModelKind {
    RandomForestClassifier(RandomForestClassifier),
    RandomForestRegressor(RandomForestRegressor),
    DecisionTreeClassifier(DecisionTreeClassifier),
    DecisionTreeRegressor(DecisionTreeRegressor),
    LogisticRegression(LogisticRegression),
    LinearRegression(LinearRegression),
    Ridge(Ridge),
}

impl ModelKind {
    fn estimator(&self) -> &dyn Estimator {
        match self {
            ModelKind::RandomForestClassifier(m) => m,
            ModelKind::RandomForestRegressor(m) => m,
            ModelKind::DecisionTreeClassifier(m) => m,
            ModelKind::DecisionTreeRegressor(m) => m,
            ModelKind::LogisticRegression(m) => m,
            ModelKind::LinearRegression(m) => m,
            ModelKind::Ridge(m) => m,
        }
    }

    fn estimator_mut(&mut self) -> &mut dyn Estimator {
        match self {
            ModelKind::RandomForestClassifier(m) => m,
            ModelKind::RandomForestRegressor(m) => m,
            ModelKind::DecisionTreeClassifier(m) => m,
            ModelKind::DecisionTreeRegressor(m) => m,
            ModelKind::LogisticRegression(m) => m,
            ModelKind::LinearRegression(m) => m,
            ModelKind::Ridge(m) => m,
        }
    }
}

impl Estimator for ModelKind {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<(), ModelError> {
        self.estimator_mut().fit(x, y)
    }

    fn predict(&self, x: &Matrix) -> Result<Vec<f64>, ModelError> {
        self.estimator().predict(x)
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.estimator().feature_importances()
    }

    fn class_probabilities(&self, x: &Matrix) -> Result<Option<Vec<Vec<f64>>>, ModelError> {
        self.estimator().class_probabilities(x)
    }
}

// ─── Hyperparameters ────────────────────────────────────────────────────────

/// Typed view over a request's hyperparameters for one algorithm.
struct Hyperparameters<'a> {
    algorithm: &'static str,
    values: &'a BTreeMap<String, Value>,
}

impl<'a> Hyperparameters<'a> {
    /// Reject keys the algorithm does not understand.
    fn new(
        algorithm: &'static str,
        values: &'a BTreeMap<String, Value>,
        accepted: &[&str],
    ) -> TrainResult<Self> {
        if let Some(unknown) = values.keys().find(|k| !accepted.contains(&k.as_str())) {
            return Err(TrainError::InvalidRequest(format!(
                "unknown hyperparameter '{unknown}' for {algorithm}"
            )));
        }
        Ok(Hyperparameters { algorithm, values })
    }

    fn invalid(&self, key: &str, expected: &str) -> TrainError {
        TrainError::InvalidRequest(format!(
            "hyperparameter '{key}' for {} must be {expected}",
            self.algorithm
        ))
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    fn count(&self, key: &str, min: usize) -> TrainResult<Option<usize>> {
        let Some(v) = self.get(key) else {
            return Ok(None);
        };
        match v.as_u64() {
            Some(n) if n as usize >= min => Ok(Some(n as usize)),
            _ => Err(self.invalid(key, &format!("an integer >= {min}"))),
        }
    }

    fn number(&self, key: &str, min: f64, inclusive: bool) -> TrainResult<Option<f64>> {
        let Some(v) = self.get(key) else {
            return Ok(None);
        };
        match v.as_f64() {
            Some(x) if x.is_finite() && (x > min || (inclusive && x == min)) => Ok(Some(x)),
            _ => {
                let bound = if inclusive { ">=" } else { ">" };
                Err(self.invalid(key, &format!("a number {bound} {min}")))
            }
        }
    }

    fn flag(&self, key: &str) -> TrainResult<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v.as_bool().map(Some).ok_or_else(|| self.invalid(key, "a boolean")),
        }
    }

    fn max_features(&self) -> TrainResult<Option<MaxFeatures>> {
        let key = "max_features";
        let Some(v) = self.get(key) else {
            return Ok(None);
        };
        let expected = "\"sqrt\", \"log2\", \"all\", a positive integer or a fraction in (0, 1]";
        let parsed = match v {
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "sqrt" | "auto" => Some(MaxFeatures::Sqrt),
                "log2" => Some(MaxFeatures::Log2),
                "all" => Some(MaxFeatures::All),
                _ => None,
            },
            Value::Number(n) => match (n.as_u64(), n.as_f64()) {
                (Some(k), _) if k >= 1 => Some(MaxFeatures::Count(k as usize)),
                (None, Some(f)) if f > 0.0 && f <= 1.0 => Some(MaxFeatures::Fraction(f)),
                _ => None,
            },
            _ => None,
        };
        parsed.map(Some).ok_or_else(|| self.invalid(key, expected))
    }

    fn tree_params(&self, defaults: TreeParams) -> TrainResult<TreeParams> {
        Ok(TreeParams {
            max_depth: self.count("max_depth", 1)?.or(defaults.max_depth),
            min_samples_split: self
                .count("min_samples_split", 2)?
                .unwrap_or(defaults.min_samples_split),
            min_samples_leaf: self
                .count("min_samples_leaf", 1)?
                .unwrap_or(defaults.min_samples_leaf),
            max_features: self.max_features()?.unwrap_or(defaults.max_features),
        })
    }
}

const TREE_KEYS: [&str; 4] = ["max_depth", "min_samples_split", "min_samples_leaf", "max_features"];
const FOREST_KEYS: [&str; 6] = [
    "n_estimators",
    "bootstrap",
    "max_depth",
    "min_samples_split",
    "min_samples_leaf",
    "max_features",
];

// ─── Factories ──────────────────────────────────────────────────────────────

/// Builds an unfitted model from request hyperparameters and the pipeline seed.
pub type ModelFactory = fn(&BTreeMap<String, Value>, u64) -> TrainResult<ModelKind>;

fn random_forest_classifier(values: &BTreeMap<String, Value>, seed: u64) -> TrainResult<ModelKind> {
    let hp = Hyperparameters::new("RandomForest", values, &FOREST_KEYS)?;
    let mut model = RandomForestClassifier::new(hp.count("n_estimators", 1)?.unwrap_or(100));
    model.params = hp.tree_params(model.params.clone())?;
    model.bootstrap = hp.flag("bootstrap")?.unwrap_or(true);
    model.seed = seed;
    Ok(ModelKind::RandomForestClassifier(model))
}

fn random_forest_regressor(values: &BTreeMap<String, Value>, seed: u64) -> TrainResult<ModelKind> {
    let hp = Hyperparameters::new("RandomForest", values, &FOREST_KEYS)?;
    let mut model = RandomForestRegressor::new(hp.count("n_estimators", 1)?.unwrap_or(100));
    model.params = hp.tree_params(model.params.clone())?;
    model.bootstrap = hp.flag("bootstrap")?.unwrap_or(true);
    model.seed = seed;
    Ok(ModelKind::RandomForestRegressor(model))
}

fn decision_tree_classifier(values: &BTreeMap<String, Value>, seed: u64) -> TrainResult<ModelKind> {
    let hp = Hyperparameters::new("DecisionTree", values, &TREE_KEYS)?;
    let mut model = DecisionTreeClassifier::new(hp.tree_params(TreeParams::default())?);
    model.seed = seed;
    Ok(ModelKind::DecisionTreeClassifier(model))
}

fn decision_tree_regressor(values: &BTreeMap<String, Value>, seed: u64) -> TrainResult<ModelKind> {
    let hp = Hyperparameters::new("DecisionTree", values, &TREE_KEYS)?;
    let mut model = DecisionTreeRegressor::new(hp.tree_params(TreeParams::default())?);
    model.seed = seed;
    Ok(ModelKind::DecisionTreeRegressor(model))
}

fn logistic_regression(values: &BTreeMap<String, Value>, _seed: u64) -> TrainResult<ModelKind> {
    let hp = Hyperparameters::new("LogisticRegression", values, &["learning_rate", "max_iter", "l2"])?;
    let mut model = LogisticRegression::new(
        hp.number("learning_rate", 0.0, false)?.unwrap_or(0.1),
        hp.count("max_iter", 1)?.unwrap_or(1000),
    );
    if let Some(l2) = hp.number("l2", 0.0, true)? {
        model = model.with_l2(l2);
    }
    Ok(ModelKind::LogisticRegression(model))
}

fn linear_regression(values: &BTreeMap<String, Value>, _seed: u64) -> TrainResult<ModelKind> {
    let hp = Hyperparameters::new("LinearRegression", values, &["fit_intercept"])?;
    Ok(ModelKind::LinearRegression(LinearRegression::new(
        hp.flag("fit_intercept")?.unwrap_or(true),
    )))
}

fn ridge(values: &BTreeMap<String, Value>, _seed: u64) -> TrainResult<ModelKind> {
    let hp = Hyperparameters::new("Ridge", values, &["alpha", "fit_intercept"])?;
    Ok(ModelKind::Ridge(Ridge::new(
        hp.number("alpha", 0.0, true)?.unwrap_or(1.0),
        hp.flag("fit_intercept")?.unwrap_or(true),
    )))
}

// ─── Registry ───────────────────────────────────────────────────────────────

/// Lookup key: "Random Forest", "random_forest" and "RandomForest" are one name.
fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

struct Registered {
    display_name: String,
    factory: ModelFactory,
}

/// Algorithms available to the pipeline, keyed by task and name.
pub struct AlgorithmRegistry {
    entries: BTreeMap<(TaskType, String), Registered>,
}

impl AlgorithmRegistry {
    pub fn empty() -> Self {
        AlgorithmRegistry {
            entries: BTreeMap::new(),
        }
    }

    /// Register (or replace) an algorithm under `name` for `task`.
    pub fn register(&mut self, task: TaskType, name: &str, factory: ModelFactory) {
        self.entries.insert(
            (task, normalize_name(name)),
            Registered {
                display_name: name.to_string(),
                factory,
            },
        );
    }

    pub fn contains(&self, task: TaskType, name: &str) -> bool {
        self.entries.contains_key(&(task, normalize_name(name)))
    }

    /// Registered names for `task`, sorted.
    pub fn names(&self, task: TaskType) -> Vec<&str> {
        let names: BTreeSet<&str> = self
            .entries
            .iter()
            .filter(|((t, _), _)| *t == task)
            .map(|(_, r)| r.display_name.as_str())
            .collect();
        names.into_iter().collect()
    }

    /// Build an unfitted model, returning it with its registered display name.
    pub fn build(
        &self,
        task: TaskType,
        name: &str,
        hyperparameters: &BTreeMap<String, Value>,
        seed: u64,
    ) -> TrainResult<(String, ModelKind)> {
        let entry = self.entries.get(&(task, normalize_name(name))).ok_or_else(|| {
            TrainError::UnsupportedAlgorithm {
                task,
                algorithm: name.to_string(),
            }
        })?;
        let model = (entry.factory)(hyperparameters, seed)?;
        Ok((entry.display_name.clone(), model))
    }
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        let mut registry = AlgorithmRegistry::empty();
        registry.register(TaskType::Classification, "RandomForest", random_forest_classifier);
        registry.register(TaskType::Classification, "LogisticRegression", logistic_regression);
        registry.register(TaskType::Classification, "DecisionTree", decision_tree_classifier);
        registry.register(TaskType::Regression, "RandomForest", random_forest_regressor);
        registry.register(TaskType::Regression, "LinearRegression", linear_regression);
        registry.register(TaskType::Regression, "Ridge", ridge);
        registry.register(TaskType::Regression, "DecisionTree", decision_tree_regressor);
        registry
    }
}
