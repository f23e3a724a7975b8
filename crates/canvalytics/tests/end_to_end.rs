use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use canvalytics::core::{DType, DatasetId, ModelId};
use canvalytics::eda::{ChartData, ChartRequest};
use canvalytics::io::LoadSource;
use canvalytics::pipeline::{Metrics, ModelArtifact, TaskType, TrainingRequest};
use canvalytics::preprocessing::train_test_split;
use canvalytics::{Error, ErrorCode, TableRef, Workbench};

const TITANIC: &str = "\
Id,Pclass,Sex,Age,Survived
1,3,male,22,0
2,1,female,38,1
3,3,female,26,1
4,1,female,35,1
5,3,male,35,0
6,3,male,,0
7,1,male,54,0
8,3,male,2,0
9,3,female,27,1
10,2,female,,1
";

fn csv(text: &str, file_name: &str) -> LoadSource {
    LoadSource::Bytes {
        bytes: text.as_bytes().to_vec(),
        file_name: file_name.to_string(),
    }
}

fn load_titanic(bench: &Workbench) -> DatasetId {
    bench.load(&csv(TITANIC, "titanic.csv"), None, None).unwrap().dataset_id
}

#[test]
fn test_load_reports_shape_and_types() {
    let bench = Workbench::default();
    let summary = bench
        .load(&csv("a,b,c\n1,1.5,a\n2,2,b\n3,,c\n", "types.csv"), Some("types"), None)
        .unwrap();
    assert_eq!(summary.name, "types");
    assert_eq!(summary.metadata.row_count, 3);
    assert_eq!(summary.metadata.column_count, 3);
    assert_eq!(summary.metadata.missing_total, 1);
    let dtypes: Vec<DType> = summary.metadata.columns.iter().map(|c| c.dtype).collect();
    assert_eq!(dtypes, vec![DType::Integer, DType::Float, DType::Categorical]);
}

#[test]
fn test_titanic_scenario() {
    let bench = Workbench::default();
    let id = load_titanic(&bench);

    let stats = bench.describe(&TableRef::Dataset(id.clone())).unwrap();
    assert_eq!(stats.basic.rows, 10);
    assert_eq!(stats.column("Age").unwrap().missing_count, 2);
    for column in &stats.columns {
        assert_eq!(column.missing_count + column.non_missing_count, 10);
    }

    let request = TrainingRequest::new(id.clone(), "Survived", "RandomForest", TaskType::Classification);
    let outcome = bench.train(&request).unwrap();
    let Metrics::Classification(metrics) = &outcome.metrics else {
        panic!("expected classification metrics");
    };
    assert!((0.0..=1.0).contains(&metrics.accuracy));

    let record = bench.get_model(&outcome.model_id).unwrap();
    assert!(!outcome.feature_importance.is_empty());
    for (name, _) in &outcome.feature_importance {
        assert!(record.feature_names.contains(name), "{name} is not a model feature");
    }
    assert!(record.feature_names.contains(&"Sex_female".to_string()));
    assert_eq!(record.train_rows + record.test_rows, 10);

    let listed = bench.list_models(Some(&id));
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].model_id, outcome.model_id);
}

#[test]
fn test_unknown_ids_are_not_found() {
    let bench = Workbench::default();
    let never = DatasetId::from("never-issued");

    let err = bench.describe(&TableRef::Dataset(never.clone())).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    let err = bench.profile(&TableRef::Dataset(never.clone()), "Age").unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    let request = TrainingRequest::new(never, "Survived", "RandomForest", TaskType::Classification);
    let err = bench.train(&request).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    let err = bench.get_model(&ModelId::from("never-issued")).unwrap_err();
    assert!(matches!(err, Error::Registry(_)));
    assert_eq!(err.http_status(), 404);
    assert!(bench.list_models(None).is_empty());
}

#[test]
fn test_training_is_deterministic() {
    let bench = Workbench::default();
    let id = load_titanic(&bench);
    let request = TrainingRequest::new(id, "Survived", "random_forest", TaskType::Classification)
        .with_param("n_estimators", 25);
    let a = bench.train(&request).unwrap();
    let b = bench.train(&request).unwrap();
    assert_ne!(a.model_id, b.model_id);
    assert_eq!(a.metrics, b.metrics);
    assert_eq!(a.feature_importance, b.feature_importance);
}

#[test]
fn test_held_out_rows_do_not_reach_preprocessing() {
    let rows: Vec<String> = (0..20)
        .map(|i| format!("{},{},{}", i, if i % 2 == 0 { "a" } else { "b" }, 3 * i + 1))
        .collect();
    let base = format!("x,g,y\n{}\n", rows.join("\n"));

    let bench = Workbench::default();
    let split = train_test_split(20, 0.2, 42).unwrap();
    let perturbed: Vec<String> = (0..20)
        .map(|i| {
            let x = if split.test.contains(&i) { 1_000_000 } else { i };
            format!("{},{},{}", x, if i % 2 == 0 { "a" } else { "b" }, 3 * i + 1)
        })
        .collect();
    let perturbed = format!("x,g,y\n{}\n", perturbed.join("\n"));

    let mut preprocessors = Vec::new();
    for text in [base, perturbed] {
        let id = bench.load(&csv(&text, "lin.csv"), None, None).unwrap().dataset_id;
        let request = TrainingRequest::new(id, "y", "Ridge", TaskType::Regression);
        let outcome = bench.train(&request).unwrap();
        let download = bench.download_model(&outcome.model_id).unwrap();
        assert_eq!(download.encoding, "base64");
        let bytes = STANDARD.decode(download.artifact).unwrap();
        preprocessors.push(ModelArtifact::from_bytes(&bytes).unwrap().preprocessor);
    }
    assert_eq!(preprocessors[0], preprocessors[1]);
}

#[test]
fn test_histogram_conserves_values() {
    let bench = Workbench::default();
    let id = load_titanic(&bench);
    for bins in [1, 3, 7, 50] {
        let chart = bench
            .chart(
                &TableRef::Dataset(id.clone()),
                &ChartRequest::Histogram { column: "Age".into(), bins: Some(bins) },
            )
            .unwrap();
        let ChartData::Histogram { counts, edges, .. } = chart else {
            panic!("expected a histogram");
        };
        assert_eq!(counts.len(), bins);
        assert_eq!(edges.len(), bins + 1);
        assert_eq!(counts.iter().sum::<usize>(), 8);
    }
}

#[test]
fn test_predict_with_registered_model() {
    let bench = Workbench::default();
    let id = load_titanic(&bench);
    let request = TrainingRequest::new(id, "Survived", "LogisticRegression", TaskType::Classification)
        .with_features(&["Pclass", "Sex", "Age"]);
    let outcome = bench.train(&request).unwrap();

    let records = serde_json::json!([
        {"Pclass": 1, "Sex": "female", "Age": 30},
        {"Pclass": 3, "Sex": "male", "Age": null},
        {"Pclass": 2, "Sex": "unseen", "Age": 40}
    ]);
    let predicted = bench.predict(&outcome.model_id, &records).unwrap().predicted;
    assert_eq!(predicted.len(), 3);
    for p in &predicted.predictions {
        let v = p.as_i64().unwrap();
        assert!(v == 0 || v == 1);
    }
    assert_eq!(predicted.classes, Some(vec![serde_json::json!(0), serde_json::json!(1)]));
    let probabilities = predicted.probabilities.unwrap();
    assert_eq!(probabilities.len(), 3);
    for row in &probabilities {
        assert_eq!(row.len(), 2);
        approx::assert_abs_diff_eq!(row.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }

    let err = bench
        .predict(&outcome.model_id, &serde_json::json!([{"Pclass": 1}]))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::FeatureNotFound);
}
