use canvalytics_core::{DType, Estimator, ModelError, Table};
use canvalytics_preprocessing::{FittedPreprocessor, LabelEncoder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::algorithms::ModelKind;
use crate::error::ArtifactError;
use crate::request::TaskType;

/// Output of [`ModelArtifact::predict`].
///
/// Classifiers that score classes also report one probability row per input
/// row, ordered like `classes`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predictions {
    pub predictions: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Vec<Vec<f64>>>,
}

impl Predictions {
    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }
}

/// The fitted preprocessing plus model pipeline, self-contained for inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub task_type: TaskType,
    pub target_column: String,
    pub preprocessor: FittedPreprocessor,
    pub model: ModelKind,
    /// Target label encoding; present for classification.
    pub labels: Option<LabelEncoder>,
}

impl ModelArtifact {
    pub fn to_bytes(&self) -> Result<Vec<u8>, ArtifactError> {
        serde_json::to_vec(self).map_err(|e| ArtifactError::Encode(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArtifactError> {
        serde_json::from_slice(bytes).map_err(|e| ArtifactError::Decode(e.to_string()))
    }

    /// Predict every row of `table`, returning target values in their original form.
    ///
    /// Extra columns are ignored. Missing numeric values take the fitted medians
    /// and unseen categories encode as all zeros.
    pub fn predict(&self, table: &Table) -> Result<Predictions, ArtifactError> {
        if let Some(missing) = self
            .preprocessor
            .input_columns()
            .into_iter()
            .find(|c| table.column(c).is_none())
        {
            return Err(ArtifactError::FeatureNotFound(missing.to_string()));
        }
        let rows: Vec<usize> = (0..table.n_rows()).collect();
        let x = self.preprocessor.transform(table, &rows)?;
        let raw = self.model.predict(&x)?;

        let Some(encoder) = &self.labels else {
            return Ok(Predictions {
                predictions: raw.into_iter().map(Value::from).collect(),
                classes: None,
                probabilities: None,
            });
        };
        let predictions = raw
            .into_iter()
            .map(|v| decode_label(encoder, v))
            .collect::<Result<Vec<_>, _>>()?;
        let n_classes = encoder.n_classes();
        let classes = (0..n_classes)
            .map(|c| decode_label(encoder, c as f64))
            .collect::<Result<Vec<_>, _>>()?;
        // classes absent from the training split score zero
        let probabilities = self.model.class_probabilities(&x)?.map(|rows| {
            rows.into_iter()
                .map(|mut row| {
                    row.resize(n_classes, 0.0);
                    row
                })
                .collect()
        });
        Ok(Predictions {
            predictions,
            classes: Some(classes),
            probabilities,
        })
    }
}

fn decode_label(encoder: &LabelEncoder, v: f64) -> Result<Value, ArtifactError> {
    let label = encoder
        .decode(v as usize)
        .filter(|_| v >= 0.0)
        .ok_or(ModelError::InvalidLabel(v))?;
    let typed = match encoder.dtype {
        DType::Integer => label.parse::<i64>().ok().map(Value::from),
        DType::Float => label.parse::<f64>().ok().map(Value::from),
        DType::Boolean => label.parse::<bool>().ok().map(Value::from),
        DType::Categorical => None,
    };
    Ok(typed.unwrap_or_else(|| Value::from(label)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvalytics_core::{Column, ColumnData};

    #[test]
    fn test_decode_keeps_label_type() {
        let col = Column::new("k", ColumnData::Integer(vec![Some(1), Some(0)]));
        let mut enc = LabelEncoder::new();
        enc.fit(&col, &[0, 1]);
        assert_eq!(decode_label(&enc, 1.0).unwrap(), Value::from(1));

        let col = Column::new("s", ColumnData::Categorical(vec![Some("yes".into())]));
        enc.fit(&col, &[0]);
        assert_eq!(decode_label(&enc, 0.0).unwrap(), Value::from("yes"));
        assert_eq!(
            decode_label(&enc, 3.0).unwrap_err(),
            ArtifactError::Model(ModelError::InvalidLabel(3.0))
        );
    }

    #[test]
    fn test_corrupt_bytes() {
        assert!(matches!(
            ModelArtifact::from_bytes(b"not json"),
            Err(ArtifactError::Decode(_))
        ));
    }
}
