use canvalytics_core::{CoreError, ModelError, ModelId};
use canvalytics_preprocessing::PreprocessError;
use thiserror::Error;

use crate::request::TaskType;

/// Underlying cause of a failed training run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrainingFailure {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrainError {
    #[error("Target column not found: {0}")]
    TargetNotFound(String),

    #[error("Feature column not found: {0}")]
    FeatureNotFound(String),

    #[error("Unsupported algorithm '{algorithm}' for {task}")]
    UnsupportedAlgorithm { task: TaskType, algorithm: String },

    #[error("Invalid training request: {0}")]
    InvalidRequest(String),

    #[error("Training failed: {cause}")]
    TrainingFailed {
        #[source]
        cause: TrainingFailure,
    },
}

impl TrainError {
    pub fn failed(cause: impl Into<TrainingFailure>) -> Self {
        TrainError::TrainingFailed {
            cause: cause.into(),
        }
    }
}

pub type TrainResult<T> = Result<T, TrainError>;

/// Errors encoding, decoding or applying a model artifact.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ArtifactError {
    #[error("Cannot encode model artifact: {0}")]
    Encode(String),

    #[error("Cannot decode model artifact: {0}")]
    Decode(String),

    #[error("Feature column not found: {0}")]
    FeatureNotFound(String),

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Model not found: {0}")]
    NotFound(ModelId),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
