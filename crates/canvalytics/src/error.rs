use canvalytics_eda::ChartError;
use canvalytics_io::LoadError;
use canvalytics_pipeline::{ArtifactError, RegistryError, TrainError};
use canvalytics_preprocessing::PreprocessError;
use canvalytics_store::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Stable machine-readable error codes exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    UnsupportedFormat,
    FetchError,
    ParseError,
    ColumnNotFound,
    NotNumeric,
    NotBinary,
    InvalidParameter,
    TargetNotFound,
    FeatureNotFound,
    UnsupportedAlgorithm,
    TrainingFailed,
    InvalidRequest,
    Internal,
}

impl ErrorCode {
    /// Transport status hint.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorCode::NotFound => 404,
            ErrorCode::UnsupportedFormat => 415,
            ErrorCode::FetchError => 502,
            ErrorCode::ParseError | ErrorCode::TrainingFailed => 422,
            ErrorCode::Internal => 500,
            ErrorCode::ColumnNotFound
            | ErrorCode::NotNumeric
            | ErrorCode::NotBinary
            | ErrorCode::InvalidParameter
            | ErrorCode::TargetNotFound
            | ErrorCode::FeatureNotFound
            | ErrorCode::UnsupportedAlgorithm
            | ErrorCode::InvalidRequest => 400,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error(transparent)]
    Train(#[from] TrainError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Load(LoadError::UnsupportedFormat(_)) => ErrorCode::UnsupportedFormat,
            Error::Load(LoadError::FetchError(_)) => ErrorCode::FetchError,
            Error::Load(LoadError::ParseError(_)) => ErrorCode::ParseError,
            Error::Store(StoreError::NotFound(_)) | Error::Registry(RegistryError::NotFound(_)) => {
                ErrorCode::NotFound
            }
            Error::Chart(e) => match e {
                ChartError::ColumnNotFound(_) => ErrorCode::ColumnNotFound,
                ChartError::NotNumeric(_) => ErrorCode::NotNumeric,
                ChartError::NotBinary { .. } => ErrorCode::NotBinary,
                ChartError::InvalidParameter(_) => ErrorCode::InvalidParameter,
            },
            Error::Train(e) => match e {
                TrainError::TargetNotFound(_) => ErrorCode::TargetNotFound,
                TrainError::FeatureNotFound(_) => ErrorCode::FeatureNotFound,
                TrainError::UnsupportedAlgorithm { .. } => ErrorCode::UnsupportedAlgorithm,
                TrainError::InvalidRequest(_) => ErrorCode::InvalidRequest,
                TrainError::TrainingFailed { .. } => ErrorCode::TrainingFailed,
            },
            Error::Artifact(e) => match e {
                ArtifactError::FeatureNotFound(_)
                | ArtifactError::Preprocess(PreprocessError::ColumnNotFound(_)) => {
                    ErrorCode::FeatureNotFound
                }
                _ => ErrorCode::Internal,
            },
            Error::ColumnNotFound(_) => ErrorCode::ColumnNotFound,
            Error::InvalidRequest(_) => ErrorCode::InvalidRequest,
            Error::Internal(_) => ErrorCode::Internal,
        }
    }

    pub fn http_status(&self) -> u16 {
        self.code().http_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvalytics_core::DatasetId;

    #[test]
    fn test_codes() {
        let e = Error::from(StoreError::NotFound(DatasetId::from("x")));
        assert_eq!(e.code(), ErrorCode::NotFound);
        assert_eq!(e.http_status(), 404);

        let e = Error::from(TrainError::failed(PreprocessError::SingleClass));
        assert_eq!(e.code(), ErrorCode::TrainingFailed);
        assert_eq!(
            serde_json::to_value(e.code()).unwrap(),
            serde_json::json!("TRAINING_FAILED")
        );
    }
}
