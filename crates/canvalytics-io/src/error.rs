use canvalytics_core::CoreError;
use thiserror::Error;

/// Load-time failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LoadError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Fetch failed: {0}")]
    FetchError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<CoreError> for LoadError {
    fn from(e: CoreError) -> Self {
        LoadError::ParseError(e.to_string())
    }
}

pub type LoadResult<T> = Result<T, LoadError>;
