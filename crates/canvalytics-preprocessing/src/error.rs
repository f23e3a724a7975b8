use canvalytics_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PreprocessError {
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Test fraction must be in (0, 1), got {0}")]
    InvalidFraction(f64),

    #[error("Cannot split {n} rows into {parts} non-empty parts")]
    TooFewRows { n: usize, parts: usize },

    #[error("Target has a single class; a stratified split needs at least two")]
    SingleClass,

    #[error("Class {class} has {count} member(s), need at least {needed}")]
    ClassTooSmall {
        class: usize,
        count: usize,
        needed: usize,
    },

    #[error("Missing label at row {0}")]
    MissingLabel(usize),

    #[error("Label '{0}' was not seen during fit")]
    UnknownLabel(String),

    #[error("No usable feature columns remain after preprocessing")]
    NoFeatures,

    #[error("Preprocessor not fitted")]
    NotFitted,

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type PreprocessResult<T> = Result<T, PreprocessError>;
