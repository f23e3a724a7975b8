use thiserror::Error;

/// Error type for table construction and matrix shape handling.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("Empty column name at position {0}")]
    EmptyColumnName(usize),

    #[error("Row {row} has {got} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("Column '{name}' has {got} rows, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("Index out of bounds: row {row}, col {col} for a {rows}x{cols} matrix")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while fitting or applying an estimator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("Model not fitted")]
    NotFitted,

    #[error("Cannot fit on an empty training set")]
    EmptyTrainingSet,

    #[error("Target has {got} values but the feature matrix has {expected} rows")]
    TargetLength { expected: usize, got: usize },

    #[error("Feature mismatch: model was fitted on {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },

    #[error("Singular matrix: cannot solve the normal equations")]
    SingularMatrix,

    #[error("Invalid class label {0}: labels must be non-negative integers")]
    InvalidLabel(f64),

    #[error("Non-finite value encountered during {0}")]
    NonFinite(&'static str),
}
