pub mod table;
pub mod matrix;
pub mod dtype;
pub mod error;
pub mod ids;
pub mod estimator;

pub use table::{Column, ColumnData, Table, TableBuilder, CellKey};
pub use matrix::Matrix;
pub use dtype::DType;
pub use error::{CoreError, CoreResult, ModelError};
pub use ids::{DatasetId, ModelId};
pub use estimator::Estimator;
