pub mod error;
pub mod config;
pub mod request;
pub mod algorithms;
pub mod evaluate;
pub mod artifact;
pub mod record;
pub mod train;
pub mod registry;

pub use error::*;
pub use config::TrainingConfig;
pub use request::{TaskType, TrainingRequest};
pub use algorithms::{AlgorithmRegistry, ModelKind};
pub use evaluate::*;
pub use artifact::{ModelArtifact, Predictions};
pub use record::{ranked_map, ModelRecord, ModelSummary};
pub use train::Trainer;
pub use registry::{InMemoryModelRegistry, ModelRegistry};
