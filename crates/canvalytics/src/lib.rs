//! # Canvalytics
//!
//! The core of a "chat with your data" service: tabular datasets are loaded
//! into a session-scoped store, profiled, turned into chart data and used to
//! train baseline models whose artifacts live in a model registry.
//!
//! ## Modules
//!
//! - **core**: typed tables, schema inference, dense matrices, estimator trait
//! - **io**: CSV/TSV, spreadsheets, URL fetch, inline JSON payloads
//! - **store**: dataset store with capacity and session eviction
//! - **eda**: column profiles, correlation, chart data, local insights
//! - **preprocessing**: imputers, scaler, encoders, splits, column transformer
//! - **pipeline**: training pipeline, algorithm registry, model registry
//! - **workbench** / **dispatch**: the operations and their JSON calling convention

/// Tables, matrices and ids.
pub use canvalytics_core as core;

/// Dataset decoding.
pub use canvalytics_io as io;

/// Dataset store.
pub use canvalytics_store as store;

/// Profiling and chart data.
pub use canvalytics_eda as eda;

/// Feature preprocessing.
pub use canvalytics_preprocessing as preprocessing;

/// Training pipeline and model registry.
pub use canvalytics_pipeline as pipeline;

pub mod config;
pub mod error;
pub mod intent;
pub mod workbench;
pub mod dispatch;

pub use config::{Config, ConfigError};
pub use error::{Error, ErrorCode, Result};
pub use intent::{classify, Intent, IntentKind};
pub use workbench::{ModelDownload, PredictOutcome, TableRef, TrainOutcome, Workbench};
pub use dispatch::{Dispatcher, Request, Response, SourceArgs};
