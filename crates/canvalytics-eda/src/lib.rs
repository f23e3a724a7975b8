pub mod config;
pub mod stats;
pub mod profile;
pub mod charts;
pub mod insights;

pub use config::{ChartConfig, ProfileConfig};
pub use profile::*;
pub use charts::*;
pub use insights::insights;
