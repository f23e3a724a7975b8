use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Categorical and boolean columns with at most this many distinct values list them.
    pub category_threshold: usize,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        ProfileConfig {
            category_threshold: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Histogram bin count when the request does not give one.
    pub default_bins: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        ChartConfig { default_bins: 20 }
    }
}
