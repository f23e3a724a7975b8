use serde::{Deserialize, Serialize};

/// Limits applied while loading a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Whole-response read timeout for URL sources.
    pub fetch_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Largest accepted body, for uploads and fetched responses alike.
    pub max_bytes: usize,
    /// Worksheet read from spreadsheet sources.
    pub sheet_index: usize,
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            fetch_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_bytes: 64 * 1024 * 1024,
            sheet_index: 0,
        }
    }
}
