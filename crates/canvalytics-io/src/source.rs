use canvalytics_core::Table;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::LoadConfig;
use crate::csv_io::read_delimited;
use crate::error::{LoadError, LoadResult};
use crate::excel::read_spreadsheet;
use crate::fetch::fetch_bytes;
use crate::format::Format;
use crate::payload::table_from_json;
use crate::sample::sample_table;

/// Where a dataset comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadSource {
    /// Uploaded file contents; the format follows the file name's extension.
    Bytes { bytes: Vec<u8>, file_name: String },
    /// Remote resource fetched over HTTP(S).
    Url(String),
    /// Inline JSON payload in records or split orientation.
    Records(Value),
    /// A bundled sample dataset, by name.
    Sample(String),
}

impl LoadSource {
    /// Name used when the caller does not declare one.
    pub fn default_name(&self) -> String {
        match self {
            LoadSource::Bytes { file_name, .. } => file_name.clone(),
            LoadSource::Url(url) => url
                .split(['?', '#'])
                .next()
                .and_then(|u| u.trim_end_matches('/').rsplit('/').next())
                .filter(|s| !s.is_empty())
                .unwrap_or(url.as_str())
                .to_string(),
            LoadSource::Records(_) => "inline".to_string(),
            LoadSource::Sample(name) => name.trim().to_lowercase(),
        }
    }
}

fn decode(bytes: &[u8], format: Format, config: &LoadConfig) -> LoadResult<Table> {
    match format {
        Format::Delimited(delimiter) => read_delimited(bytes, delimiter),
        Format::Spreadsheet => read_spreadsheet(bytes, config.sheet_index),
    }
}

/// Decode a source into a typed table.
pub fn load_table(source: &LoadSource, config: &LoadConfig) -> LoadResult<Table> {
    let table = match source {
        LoadSource::Bytes { bytes, file_name } => {
            let format = Format::from_file_name(file_name)?;
            if bytes.len() > config.max_bytes {
                return Err(LoadError::ParseError(format!(
                    "upload of {} bytes exceeds the {} byte limit",
                    bytes.len(),
                    config.max_bytes
                )));
            }
            debug!(file_name = %file_name, ?format, "decoding upload");
            decode(bytes, format, config)?
        }
        LoadSource::Url(url) => {
            let format = Format::from_url(url)?;
            let bytes = fetch_bytes(url, config)?;
            decode(&bytes, format, config)?
        }
        LoadSource::Records(payload) => table_from_json(payload)?,
        LoadSource::Sample(name) => sample_table(name)?,
    };
    info!(rows = table.n_rows(), columns = table.n_columns(), "table decoded");
    Ok(table)
}
