use crate::error::{LoadError, LoadResult};

/// A recognized tabular encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Delimited text; `None` sniffs comma vs tab from the header line.
    Delimited(Option<u8>),
    Spreadsheet,
}

fn extension(name: &str) -> Option<String> {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn from_extension(ext: &str) -> Option<Format> {
    match ext {
        "csv" => Some(Format::Delimited(Some(b','))),
        "tsv" => Some(Format::Delimited(Some(b'\t'))),
        "txt" => Some(Format::Delimited(None)),
        "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Format::Spreadsheet),
        _ => None,
    }
}

impl Format {
    /// Format of an uploaded file, chosen by its extension.
    pub fn from_file_name(name: &str) -> LoadResult<Format> {
        let ext = extension(name).ok_or_else(|| {
            LoadError::UnsupportedFormat(format!("'{name}' has no file extension"))
        })?;
        from_extension(&ext)
            .ok_or_else(|| LoadError::UnsupportedFormat(format!("'.{ext}' files are not tabular")))
    }

    /// Format of a remote resource, from the last path segment of its URL.
    /// A path without an extension is read as CSV.
    pub fn from_url(url: &str) -> LoadResult<Format> {
        let without_query = url.split(['?', '#']).next().unwrap_or(url);
        let path = without_query
            .split_once("://")
            .map_or(without_query, |(_, rest)| rest.split_once('/').map_or("", |(_, p)| p));
        match extension(path) {
            None => Ok(Format::Delimited(Some(b','))),
            Some(ext) => from_extension(&ext).ok_or_else(|| {
                LoadError::UnsupportedFormat(format!("'.{ext}' resources are not tabular"))
            }),
        }
    }
}
