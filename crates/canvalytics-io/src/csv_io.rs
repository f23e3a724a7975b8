use canvalytics_core::dtype::normalize_cell;
use canvalytics_core::{Table, TableBuilder};

use crate::error::{LoadError, LoadResult};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Pick tab when the header line has tabs but no commas.
fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let header = bytes.split(|&b| b == b'\n').next().unwrap_or(bytes);
    if header.contains(&b'\t') && !header.contains(&b',') {
        b'\t'
    } else {
        b','
    }
}

/// Parse delimited text with a header row into a typed table.
///
/// Every record must have exactly as many fields as the header.
pub fn read_delimited(bytes: &[u8], delimiter: Option<u8>) -> LoadResult<Table> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(bytes));

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| LoadError::ParseError(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
        return Err(LoadError::ParseError("input has no header row".into()));
    }
    let expected = headers.len();
    let mut builder = TableBuilder::new(headers)?;

    for result in rdr.records() {
        let record = result.map_err(|e| LoadError::ParseError(e.to_string()))?;
        if record.len() != expected {
            let line = record.position().map_or(0, |p| p.line());
            return Err(LoadError::ParseError(format!(
                "line {line}: expected {expected} fields, got {}",
                record.len()
            )));
        }
        builder.push_row(record.iter().map(normalize_cell).collect())?;
    }

    Ok(builder.finish()?)
}
