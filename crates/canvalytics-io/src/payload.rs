use canvalytics_core::dtype::normalize_cell;
use canvalytics_core::{Table, TableBuilder};
use serde_json::{Map, Value};

use crate::error::{LoadError, LoadResult};

fn json_cell(value: &Value) -> LoadResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(normalize_cell(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => Err(LoadError::ParseError(
            "nested arrays and objects are not tabular cells".into(),
        )),
    }
}

fn from_records(records: &[Value]) -> LoadResult<Table> {
    let objects: Vec<&Map<String, Value>> = records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            r.as_object()
                .ok_or_else(|| LoadError::ParseError(format!("record {} is not an object", i + 1)))
        })
        .collect::<LoadResult<_>>()?;

    // Column order is the order of first appearance
    let mut headers: Vec<String> = Vec::new();
    for obj in &objects {
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let mut builder = TableBuilder::new(headers.clone())?;
    for obj in objects {
        let row = headers
            .iter()
            .map(|h| obj.get(h).map_or(Ok(None), json_cell))
            .collect::<LoadResult<Vec<_>>>()?;
        builder.push_row(row)?;
    }
    Ok(builder.finish()?)
}

fn from_split(columns: &[Value], data: &[Value]) -> LoadResult<Table> {
    let headers: Vec<String> = columns
        .iter()
        .map(|c| match c {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();

    let mut builder = TableBuilder::new(headers)?;
    for (i, row) in data.iter().enumerate() {
        let cells = row
            .as_array()
            .ok_or_else(|| LoadError::ParseError(format!("data row {} is not an array", i + 1)))?;
        builder.push_row(cells.iter().map(json_cell).collect::<LoadResult<Vec<_>>>()?)?;
    }
    Ok(builder.finish()?)
}

/// Build a table from an inline JSON payload.
///
/// Accepts `records` orientation (`[{"col": value}, ...]`) or `split`
/// orientation (`{"columns": [...], "data": [[...], ...]}`).
pub fn table_from_json(payload: &Value) -> LoadResult<Table> {
    match payload {
        Value::Array(records) => from_records(records),
        Value::Object(obj) => match (obj.get("columns"), obj.get("data")) {
            (Some(Value::Array(columns)), Some(Value::Array(data))) => from_split(columns, data),
            _ => Err(LoadError::ParseError(
                "expected an array of records or an object with 'columns' and 'data'".into(),
            )),
        },
        _ => Err(LoadError::ParseError("inline dataset must be an array or object".into())),
    }
}
