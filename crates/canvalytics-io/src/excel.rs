use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use canvalytics_core::dtype::normalize_cell;
use canvalytics_core::{Table, TableBuilder};

use crate::error::{LoadError, LoadResult};

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        other => normalize_cell(&other.to_string()),
    }
}

/// Read one worksheet of an `.xlsx`/`.xls`/`.ods` workbook. The first row is the header.
pub fn read_spreadsheet(bytes: &[u8], sheet_index: usize) -> LoadResult<Table> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| LoadError::ParseError(format!("could not open workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(sheet_index)
        .ok_or_else(|| LoadError::ParseError(format!("workbook has no sheet {sheet_index}")))?
        .map_err(|e| LoadError::ParseError(format!("could not read sheet {sheet_index}: {e}")))?;

    let mut rows = range.rows();
    let header_row = rows
        .next()
        .ok_or_else(|| LoadError::ParseError("sheet is empty".into()))?;
    let headers: Vec<String> = header_row
        .iter()
        .map(|c| cell_text(c).unwrap_or_default())
        .collect();

    let mut builder = TableBuilder::new(headers)?;
    for row in rows {
        builder.push_row(row.iter().map(cell_text).collect())?;
    }
    Ok(builder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Empty), None);
        assert_eq!(cell_text(&Data::String(" NA ".into())), None);
        assert_eq!(cell_text(&Data::Int(3)), Some("3".into()));
        assert_eq!(cell_text(&Data::Bool(true)), Some("true".into()));
    }

    #[test]
    fn test_rejects_non_workbook_bytes() {
        assert!(matches!(
            read_spreadsheet(b"a,b\n1,2\n", 0),
            Err(LoadError::ParseError(_))
        ));
    }
}
