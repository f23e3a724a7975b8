use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::dtype::{infer_dtype, parse_boolean, parse_float, parse_integer, DType};
use crate::error::{CoreError, CoreResult};

/// Typed storage for a single column. `None` marks a missing value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Integer(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Boolean(Vec<Option<bool>>),
    Categorical(Vec<Option<String>>),
}

/// Hashable identity of a single cell, used for distinct counts and duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellKey<'a> {
    Missing,
    Integer(i64),
    Float(u64),
    Boolean(bool),
    Text(&'a str),
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Column {
            name: name.into(),
            data,
        }
    }

    /// Build a column from normalized cells, inferring its type.
    pub fn from_cells(name: impl Into<String>, cells: Vec<Option<String>>) -> Self {
        let data = match infer_dtype(&cells) {
            DType::Integer => ColumnData::Integer(
                cells.iter().map(|c| c.as_deref().and_then(parse_integer)).collect(),
            ),
            DType::Float => ColumnData::Float(
                cells.iter().map(|c| c.as_deref().and_then(parse_float)).collect(),
            ),
            DType::Boolean => ColumnData::Boolean(
                cells.iter().map(|c| c.as_deref().and_then(parse_boolean)).collect(),
            ),
            DType::Categorical => ColumnData::Categorical(cells),
        };
        Column::new(name, data)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn dtype(&self) -> DType {
        match self.data {
            ColumnData::Integer(_) => DType::Integer,
            ColumnData::Float(_) => DType::Float,
            ColumnData::Boolean(_) => DType::Boolean,
            ColumnData::Categorical(_) => DType::Categorical,
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Integer(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Boolean(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match &self.data {
            ColumnData::Integer(v) => v[row].is_none(),
            ColumnData::Float(v) => v[row].is_none(),
            ColumnData::Boolean(v) => v[row].is_none(),
            ColumnData::Categorical(v) => v[row].is_none(),
        }
    }

    pub fn missing_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_missing(i)).count()
    }

    pub fn non_missing_count(&self) -> usize {
        self.len() - self.missing_count()
    }

    /// Numeric value of a cell; `None` for missing cells and non-numeric columns.
    pub fn f64_at(&self, row: usize) -> Option<f64> {
        match &self.data {
            ColumnData::Integer(v) => v[row].map(|x| x as f64),
            ColumnData::Float(v) => v[row],
            _ => None,
        }
    }

    /// All cells of a numeric column as `f64`, or `None` when the column is not numeric.
    pub fn numeric_values(&self) -> Option<Vec<Option<f64>>> {
        if !self.dtype().is_numeric() {
            return None;
        }
        Some((0..self.len()).map(|i| self.f64_at(i)).collect())
    }

    /// Present numeric values in row order, missing cells dropped.
    pub fn present_f64(&self) -> Vec<f64> {
        (0..self.len()).filter_map(|i| self.f64_at(i)).collect()
    }

    /// Display form of a cell, as it would be written back to text.
    pub fn text_at(&self, row: usize) -> Option<String> {
        match &self.data {
            ColumnData::Integer(v) => v[row].map(|x| x.to_string()),
            ColumnData::Float(v) => v[row].map(|x| x.to_string()),
            ColumnData::Boolean(v) => v[row].map(|x| x.to_string()),
            ColumnData::Categorical(v) => v[row].clone(),
        }
    }

    pub fn key_at(&self, row: usize) -> CellKey<'_> {
        match &self.data {
            ColumnData::Integer(v) => v[row].map_or(CellKey::Missing, CellKey::Integer),
            // -0.0 and 0.0 are one value
            ColumnData::Float(v) => v[row].map_or(CellKey::Missing, |x| {
                CellKey::Float(if x == 0.0 { 0.0f64.to_bits() } else { x.to_bits() })
            }),
            ColumnData::Boolean(v) => v[row].map_or(CellKey::Missing, CellKey::Boolean),
            ColumnData::Categorical(v) => {
                v[row].as_deref().map_or(CellKey::Missing, CellKey::Text)
            }
        }
    }

    /// Number of distinct present values.
    pub fn unique_count(&self) -> usize {
        (0..self.len())
            .map(|i| self.key_at(i))
            .filter(|k| *k != CellKey::Missing)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Distinct present values in order of first appearance.
    pub fn distinct_text(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for i in 0..self.len() {
            let key = self.key_at(i);
            if key == CellKey::Missing || !seen.insert(key) {
                continue;
            }
            if let Some(text) = self.text_at(i) {
                out.push(text);
            }
        }
        out
    }

    fn take(&self, rows: &[usize]) -> Column {
        let data = match &self.data {
            ColumnData::Integer(v) => ColumnData::Integer(rows.iter().map(|&i| v[i]).collect()),
            ColumnData::Float(v) => ColumnData::Float(rows.iter().map(|&i| v[i]).collect()),
            ColumnData::Boolean(v) => ColumnData::Boolean(rows.iter().map(|&i| v[i]).collect()),
            ColumnData::Categorical(v) => {
                ColumnData::Categorical(rows.iter().map(|&i| v[i].clone()).collect())
            }
        };
        Column::new(self.name.clone(), data)
    }
}

/// An immutable, column-major table with a fixed schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Assemble a table from columns, checking names are unique and lengths agree.
    pub fn new(columns: Vec<Column>) -> CoreResult<Self> {
        let n_rows = columns.first().map_or(0, Column::len);
        let mut names = HashSet::new();
        for (idx, col) in columns.iter().enumerate() {
            if col.name().is_empty() {
                return Err(CoreError::EmptyColumnName(idx));
            }
            if !names.insert(col.name()) {
                return Err(CoreError::DuplicateColumn(col.name().to_string()));
            }
            if col.len() != n_rows {
                return Err(CoreError::LengthMismatch {
                    name: col.name().to_string(),
                    expected: n_rows,
                    got: col.len(),
                });
            }
        }
        Ok(Table { columns, n_rows })
    }

    pub fn empty() -> Self {
        Table {
            columns: Vec::new(),
            n_rows: 0,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Look up a column, failing with `ColumnNotFound`.
    pub fn require(&self, name: &str) -> CoreResult<&Column> {
        self.column(name)
            .ok_or_else(|| CoreError::ColumnNotFound(name.to_string()))
    }

    pub fn schema(&self) -> Vec<(String, DType)> {
        self.columns
            .iter()
            .map(|c| (c.name().to_string(), c.dtype()))
            .collect()
    }

    pub fn missing_total(&self) -> usize {
        self.columns.iter().map(Column::missing_count).sum()
    }

    /// Columns with a numeric type, in table order.
    pub fn numeric_columns(&self) -> Vec<&Column> {
        self.columns
            .iter()
            .filter(|c| c.dtype().is_numeric())
            .collect()
    }

    /// Number of rows identical to an earlier row.
    pub fn duplicate_rows(&self) -> usize {
        let mut seen = HashSet::with_capacity(self.n_rows);
        (0..self.n_rows)
            .filter(|&i| {
                let key: Vec<CellKey<'_>> = self.columns.iter().map(|c| c.key_at(i)).collect();
                !seen.insert(key)
            })
            .count()
    }

    /// A new table holding the given rows, in the given order. The schema is preserved.
    pub fn take_rows(&self, rows: &[usize]) -> CoreResult<Table> {
        if let Some(&bad) = rows.iter().find(|&&r| r >= self.n_rows) {
            return Err(CoreError::IndexOutOfBounds {
                row: bad,
                col: 0,
                rows: self.n_rows,
                cols: self.columns.len(),
            });
        }
        Ok(Table {
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            n_rows: rows.len(),
        })
    }
}

/// Row-wise builder that validates the rectangular shape and infers column types on finish.
pub struct TableBuilder {
    headers: Vec<String>,
    cells: Vec<Vec<Option<String>>>,
    n_rows: usize,
}

impl TableBuilder {
    pub fn new(headers: Vec<String>) -> CoreResult<Self> {
        let mut seen = HashSet::new();
        for (idx, h) in headers.iter().enumerate() {
            if h.trim().is_empty() {
                return Err(CoreError::EmptyColumnName(idx));
            }
            if !seen.insert(h.as_str()) {
                return Err(CoreError::DuplicateColumn(h.clone()));
            }
        }
        let cells = vec![Vec::new(); headers.len()];
        Ok(TableBuilder {
            headers,
            cells,
            n_rows: 0,
        })
    }

    /// Append one row of normalized cells (`None` = missing).
    pub fn push_row(&mut self, row: Vec<Option<String>>) -> CoreResult<()> {
        if row.len() != self.headers.len() {
            return Err(CoreError::RaggedRow {
                row: self.n_rows + 1,
                expected: self.headers.len(),
                got: row.len(),
            });
        }
        for (col, cell) in self.cells.iter_mut().zip(row) {
            col.push(cell);
        }
        self.n_rows += 1;
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn finish(self) -> CoreResult<Table> {
        let columns = self
            .headers
            .into_iter()
            .zip(self.cells)
            .map(|(name, cells)| Column::from_cells(name, cells))
            .collect();
        Table::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::normalize_cell;

    fn build(headers: &[&str], rows: &[&[&str]]) -> Table {
        let mut b = TableBuilder::new(headers.iter().map(|h| h.to_string()).collect()).unwrap();
        for row in rows {
            b.push_row(row.iter().map(|c| normalize_cell(c)).collect()).unwrap();
        }
        b.finish().unwrap()
    }

    #[test]
    fn test_builder_infers_schema() {
        let t = build(
            &["id", "score", "name", "flag"],
            &[&["1", "1.5", "a", "true"], &["2", "2", "b", "False"], &["3", "", "a", ""]],
        );
        assert_eq!(t.n_rows(), 3);
        assert_eq!(t.n_columns(), 4);
        assert_eq!(
            t.schema().into_iter().map(|(_, d)| d).collect::<Vec<_>>(),
            vec![DType::Integer, DType::Float, DType::Categorical, DType::Boolean]
        );
        assert_eq!(t.missing_total(), 2);
    }

    #[test]
    fn test_ragged_row_rejected() {
        let mut b = TableBuilder::new(vec!["a".into(), "b".into()]).unwrap();
        b.push_row(vec![Some("1".into()), Some("2".into())]).unwrap();
        let err = b.push_row(vec![Some("1".into())]).unwrap_err();
        assert_eq!(err, CoreError::RaggedRow { row: 2, expected: 2, got: 1 });
    }

    #[test]
    fn test_duplicate_header_rejected() {
        assert!(matches!(
            TableBuilder::new(vec!["a".into(), "a".into()]),
            Err(CoreError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_missing_conservation() {
        let t = build(&["x", "y"], &[&["", "1"], &["", "2"], &["", "3"]]);
        for col in t.columns() {
            assert_eq!(col.missing_count() + col.non_missing_count(), t.n_rows());
        }
        assert_eq!(t.require("x").unwrap().missing_count(), 3);
        assert_eq!(t.require("y").unwrap().missing_count(), 0);
    }

    #[test]
    fn test_distinct_and_duplicates() {
        let t = build(&["c", "n"], &[&["b", "1"], &["a", "2"], &["b", "1"], &["", "3"]]);
        let c = t.require("c").unwrap();
        assert_eq!(c.unique_count(), 2);
        assert_eq!(c.distinct_text(), vec!["b".to_string(), "a".to_string()]);
        assert_eq!(t.duplicate_rows(), 1);
    }

    #[test]
    fn test_take_rows_keeps_schema() {
        let t = build(&["a"], &[&["1"], &["2"], &["3"]]);
        let sub = t.take_rows(&[2, 0]).unwrap();
        assert_eq!(sub.n_rows(), 2);
        assert_eq!(sub.require("a").unwrap().f64_at(0), Some(3.0));
        assert_eq!(sub.schema(), t.schema());
        assert!(t.take_rows(&[3]).is_err());
    }
}
