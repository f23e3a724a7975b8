use std::fmt;

use serde::{Deserialize, Serialize};

/// Tokens read as a missing value, matching the defaults of common dataframe readers.
pub const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A",
];

/// Semantic type inferred for a column at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Integer,
    Float,
    Boolean,
    Categorical,
}

impl DType {
    pub fn is_numeric(self) -> bool {
        matches!(self, DType::Integer | DType::Float)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DType::Integer => "integer",
            DType::Float => "float",
            DType::Boolean => "boolean",
            DType::Categorical => "categorical",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trim a raw field and map missing-value tokens to `None`.
pub fn normalize_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if MISSING_TOKENS.contains(&trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn parse_integer(token: &str) -> Option<i64> {
    token.parse::<i64>().ok()
}

/// Parse a finite float. `inf`-like tokens are rejected so they never reach a numeric column.
pub fn parse_float(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_boolean(token: &str) -> Option<bool> {
    if token.eq_ignore_ascii_case("true") {
        Some(true)
    } else if token.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Infer the semantic type of a column of normalized cells.
///
/// Integer is tried first, then float, then boolean; anything else is categorical.
/// A column without a single present value is reported as float.
pub fn infer_dtype(cells: &[Option<String>]) -> DType {
    let mut present = cells.iter().flatten().peekable();
    if present.peek().is_none() {
        return DType::Float;
    }
    if cells.iter().flatten().all(|c| parse_integer(c).is_some()) {
        return DType::Integer;
    }
    if cells.iter().flatten().all(|c| parse_float(c).is_some()) {
        return DType::Float;
    }
    if cells.iter().flatten().all(|c| parse_boolean(c).is_some()) {
        return DType::Boolean;
    }
    DType::Categorical
}
