use std::cmp::Ordering;
use std::collections::HashSet;

use canvalytics_core::{Column, DType, Matrix};
use serde::{Deserialize, Serialize};

use crate::error::{PreprocessError, PreprocessResult};

/// Encode target labels as class indices `0..n_classes`.
///
/// Classes are sorted by value: numerically for numeric columns, `false`
/// before `true` for booleans, lexicographically otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
    pub dtype: DType,
}

impl LabelEncoder {
    pub fn new() -> Self {
        LabelEncoder {
            classes: Vec::new(),
            dtype: DType::Categorical,
        }
    }

    /// Fit on the present values of `column` at `rows`.
    pub fn fit(&mut self, column: &Column, rows: &[usize]) {
        let mut seen: Vec<(usize, String)> = Vec::new();
        let mut known = HashSet::new();
        for &r in rows {
            if let Some(text) = column.text_at(r) {
                if known.insert(text.clone()) {
                    seen.push((r, text));
                }
            }
        }
        seen.sort_by(|(ra, ta), (rb, tb)| match column.dtype() {
            DType::Integer | DType::Float => column
                .f64_at(*ra)
                .zip(column.f64_at(*rb))
                .map_or(Ordering::Equal, |(a, b)| a.total_cmp(&b)),
            // "false" < "true" lexicographically as well
            DType::Boolean | DType::Categorical => ta.cmp(tb),
        });
        self.dtype = column.dtype();
        self.classes = seen.into_iter().map(|(_, t)| t).collect();
    }

    /// Class index of a cell; `None` for missing or unseen values.
    pub fn encode(&self, column: &Column, row: usize) -> Option<usize> {
        let text = column.text_at(row)?;
        self.classes.iter().position(|c| *c == text)
    }

    /// Class indices for `rows`, failing on missing or unseen labels.
    pub fn transform(&self, column: &Column, rows: &[usize]) -> PreprocessResult<Vec<usize>> {
        rows.iter()
            .map(|&r| {
                let text = column.text_at(r).ok_or(PreprocessError::MissingLabel(r))?;
                self.classes
                    .iter()
                    .position(|c| *c == text)
                    .ok_or(PreprocessError::UnknownLabel(text))
            })
            .collect()
    }

    /// Inverse transform: class index → label.
    pub fn decode(&self, idx: usize) -> Option<&str> {
        self.classes.get(idx).map(String::as_str)
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }
}

impl Default for LabelEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// One-hot encode a categorical feature. Unknown categories at transform time
/// map to an all-zero indicator block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub categories: Vec<String>,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        OneHotEncoder {
            categories: Vec::new(),
        }
    }

    pub fn fit(&mut self, values: &[String]) {
        let mut unique = values.to_vec();
        unique.sort();
        unique.dedup();
        self.categories = unique;
    }

    /// Output width.
    pub fn n_outputs(&self) -> usize {
        self.categories.len()
    }

    /// Indicator position of `value`, if it was seen during fit.
    pub fn position(&self, value: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
    }

    pub fn transform(&self, values: &[String]) -> Matrix {
        let k = self.n_outputs();
        let mut out = Matrix::zeros(values.len(), k);
        for (i, v) in values.iter().enumerate() {
            if let Some(j) = self.position(v) {
                out.set(i, j, 1.0);
            }
        }
        out
    }

    /// Output feature names `{column}_{category}`.
    pub fn feature_names(&self, column: &str) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{column}_{c}"))
            .collect()
    }
}

impl Default for OneHotEncoder {
    fn default() -> Self {
        Self::new()
    }
}
