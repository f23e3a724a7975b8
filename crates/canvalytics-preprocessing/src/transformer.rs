use canvalytics_core::{Column, Matrix, Table};
use serde::{Deserialize, Serialize};

use crate::encoder::OneHotEncoder;
use crate::error::{PreprocessError, PreprocessResult};
use crate::imputer::{ConstantImputer, ImputeStrategy, SimpleImputer};
use crate::scaler::StandardScaler;

/// Type-aware column transformer settings.
///
/// Numeric features are median-imputed then standardized. Boolean and
/// categorical features are filled with `placeholder` and one-hot encoded,
/// unless they have more than `max_cardinality` distinct values in the
/// fitting rows, in which case they are dropped.
#[derive(Debug, Clone)]
pub struct TabularPreprocessor {
    pub max_cardinality: usize,
    pub placeholder: String,
}

impl Default for TabularPreprocessor {
    fn default() -> Self {
        TabularPreprocessor {
            max_cardinality: 50,
            placeholder: "Unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CategoricalFeature {
    column: String,
    encoder: OneHotEncoder,
}

/// Fitted preprocessing state. Output layout: numeric features first, in
/// input order, then each categorical feature's one-hot block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    numeric: Vec<String>,
    imputer: SimpleImputer,
    scaler: StandardScaler,
    categorical: Vec<CategoricalFeature>,
    fill: ConstantImputer,
    dropped: Vec<String>,
    feature_names: Vec<String>,
}

fn require<'t>(table: &'t Table, name: &str) -> PreprocessResult<&'t Column> {
    table
        .column(name)
        .ok_or_else(|| PreprocessError::ColumnNotFound(name.to_string()))
}

/// Raw numeric block with `NaN` marking missing or non-numeric cells.
fn numeric_block(table: &Table, columns: &[String], rows: &[usize]) -> PreprocessResult<Matrix> {
    let cols = columns
        .iter()
        .map(|c| require(table, c))
        .collect::<PreprocessResult<Vec<_>>>()?;
    let mut out = Matrix::zeros(rows.len(), cols.len());
    for (i, &r) in rows.iter().enumerate() {
        for (j, col) in cols.iter().enumerate() {
            out.set(i, j, col.f64_at(r).unwrap_or(f64::NAN));
        }
    }
    Ok(out)
}

fn text_values(column: &Column, rows: &[usize]) -> Vec<Option<String>> {
    rows.iter().map(|&r| column.text_at(r)).collect()
}

impl TabularPreprocessor {
    pub fn new(max_cardinality: usize, placeholder: impl Into<String>) -> Self {
        TabularPreprocessor {
            max_cardinality,
            placeholder: placeholder.into(),
        }
    }

    /// Fit on `features` using only the table rows listed in `rows`.
    pub fn fit(
        &self,
        table: &Table,
        features: &[String],
        rows: &[usize],
    ) -> PreprocessResult<FittedPreprocessor> {
        let fill = ConstantImputer::new(self.placeholder.clone());
        let mut numeric = Vec::new();
        let mut categorical = Vec::new();
        let mut dropped = Vec::new();

        for name in features {
            let column = require(table, name)?;
            if column.dtype().is_numeric() {
                numeric.push(name.clone());
                continue;
            }
            let present: Vec<Option<String>> = text_values(column, rows);
            let mut distinct: Vec<&String> = present.iter().flatten().collect();
            distinct.sort();
            distinct.dedup();
            if distinct.len() > self.max_cardinality {
                dropped.push(name.clone());
                continue;
            }
            let mut encoder = OneHotEncoder::new();
            encoder.fit(&fill.transform(present));
            categorical.push(CategoricalFeature {
                column: name.clone(),
                encoder,
            });
        }

        let mut block = numeric_block(table, &numeric, rows)?;
        let mut imputer = SimpleImputer::new(ImputeStrategy::Median);
        imputer.fit(&block);
        imputer.transform(&mut block);
        let mut scaler = StandardScaler::new();
        scaler.fit(&block);

        let mut feature_names = numeric.clone();
        for cat in &categorical {
            feature_names.extend(cat.encoder.feature_names(&cat.column));
        }
        if feature_names.is_empty() {
            return Err(PreprocessError::NoFeatures);
        }

        Ok(FittedPreprocessor {
            numeric,
            imputer,
            scaler,
            categorical,
            fill,
            dropped,
            feature_names,
        })
    }
}

impl FittedPreprocessor {
    /// Expanded output feature names, one per matrix column.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Categorical features removed for exceeding the cardinality threshold.
    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }

    /// Input columns the transform reads.
    pub fn input_columns(&self) -> Vec<&str> {
        self.numeric
            .iter()
            .map(String::as_str)
            .chain(self.categorical.iter().map(|c| c.column.as_str()))
            .collect()
    }

    /// Fitted imputation medians, aligned with the numeric features.
    pub fn medians(&self) -> &[f64] {
        self.imputer.statistics.as_deref().unwrap_or(&[])
    }

    /// Fitted scaler mean and std, aligned with the numeric features.
    pub fn scaling(&self) -> (&[f64], &[f64]) {
        (
            self.scaler.mean.as_deref().unwrap_or(&[]),
            self.scaler.std.as_deref().unwrap_or(&[]),
        )
    }

    /// Transform the listed table rows into the design matrix.
    pub fn transform(&self, table: &Table, rows: &[usize]) -> PreprocessResult<Matrix> {
        let mut block = numeric_block(table, &self.numeric, rows)?;
        self.imputer.transform(&mut block);
        self.scaler.transform(&mut block);

        let blocks = self
            .categorical
            .iter()
            .map(|cat| {
                let column = require(table, &cat.column)?;
                Ok(cat.encoder.transform(&self.fill.transform(text_values(column, rows))))
            })
            .collect::<PreprocessResult<Vec<Matrix>>>()?;

        let width = self.feature_names.len();
        let mut data = Vec::with_capacity(rows.len() * width);
        for i in 0..rows.len() {
            data.extend_from_slice(block.row(i));
            for b in &blocks {
                data.extend_from_slice(b.row(i));
            }
        }
        Ok(Matrix::new(data, rows.len(), width)?)
    }
}
