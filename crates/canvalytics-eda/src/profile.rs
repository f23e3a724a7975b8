use canvalytics_core::{Column, DType, Table};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::debug;

use crate::config::ProfileConfig;
use crate::stats::{mean, pearson, quantile_sorted, sample_std, sorted};

/// Summary of a numeric column's present values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation; absent with fewer than two values.
    pub std: Option<f64>,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
}

/// Per-column statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    #[serde(skip)]
    pub name: String,
    pub dtype: DType,
    pub missing_count: usize,
    pub non_missing_count: usize,
    pub missing_percentage: f64,
    pub unique_count: usize,
    /// Present only for numeric columns with at least one value.
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericSummary>,
    /// Distinct values of low-cardinality categorical and boolean columns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicCounts {
    pub rows: usize,
    pub columns: usize,
    pub missing_total: usize,
    pub duplicate_rows: usize,
}

/// Pearson correlations over numeric columns; `None` marks an undefined pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub matrix: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.matrix[i][j]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStatistics {
    pub basic: BasicCounts,
    #[serde(serialize_with = "profiles_by_name")]
    pub columns: Vec<ColumnProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation: Option<CorrelationMatrix>,
}

impl DatasetStatistics {
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Serialize profiles as a `name -> profile` map in column order.
fn profiles_by_name<S: Serializer>(profiles: &[ColumnProfile], s: S) -> Result<S::Ok, S::Error> {
    let mut map = s.serialize_map(Some(profiles.len()))?;
    for p in profiles {
        map.serialize_entry(&p.name, p)?;
    }
    map.end()
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

fn numeric_summary(column: &Column) -> Option<NumericSummary> {
    let present = column.present_f64();
    let s = sorted(&present);
    Some(NumericSummary {
        min: *s.first()?,
        max: *s.last()?,
        mean: mean(&present)?,
        std: sample_std(&present),
        q25: quantile_sorted(&s, 0.25)?,
        median: quantile_sorted(&s, 0.5)?,
        q75: quantile_sorted(&s, 0.75)?,
    })
}

/// Profile one column using its load-time type.
pub fn profile_column(column: &Column, config: &ProfileConfig) -> ColumnProfile {
    let dtype = column.dtype();
    let missing = column.missing_count();
    let unique = column.unique_count();
    let numeric = if dtype.is_numeric() {
        numeric_summary(column)
    } else {
        None
    };
    let values = match dtype {
        DType::Categorical | DType::Boolean if unique <= config.category_threshold => {
            Some(column.distinct_text())
        }
        _ => None,
    };
    ColumnProfile {
        name: column.name().to_string(),
        dtype,
        missing_count: missing,
        non_missing_count: column.len() - missing,
        missing_percentage: percentage(missing, column.len()),
        unique_count: unique,
        numeric,
        values,
    }
}

/// Correlation over every numeric column, in table order.
pub fn correlation_matrix(table: &Table) -> CorrelationMatrix {
    let numeric = table.numeric_columns();
    let values: Vec<Vec<Option<f64>>> = numeric
        .iter()
        .map(|c| (0..c.len()).map(|i| c.f64_at(i)).collect())
        .collect();
    let k = numeric.len();
    let mut matrix = vec![vec![None; k]; k];
    for i in 0..k {
        for j in i..k {
            let r = pearson(&values[i], &values[j]);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }
    CorrelationMatrix {
        columns: numeric.iter().map(|c| c.name().to_string()).collect(),
        matrix,
    }
}

/// Profile a whole table. The correlation matrix is omitted with fewer than two numeric columns.
pub fn profile(table: &Table, config: &ProfileConfig) -> DatasetStatistics {
    let columns: Vec<ColumnProfile> = table
        .columns()
        .iter()
        .map(|c| profile_column(c, config))
        .collect();
    let correlation = if table.numeric_columns().len() >= 2 {
        Some(correlation_matrix(table))
    } else {
        None
    };
    debug!(rows = table.n_rows(), columns = table.n_columns(), "profiled table");
    DatasetStatistics {
        basic: BasicCounts {
            rows: table.n_rows(),
            columns: table.n_columns(),
            missing_total: table.missing_total(),
            duplicate_rows: table.duplicate_rows(),
        },
        columns,
        correlation,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingColumn {
    pub column: String,
    pub missing: usize,
    pub percentage: f64,
}

/// Missing-value overview: columns with any missing cell, most missing first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingReport {
    pub rows: usize,
    pub missing_total: usize,
    pub missing_percentage: f64,
    pub columns: Vec<MissingColumn>,
}

pub fn missing_report(table: &Table) -> MissingReport {
    let mut columns: Vec<MissingColumn> = table
        .columns()
        .iter()
        .filter(|c| c.missing_count() > 0)
        .map(|c| MissingColumn {
            column: c.name().to_string(),
            missing: c.missing_count(),
            percentage: percentage(c.missing_count(), c.len()),
        })
        .collect();
    columns.sort_by(|a, b| b.missing.cmp(&a.missing));
    let missing_total = table.missing_total();
    MissingReport {
        rows: table.n_rows(),
        missing_total,
        missing_percentage: percentage(missing_total, table.n_rows() * table.n_columns()),
        columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use canvalytics_core::ColumnData;

    fn fixture() -> Table {
        Table::new(vec![
            Column::new(
                "n",
                ColumnData::Integer(vec![Some(1), Some(2), Some(3), Some(4), Some(5)]),
            ),
            Column::new("empty", ColumnData::Float(vec![None; 5])),
            Column::new("constant", ColumnData::Float(vec![Some(2.0); 5])),
            Column::new(
                "sex",
                ColumnData::Categorical(vec![
                    Some("m".into()),
                    Some("f".into()),
                    None,
                    Some("m".into()),
                    Some("f".into()),
                ]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_numeric_summary() {
        let stats = profile(&fixture(), &ProfileConfig::default());
        let n = stats.column("n").unwrap().numeric.as_ref().unwrap();
        assert_abs_diff_eq!(n.mean, 3.0);
        assert_abs_diff_eq!(n.std.unwrap(), 1.5811388300841898, epsilon = 1e-12);
        assert_abs_diff_eq!(n.q25, 2.0);
        assert_abs_diff_eq!(n.median, 3.0);
        assert_abs_diff_eq!(n.q75, 4.0);
        assert_eq!((n.min, n.max), (1.0, 5.0));
    }

    #[test]
    fn test_missingness_conservation() {
        let table = fixture();
        let stats = profile(&table, &ProfileConfig::default());
        for col in &stats.columns {
            assert_eq!(col.missing_count + col.non_missing_count, table.n_rows());
        }
        let empty = stats.column("empty").unwrap();
        assert_eq!(empty.numeric, None);
        assert_eq!(empty.unique_count, 0);
        assert_eq!(stats.basic.missing_total, 6);
    }

    #[test]
    fn test_constant_column_correlation_is_null() {
        let stats = profile(&fixture(), &ProfileConfig::default());
        let corr = stats.correlation.as_ref().unwrap();
        assert_eq!(corr.columns, vec!["n", "empty", "constant"]);
        assert_eq!(corr.get("n", "constant"), None);
        assert_eq!(corr.get("constant", "constant"), None);
        assert_abs_diff_eq!(corr.get("n", "n").unwrap(), 1.0, epsilon = 1e-12);

        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["correlation"]["matrix"][0][2].is_null());
    }

    #[test]
    fn test_categorical_values_and_json_shape() {
        let stats = profile(&fixture(), &ProfileConfig::default());
        let sex = stats.column("sex").unwrap();
        assert_eq!(sex.values.as_deref(), Some(&["m".to_string(), "f".to_string()][..]));

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["columns"]["sex"]["missing_count"], 1);
        assert_eq!(json["columns"]["n"]["q75"], 4.0);
        assert!(json["columns"]["empty"].get("mean").is_none());
        assert!(json["columns"]["n"].get("values").is_none());

        let few = profile(&fixture(), &ProfileConfig { category_threshold: 1 });
        assert_eq!(few.column("sex").unwrap().values, None);
    }

    #[test]
    fn test_empty_table() {
        let stats = profile(&Table::empty(), &ProfileConfig::default());
        assert_eq!(stats.basic.rows, 0);
        assert_eq!(stats.basic.missing_total, 0);
        assert!(stats.correlation.is_none());
    }

    #[test]
    fn test_missing_report() {
        let report = missing_report(&fixture());
        assert_eq!(report.missing_total, 6);
        assert_eq!(report.columns[0].column, "empty");
        assert_eq!(report.columns[1].column, "sex");
        assert_abs_diff_eq!(report.columns[1].percentage, 20.0);
    }
}
