use std::cmp::Ordering;
use std::collections::HashMap;

use canvalytics_core::{Column, ColumnData, Table};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::ChartConfig;
use crate::profile::correlation_matrix;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChartError {
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Column '{0}' is not numeric")]
    NotNumeric(String),

    #[error("Column '{column}' has {distinct} distinct values, expected at most 2")]
    NotBinary { column: String, distinct: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type ChartResult<T> = Result<T, ChartError>;

/// Which chart to build and over which columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartRequest {
    BinaryOutcome {
        column: String,
    },
    GroupedOutcome {
        outcome: String,
        group: String,
    },
    Histogram {
        column: String,
        #[serde(default)]
        bins: Option<usize>,
    },
    Correlation,
    ValueCounts {
        column: String,
        #[serde(default)]
        limit: Option<usize>,
    },
}

/// Chart-ready numeric series. Rendering happens elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartData {
    BinaryOutcome {
        column: String,
        labels: Vec<String>,
        counts: Vec<usize>,
    },
    /// `counts[g][o]` is the number of rows in group `g` with outcome `o`.
    GroupedOutcome {
        outcome: String,
        group: String,
        groups: Vec<String>,
        outcomes: Vec<String>,
        counts: Vec<Vec<usize>>,
    },
    /// `edges` has one more entry than `counts`; `labels` are the left edges.
    Histogram {
        column: String,
        edges: Vec<f64>,
        labels: Vec<String>,
        counts: Vec<usize>,
    },
    Correlation {
        columns: Vec<String>,
        matrix: Vec<Vec<Option<f64>>>,
    },
    ValueCounts {
        column: String,
        labels: Vec<String>,
        counts: Vec<usize>,
    },
}

fn require<'t>(table: &'t Table, name: &str) -> ChartResult<&'t Column> {
    table
        .column(name)
        .ok_or_else(|| ChartError::ColumnNotFound(name.to_string()))
}

/// Value order for labels: numeric for numeric columns, textual otherwise.
fn compare_labels(column: &Column, a: &str, b: &str) -> Ordering {
    if column.dtype().is_numeric() {
        if let (Ok(x), Ok(y)) = (a.parse::<f64>(), b.parse::<f64>()) {
            return x.total_cmp(&y);
        }
    }
    a.cmp(b)
}

fn sorted_distinct(column: &Column) -> Vec<String> {
    let mut values = column.distinct_text();
    values.sort_by(|a, b| compare_labels(column, a, b));
    values
}

fn count_by_label(column: &Column) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for row in 0..column.len() {
        if let Some(text) = column.text_at(row) {
            *counts.entry(text).or_insert(0) += 1;
        }
    }
    counts
}

fn binary_labels(column: &Column) -> ChartResult<Vec<String>> {
    match column.data() {
        ColumnData::Boolean(_) => return Ok(vec!["false".into(), "true".into()]),
        ColumnData::Integer(values) if values.iter().flatten().all(|v| *v == 0 || *v == 1) => {
            return Ok(vec!["0".into(), "1".into()]);
        }
        _ => {}
    }
    let labels = sorted_distinct(column);
    if labels.len() > 2 {
        return Err(ChartError::NotBinary {
            column: column.name().to_string(),
            distinct: labels.len(),
        });
    }
    Ok(labels)
}

pub fn binary_outcome(table: &Table, column: &str) -> ChartResult<ChartData> {
    let col = require(table, column)?;
    let labels = binary_labels(col)?;
    let counts_by = count_by_label(col);
    let counts = labels
        .iter()
        .map(|l| counts_by.get(l).copied().unwrap_or(0))
        .collect();
    Ok(ChartData::BinaryOutcome {
        column: column.to_string(),
        labels,
        counts,
    })
}

/// Per-group outcome counts. Rows missing either value are skipped; groups
/// and outcomes are sorted by value.
pub fn grouped_outcome(table: &Table, outcome: &str, group: &str) -> ChartResult<ChartData> {
    let out_col = require(table, outcome)?;
    let group_col = require(table, group)?;

    let groups = sorted_distinct(group_col);
    let outcomes = sorted_distinct(out_col);
    let g_index: HashMap<&str, usize> =
        groups.iter().enumerate().map(|(i, g)| (g.as_str(), i)).collect();
    let o_index: HashMap<&str, usize> =
        outcomes.iter().enumerate().map(|(i, o)| (o.as_str(), i)).collect();
    let mut counts = vec![vec![0; outcomes.len()]; groups.len()];

    for row in 0..table.n_rows() {
        let (Some(g), Some(o)) = (group_col.text_at(row), out_col.text_at(row)) else {
            continue;
        };
        if let (Some(&gi), Some(&oi)) = (g_index.get(g.as_str()), o_index.get(o.as_str())) {
            counts[gi][oi] += 1;
        }
    }
    Ok(ChartData::GroupedOutcome {
        outcome: outcome.to_string(),
        group: group.to_string(),
        groups,
        outcomes,
        counts,
    })
}

/// Equal-width histogram over the present values. The last bin is closed.
pub fn histogram(table: &Table, column: &str, bins: usize) -> ChartResult<ChartData> {
    let col = require(table, column)?;
    if !col.dtype().is_numeric() {
        return Err(ChartError::NotNumeric(column.to_string()));
    }
    if bins == 0 {
        return Err(ChartError::InvalidParameter("bins must be at least 1".into()));
    }
    let values = col.present_f64();
    let empty = || ChartData::Histogram {
        column: column.to_string(),
        edges: Vec::new(),
        labels: Vec::new(),
        counts: Vec::new(),
    };
    let Some(mut lo) = values.iter().copied().reduce(f64::min) else {
        return Ok(empty());
    };
    let mut hi = values.iter().copied().fold(lo, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins)
        .map(|i| if i == bins { hi } else { lo + width * i as f64 })
        .collect();
    let mut counts = vec![0usize; bins];
    for v in &values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    let labels = edges[..bins].iter().map(|e| format!("{e:.1}")).collect();
    Ok(ChartData::Histogram {
        column: column.to_string(),
        edges,
        labels,
        counts,
    })
}

pub fn correlation_chart(table: &Table) -> ChartData {
    let corr = correlation_matrix(table);
    ChartData::Correlation {
        columns: corr.columns,
        matrix: corr.matrix,
    }
}

/// Counts per distinct value, most frequent first, ties by value.
pub fn value_counts(table: &Table, column: &str, limit: Option<usize>) -> ChartResult<ChartData> {
    let col = require(table, column)?;
    let mut pairs: Vec<(String, usize)> = count_by_label(col).into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| compare_labels(col, &a.0, &b.0)));
    if let Some(limit) = limit {
        pairs.truncate(limit);
    }
    let (labels, counts) = pairs.into_iter().unzip();
    Ok(ChartData::ValueCounts {
        column: column.to_string(),
        labels,
        counts,
    })
}

/// Build chart data for any request kind.
pub fn build_chart(table: &Table, request: &ChartRequest, config: &ChartConfig) -> ChartResult<ChartData> {
    debug!(?request, "building chart");
    match request {
        ChartRequest::BinaryOutcome { column } => binary_outcome(table, column),
        ChartRequest::GroupedOutcome { outcome, group } => grouped_outcome(table, outcome, group),
        ChartRequest::Histogram { column, bins } => {
            histogram(table, column, bins.unwrap_or(config.default_bins))
        }
        ChartRequest::Correlation => Ok(correlation_chart(table)),
        ChartRequest::ValueCounts { column, limit } => value_counts(table, column, *limit),
    }
}

/// Initial visualizations: the correlation matrix when there are at least two
/// numeric columns, then a histogram per numeric column.
pub fn default_charts(table: &Table, config: &ChartConfig) -> Vec<ChartData> {
    let numeric = table.numeric_columns();
    let mut charts = Vec::with_capacity(numeric.len() + 1);
    if numeric.len() >= 2 {
        charts.push(correlation_chart(table));
    }
    for col in numeric {
        if let Ok(chart) = histogram(table, col.name(), config.default_bins) {
            charts.push(chart);
        }
    }
    charts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titanic() -> Table {
        Table::new(vec![
            Column::new(
                "Survived",
                ColumnData::Integer(vec![Some(0), Some(1), Some(1), Some(0), Some(0), None]),
            ),
            Column::new(
                "Pclass",
                ColumnData::Integer(vec![Some(3), Some(1), Some(2), Some(3), Some(1), Some(3)]),
            ),
            Column::new(
                "Age",
                ColumnData::Float(vec![Some(22.0), Some(38.0), None, Some(35.0), Some(54.0), Some(2.0)]),
            ),
            Column::new(
                "Embarked",
                ColumnData::Categorical(vec![
                    Some("S".into()),
                    Some("C".into()),
                    Some("S".into()),
                    Some("Q".into()),
                    Some("S".into()),
                    None,
                ]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_binary_outcome() {
        let chart = binary_outcome(&titanic(), "Survived").unwrap();
        assert_eq!(
            chart,
            ChartData::BinaryOutcome {
                column: "Survived".into(),
                labels: vec!["0".into(), "1".into()],
                counts: vec![3, 2],
            }
        );
        assert_eq!(
            binary_outcome(&titanic(), "Fare"),
            Err(ChartError::ColumnNotFound("Fare".into()))
        );
        assert!(matches!(
            binary_outcome(&titanic(), "Embarked"),
            Err(ChartError::NotBinary { distinct: 3, .. })
        ));
    }

    #[test]
    fn test_grouped_outcome_sorted_by_group() {
        let ChartData::GroupedOutcome { groups, outcomes, counts, .. } =
            grouped_outcome(&titanic(), "Survived", "Pclass").unwrap()
        else {
            panic!("wrong chart kind");
        };
        assert_eq!(groups, vec!["1", "2", "3"]);
        assert_eq!(outcomes, vec!["0", "1"]);
        // the row with a missing outcome is skipped
        assert_eq!(counts, vec![vec![1, 1], vec![0, 1], vec![2, 0]]);
    }

    #[test]
    fn test_histogram_conservation() {
        let table = titanic();
        for bins in [1, 2, 3, 7, 20] {
            let ChartData::Histogram { counts, edges, labels, .. } =
                histogram(&table, "Age", bins).unwrap()
            else {
                panic!("wrong chart kind");
            };
            assert_eq!(counts.len(), bins);
            assert_eq!(edges.len(), bins + 1);
            assert_eq!(labels.len(), bins);
            assert_eq!(counts.iter().sum::<usize>(), 5);
        }
    }

    #[test]
    fn test_histogram_edge_cases() {
        let table = titanic();
        assert_eq!(
            histogram(&table, "Embarked", 5),
            Err(ChartError::NotNumeric("Embarked".into()))
        );
        assert!(matches!(
            histogram(&table, "Age", 0),
            Err(ChartError::InvalidParameter(_))
        ));

        let empty = Table::new(vec![Column::new("x", ColumnData::Float(vec![None, None]))]).unwrap();
        let ChartData::Histogram { counts, .. } = histogram(&empty, "x", 4).unwrap() else {
            panic!("wrong chart kind");
        };
        assert!(counts.is_empty());

        let flat = Table::new(vec![Column::new("x", ColumnData::Float(vec![Some(3.0); 4]))]).unwrap();
        let ChartData::Histogram { counts, edges, .. } = histogram(&flat, "x", 2).unwrap() else {
            panic!("wrong chart kind");
        };
        assert_eq!(edges, vec![2.5, 3.0, 3.5]);
        assert_eq!(counts.iter().sum::<usize>(), 4);
    }

    #[test]
    fn test_value_counts() {
        let chart = value_counts(&titanic(), "Embarked", Some(2)).unwrap();
        assert_eq!(
            chart,
            ChartData::ValueCounts {
                column: "Embarked".into(),
                labels: vec!["S".into(), "C".into()],
                counts: vec![3, 1],
            }
        );
    }

    #[test]
    fn test_request_json_and_defaults() {
        let request: ChartRequest =
            serde_json::from_str(r#"{"kind":"histogram","column":"Age"}"#).unwrap();
        let chart = build_chart(&titanic(), &request, &ChartConfig { default_bins: 4 }).unwrap();
        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["kind"], "histogram");
        assert_eq!(json["counts"].as_array().unwrap().len(), 4);

        let charts = default_charts(&titanic(), &ChartConfig::default());
        assert_eq!(charts.len(), 4);
        assert!(matches!(charts[0], ChartData::Correlation { .. }));
    }
}
