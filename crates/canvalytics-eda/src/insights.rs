use canvalytics_core::Table;

use crate::profile::{correlation_matrix, missing_report};

const TOP_MISSING: usize = 3;

/// Short plain-text observations about a table, computed locally.
pub fn insights(table: &Table) -> Vec<String> {
    let mut lines = vec![format!(
        "The dataset has {} rows and {} columns.",
        table.n_rows(),
        table.n_columns()
    )];

    let report = missing_report(table);
    if report.missing_total == 0 {
        lines.push("There are no missing values.".to_string());
    } else {
        lines.push(format!(
            "{:.1}% of all cells are missing ({} cells).",
            report.missing_percentage, report.missing_total
        ));
        let top: Vec<String> = report
            .columns
            .iter()
            .take(TOP_MISSING)
            .map(|c| format!("{} ({:.1}%)", c.column, c.percentage))
            .collect();
        lines.push(format!("Most missing: {}.", top.join(", ")));
    }

    let duplicates = table.duplicate_rows();
    if duplicates > 0 {
        lines.push(format!("Duplicate rows: {duplicates}."));
    }

    let corr = correlation_matrix(table);
    let mut strongest: Option<(usize, usize, f64)> = None;
    for i in 0..corr.columns.len() {
        for j in (i + 1)..corr.columns.len() {
            if let Some(r) = corr.matrix[i][j] {
                if strongest.map_or(true, |(_, _, best)| r.abs() > best.abs()) {
                    strongest = Some((i, j, r));
                }
            }
        }
    }
    if let Some((i, j, r)) = strongest {
        lines.push(format!(
            "Strongest correlation: {} and {} (r = {r:.2}).",
            corr.columns[i], corr.columns[j]
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvalytics_core::{Column, ColumnData};

    #[test]
    fn test_insights() {
        let table = Table::new(vec![
            Column::new("a", ColumnData::Integer(vec![Some(1), Some(2), Some(3), Some(1), Some(4)])),
            Column::new("b", ColumnData::Float(vec![Some(2.0), Some(4.0), None, Some(2.0), Some(8.0)])),
            Column::new(
                "c",
                ColumnData::Float(vec![Some(5.0), Some(1.0), Some(4.0), Some(5.0), Some(2.0)]),
            ),
        ])
        .unwrap();
        let lines = insights(&table);
        assert_eq!(lines[0], "The dataset has 5 rows and 3 columns.");
        assert!(lines[2].contains("b (20.0%)"));
        assert!(lines.iter().any(|l| l == "Duplicate rows: 1."));
        assert!(lines.last().unwrap().contains("a and b"));
    }

    #[test]
    fn test_clean_table() {
        let lines = insights(&Table::empty());
        assert_eq!(lines, vec![
            "The dataset has 0 rows and 0 columns.".to_string(),
            "There are no missing values.".to_string(),
        ]);
    }
}
