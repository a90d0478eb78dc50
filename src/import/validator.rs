//! Raw row standardization
//!
//! Every problem found in the table is reported instead of raised: blocking
//! problems land in `ValidationReport::errors`, questionable rows in
//! `warnings`. Rows that cannot be used are dropped, rows that are merely
//! suspicious are kept.

use tracing::{debug, info};

use crate::config::defaults::MIN_VALID_RECORDS;
use crate::types::{ColumnMapping, RawTable, TestRecord, ValidationReport};

/// Validator output: the canonical records and what was wrong on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Standardized {
    /// Sorted, strictly increasing in time
    pub records: Vec<TestRecord>,
    pub report: ValidationReport,
}

impl Standardized {
    pub fn is_valid(&self) -> bool {
        self.report.is_valid()
    }
}

/// Resolved column positions for one mapping.
struct Columns {
    time: usize,
    pressure: usize,
    rate: Option<usize>,
}

/// Normalizes imported rows into `TestRecord`s.
pub struct Validator;

impl Validator {
    /// Validate `table` under `mapping` and build the canonical record list.
    pub fn standardize(table: &RawTable, mapping: &ColumnMapping) -> Standardized {
        let mut report = ValidationReport::default();

        if table.is_empty() {
            report.error("Table contains no data rows");
            return Standardized { records: Vec::new(), report };
        }

        let Some(columns) = Self::resolve_columns(table, mapping, &mut report) else {
            return Standardized { records: Vec::new(), report };
        };

        let factor = mapping.time_unit.to_hours_factor();
        let mut records = Vec::with_capacity(table.rows.len());
        for (i, row) in table.rows.iter().enumerate() {
            if let Some(record) = Self::parse_row(i + 1, row, &columns, factor, &mut report) {
                records.push(record);
            }
        }

        Self::order_by_time(&mut records, &mut report);

        if records.len() < MIN_VALID_RECORDS {
            report.error(format!(
                "Only {} valid records after standardization; at least {} are required",
                records.len(),
                MIN_VALID_RECORDS
            ));
        }

        info!(
            rows = table.rows.len(),
            records = records.len(),
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "Import standardized"
        );

        Standardized { records, report }
    }

    fn resolve_columns(
        table: &RawTable,
        mapping: &ColumnMapping,
        report: &mut ValidationReport,
    ) -> Option<Columns> {
        let time = table.column_index(&mapping.time);
        if time.is_none() {
            report.error(format!("Time column '{}' not found in table headers", mapping.time));
        }
        let pressure = table.column_index(&mapping.pressure);
        if pressure.is_none() {
            report.error(format!(
                "Pressure column '{}' not found in table headers",
                mapping.pressure
            ));
        }

        let rate = match &mapping.rate {
            Some(name) => match table.column_index(name) {
                Some(idx) => Some(idx),
                None => {
                    report.error(format!("Rate column '{name}' not found in table headers"));
                    None
                }
            },
            None => {
                report.warning("No rate column mapped; rate is taken as 0 for every record");
                None
            }
        };

        if !report.is_valid() {
            return None;
        }
        Some(Columns { time: time?, pressure: pressure?, rate })
    }

    fn parse_cell(
        line: usize,
        row: &[String],
        idx: usize,
        name: &str,
        report: &mut ValidationReport,
    ) -> Option<f64> {
        let Some(cell) = row.get(idx) else {
            report.warning(format!("Row {line}: missing {name} value, row dropped"));
            return None;
        };
        match cell.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            Ok(_) => {
                report.warning(format!("Row {line}: non-finite {name} '{cell}', row dropped"));
                None
            }
            Err(_) => {
                report.warning(format!("Row {line}: unparseable {name} '{cell}', row dropped"));
                None
            }
        }
    }

    fn parse_row(
        line: usize,
        row: &[String],
        columns: &Columns,
        hours_factor: f64,
        report: &mut ValidationReport,
    ) -> Option<TestRecord> {
        let time = Self::parse_cell(line, row, columns.time, "time", report)?;
        let pressure = Self::parse_cell(line, row, columns.pressure, "pressure", report)?;
        let rate = match columns.rate {
            Some(idx) => Self::parse_cell(line, row, idx, "rate", report)?,
            None => 0.0,
        };

        if time < 0.0 {
            report.warning(format!("Row {line}: negative time {time}, row dropped"));
            return None;
        }
        if pressure <= 0.0 {
            report.warning(format!("Row {line}: non-positive pressure {pressure}"));
        }

        Some(TestRecord::new(time * hours_factor, pressure, rate))
    }

    /// Sort by time and drop repeated time stamps, keeping the first row seen.
    fn order_by_time(records: &mut Vec<TestRecord>, report: &mut ValidationReport) {
        let out_of_order = records.windows(2).any(|w| w[1].time < w[0].time);
        if out_of_order {
            // Stable, so "first" below still means first in file order.
            records.sort_by(|a, b| a.time.total_cmp(&b.time));
            report.warning("Rows were not in time order and have been sorted");
        }

        let before = records.len();
        records.dedup_by(|later, earlier| later.time == earlier.time);
        let removed = before - records.len();
        if removed > 0 {
            debug!(removed, "Duplicate time stamps removed");
            report.warning(format!(
                "{removed} duplicate time value(s) removed, first occurrence kept"
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimeUnit;

    fn table(rows: &[[&str; 3]]) -> RawTable {
        RawTable::new(
            vec!["Time".to_string(), "Pressure".to_string(), "Rate".to_string()],
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn mapping() -> ColumnMapping {
        ColumnMapping::new("time", "pressure").with_rate("rate")
    }

    #[test]
    fn test_clean_table_standardizes_without_findings() {
        let t = table(&[["0.1", "3000", "500"], ["0.2", "2990", "500"], ["0.5", "2980", "500"]]);
        let out = Validator::standardize(&t, &mapping());
        assert!(out.is_valid());
        assert!(out.report.warnings.is_empty());
        assert_eq!(out.records.len(), 3);
        assert_eq!(out.records[2], TestRecord::new(0.5, 2980.0, 500.0));
    }

    #[test]
    fn test_empty_table_is_an_error() {
        let out = Validator::standardize(&table(&[]), &mapping());
        assert!(!out.is_valid());
        assert!(out.records.is_empty());
    }

    #[test]
    fn test_missing_mapped_column_is_an_error() {
        let t = table(&[["0.1", "3000", "500"]]);
        let out = Validator::standardize(&t, &ColumnMapping::new("elapsed", "pressure"));
        assert!(!out.is_valid());
        assert!(out.report.errors[0].contains("elapsed"));
    }

    #[test]
    fn test_unsorted_and_duplicate_rows_are_fixed_and_flagged() {
        let t = table(&[
            ["0.3", "2970", "500"],
            ["0.1", "3000", "500"],
            ["0.2", "2990", "500"],
            ["0.1", "1234", "500"],
        ]);
        let out = Validator::standardize(&t, &mapping());
        assert!(out.is_valid());
        let times: Vec<f64> = out.records.iter().map(|r| r.time).collect();
        assert_eq!(times, vec![0.1, 0.2, 0.3]);
        // First occurrence in file order wins
        assert_eq!(out.records[0].pressure, 3000.0);
        assert_eq!(out.report.warnings.len(), 2);
    }

    #[test]
    fn test_bad_cells_are_dropped_with_warnings() {
        let t = table(&[
            ["0.1", "3000", "500"],
            ["abc", "2990", "500"],
            ["-1", "2990", "500"],
            ["0.2", "NaN", "500"],
            ["0.3", "2980", "500"],
        ]);
        let out = Validator::standardize(&t, &mapping());
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.report.warnings.len(), 3);
        // Only two usable rows left: blocks progression
        assert!(!out.is_valid());
    }

    #[test]
    fn test_unmapped_rate_defaults_to_zero_with_warning() {
        let t = table(&[["1", "3000", "500"], ["2", "2990", "500"], ["3", "2980", "500"]]);
        let out = Validator::standardize(&t, &ColumnMapping::new("Time", "Pressure"));
        assert!(out.is_valid());
        assert!(out.records.iter().all(|r| r.rate == 0.0));
        assert_eq!(out.report.warnings.len(), 1);
    }

    #[test]
    fn test_minutes_are_converted_to_hours() {
        let t = table(&[["30", "3000", "0"], ["60", "2990", "0"], ["90", "2980", "0"]]);
        let out = Validator::standardize(&t, &mapping().with_time_unit(TimeUnit::Minutes));
        assert!((out.records[1].time - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_non_positive_pressure_is_kept_with_warning() {
        let t = table(&[["1", "0", "0"], ["2", "2990", "0"], ["3", "2980", "0"]]);
        let out = Validator::standardize(&t, &mapping());
        assert!(out.is_valid());
        assert_eq!(out.records.len(), 3);
        assert_eq!(out.report.warnings.len(), 1);
    }
}
