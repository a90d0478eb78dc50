//! Import-side types: raw tables, column mappings and standardized records

use serde::{Deserialize, Serialize};

/// A pre-parsed tabular row sequence handed over by the import facility.
///
/// Cells are kept as strings; numeric parsing happens in the validator so
/// that unparseable cells can be reported instead of silently dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    /// Column headers, in file order
    pub headers: Vec<String>,
    /// Data rows; each row is aligned with `headers`
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Position of a header, matched case-insensitively after trimming.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim();
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(wanted))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Unit of the elapsed-time column in the raw table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    #[default]
    Hours,
    Minutes,
    Seconds,
}

impl TimeUnit {
    /// Multiplier converting a value in this unit to hours.
    pub fn to_hours_factor(self) -> f64 {
        match self {
            TimeUnit::Hours => 1.0,
            TimeUnit::Minutes => 1.0 / 60.0,
            TimeUnit::Seconds => 1.0 / 3600.0,
        }
    }
}

/// User-supplied column -> field mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Header holding elapsed time
    pub time: String,
    /// Header holding bottomhole pressure (psi)
    pub pressure: String,
    /// Header holding flow rate, if the table has one
    #[serde(default)]
    pub rate: Option<String>,
    /// Unit of the time column
    #[serde(default)]
    pub time_unit: TimeUnit,
}

impl ColumnMapping {
    pub fn new(time: impl Into<String>, pressure: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            pressure: pressure.into(),
            rate: None,
            time_unit: TimeUnit::Hours,
        }
    }

    pub fn with_rate(mut self, rate: impl Into<String>) -> Self {
        self.rate = Some(rate.into());
        self
    }

    pub fn with_time_unit(mut self, unit: TimeUnit) -> Self {
        self.time_unit = unit;
        self
    }
}

/// One canonical observation of a pressure-transient test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    /// Elapsed time since start of the test period (hours, >= 0)
    pub time: f64,
    /// Bottomhole pressure (psi)
    pub pressure: f64,
    /// Surface flow rate (STB/d or Mscf/d); 0 during shut-in
    pub rate: f64,
}

impl TestRecord {
    pub fn new(time: f64, pressure: f64, rate: f64) -> Self {
        Self { time, pressure, rate }
    }
}

/// Structured outcome of import validation.
///
/// Errors block progression from column mapping to setup; warnings are
/// advisory only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}
