//! Shared data structures for pressure-transient interpretation
//!
//! This module defines the core types for the interpretation pipeline:
//! - Import: RawTable, ColumnMapping, TestRecord, ValidationReport
//! - Setup: TestConfiguration (test type, fluid and formation properties)
//! - Diagnostics: DiagnosticPoint, FlowRegime, FlowRegimeSegment
//! - Matching: ModelParameters, ParameterUpdate, MatchQuality, FlowCapacity

mod records;
mod test_config;
mod diagnostics;
mod matching;

pub use records::*;
pub use test_config::*;
pub use diagnostics::*;
pub use matching::*;
