//! Diagnostics branch: superposition time → Bourdet derivative → flow regimes
//!
//! `run_diagnostics` is idempotent and pure; re-running it with the same
//! records, configuration and settings reproduces the same result.

pub mod regime_classifier;

pub use regime_classifier::FlowRegimeClassifier;

use tracing::info;

use crate::config::{DerivativeSettings, RegimeSettings};
use crate::physics_engine::{delta_pressures, superposition_times, BourdetDerivativeEngine};
use crate::types::{DiagnosticPoint, DiagnosticsResult, TestConfiguration, TestRecord};

/// Compute diagnostic points and flow-regime segments for `records`.
pub fn run_diagnostics(
    records: &[TestRecord],
    config: &TestConfiguration,
    derivative: &DerivativeSettings,
    regimes: &RegimeSettings,
) -> DiagnosticsResult {
    let floor = derivative.time_floor_hours;
    let te = superposition_times(records, config, floor);
    let dp = delta_pressures(records, config);
    let engine = BourdetDerivativeEngine::from_settings(derivative);
    let dprime = engine.compute(&te, &dp);

    let points: Vec<DiagnosticPoint> = records
        .iter()
        .zip(te.iter().zip(&dp).zip(&dprime))
        .map(|(record, ((&equivalent, &delta), &d))| DiagnosticPoint {
            time: record.time,
            superposition_time: equivalent,
            delta_pressure: delta,
            derivative: d,
        })
        .collect();

    let log_times: Vec<f64> = te.iter().map(|t| t.max(floor).ln()).collect();
    let segments = FlowRegimeClassifier::classify(&log_times, &dprime, regimes);

    info!(
        points = points.len(),
        with_derivative = dprime.iter().filter(|d| d.is_some()).count(),
        regimes = ?segments.iter().map(|s| s.regime).collect::<Vec<_>>(),
        "Diagnostics computed"
    );

    DiagnosticsResult { points, segments }
}
