//! Superposition (equivalent) time and pressure change
//!
//! Buildup data is plotted against the time a drawdown would have needed to
//! produce the same pressure response, so that buildup and drawdown share one
//! set of type curves. Drawdown data needs no conversion.

use crate::types::{RatePeriod, TestConfiguration, TestRecord, TestType};

/// Agarwal equivalent time for a single producing period `tp`.
///
/// Returns `dt` unchanged when `tp` is not positive.
pub fn agarwal_time(dt: f64, tp: f64) -> f64 {
    if tp <= 0.0 || dt <= 0.0 {
        return dt;
    }
    tp * dt / (tp + dt)
}

/// Multi-rate equivalent time after a variable-rate producing history.
///
/// `history` lists the producing periods in chronological order; the last
/// period's rate normalizes the superposition exponents. Falls back to `dt`
/// when the history is empty, has no producing time, or ends at zero rate.
pub fn multi_rate_time(dt: f64, history: &[RatePeriod]) -> f64 {
    let tp: f64 = history.iter().map(|p| p.duration_hours).sum();
    let q_last = history.last().map_or(0.0, |p| p.rate);
    if history.is_empty() || tp <= 0.0 || q_last == 0.0 || dt <= 0.0 {
        return dt;
    }

    let mut log_te = 0.0;
    let mut period_start = 0.0;
    let mut q_prev = 0.0;
    for period in history {
        let tau = tp - period_start;
        if tau > 0.0 {
            let exponent = (period.rate - q_prev) / q_last;
            log_te += exponent * (tau * dt / (tau + dt)).ln();
        }
        period_start += period.duration_hours;
        q_prev = period.rate;
    }

    let te = log_te.exp();
    if te.is_finite() { te } else { dt }
}

/// Equivalent time for one elapsed time under `config`, floored at `floor`.
pub fn equivalent_time(dt: f64, config: &TestConfiguration, floor: f64) -> f64 {
    let te = match config.test_type {
        TestType::Drawdown => dt,
        TestType::Buildup if config.rate_history.len() > 1 => {
            multi_rate_time(dt, &config.rate_history)
        }
        TestType::Buildup => agarwal_time(dt, config.total_producing_time()),
    };
    te.max(floor)
}

/// Equivalent time for every record.
pub fn superposition_times(
    records: &[TestRecord],
    config: &TestConfiguration,
    floor: f64,
) -> Vec<f64> {
    records
        .iter()
        .map(|r| equivalent_time(r.time, config, floor))
        .collect()
}

/// Pressure the drawdown is measured from: the configured initial pressure
/// when one was given, otherwise the first recorded pressure.
pub fn reference_pressure(records: &[TestRecord], config: &TestConfiguration) -> f64 {
    if config.initial_pressure_psi > 0.0 {
        config.initial_pressure_psi
    } else {
        records.first().map_or(0.0, |r| r.pressure)
    }
}

/// Pressure change of every record, positive for a normal response.
///
/// Drawdown: `p_ref - p`. Buildup: `p - p(Δt=first)`.
pub fn delta_pressures(records: &[TestRecord], config: &TestConfiguration) -> Vec<f64> {
    match config.test_type {
        TestType::Drawdown => {
            let p_ref = reference_pressure(records, config);
            records.iter().map(|r| p_ref - r.pressure).collect()
        }
        TestType::Buildup => {
            let p_first = records.first().map_or(0.0, |r| r.pressure);
            records.iter().map(|r| r.pressure - p_first).collect()
        }
    }
}
