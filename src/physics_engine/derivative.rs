//! Bourdet logarithmic pressure derivative
//!
//! The derivative `dΔp/d ln(te)` is the main diagnostic of pressure-transient
//! analysis: each flow regime leaves a characteristic slope on a log-log plot.
//! Raw point-to-point differences amplify gauge noise, so each point is
//! differenced against the nearest neighbours at least `L` log cycles away
//! and the two one-sided slopes are blended, weighted by distance.

use std::f64::consts::LN_10;

use crate::config::DerivativeSettings;

/// Smallest neighbour distance accepted in ln(time), so L = 0 still means
/// "adjacent distinct point" rather than a zero-width difference.
const MIN_LOG_SPACING: f64 = 1e-12;

/// Smoothed Bourdet derivative calculator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BourdetDerivativeEngine {
    /// Smoothing window L in log10 cycles of time
    pub smoothing_l: f64,
    /// Floor applied to time before its logarithm
    pub time_floor: f64,
}

impl Default for BourdetDerivativeEngine {
    fn default() -> Self {
        Self::from_settings(&DerivativeSettings::default())
    }
}

impl BourdetDerivativeEngine {
    pub fn new(smoothing_l: f64, time_floor: f64) -> Self {
        Self { smoothing_l, time_floor }
    }

    pub fn from_settings(settings: &DerivativeSettings) -> Self {
        Self::new(settings.smoothing_l, settings.time_floor_hours)
    }

    /// Same engine with a different smoothing window.
    pub fn with_smoothing(self, smoothing_l: f64) -> Self {
        Self { smoothing_l, ..self }
    }

    /// Derivative of `delta_p` with respect to ln(`times`).
    ///
    /// The output has one entry per input pair (the shorter slice wins).
    /// Points with no usable neighbour on either side, or whose result is
    /// not finite, are `None`.
    pub fn compute(&self, times: &[f64], delta_p: &[f64]) -> Vec<Option<f64>> {
        let n = times.len().min(delta_p.len());
        let x: Vec<f64> = times[..n]
            .iter()
            .map(|&t| t.max(self.time_floor).ln())
            .collect();
        let y = &delta_p[..n];
        // Neighbours are searched in ln(time)
        let spacing = if self.smoothing_l.is_finite() {
            (self.smoothing_l * LN_10).max(MIN_LOG_SPACING)
        } else {
            MIN_LOG_SPACING
        };

        (0..n)
            .map(|i| {
                let left = (0..i).rev().find(|&j| x[i] - x[j] >= spacing);
                let right = (i + 1..n).find(|&j| x[j] - x[i] >= spacing);

                let value = match (left, right) {
                    (Some(l), Some(r)) => {
                        let dx_l = x[i] - x[l];
                        let dx_r = x[r] - x[i];
                        let m_l = (y[i] - y[l]) / dx_l;
                        let m_r = (y[r] - y[i]) / dx_r;
                        (dx_r * m_l + dx_l * m_r) / (dx_l + dx_r)
                    }
                    (Some(l), None) => (y[i] - y[l]) / (x[i] - x[l]),
                    (None, Some(r)) => (y[r] - y[i]) / (x[r] - x[i]),
                    (None, None) => return None,
                };

                value.is_finite().then_some(value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_times(n: usize, t0: f64, t1: f64) -> Vec<f64> {
        let (l0, l1) = (t0.log10(), t1.log10());
        (0..n)
            .map(|i| 10f64.powf(l0 + (l1 - l0) * i as f64 / (n - 1) as f64))
            .collect()
    }

    #[test]
    fn test_semilog_straight_line_gives_constant_derivative() {
        let times = log_times(40, 0.001, 1000.0);
        let (a, b) = (12.5, 300.0);
        let dp: Vec<f64> = times.iter().map(|t| a * t.ln() + b).collect();

        for l in [0.0, 0.1, 0.2, 0.5, 1.0] {
            let d = BourdetDerivativeEngine::new(l, 1e-9).compute(&times, &dp);
            for (i, v) in d.iter().enumerate() {
                let v = v.unwrap_or_else(|| panic!("L={l} point {i} missing"));
                assert!((v - a).abs() < 1e-6, "L={l} point {i}: {v} != {a}");
            }
        }
    }

    #[test]
    fn test_unit_slope_is_recovered() {
        // Δp ∝ t gives dΔp/dln t = Δp
        let times = log_times(30, 0.01, 1.0);
        let dp: Vec<f64> = times.iter().map(|t| 100.0 * t).collect();
        let d = BourdetDerivativeEngine::new(0.1, 1e-9).compute(&times, &dp);
        for i in 5..25 {
            let ratio = d[i].unwrap() / dp[i];
            assert!((ratio - 1.0).abs() < 0.05, "point {i}: ratio {ratio}");
        }
    }

    #[test]
    fn test_window_is_measured_in_log_cycles() {
        // 0.21 log cycles between samples
        let times: Vec<f64> = (0..5).map(|i| 10f64.powf(0.21 * i as f64)).collect();
        let dp = vec![0.0, 0.0, 1.0, 3.0, 4.0];
        let h = 0.21 * LN_10;

        // L = 0.2 cycles reaches the adjacent samples
        let d = BourdetDerivativeEngine::new(0.2, 1e-9).compute(&times, &dp);
        assert!((d[2].unwrap() - 1.5 / h).abs() < 1e-9);

        // L = 0.3 cycles skips them
        let d = BourdetDerivativeEngine::new(0.3, 1e-9).compute(&times, &dp);
        assert!((d[2].unwrap() - 1.0 / h).abs() < 1e-9);
    }

    #[test]
    fn test_window_wider_than_data_yields_none() {
        let times = vec![1.0, 1.1, 1.2];
        let dp = vec![1.0, 2.0, 3.0];
        let d = BourdetDerivativeEngine::new(5.0, 1e-9).compute(&times, &dp);
        assert_eq!(d, vec![None, None, None]);
    }

    #[test]
    fn test_edges_use_one_sided_slope() {
        let times = vec![1.0, std::f64::consts::E, std::f64::consts::E.powi(2)];
        let dp = vec![0.0, 2.0, 6.0];
        let d = BourdetDerivativeEngine::new(0.0, 1e-9).compute(&times, &dp);
        assert!((d[0].unwrap() - 2.0).abs() < 1e-9);
        assert!((d[2].unwrap() - 4.0).abs() < 1e-9);
        // Interior: equal spacing, plain average of 2 and 4
        assert!((d[1].unwrap() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_inputs_never_panic() {
        let engine = BourdetDerivativeEngine::default();
        assert!(engine.compute(&[], &[]).is_empty());
        assert_eq!(engine.compute(&[1.0], &[5.0]), vec![None]);

        // Zero and negative times are floored; repeated times have no spacing
        let d = engine.compute(&[0.0, -1.0, 0.0], &[1.0, 2.0, 3.0]);
        assert_eq!(d, vec![None, None, None]);

        // Non-finite pressure is contained to the points that touch it
        let times = log_times(6, 0.1, 10.0);
        let d = engine.compute(&times, &[1.0, 2.0, f64::NAN, 4.0, 5.0, 6.0]);
        assert!(d[2].is_none());
        assert!(d[5].is_some());
    }

    #[test]
    fn test_mismatched_lengths_use_shorter() {
        let times = log_times(10, 0.1, 10.0);
        let d = BourdetDerivativeEngine::default().compute(&times, &[1.0, 2.0, 3.0]);
        assert_eq!(d.len(), 3);
    }
}
