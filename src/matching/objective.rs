//! Log-space match objective
//!
//! Residuals are taken on log10 Δp and on log10 of the Bourdet derivative.
//! Pressure alone leaves permeability and skin nearly interchangeable; the
//! derivative level pins permeability down. The model derivative is run
//! through the same Bourdet engine as the data so that smoothing bias
//! cancels out.

use super::quality::MatchQualityEvaluator;
use crate::config::defaults::DELTA_P_FLOOR;
use crate::physics_engine::{BourdetDerivativeEngine, ReservoirModel};
use crate::types::{DiagnosticPoint, MatchQuality, ModelParameters};

/// Observed data prepared for repeated model comparison.
pub struct MatchObjective<'a> {
    model: &'a dyn ReservoirModel,
    engine: BourdetDerivativeEngine,
    derivative_weight: f64,
    times: Vec<f64>,
    /// (index, log10 Δp) of points with positive pressure change
    observed_pressure: Vec<(usize, f64)>,
    /// (index, log10 derivative) of points with a positive derivative
    observed_derivative: Vec<(usize, f64)>,
}

impl<'a> MatchObjective<'a> {
    pub fn new(
        model: &'a dyn ReservoirModel,
        points: &[DiagnosticPoint],
        engine: BourdetDerivativeEngine,
        derivative_weight: f64,
    ) -> Self {
        let log_positive = |v: f64| (v.is_finite() && v > 0.0).then(|| v.log10());

        let observed_pressure = points
            .iter()
            .enumerate()
            .filter_map(|(i, p)| log_positive(p.delta_pressure).map(|v| (i, v)))
            .collect();
        let observed_derivative = if derivative_weight > 0.0 {
            points
                .iter()
                .enumerate()
                .filter_map(|(i, p)| p.derivative.and_then(log_positive).map(|v| (i, v)))
                .collect()
        } else {
            Vec::new()
        };

        Self {
            model,
            engine,
            derivative_weight,
            times: points.iter().map(|p| p.superposition_time).collect(),
            observed_pressure,
            observed_derivative,
        }
    }

    /// Number of residuals the objective combines.
    pub fn residual_count(&self) -> usize {
        self.observed_pressure.len() + self.observed_derivative.len()
    }

    /// Modeled Δp at every observed superposition time.
    pub fn modeled_pressure(&self, params: &ModelParameters) -> Vec<f64> {
        self.times
            .iter()
            .map(|&t| self.model.pressure_change(params, t))
            .collect()
    }

    /// RMSE over the combined log residuals. `INFINITY` when nothing can be
    /// compared, so such a state is never preferred.
    pub fn rmse(&self, params: &ModelParameters) -> f64 {
        let count = self.residual_count();
        if count == 0 {
            return f64::INFINITY;
        }

        let modeled = self.modeled_pressure(params);
        let mut sum_sq: f64 = self
            .observed_pressure
            .iter()
            .map(|&(i, obs)| (obs - modeled[i].max(DELTA_P_FLOOR).log10()).powi(2))
            .sum();

        if !self.observed_derivative.is_empty() {
            let modeled_derivative = self.engine.compute(&self.times, &modeled);
            sum_sq += self
                .observed_derivative
                .iter()
                .map(|&(i, obs)| {
                    let m = modeled_derivative[i].unwrap_or(DELTA_P_FLOOR).max(DELTA_P_FLOOR);
                    (self.derivative_weight * (obs - m.log10())).powi(2)
                })
                .sum::<f64>();
        }

        (sum_sq / count as f64).sqrt()
    }

    /// Log-pressure fit score used for display and match ratings.
    pub fn quality(&self, params: &ModelParameters, evaluator: &MatchQualityEvaluator) -> MatchQuality {
        let modeled = self.modeled_pressure(params);
        let (observed, model): (Vec<f64>, Vec<f64>) = self
            .observed_pressure
            .iter()
            .map(|&(i, obs)| (obs, modeled[i].max(DELTA_P_FLOOR).log10()))
            .unzip();
        evaluator.evaluate(&observed, &model)
    }
}
