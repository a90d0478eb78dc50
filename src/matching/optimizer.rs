//! Deterministic auto-match optimizer
//!
//! Coordinate pattern search over the model's tunable parameters. Each
//! iteration tries one step up and one step down per parameter, keeps the
//! better of the two only if it strictly lowers the objective, then shrinks
//! the step. There is no randomness: the same data and starting point always
//! produce the same result.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::confidence::score_confidence;
use super::objective::MatchObjective;
use super::quality::MatchQualityEvaluator;
use crate::config::defaults::{
    FAULT_DISTANCE_BOUNDS, PERMEABILITY_BOUNDS, SKIN_BOUNDS, WELLBORE_STORAGE_BOUNDS,
};
use crate::config::MatchingSettings;
use crate::types::{MatchQuality, ModelParameters, ParameterKind};

/// Why the search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Iteration cap reached
    MaxIterations,
    /// Step shrank below the minimum
    StepConverged,
    /// A newer request superseded this one
    Cancelled,
    /// No observed point could be compared with the model
    NoUsableData,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::MaxIterations => write!(f, "iteration limit reached"),
            StopReason::StepConverged => write!(f, "step converged"),
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::NoUsableData => write!(f, "no usable data"),
        }
    }
}

/// Side-channel notification after each completed iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerProgress {
    pub iteration: usize,
    pub step: f64,
    pub best_rmse: f64,
    pub parameters: ModelParameters,
}

/// Outcome of one auto-match run. Nothing here is committed until the
/// session accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoMatchResult {
    pub parameters: ModelParameters,
    pub initial_rmse: f64,
    pub rmse: f64,
    pub quality: MatchQuality,
    /// Relative objective improvement, 0..1
    pub confidence: f64,
    pub iterations: usize,
    pub stop_reason: StopReason,
}

/// Physical search bounds for one parameter.
pub fn parameter_bounds(kind: ParameterKind) -> (f64, f64) {
    match kind {
        ParameterKind::Permeability => PERMEABILITY_BOUNDS,
        ParameterKind::Skin => SKIN_BOUNDS,
        ParameterKind::WellboreStorage => WELLBORE_STORAGE_BOUNDS,
        ParameterKind::FaultDistance => FAULT_DISTANCE_BOUNDS,
    }
}

/// Pattern-search optimizer
pub struct AutoMatchOptimizer {
    settings: MatchingSettings,
    evaluator: MatchQualityEvaluator,
}

impl AutoMatchOptimizer {
    pub fn new(settings: MatchingSettings, evaluator: MatchQualityEvaluator) -> Self {
        Self { settings, evaluator }
    }

    /// Perturbed value of `kind`, clamped to its physical bounds.
    ///
    /// Skin moves additively; the scale parameters move multiplicatively so
    /// a step means the same thing at 1 md and at 1000 md.
    fn perturb(&self, kind: ParameterKind, value: f64, step: f64, sign: f64) -> f64 {
        let next = match kind {
            ParameterKind::Skin => value + sign * step * self.settings.skin_step_scale,
            _ => value * (1.0 + sign * step),
        };
        let (lo, hi) = parameter_bounds(kind);
        next.clamp(lo, hi)
    }

    /// Fit `tunable` parameters starting from `start`.
    ///
    /// `progress` is called once per completed iteration and must not
    /// block. `cancel` is checked before every iteration.
    pub fn optimize(
        &self,
        objective: &MatchObjective<'_>,
        tunable: &[ParameterKind],
        start: ModelParameters,
        cancel: &CancellationToken,
        mut progress: impl FnMut(&OptimizerProgress),
    ) -> AutoMatchResult {
        let initial_rmse = objective.rmse(&start);
        let mut best = start;
        let mut best_rmse = initial_rmse;
        let mut step = self.settings.initial_step;
        let mut iterations = 0;

        let stop_reason = if objective.residual_count() == 0 {
            StopReason::NoUsableData
        } else {
            loop {
                // 1. Termination checks
                if iterations >= self.settings.max_iterations {
                    break StopReason::MaxIterations;
                }
                if step < self.settings.min_step {
                    break StopReason::StepConverged;
                }
                if cancel.is_cancelled() {
                    break StopReason::Cancelled;
                }

                // 2. One exploratory move per parameter, in model order
                for &kind in tunable {
                    let Some(value) = best.get(kind) else {
                        continue;
                    };
                    let up = best.with(kind, self.perturb(kind, value, step, 1.0));
                    let down = best.with(kind, self.perturb(kind, value, step, -1.0));
                    let up_rmse = objective.rmse(&up);
                    let down_rmse = objective.rmse(&down);

                    let (candidate, candidate_rmse) = if down_rmse < up_rmse {
                        (down, down_rmse)
                    } else {
                        (up, up_rmse)
                    };
                    if candidate_rmse < best_rmse {
                        best = candidate;
                        best_rmse = candidate_rmse;
                    }
                }

                // 3. Shrink and report
                step *= self.settings.step_decay;
                iterations += 1;
                progress(&OptimizerProgress {
                    iteration: iterations,
                    step,
                    best_rmse,
                    parameters: best,
                });
            }
        };

        let confidence = score_confidence(initial_rmse, best_rmse);
        let quality = objective.quality(&best, &self.evaluator);

        if stop_reason == StopReason::Cancelled {
            debug!(iterations, "Auto-match cancelled");
        } else {
            info!(
                iterations,
                %stop_reason,
                initial_rmse,
                rmse = best_rmse,
                confidence,
                k = best.permeability_md,
                skin = best.skin,
                c = best.wellbore_storage_bbl_psi,
                "Auto-match finished"
            );
        }

        AutoMatchResult {
            parameters: best,
            initial_rmse,
            rmse: best_rmse,
            quality,
            confidence,
            iterations,
            stop_reason,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DerivativeSettings, RegimeSettings};
    use crate::diagnostics::run_diagnostics;
    use crate::physics_engine::{
        BourdetDerivativeEngine, ReservoirContext, ReservoirModel, WellboreStorageRadial,
    };
    use crate::types::{DiagnosticPoint, TestConfiguration, TestRecord, TestType};

    const INITIAL_PRESSURE: f64 = 5000.0;

    fn make_config() -> TestConfiguration {
        TestConfiguration {
            test_type: TestType::Drawdown,
            initial_pressure_psi: INITIAL_PRESSURE,
            ..Default::default()
        }
    }

    fn make_records(config: &TestConfiguration) -> Vec<TestRecord> {
        let truth = ModelParameters::new(50.0, 5.0, 0.02);
        let ctx = ReservoirContext {
            rate: 500.0,
            ..ReservoirContext::from_configuration(config, &[])
        };
        let model = WellboreStorageRadial::new(ctx);
        (0..20)
            .map(|i| {
                let t = 0.01 * 10f64.powf(4.0 * i as f64 / 19.0);
                let noise = 1.0 + 0.01 * (i as f64 * 1.7 + 0.3).sin();
                let dp = model.pressure_change(&truth, t) * noise;
                TestRecord::new(t, INITIAL_PRESSURE - dp, 500.0)
            })
            .collect()
    }

    fn make_points(smoothing_l: f64) -> (ReservoirContext, Vec<DiagnosticPoint>) {
        let config = make_config();
        let records = make_records(&config);
        let settings = DerivativeSettings {
            smoothing_l,
            ..Default::default()
        };
        let result = run_diagnostics(&records, &config, &settings, &RegimeSettings::default());
        (ReservoirContext::from_configuration(&config, &records), result.points)
    }

    fn make_optimizer() -> AutoMatchOptimizer {
        AutoMatchOptimizer::new(MatchingSettings::default(), MatchQualityEvaluator::default())
    }

    fn default_l() -> f64 {
        DerivativeSettings::default().smoothing_l
    }

    fn start() -> ModelParameters {
        ModelParameters::new(10.0, 0.0, 0.01)
    }

    fn run(smoothing_l: f64, settings: MatchingSettings) -> (AutoMatchResult, Vec<OptimizerProgress>) {
        let (ctx, points) = make_points(smoothing_l);
        let model = WellboreStorageRadial::new(ctx);
        let engine = BourdetDerivativeEngine::default().with_smoothing(smoothing_l);
        let objective = MatchObjective::new(&model, &points, engine, settings.derivative_weight);
        let optimizer = AutoMatchOptimizer::new(settings, MatchQualityEvaluator::default());
        let mut events = Vec::new();
        let result = optimizer.optimize(
            &objective,
            model.tunable_parameters(),
            start(),
            &CancellationToken::new(),
            |p| events.push(*p),
        );
        (result, events)
    }

    #[test]
    fn test_recovers_synthetic_parameters() {
        let (result, _) = run(default_l(), MatchingSettings::default());
        let p = result.parameters;
        assert!(
            (p.permeability_md - 50.0).abs() / 50.0 < 0.10,
            "k = {}",
            p.permeability_md
        );
        assert!((p.skin - 5.0).abs() < 1.0, "s = {}", p.skin);
        assert!(result.rmse < 0.06, "rmse = {}", result.rmse);
        assert!(result.confidence > 0.8, "confidence = {}", result.confidence);
        assert_eq!(result.stop_reason, StopReason::MaxIterations);
        assert_eq!(result.iterations, 50);
    }

    #[test]
    fn test_recovers_with_light_smoothing() {
        let (result, _) = run(0.2, MatchingSettings::default());
        let k = result.parameters.permeability_md;
        assert!((k - 50.0).abs() / 50.0 < 0.10, "k = {k}");
        assert!(result.rmse < 0.12, "rmse = {}", result.rmse);
    }

    #[test]
    fn test_is_bit_for_bit_deterministic() {
        let (a, _) = run(default_l(), MatchingSettings::default());
        let (b, _) = run(default_l(), MatchingSettings::default());
        assert_eq!(a.parameters.permeability_md.to_bits(), b.parameters.permeability_md.to_bits());
        assert_eq!(a.parameters.skin.to_bits(), b.parameters.skin.to_bits());
        assert_eq!(
            a.parameters.wellbore_storage_bbl_psi.to_bits(),
            b.parameters.wellbore_storage_bbl_psi.to_bits()
        );
        assert_eq!(a.rmse.to_bits(), b.rmse.to_bits());
    }

    #[test]
    fn test_progress_is_reported_every_iteration_and_never_worsens() {
        let (result, events) = run(default_l(), MatchingSettings::default());
        assert_eq!(events.len(), result.iterations);
        assert!(events.windows(2).all(|w| w[1].best_rmse <= w[0].best_rmse));
        assert!(events.last().is_some_and(|e| e.best_rmse == result.rmse));
    }

    #[test]
    fn test_iteration_cap_is_respected() {
        let settings = MatchingSettings {
            max_iterations: 3,
            ..Default::default()
        };
        let (result, events) = run(default_l(), settings);
        assert_eq!(result.iterations, 3);
        assert_eq!(events.len(), 3);
        assert_eq!(result.stop_reason, StopReason::MaxIterations);
    }

    #[test]
    fn test_small_step_stops_immediately() {
        let settings = MatchingSettings {
            min_step: 0.5,
            ..Default::default()
        };
        let (result, events) = run(default_l(), settings);
        assert_eq!(result.stop_reason, StopReason::StepConverged);
        assert_eq!(result.iterations, 0);
        assert!(events.is_empty());
        assert!(result.parameters.same_values(&start()));
    }

    #[test]
    fn test_cancelled_token_stops_before_first_iteration() {
        let (ctx, points) = make_points(default_l());
        let model = WellboreStorageRadial::new(ctx);
        let objective = MatchObjective::new(&model, &points, BourdetDerivativeEngine::default(), 1.0);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = make_optimizer().optimize(
            &objective,
            model.tunable_parameters(),
            start(),
            &cancel,
            |_| {},
        );
        assert_eq!(result.stop_reason, StopReason::Cancelled);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_no_usable_data_is_reported_not_raised() {
        let (ctx, _) = make_points(default_l());
        let model = WellboreStorageRadial::new(ctx);
        let objective = MatchObjective::new(&model, &[], BourdetDerivativeEngine::default(), 1.0);
        let result = make_optimizer().optimize(
            &objective,
            model.tunable_parameters(),
            start(),
            &CancellationToken::new(),
            |_| {},
        );
        assert_eq!(result.stop_reason, StopReason::NoUsableData);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.quality.points, 0);
    }

    #[test]
    fn test_perturbation_respects_bounds() {
        let optimizer = make_optimizer();
        assert_eq!(
            optimizer.perturb(ParameterKind::Skin, 49.5, 0.1, 1.0),
            SKIN_BOUNDS.1
        );
        assert_eq!(
            optimizer.perturb(ParameterKind::Permeability, PERMEABILITY_BOUNDS.0, 0.1, -1.0),
            PERMEABILITY_BOUNDS.0
        );
        assert!((optimizer.perturb(ParameterKind::WellboreStorage, 0.02, 0.1, 1.0) - 0.022).abs() < 1e-15);
    }
}
