//! Background work requested by the reducer
//!
//! Jobs own immutable snapshots of their inputs, so the session can keep
//! changing while one runs. The actor executes them off the async runtime.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::commands::TaskKind;
use crate::config::{DerivativeSettings, MatchingSettings, QualityThresholds, RegimeSettings};
use crate::diagnostics::run_diagnostics;
use crate::matching::{
    AutoMatchOptimizer, AutoMatchResult, MatchObjective, MatchQualityEvaluator, OptimizerProgress,
};
use crate::physics_engine::{build_model, BourdetDerivativeEngine, ModelError, ReservoirContext};
use crate::types::{
    DiagnosticsResult, ModelId, ModelParameters, TestConfiguration, TestRecord,
};

/// Side effect returned alongside a new state.
#[derive(Debug, Clone)]
pub enum Effect {
    RunDiagnostics(DiagnosticsJob),
    RunAutoMatch(AutoMatchJob),
    /// Cancel whatever is running for this task kind
    Cancel(TaskKind),
}

#[derive(Debug, Clone)]
pub struct DiagnosticsJob {
    pub generation: u64,
    pub records: Arc<[TestRecord]>,
    pub config: Arc<TestConfiguration>,
    pub derivative: DerivativeSettings,
    pub regimes: RegimeSettings,
}

impl DiagnosticsJob {
    pub fn run(&self) -> DiagnosticsResult {
        run_diagnostics(&self.records, &self.config, &self.derivative, &self.regimes)
    }
}

#[derive(Debug, Clone)]
pub struct AutoMatchJob {
    pub generation: u64,
    pub model: ModelId,
    pub context: ReservoirContext,
    pub diagnostics: Arc<DiagnosticsResult>,
    pub start: ModelParameters,
    pub derivative: DerivativeSettings,
    pub matching: MatchingSettings,
    pub quality: QualityThresholds,
}

impl AutoMatchJob {
    /// Run the optimizer. Blocking; `progress` fires once per iteration.
    pub fn run(
        &self,
        cancel: &CancellationToken,
        progress: impl FnMut(&OptimizerProgress),
    ) -> Result<AutoMatchResult, ModelError> {
        let model = build_model(self.model, self.context)?;
        let objective = MatchObjective::new(
            model.as_ref(),
            &self.diagnostics.points,
            BourdetDerivativeEngine::from_settings(&self.derivative),
            self.matching.derivative_weight,
        );
        let optimizer =
            AutoMatchOptimizer::new(self.matching, MatchQualityEvaluator::new(self.quality));
        Ok(optimizer.optimize(
            &objective,
            model.tunable_parameters(),
            self.start,
            cancel,
            progress,
        ))
    }
}
