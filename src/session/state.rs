//! Interpretation session state
//!
//! `SessionState` is an immutable value as far as the rest of the crate is
//! concerned: the reducer produces a new state per command, and the actor
//! publishes each one as a read-only snapshot. Large members are behind
//! `Arc`, so cloning a state is cheap.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::history::ParameterHistory;
use crate::config::{DerivativeSettings, EngineConfig};
use crate::matching::AutoMatchResult;
use crate::types::{
    ColumnMapping, DiagnosticsResult, FlowCapacity, MatchQuality, ModelId, ModelParameters,
    RawTable, TestConfiguration, TestRecord, ValidationReport,
};

/// Import wizard stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStage {
    #[default]
    Upload,
    ColumnMapping,
    Setup,
    Complete,
}

/// Analysis view shown once import is complete. Navigation is free-form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Diagnostics,
    Matching,
    Forecast,
}

/// Settings that change diagnostic results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessingSettings {
    /// Bourdet smoothing window L (log10 cycles)
    pub smoothing_l: f64,
}

impl ProcessingSettings {
    pub fn from_engine(engine: &EngineConfig) -> Self {
        Self { smoothing_l: engine.derivative.smoothing_l }
    }

    pub fn is_valid(&self) -> bool {
        self.smoothing_l.is_finite() && self.smoothing_l >= 0.0
    }

    /// Derivative settings for this session, keeping the engine's time floor.
    pub fn derivative_settings(&self, engine: &EngineConfig) -> DerivativeSettings {
        DerivativeSettings {
            smoothing_l: self.smoothing_l,
            ..engine.derivative
        }
    }
}

/// Presentation-only settings; never affect computed results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySettings {
    pub show_derivative: bool,
    pub show_model_curve: bool,
    pub show_regimes: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_derivative: true,
            show_model_curve: true,
            show_regimes: true,
        }
    }
}

/// Settings persisted under the `app_settings` key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    pub processing: ProcessingSettings,
    #[serde(default)]
    pub display: DisplaySettings,
}

/// Generation counter for one kind of background task.
///
/// `requested` is bumped for every new request; `settled` is the newest
/// generation whose outcome has been applied (or invalidated). A task is in
/// flight while `settled < requested`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskGeneration {
    pub requested: u64,
    pub settled: u64,
}

impl TaskGeneration {
    /// Start a new request, returning its generation.
    pub fn request(&mut self) -> u64 {
        self.requested += 1;
        self.requested
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.requested
    }

    pub fn settle(&mut self, generation: u64) {
        self.settled = self.settled.max(generation);
    }

    /// Supersede anything in flight without starting a new task.
    pub fn invalidate(&mut self) {
        self.requested += 1;
        self.settled = self.requested;
    }

    pub fn in_flight(&self) -> bool {
        self.settled < self.requested
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskGenerations {
    pub diagnostics: TaskGeneration,
    pub auto_match: TaskGeneration,
}

/// Complete interpretation session state.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub stage: ImportStage,
    pub view: View,
    pub raw_table: Option<Arc<RawTable>>,
    pub column_mapping: Option<ColumnMapping>,
    pub validation: Option<ValidationReport>,
    pub records: Arc<[TestRecord]>,
    pub test_config: Option<Arc<TestConfiguration>>,
    pub processing: ProcessingSettings,
    pub display: DisplaySettings,
    pub diagnostics: Option<Arc<DiagnosticsResult>>,
    pub model: ModelId,
    pub parameters: ModelParameters,
    pub match_quality: Option<MatchQuality>,
    pub flow_capacity: Option<FlowCapacity>,
    pub pending_match: Option<AutoMatchResult>,
    pub tasks: TaskGenerations,
    pub history: ParameterHistory,
    /// Engine tuning this session was started with
    pub engine: Arc<EngineConfig>,
}

/// Read-only view published after every command.
pub type SessionSnapshot = SessionState;

impl SessionState {
    pub fn new(engine: Arc<EngineConfig>) -> Self {
        let model = engine.matching.default_model;
        Self {
            stage: ImportStage::Upload,
            view: View::Diagnostics,
            raw_table: None,
            column_mapping: None,
            validation: None,
            records: Arc::from(Vec::new()),
            test_config: None,
            processing: ProcessingSettings::from_engine(&engine),
            display: DisplaySettings::default(),
            diagnostics: None,
            model,
            parameters: engine.templates.parameters_for(model),
            match_quality: None,
            flow_capacity: None,
            pending_match: None,
            tasks: TaskGenerations::default(),
            history: ParameterHistory::new(engine.session.history_depth),
            engine,
        }
    }

    pub fn app_settings(&self) -> AppSettings {
        AppSettings {
            processing: self.processing,
            display: self.display,
        }
    }

    /// Test configuration, but only once setup has been completed.
    pub fn active_config(&self) -> Option<&Arc<TestConfiguration>> {
        match self.stage {
            ImportStage::Complete => self.test_config.as_ref(),
            _ => None,
        }
    }

    pub fn derivative_settings(&self) -> DerivativeSettings {
        self.processing.derivative_settings(&self.engine)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_uses_templates() {
        let state = SessionState::new(Arc::new(EngineConfig::default()));
        assert_eq!(state.stage, ImportStage::Upload);
        assert_eq!(state.model, ModelId::WellboreStorageRadial);
        assert_eq!(state.parameters.permeability_md, 10.0);
        assert_eq!(state.processing.smoothing_l, 0.3);
        assert!(state.active_config().is_none());
    }

    #[test]
    fn test_task_generation_lifecycle() {
        let mut g = TaskGeneration::default();
        assert!(!g.in_flight());
        let first = g.request();
        let second = g.request();
        assert!(g.in_flight());
        assert!(!g.is_current(first));
        assert!(g.is_current(second));
        g.settle(second);
        assert!(!g.in_flight());

        g.request();
        g.invalidate();
        assert!(!g.in_flight());
        assert_eq!(g.settled, g.requested);
    }
}
