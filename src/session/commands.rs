//! Session command set

use super::state::{DisplaySettings, ProcessingSettings, View};
use crate::matching::AutoMatchResult;
use crate::types::{
    ColumnMapping, DiagnosticsResult, ModelId, ParameterUpdate, RawTable, TestConfiguration,
};

/// Background task kinds, each with its own generation counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Diagnostics,
    AutoMatch,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Diagnostics => write!(f, "diagnostics"),
            TaskKind::AutoMatch => write!(f, "auto-match"),
        }
    }
}

/// Every state change goes through one of these.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    // ------------------------------------------------------------------
    // Import wizard
    // ------------------------------------------------------------------
    /// New raw table; restarts the import at column mapping
    SubmitRawData(RawTable),
    /// Validate and standardize the raw table with this mapping
    ConfirmColumnMapping(ColumnMapping),
    /// Finish setup and enter analysis
    CompleteSetup(TestConfiguration),
    /// Edit the test configuration after setup
    ReplaceTestConfiguration(TestConfiguration),

    // ------------------------------------------------------------------
    // Navigation and settings
    // ------------------------------------------------------------------
    SetActiveView(View),
    UpdateProcessingSettings(ProcessingSettings),
    UpdateDisplaySettings(DisplaySettings),
    SelectModel(ModelId),

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------
    RunDiagnostics,
    DiagnosticsCompleted {
        generation: u64,
        result: DiagnosticsResult,
    },

    // ------------------------------------------------------------------
    // Matching
    // ------------------------------------------------------------------
    UpdateMatchParameters(ParameterUpdate),
    Undo,
    Redo,
    StartAutoMatch,
    AutoMatchCompleted {
        generation: u64,
        result: AutoMatchResult,
    },
    AcceptAutoMatch,
    DiscardAutoMatch,

    /// A background task ended without a result
    TaskFailed {
        task: TaskKind,
        generation: u64,
        message: String,
    },
}

impl SessionCommand {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::SubmitRawData(_) => "submit_raw_data",
            SessionCommand::ConfirmColumnMapping(_) => "confirm_column_mapping",
            SessionCommand::CompleteSetup(_) => "complete_setup",
            SessionCommand::ReplaceTestConfiguration(_) => "replace_test_configuration",
            SessionCommand::SetActiveView(_) => "set_active_view",
            SessionCommand::UpdateProcessingSettings(_) => "update_processing_settings",
            SessionCommand::UpdateDisplaySettings(_) => "update_display_settings",
            SessionCommand::SelectModel(_) => "select_model",
            SessionCommand::RunDiagnostics => "run_diagnostics",
            SessionCommand::DiagnosticsCompleted { .. } => "diagnostics_completed",
            SessionCommand::UpdateMatchParameters(_) => "update_match_parameters",
            SessionCommand::Undo => "undo",
            SessionCommand::Redo => "redo",
            SessionCommand::StartAutoMatch => "start_auto_match",
            SessionCommand::AutoMatchCompleted { .. } => "auto_match_completed",
            SessionCommand::AcceptAutoMatch => "accept_auto_match",
            SessionCommand::DiscardAutoMatch => "discard_auto_match",
            SessionCommand::TaskFailed { .. } => "task_failed",
        }
    }
}
