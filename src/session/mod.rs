//! Interpretation session
//!
//! State machine over the import wizard, diagnostics and type-curve matching.
//!
//! - `state` - immutable session snapshot
//! - `commands` / `reducer` - pure transition function
//! - `effects` - background jobs requested by a transition
//! - `history` - bounded undo/redo of model parameters
//! - `events` - notices and progress for observers
//! - `actor` - async owner that applies commands and runs jobs

pub mod actor;
pub mod commands;
pub mod effects;
pub mod events;
pub mod history;
pub mod reducer;
pub mod state;

pub use actor::{SessionActor, SessionError, SessionHandle};
pub use commands::{SessionCommand, TaskKind};
pub use effects::{AutoMatchJob, DiagnosticsJob, Effect};
pub use events::{EventKind, SessionEvent, SessionNotice};
pub use history::ParameterHistory;
pub use reducer::{reduce, Transition};
pub use state::{
    AppSettings, DisplaySettings, ImportStage, ProcessingSettings, SessionSnapshot, SessionState,
    TaskGeneration, TaskGenerations, View,
};
