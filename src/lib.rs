//! Well-test engine: pressure-transient interpretation
//!
//! Turns raw gauge data into a reservoir description.
//!
//! ## Architecture
//!
//! - **Import**: column mapping, validation and standardization of raw tables
//! - **Physics Engine**: superposition time, Bourdet derivative, analytical type curves
//! - **Diagnostics**: flow-regime classification from the log-log derivative
//! - **Matching**: deterministic auto-match optimizer and match quality scoring
//! - **Session**: command-driven state machine with undo/redo and background tasks
//! - **Storage**: key-value hook for persisting settings across sessions

pub mod config;
pub mod diagnostics;
pub mod import;
pub mod matching;
pub mod physics_engine;
pub mod session;
pub mod storage;
pub mod types;

// Re-export configuration
pub use config::EngineConfig;

// Re-export commonly used types
pub use types::{
    ColumnMapping, DiagnosticPoint, DiagnosticsResult, FlowCapacity, FlowRegime,
    FlowRegimeSegment, MatchQuality, MatchRating, ModelId, ModelParameters, ParameterUpdate,
    RawTable, TestConfiguration, TestRecord, TestType, ValidationReport,
};

// Re-export pipeline components
pub use diagnostics::{run_diagnostics, FlowRegimeClassifier};
pub use import::Validator;
pub use matching::{AutoMatchOptimizer, AutoMatchResult, MatchQualityEvaluator, StopReason};
pub use physics_engine::{build_model, BourdetDerivativeEngine, ReservoirContext, ReservoirModel};

// Re-export session
pub use session::{SessionActor, SessionCommand, SessionHandle, SessionSnapshot};

// Re-export storage
pub use storage::{InMemoryStore, KeyValueStore, SledStore};
