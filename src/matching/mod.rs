//! Type-Curve Matching
//!
//! Scores modeled curves against diagnostics and fits model parameters with
//! a deterministic pattern search. Optimizer output is advisory: the session
//! only commits it when the user accepts it.

mod confidence;
pub mod objective;
pub mod optimizer;
pub mod quality;

pub use confidence::score_confidence;
pub use objective::MatchObjective;
pub use optimizer::{AutoMatchOptimizer, AutoMatchResult, OptimizerProgress, StopReason};
pub use quality::MatchQualityEvaluator;
