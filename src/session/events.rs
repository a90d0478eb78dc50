//! Session events: the structured log hook for external observability
//!
//! The reducer emits unstamped `SessionNotice`s so it stays pure; the actor
//! stamps them into `SessionEvent`s, mirrors them into `tracing` and
//! broadcasts them to subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::matching::OptimizerProgress;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Debug,
    Info,
    Warning,
    Error,
    /// Auto-match progress side channel
    Progress,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Debug => write!(f, "debug"),
            EventKind::Info => write!(f, "info"),
            EventKind::Warning => write!(f, "warning"),
            EventKind::Error => write!(f, "error"),
            EventKind::Progress => write!(f, "progress"),
        }
    }
}

/// Unstamped event produced by a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionNotice {
    pub kind: EventKind,
    pub message: String,
}

impl SessionNotice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { kind: EventKind::Info, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { kind: EventKind::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: EventKind::Error, message: message.into() }
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self { kind: EventKind::Debug, message: message.into() }
    }
}

/// Event delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub message: String,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    /// Present on `Progress` events only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<OptimizerProgress>,
}

impl SessionEvent {
    pub fn stamp(notice: SessionNotice) -> Self {
        Self {
            message: notice.message,
            kind: notice.kind,
            timestamp: Utc::now(),
            progress: None,
        }
    }

    pub fn progress(progress: OptimizerProgress) -> Self {
        Self {
            message: format!(
                "Auto-match iteration {}: rmse {:.4}, k {:.3} md, skin {:.2}",
                progress.iteration,
                progress.best_rmse,
                progress.parameters.permeability_md,
                progress.parameters.skin
            ),
            kind: EventKind::Progress,
            timestamp: Utc::now(),
            progress: Some(progress),
        }
    }

    /// Mirror this event into the tracing subscriber.
    pub fn trace(&self) {
        match self.kind {
            EventKind::Debug | EventKind::Progress => {
                tracing::debug!(kind = %self.kind, "{}", self.message);
            }
            EventKind::Info => tracing::info!("{}", self.message),
            EventKind::Warning => tracing::warn!("{}", self.message),
            EventKind::Error => tracing::error!("{}", self.message),
        }
    }
}
