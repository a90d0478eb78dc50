//! Session Actor - single owner of the interpretation session
//!
//! Commands are applied one at a time through the pure reducer. After each
//! command the actor publishes the new snapshot on a watch channel, stamps
//! and broadcasts the notices, persists changed settings and starts any
//! background work. Background tasks report back as ordinary commands.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::commands::{SessionCommand, TaskKind};
use super::effects::Effect;
use super::events::SessionEvent;
use super::reducer::{reduce, Transition};
use super::state::{AppSettings, SessionSnapshot, SessionState, TaskGeneration};
use crate::config::defaults::{
    SESSION_COMMAND_CHANNEL_SIZE, STORE_KEY_APP_SETTINGS, STORE_KEY_TEST_CONFIG,
};
use crate::config::EngineConfig;
use crate::storage::{load_typed, save_typed, KeyValueStore};
use crate::types::TestConfiguration;

/// Errors surfaced by `SessionHandle`
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session actor channel closed")]
    ChannelClosed,
    #[error("session actor dropped the response")]
    ResponseDropped,
}

// ============================================================================
// Messages
// ============================================================================

struct Envelope {
    command: SessionCommand,
    /// Receives the snapshot produced by this command
    ack: Option<oneshot::Sender<Arc<SessionSnapshot>>>,
}

// ============================================================================
// Actor Handle
// ============================================================================

/// Handle to interact with the SessionActor
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Envelope>,
    snapshots: watch::Receiver<Arc<SessionSnapshot>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    /// Queue a command without waiting for it to be applied
    pub async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.tx
            .send(Envelope { command, ack: None })
            .await
            .map_err(|_| SessionError::ChannelClosed)
    }

    /// Apply a command and return the snapshot it produced
    pub async fn dispatch(&self, command: SessionCommand) -> Result<Arc<SessionSnapshot>, SessionError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(Envelope { command, ack: Some(ack_tx) })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        ack_rx.await.map_err(|_| SessionError::ResponseDropped)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    /// Receiver notified on every new snapshot
    pub fn watch(&self) -> watch::Receiver<Arc<SessionSnapshot>> {
        self.snapshots.clone()
    }

    /// Subscribe to session events (notices and auto-match progress)
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Run diagnostics and wait until the request has settled.
    ///
    /// Returns immediately with the current snapshot when the command was a
    /// no-op (missing configuration or records).
    pub async fn run_diagnostics(&self) -> Result<Arc<SessionSnapshot>, SessionError> {
        let snapshot = self.dispatch(SessionCommand::RunDiagnostics).await?;
        let generation = snapshot.tasks.diagnostics.requested;
        self.wait_settled(generation, |s| s.tasks.diagnostics).await
    }

    /// Start an auto-match and wait for its result to land in `pending_match`.
    pub async fn auto_match(&self) -> Result<Arc<SessionSnapshot>, SessionError> {
        let snapshot = self.dispatch(SessionCommand::StartAutoMatch).await?;
        let generation = snapshot.tasks.auto_match.requested;
        self.wait_settled(generation, |s| s.tasks.auto_match).await
    }

    async fn wait_settled(
        &self,
        generation: u64,
        tracker: impl Fn(&SessionSnapshot) -> TaskGeneration,
    ) -> Result<Arc<SessionSnapshot>, SessionError> {
        let mut rx = self.snapshots.clone();
        let settled = rx
            .wait_for(|s| tracker(&**s).settled >= generation)
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        Ok(Arc::clone(&settled))
    }
}

// ============================================================================
// Session Actor
// ============================================================================

/// Session Actor - owns the state and runs background tasks
pub struct SessionActor {
    state: Arc<SessionState>,
    rx: mpsc::Receiver<Envelope>,
    /// Completions are fed back through this; weak so that dropping every
    /// handle stops the actor
    feedback: mpsc::WeakSender<Envelope>,
    snapshots: watch::Sender<Arc<SessionSnapshot>>,
    events: broadcast::Sender<SessionEvent>,
    store: Option<Arc<dyn KeyValueStore>>,
    running: HashMap<TaskKind, CancellationToken>,
}

impl SessionActor {
    /// Create a new actor and handle, restoring persisted settings from `store`
    pub fn new(
        engine: Arc<EngineConfig>,
        store: Option<Arc<dyn KeyValueStore>>,
    ) -> (Self, SessionHandle) {
        let (tx, rx) = mpsc::channel(SESSION_COMMAND_CHANNEL_SIZE);
        let (events, _) = broadcast::channel(engine.session.event_channel_capacity.max(1));

        let mut state = SessionState::new(engine);
        if let Some(store) = store.as_deref() {
            restore(&mut state, store);
        }
        let state = Arc::new(state);
        let (snapshots, snapshot_rx) = watch::channel(Arc::clone(&state));

        let actor = Self {
            state,
            rx,
            feedback: tx.downgrade(),
            snapshots,
            events: events.clone(),
            store,
            running: HashMap::new(),
        };

        let handle = SessionHandle {
            tx,
            snapshots: snapshot_rx,
            events,
        };

        (actor, handle)
    }

    /// Create the actor and run it on the current runtime
    pub fn spawn(engine: Arc<EngineConfig>, store: Option<Arc<dyn KeyValueStore>>) -> SessionHandle {
        let (actor, handle) = Self::new(engine, store);
        tokio::spawn(actor.run());
        handle
    }

    /// Run the actor loop until every handle is dropped
    pub async fn run(mut self) {
        info!(
            store = self.store.as_ref().map_or("none", |s| s.backend_name()),
            "SessionActor starting"
        );

        while let Some(Envelope { command, ack }) = self.rx.recv().await {
            self.apply(command);
            if let Some(ack) = ack {
                let _ = ack.send(Arc::clone(&self.state));
            }
        }

        for token in self.running.values() {
            token.cancel();
        }
        info!("SessionActor stopped");
    }

    fn apply(&mut self, command: SessionCommand) {
        let name = command.name();
        let Transition { state, notices, effects } = reduce(&self.state, command);
        let previous = std::mem::replace(&mut self.state, Arc::new(state));

        self.persist_changes(&previous);
        for notice in notices {
            let event = SessionEvent::stamp(notice);
            event.trace();
            let _ = self.events.send(event);
        }
        for effect in effects {
            self.start(effect);
        }
        self.snapshots.send_replace(Arc::clone(&self.state));

        debug!(
            command = name,
            stage = ?self.state.stage,
            version = self.state.parameters.version,
            "Command applied"
        );
    }

    /// Fresh token for `kind`, cancelling the task it supersedes.
    fn replace_token(&mut self, kind: TaskKind) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(previous) = self.running.insert(kind, token.clone()) {
            previous.cancel();
        }
        token
    }

    fn start(&mut self, effect: Effect) {
        match effect {
            Effect::Cancel(kind) => {
                if let Some(token) = self.running.remove(&kind) {
                    debug!(task = %kind, "Cancelling superseded task");
                    token.cancel();
                }
            }
            Effect::RunDiagnostics(job) => {
                let token = self.replace_token(TaskKind::Diagnostics);
                let feedback = self.feedback.clone();
                tokio::spawn(async move {
                    let generation = job.generation;
                    let outcome = tokio::task::spawn_blocking(move || job.run()).await;
                    if token.is_cancelled() {
                        debug!(generation, "Diagnostics finished after being superseded");
                        return;
                    }
                    let command = match outcome {
                        Ok(result) => SessionCommand::DiagnosticsCompleted { generation, result },
                        Err(e) => SessionCommand::TaskFailed {
                            task: TaskKind::Diagnostics,
                            generation,
                            message: e.to_string(),
                        },
                    };
                    deliver(&feedback, command).await;
                });
            }
            Effect::RunAutoMatch(job) => {
                let token = self.replace_token(TaskKind::AutoMatch);
                let feedback = self.feedback.clone();
                let events = self.events.clone();
                tokio::spawn(async move {
                    let generation = job.generation;
                    let cancel = token.clone();
                    let outcome = tokio::task::spawn_blocking(move || {
                        job.run(&cancel, |progress| {
                            let event = SessionEvent::progress(*progress);
                            event.trace();
                            let _ = events.send(event);
                        })
                    })
                    .await;
                    if token.is_cancelled() {
                        debug!(generation, "Auto-match finished after being superseded");
                        return;
                    }
                    let command = match outcome {
                        Ok(Ok(result)) => SessionCommand::AutoMatchCompleted { generation, result },
                        Ok(Err(e)) => SessionCommand::TaskFailed {
                            task: TaskKind::AutoMatch,
                            generation,
                            message: e.to_string(),
                        },
                        Err(e) => SessionCommand::TaskFailed {
                            task: TaskKind::AutoMatch,
                            generation,
                            message: e.to_string(),
                        },
                    };
                    deliver(&feedback, command).await;
                });
            }
        }
    }

    /// Save the test configuration and app settings when they changed.
    fn persist_changes(&self, previous: &SessionState) {
        let Some(store) = self.store.as_deref() else {
            return;
        };

        if let Some(config) = &self.state.test_config {
            let changed = previous
                .test_config
                .as_ref()
                .map_or(true, |old| !Arc::ptr_eq(old, config));
            if changed {
                if let Err(e) = save_typed(store, STORE_KEY_TEST_CONFIG, config.as_ref()) {
                    warn!(error = %e, "Failed to persist test configuration");
                }
            }
        }

        let settings = self.state.app_settings();
        if settings != previous.app_settings() {
            if let Err(e) = save_typed(store, STORE_KEY_APP_SETTINGS, &settings) {
                warn!(error = %e, "Failed to persist app settings");
            }
        }
    }
}

/// Feed a completion back to the actor, if it is still running.
async fn deliver(feedback: &mpsc::WeakSender<Envelope>, command: SessionCommand) {
    let Some(tx) = feedback.upgrade() else {
        return;
    };
    let _ = tx.send(Envelope { command, ack: None }).await;
}

/// Load persisted settings into a fresh state. Bad or missing values are
/// skipped with a warning.
fn restore(state: &mut SessionState, store: &dyn KeyValueStore) {
    match load_typed::<TestConfiguration>(store, STORE_KEY_TEST_CONFIG) {
        Ok(Some(config)) if config.is_valid() => {
            info!(backend = store.backend_name(), "Restored test configuration");
            state.test_config = Some(Arc::new(config));
        }
        Ok(Some(_)) => warn!("Stored test configuration is invalid, ignoring"),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Failed to load test configuration"),
    }

    match load_typed::<AppSettings>(store, STORE_KEY_APP_SETTINGS) {
        Ok(Some(settings)) if settings.processing.is_valid() => {
            info!(
                backend = store.backend_name(),
                smoothing_l = settings.processing.smoothing_l,
                "Restored app settings"
            );
            state.processing = settings.processing;
            state.display = settings.display;
        }
        Ok(Some(_)) => warn!("Stored app settings are invalid, ignoring"),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Failed to load app settings"),
    }
}
