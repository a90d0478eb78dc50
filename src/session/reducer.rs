//! Pure session transition function
//!
//! `reduce` never touches the outside world: it returns the next state, the
//! notices to publish and the background work to start. Replaying the same
//! command list from the same initial state reproduces the same state.

use std::sync::Arc;

use super::commands::{SessionCommand, TaskKind};
use super::effects::{AutoMatchJob, DiagnosticsJob, Effect};
use super::events::SessionNotice;
use super::state::{DisplaySettings, ImportStage, ProcessingSettings, SessionState, View};
use crate::config::defaults::MIN_VALID_RECORDS;
use crate::import::Validator;
use crate::matching::{AutoMatchResult, MatchObjective, MatchQualityEvaluator};
use crate::physics_engine::{
    build_model, calculate_flow_capacity, BourdetDerivativeEngine, ReservoirContext,
};
use crate::types::{
    ColumnMapping, DiagnosticsResult, ModelId, ParameterUpdate, RawTable, TestConfiguration,
};

/// Result of applying one command.
#[derive(Debug)]
pub struct Transition {
    pub state: SessionState,
    pub notices: Vec<SessionNotice>,
    pub effects: Vec<Effect>,
}

/// Apply `command` to `state`.
pub fn reduce(state: &SessionState, command: SessionCommand) -> Transition {
    let mut tx = Transition {
        state: state.clone(),
        notices: Vec::new(),
        effects: Vec::new(),
    };

    match command {
        SessionCommand::SubmitRawData(table) => submit_raw_data(&mut tx, table),
        SessionCommand::ConfirmColumnMapping(mapping) => confirm_column_mapping(&mut tx, mapping),
        SessionCommand::CompleteSetup(config) => complete_setup(&mut tx, config),
        SessionCommand::ReplaceTestConfiguration(config) => replace_configuration(&mut tx, config),
        SessionCommand::SetActiveView(view) => set_active_view(&mut tx, view),
        SessionCommand::UpdateProcessingSettings(settings) => update_processing(&mut tx, settings),
        SessionCommand::UpdateDisplaySettings(settings) => update_display(&mut tx, settings),
        SessionCommand::SelectModel(id) => select_model(&mut tx, id),
        SessionCommand::RunDiagnostics => run_diagnostics(&mut tx),
        SessionCommand::DiagnosticsCompleted { generation, result } => {
            diagnostics_completed(&mut tx, generation, result)
        }
        SessionCommand::UpdateMatchParameters(update) => update_parameters(&mut tx, update),
        SessionCommand::Undo => undo(&mut tx),
        SessionCommand::Redo => redo(&mut tx),
        SessionCommand::StartAutoMatch => start_auto_match(&mut tx),
        SessionCommand::AutoMatchCompleted { generation, result } => {
            auto_match_completed(&mut tx, generation, result)
        }
        SessionCommand::AcceptAutoMatch => accept_auto_match(&mut tx),
        SessionCommand::DiscardAutoMatch => discard_auto_match(&mut tx),
        SessionCommand::TaskFailed { task, generation, message } => {
            task_failed(&mut tx, task, generation, message)
        }
    }

    tx
}

// ============================================================================
// Import wizard
// ============================================================================

fn submit_raw_data(tx: &mut Transition, table: RawTable) {
    let rows = table.rows.len();
    let columns = table.headers.len();
    let state = &mut tx.state;
    state.raw_table = Some(Arc::new(table));
    state.column_mapping = None;
    state.validation = None;
    state.records = Arc::from(Vec::new());
    state.stage = ImportStage::ColumnMapping;
    invalidate_derived(tx);
    tx.notices.push(SessionNotice::info(format!(
        "Raw data received: {rows} rows, {columns} columns"
    )));
}

fn confirm_column_mapping(tx: &mut Transition, mapping: ColumnMapping) {
    let Some(table) = tx.state.raw_table.clone() else {
        tx.notices
            .push(SessionNotice::warning("Column mapping ignored: no raw data submitted"));
        return;
    };

    let standardized = Validator::standardize(&table, &mapping);
    let valid = standardized.is_valid();
    let report = standardized.report;
    let count = standardized.records.len();

    for warning in &report.warnings {
        tx.notices.push(SessionNotice::warning(warning.clone()));
    }

    let state = &mut tx.state;
    state.column_mapping = Some(mapping);
    if valid {
        state.records = Arc::from(standardized.records);
        state.stage = ImportStage::Setup;
        tx.notices.push(SessionNotice::info(format!(
            "Column mapping accepted: {count} records standardized"
        )));
    } else {
        state.records = Arc::from(Vec::new());
        state.stage = ImportStage::ColumnMapping;
        for error in &report.errors {
            tx.notices.push(SessionNotice::error(error.clone()));
        }
    }
    tx.state.validation = Some(report);
    invalidate_derived(tx);
}

fn complete_setup(tx: &mut Transition, config: TestConfiguration) {
    if !matches!(tx.state.stage, ImportStage::Setup | ImportStage::Complete) {
        tx.notices.push(SessionNotice::warning(format!(
            "Setup cannot be completed from the {:?} stage",
            tx.state.stage
        )));
        return;
    }
    if !accept_configuration(tx, config) {
        return;
    }
    tx.state.stage = ImportStage::Complete;
    tx.state.view = View::Diagnostics;
    tx.notices.push(SessionNotice::info("Setup complete"));
}

fn replace_configuration(tx: &mut Transition, config: TestConfiguration) {
    if tx.state.stage != ImportStage::Complete {
        tx.notices.push(SessionNotice::warning(
            "Test configuration can only be replaced after setup is complete",
        ));
        return;
    }
    if accept_configuration(tx, config) {
        tx.notices.push(SessionNotice::info("Test configuration replaced"));
    }
}

/// Validate and install a configuration. Returns false (state untouched)
/// when it is rejected.
fn accept_configuration(tx: &mut Transition, config: TestConfiguration) -> bool {
    let errors = config.validate();
    if !errors.is_empty() {
        tx.notices.push(SessionNotice::warning(format!(
            "Test configuration rejected: {}",
            errors.join("; ")
        )));
        return false;
    }
    tx.state.test_config = Some(Arc::new(config));
    invalidate_derived(tx);
    refresh_match_outputs(&mut tx.state);
    true
}

// ============================================================================
// Navigation and settings
// ============================================================================

fn set_active_view(tx: &mut Transition, view: View) {
    if tx.state.stage != ImportStage::Complete {
        tx.notices
            .push(SessionNotice::warning("Analysis views are available once setup is complete"));
        return;
    }
    tx.state.view = view;
}

fn update_processing(tx: &mut Transition, settings: ProcessingSettings) {
    if !settings.is_valid() {
        tx.notices.push(SessionNotice::warning(format!(
            "Smoothing window {} rejected: must be a non-negative number",
            settings.smoothing_l
        )));
        return;
    }
    if settings == tx.state.processing {
        return;
    }
    tx.state.processing = settings;
    invalidate_derived(tx);
    refresh_match_outputs(&mut tx.state);
    tx.notices.push(SessionNotice::info(format!(
        "Smoothing window set to L = {}",
        settings.smoothing_l
    )));
}

fn update_display(tx: &mut Transition, settings: DisplaySettings) {
    tx.state.display = settings;
}

fn select_model(tx: &mut Transition, id: ModelId) {
    if tx.state.model == id {
        return;
    }
    tx.state.model = id;
    cancel_task(tx, TaskKind::AutoMatch);
    tx.state.pending_match = None;

    let needs_fault = id == ModelId::WellboreStorageFault
        && tx.state.parameters.fault_distance_ft.is_none();
    if needs_fault {
        let template = tx.state.engine.templates.fault_distance_ft;
        commit_parameters(
            tx,
            ParameterUpdate {
                fault_distance_ft: Some(template),
                ..Default::default()
            },
        );
    } else {
        refresh_match_outputs(&mut tx.state);
    }
    tx.notices.push(SessionNotice::info(format!("Model {id} selected")));
}

// ============================================================================
// Diagnostics
// ============================================================================

fn run_diagnostics(tx: &mut Transition) {
    let Some(config) = tx.state.active_config().cloned() else {
        tx.notices.push(SessionNotice::warning(
            "Diagnostics skipped: no valid test configuration",
        ));
        return;
    };
    if tx.state.records.len() < MIN_VALID_RECORDS {
        tx.notices.push(SessionNotice::warning(format!(
            "Diagnostics skipped: {} records, need at least {MIN_VALID_RECORDS}",
            tx.state.records.len()
        )));
        return;
    }

    let generation = tx.state.tasks.diagnostics.request();
    tx.effects.push(Effect::RunDiagnostics(DiagnosticsJob {
        generation,
        records: Arc::clone(&tx.state.records),
        config,
        derivative: tx.state.derivative_settings(),
        regimes: tx.state.engine.regimes,
    }));
    tx.notices
        .push(SessionNotice::info(format!("Diagnostics requested (generation {generation})")));
}

fn diagnostics_completed(tx: &mut Transition, generation: u64, result: DiagnosticsResult) {
    if !tx.state.tasks.diagnostics.is_current(generation) {
        tx.notices.push(SessionNotice::debug(format!(
            "Discarded stale diagnostics (generation {generation}, latest {})",
            tx.state.tasks.diagnostics.requested
        )));
        return;
    }
    tx.state.tasks.diagnostics.settle(generation);
    let segments = result.segments.len();
    let points = result.points.len();
    tx.state.diagnostics = Some(Arc::new(result));
    refresh_match_outputs(&mut tx.state);
    tx.notices.push(SessionNotice::info(format!(
        "Diagnostics ready: {points} points, {segments} flow-regime segments"
    )));
}

// ============================================================================
// Matching
// ============================================================================

fn update_parameters(tx: &mut Transition, update: ParameterUpdate) {
    if update.is_empty() {
        tx.notices.push(SessionNotice::debug("Empty parameter update ignored"));
        return;
    }
    let errors = update.validate();
    if !errors.is_empty() {
        tx.notices.push(SessionNotice::warning(format!(
            "Parameter update rejected: {}",
            errors.join("; ")
        )));
        return;
    }
    commit_parameters(tx, update);
}

/// Merge `update`, recording the prior value in the undo history.
fn commit_parameters(tx: &mut Transition, update: ParameterUpdate) {
    let state = &mut tx.state;
    let prior = state.parameters;
    state.history.commit(prior);
    state.parameters = update.apply(&prior);
    refresh_match_outputs(state);
    tx.notices.push(SessionNotice::info(format!(
        "Parameters v{}: k = {:.3} md, s = {:.2}, C = {:.4} bbl/psi",
        state.parameters.version,
        state.parameters.permeability_md,
        state.parameters.skin,
        state.parameters.wellbore_storage_bbl_psi
    )));
}

fn undo(tx: &mut Transition) {
    let state = &mut tx.state;
    let current = state.parameters;
    match state.history.undo(current) {
        Some(restored) => {
            state.parameters = restored;
            state.parameters.version = current.version + 1;
            refresh_match_outputs(state);
            tx.notices.push(SessionNotice::info("Parameter change undone"));
        }
        None => tx.notices.push(SessionNotice::debug("Nothing to undo")),
    }
}

fn redo(tx: &mut Transition) {
    let state = &mut tx.state;
    let current = state.parameters;
    match state.history.redo(current) {
        Some(restored) => {
            state.parameters = restored;
            state.parameters.version = current.version + 1;
            refresh_match_outputs(state);
            tx.notices.push(SessionNotice::info("Parameter change redone"));
        }
        None => tx.notices.push(SessionNotice::debug("Nothing to redo")),
    }
}

fn start_auto_match(tx: &mut Transition) {
    let state = &tx.state;
    let Some(config) = state.active_config() else {
        tx.notices.push(SessionNotice::warning(
            "Auto-match skipped: no valid test configuration",
        ));
        return;
    };
    let Some(diagnostics) = state.diagnostics.clone() else {
        tx.notices
            .push(SessionNotice::warning("Auto-match skipped: run diagnostics first"));
        return;
    };
    let context = ReservoirContext::from_configuration(config, &state.records);
    if let Err(e) = build_model(state.model, context) {
        tx.notices
            .push(SessionNotice::warning(format!("Auto-match skipped: {e}")));
        return;
    }

    let generation = tx.state.tasks.auto_match.request();
    tx.state.pending_match = None;
    let engine = &tx.state.engine;
    tx.effects.push(Effect::RunAutoMatch(AutoMatchJob {
        generation,
        model: tx.state.model,
        context,
        diagnostics,
        start: tx.state.parameters,
        derivative: tx.state.derivative_settings(),
        matching: engine.matching,
        quality: engine.quality,
    }));
    tx.notices.push(SessionNotice::info(format!(
        "Auto-match started for {} (generation {generation})",
        tx.state.model
    )));
}

fn auto_match_completed(tx: &mut Transition, generation: u64, result: AutoMatchResult) {
    if !tx.state.tasks.auto_match.is_current(generation) {
        tx.notices.push(SessionNotice::debug(format!(
            "Discarded stale auto-match result (generation {generation}, latest {})",
            tx.state.tasks.auto_match.requested
        )));
        return;
    }
    tx.state.tasks.auto_match.settle(generation);
    tx.state.pending_match = Some(result);
    tx.notices.push(SessionNotice::info(format!(
        "Auto-match finished ({}): k = {:.3} md, s = {:.2}, confidence {:.2}, {} fit",
        result.stop_reason,
        result.parameters.permeability_md,
        result.parameters.skin,
        result.confidence,
        result.quality.rating
    )));
}

fn accept_auto_match(tx: &mut Transition) {
    let Some(pending) = tx.state.pending_match.take() else {
        tx.notices
            .push(SessionNotice::warning("No auto-match result to accept"));
        return;
    };
    commit_parameters(tx, ParameterUpdate::replace_with(&pending.parameters));
}

fn discard_auto_match(tx: &mut Transition) {
    if tx.state.pending_match.take().is_some() {
        tx.notices.push(SessionNotice::info("Auto-match result discarded"));
    }
}

fn task_failed(tx: &mut Transition, task: TaskKind, generation: u64, message: String) {
    let tracker = match task {
        TaskKind::Diagnostics => &mut tx.state.tasks.diagnostics,
        TaskKind::AutoMatch => &mut tx.state.tasks.auto_match,
    };
    if tracker.is_current(generation) {
        tracker.settle(generation);
        tx.notices
            .push(SessionNotice::error(format!("{task} failed: {message}")));
    } else {
        tx.notices.push(SessionNotice::debug(format!(
            "Ignored failure of superseded {task} task (generation {generation})"
        )));
    }
}

// ============================================================================
// Derived data
// ============================================================================

/// Drop every result computed from the old inputs and supersede any task
/// still working on them.
fn invalidate_derived(tx: &mut Transition) {
    tx.state.diagnostics = None;
    tx.state.match_quality = None;
    tx.state.flow_capacity = None;
    tx.state.pending_match = None;
    cancel_task(tx, TaskKind::Diagnostics);
    cancel_task(tx, TaskKind::AutoMatch);
}

fn cancel_task(tx: &mut Transition, kind: TaskKind) {
    let tracker = match kind {
        TaskKind::Diagnostics => &mut tx.state.tasks.diagnostics,
        TaskKind::AutoMatch => &mut tx.state.tasks.auto_match,
    };
    if tracker.in_flight() {
        tracker.invalidate();
        tx.effects.push(Effect::Cancel(kind));
    }
}

/// Recompute flow capacity and match quality for the current parameters.
fn refresh_match_outputs(state: &mut SessionState) {
    let Some(config) = state.test_config.clone() else {
        state.flow_capacity = None;
        state.match_quality = None;
        return;
    };
    let context = ReservoirContext::from_configuration(&config, &state.records);
    let duration = state.records.last().map_or(0.0, |r| r.time);
    state.flow_capacity = Some(calculate_flow_capacity(&state.parameters, &context, duration));

    state.match_quality = match (&state.diagnostics, build_model(state.model, context)) {
        (Some(diagnostics), Ok(model)) => {
            let objective = MatchObjective::new(
                model.as_ref(),
                &diagnostics.points,
                BourdetDerivativeEngine::from_settings(&state.derivative_settings()),
                state.engine.matching.derivative_weight,
            );
            let evaluator = MatchQualityEvaluator::new(state.engine.quality);
            Some(objective.quality(&state.parameters, &evaluator))
        }
        _ => None,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::physics_engine::{ReservoirModel, WellboreStorageRadial};
    use crate::session::events::EventKind;
    use crate::types::{FlowRegime, ModelParameters, TestType};
    use tokio_util::sync::CancellationToken;

    const INITIAL_PRESSURE: f64 = 5000.0;

    fn make_config() -> TestConfiguration {
        TestConfiguration {
            test_type: TestType::Drawdown,
            initial_pressure_psi: INITIAL_PRESSURE,
            ..Default::default()
        }
    }

    fn make_table() -> RawTable {
        let config = make_config();
        let ctx = ReservoirContext {
            rate: 500.0,
            ..ReservoirContext::from_configuration(&config, &[])
        };
        let model = WellboreStorageRadial::new(ctx);
        let truth = ModelParameters::new(50.0, 5.0, 0.02);
        let rows = (0..20)
            .map(|i| {
                let t = 0.01 * 10f64.powf(4.0 * i as f64 / 19.0);
                let noise = 1.0 + 0.01 * (i as f64 * 1.7 + 0.3).sin();
                let p = INITIAL_PRESSURE - model.pressure_change(&truth, t) * noise;
                vec![t.to_string(), p.to_string(), "500".to_string()]
            })
            .collect();
        RawTable::new(
            vec!["time".into(), "pressure".into(), "rate".into()],
            rows,
        )
    }

    fn mapping() -> ColumnMapping {
        ColumnMapping::new("time", "pressure").with_rate("rate")
    }

    fn apply(state: &SessionState, command: SessionCommand) -> SessionState {
        reduce(state, command).state
    }

    fn complete_session() -> SessionState {
        let state = SessionState::new(Arc::new(EngineConfig::default()));
        let state = apply(&state, SessionCommand::SubmitRawData(make_table()));
        let state = apply(&state, SessionCommand::ConfirmColumnMapping(mapping()));
        apply(&state, SessionCommand::CompleteSetup(make_config()))
    }

    fn diagnostics_job(effects: &[Effect]) -> DiagnosticsJob {
        match effects {
            [Effect::RunDiagnostics(job)] => job.clone(),
            other => panic!("expected one diagnostics effect, got {other:?}"),
        }
    }

    fn with_diagnostics() -> SessionState {
        let state = complete_session();
        let tx = reduce(&state, SessionCommand::RunDiagnostics);
        let job = diagnostics_job(&tx.effects);
        apply(
            &tx.state,
            SessionCommand::DiagnosticsCompleted {
                generation: job.generation,
                result: job.run(),
            },
        )
    }

    #[test]
    fn test_import_wizard_stages() {
        let state = SessionState::new(Arc::new(EngineConfig::default()));
        let state = apply(&state, SessionCommand::SubmitRawData(make_table()));
        assert_eq!(state.stage, ImportStage::ColumnMapping);

        let bad = apply(
            &state,
            SessionCommand::ConfirmColumnMapping(ColumnMapping::new("elapsed", "pressure")),
        );
        assert_eq!(bad.stage, ImportStage::ColumnMapping);
        assert!(!bad.validation.as_ref().unwrap().is_valid());

        let state = apply(&bad, SessionCommand::ConfirmColumnMapping(mapping()));
        assert_eq!(state.stage, ImportStage::Setup);
        assert_eq!(state.records.len(), 20);

        let state = apply(&state, SessionCommand::SetActiveView(View::Matching));
        assert_eq!(state.view, View::Diagnostics);

        let state = apply(&state, SessionCommand::CompleteSetup(make_config()));
        assert_eq!(state.stage, ImportStage::Complete);
        assert_eq!(state.view, View::Diagnostics);
        assert!(state.flow_capacity.is_some());

        let state = apply(&state, SessionCommand::SetActiveView(View::Forecast));
        assert_eq!(state.view, View::Forecast);
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        let state = SessionState::new(Arc::new(EngineConfig::default()));
        let state = apply(&state, SessionCommand::SubmitRawData(make_table()));
        let state = apply(&state, SessionCommand::ConfirmColumnMapping(mapping()));
        let bad = TestConfiguration {
            viscosity_cp: 0.0,
            ..make_config()
        };
        let tx = reduce(&state, SessionCommand::CompleteSetup(bad));
        assert_eq!(tx.state.stage, ImportStage::Setup);
        assert!(tx.state.test_config.is_none());
        assert_eq!(tx.notices.len(), 1);
    }

    #[test]
    fn test_run_diagnostics_without_configuration_is_a_no_op() {
        let state = SessionState::new(Arc::new(EngineConfig::default()));
        let tx = reduce(&state, SessionCommand::RunDiagnostics);
        assert!(tx.effects.is_empty());
        assert_eq!(tx.state.tasks, state.tasks);
        assert_eq!(tx.notices[0].kind, EventKind::Warning);

        let tx = reduce(&state, SessionCommand::StartAutoMatch);
        assert!(tx.effects.is_empty());
    }

    #[test]
    fn test_diagnostics_applied_and_idempotent() {
        let state = with_diagnostics();
        let first = state.diagnostics.clone().unwrap();
        assert_eq!(first.points.len(), 20);
        assert!(state.match_quality.is_some());
        assert!(!state.tasks.diagnostics.in_flight());

        let tx = reduce(&state, SessionCommand::RunDiagnostics);
        let rerun = diagnostics_job(&tx.effects).run();
        assert_eq!(*first, rerun);
    }

    #[test]
    fn test_stale_diagnostics_are_discarded() {
        let state = complete_session();
        let first = reduce(&state, SessionCommand::RunDiagnostics);
        let old_job = diagnostics_job(&first.effects);
        let second = reduce(&first.state, SessionCommand::RunDiagnostics);
        let new_job = diagnostics_job(&second.effects);
        assert!(new_job.generation > old_job.generation);

        let tx = reduce(
            &second.state,
            SessionCommand::DiagnosticsCompleted {
                generation: old_job.generation,
                result: old_job.run(),
            },
        );
        assert!(tx.state.diagnostics.is_none());
        assert!(tx.state.tasks.diagnostics.in_flight());

        let state = apply(
            &tx.state,
            SessionCommand::DiagnosticsCompleted {
                generation: new_job.generation,
                result: new_job.run(),
            },
        );
        assert!(state.diagnostics.is_some());
    }

    #[test]
    fn test_new_configuration_supersedes_in_flight_work() {
        let state = complete_session();
        let running = reduce(&state, SessionCommand::RunDiagnostics);
        let job = diagnostics_job(&running.effects);

        let tx = reduce(
            &running.state,
            SessionCommand::ReplaceTestConfiguration(TestConfiguration {
                net_pay_ft: 80.0,
                ..make_config()
            }),
        );
        assert!(tx
            .effects
            .iter()
            .any(|e| matches!(e, Effect::Cancel(TaskKind::Diagnostics))));

        let state = apply(
            &tx.state,
            SessionCommand::DiagnosticsCompleted {
                generation: job.generation,
                result: job.run(),
            },
        );
        assert!(state.diagnostics.is_none());
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let original = complete_session();
        let mut state = original.clone();
        for i in 1..=5 {
            state = apply(
                &state,
                SessionCommand::UpdateMatchParameters(ParameterUpdate::permeability(10.0 * i as f64)),
            );
        }
        let updated = state.parameters;
        assert_eq!(updated.permeability_md, 50.0);

        for _ in 0..5 {
            state = apply(&state, SessionCommand::Undo);
        }
        assert!(state.parameters.same_values(&original.parameters));
        assert!(!state.can_undo());

        for _ in 0..5 {
            state = apply(&state, SessionCommand::Redo);
        }
        assert!(state.parameters.same_values(&updated));
        assert!(state.parameters.version > updated.version);
    }

    #[test]
    fn test_history_keeps_latest_twenty() {
        let mut state = complete_session();
        for i in 0..25 {
            state = apply(
                &state,
                SessionCommand::UpdateMatchParameters(ParameterUpdate::skin(i as f64)),
            );
        }
        assert_eq!(state.history.past_len(), 20);
        for _ in 0..25 {
            state = apply(&state, SessionCommand::Undo);
        }
        // Oldest surviving prior is the value before update #5 (skin = 4)
        assert_eq!(state.parameters.skin, 4.0);
    }

    #[test]
    fn test_invalid_update_is_rejected() {
        let state = complete_session();
        let tx = reduce(
            &state,
            SessionCommand::UpdateMatchParameters(ParameterUpdate::permeability(-1.0)),
        );
        assert_eq!(tx.state.parameters, state.parameters);
        assert!(!tx.state.can_undo());
    }

    #[test]
    fn test_auto_match_result_needs_acceptance() {
        let state = with_diagnostics();
        let tx = reduce(&state, SessionCommand::StartAutoMatch);
        let job = match tx.effects.as_slice() {
            [Effect::RunAutoMatch(job)] => job.clone(),
            other => panic!("expected auto-match effect, got {other:?}"),
        };
        let mut progress = 0;
        let result = job.run(&CancellationToken::new(), |_| progress += 1).unwrap();
        assert_eq!(progress, result.iterations);

        let state = apply(
            &tx.state,
            SessionCommand::AutoMatchCompleted {
                generation: job.generation,
                result,
            },
        );
        assert!(state.pending_match.is_some());
        assert_eq!(state.parameters.permeability_md, 10.0);

        let accepted = apply(&state, SessionCommand::AcceptAutoMatch);
        assert!(accepted.pending_match.is_none());
        assert!(accepted.parameters.same_values(&result.parameters));
        assert!(accepted.match_quality.is_some());

        let undone = apply(&accepted, SessionCommand::Undo);
        assert_eq!(undone.parameters.permeability_md, 10.0);
    }

    #[test]
    fn test_select_fault_model_fills_distance() {
        let state = complete_session();
        let state = apply(&state, SessionCommand::SelectModel(ModelId::WellboreStorageFault));
        assert_eq!(state.model, ModelId::WellboreStorageFault);
        assert_eq!(state.parameters.fault_distance_ft, Some(500.0));
        assert!(state.can_undo());
    }

    #[test]
    fn test_replay_is_deterministic() {
        let commands = || {
            vec![
                SessionCommand::SubmitRawData(make_table()),
                SessionCommand::ConfirmColumnMapping(mapping()),
                SessionCommand::CompleteSetup(make_config()),
                SessionCommand::UpdateProcessingSettings(ProcessingSettings { smoothing_l: 0.25 }),
                SessionCommand::UpdateMatchParameters(ParameterUpdate::permeability(40.0)),
                SessionCommand::UpdateMatchParameters(ParameterUpdate::skin(3.0)),
                SessionCommand::Undo,
                SessionCommand::SetActiveView(View::Matching),
            ]
        };
        let replay = || {
            commands()
                .into_iter()
                .fold(SessionState::new(Arc::new(EngineConfig::default())), |s, c| {
                    apply(&s, c)
                })
        };
        let a = replay();
        let b = replay();
        assert_eq!(a.parameters, b.parameters);
        assert_eq!(a.history, b.history);
        assert_eq!(a.tasks, b.tasks);
        assert_eq!(a.view, b.view);
        assert_eq!(a.flow_capacity, b.flow_capacity);
        assert_eq!(a.processing.smoothing_l, 0.25);
    }

    #[test]
    fn test_late_time_region_is_radial_flow() {
        let state = complete_session();
        let tx = reduce(&state, SessionCommand::RunDiagnostics);
        let result = diagnostics_job(&tx.effects).run();
        let radial = result.regime_at(19).unwrap();
        assert_eq!(radial.regime, FlowRegime::RadialFlow);
        assert_eq!(radial.start_index, 14);
    }

    #[test]
    fn test_records_are_shared_not_copied() {
        let state = complete_session();
        let next = apply(&state, SessionCommand::SetActiveView(View::Matching));
        assert!(Arc::ptr_eq(&state.records, &next.records));
    }
}
