//! welltest-engine - pressure-transient interpretation from the command line
//!
//! Reads a raw data table as JSON (`{"headers": [...], "rows": [[...], ...]}`),
//! runs it through an interpretation session and prints a JSON report.
//!
//! # Usage
//!
//! ```bash
//! # Generate a synthetic drawdown and interpret it
//! ./synthetic-test --seed 7 | ./welltest-engine --test-type drawdown --initial-pressure 5000
//!
//! # Interpret a buildup using a saved test configuration
//! ./welltest-engine --input gauge.json --setup buildup.json --rate-column q
//! ```
//!
//! # Environment Variables
//!
//! - `WELLTEST_CONFIG`: Path to the engine configuration TOML
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use welltest_engine::config::{self, EngineConfig};
use welltest_engine::matching::AutoMatchResult;
use welltest_engine::session::{
    ImportStage, ProcessingSettings, SessionActor, SessionCommand, SessionHandle,
};
use welltest_engine::storage::{KeyValueStore, SledStore};
use welltest_engine::types::{
    ColumnMapping, DiagnosticsResult, FlowCapacity, MatchQuality, ModelId, ModelParameters,
    RawTable, TestConfiguration, TestType, TimeUnit, ValidationReport,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "welltest-engine")]
#[command(about = "Pressure-transient interpretation: Bourdet diagnostics and type-curve matching")]
#[command(version)]
struct CliArgs {
    /// JSON raw table to interpret (reads stdin when omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Engine configuration TOML (overrides WELLTEST_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sled directory used to persist the test configuration and settings
    #[arg(long, env = "WELLTEST_STORE")]
    store: Option<PathBuf>,

    /// Column holding elapsed time
    #[arg(long, default_value = "time")]
    time_column: String,

    /// Column holding gauge pressure
    #[arg(long, default_value = "pressure")]
    pressure_column: String,

    /// Column holding flow rate
    #[arg(long)]
    rate_column: Option<String>,

    /// Unit of the time column
    #[arg(long, value_enum, default_value = "hours")]
    time_unit: CliTimeUnit,

    /// JSON test configuration; flags below override its fields
    #[arg(long)]
    setup: Option<PathBuf>,

    #[arg(long, value_enum)]
    test_type: Option<CliTestType>,

    /// Initial reservoir pressure (psi); 0 uses the first record
    #[arg(long)]
    initial_pressure: Option<f64>,

    /// Producing time before shut-in (hours)
    #[arg(long)]
    producing_time: Option<f64>,

    #[arg(long)]
    porosity: Option<f64>,

    /// Total compressibility (1/psi)
    #[arg(long)]
    compressibility: Option<f64>,

    /// Wellbore radius (ft)
    #[arg(long)]
    wellbore_radius: Option<f64>,

    /// Net pay (ft)
    #[arg(long)]
    net_pay: Option<f64>,

    /// Viscosity (cp)
    #[arg(long)]
    viscosity: Option<f64>,

    /// Formation volume factor (rb/STB)
    #[arg(long)]
    fvf: Option<f64>,

    /// Reservoir model to match (wbs_radial, wbs_fault)
    #[arg(long)]
    model: Option<ModelId>,

    /// Bourdet smoothing window L (log10 cycles)
    #[arg(long)]
    smoothing: Option<f64>,

    /// Stop after diagnostics
    #[arg(long)]
    no_match: bool,

    /// Pretty-print the report
    #[arg(long)]
    pretty: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliTimeUnit {
    Hours,
    Minutes,
    Seconds,
}

impl From<CliTimeUnit> for TimeUnit {
    fn from(unit: CliTimeUnit) -> Self {
        match unit {
            CliTimeUnit::Hours => TimeUnit::Hours,
            CliTimeUnit::Minutes => TimeUnit::Minutes,
            CliTimeUnit::Seconds => TimeUnit::Seconds,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliTestType {
    Buildup,
    Drawdown,
}

impl From<CliTestType> for TestType {
    fn from(kind: CliTestType) -> Self {
        match kind {
            CliTestType::Buildup => TestType::Buildup,
            CliTestType::Drawdown => TestType::Drawdown,
        }
    }
}

// ============================================================================
// Report
// ============================================================================

#[derive(Serialize)]
struct Report<'a> {
    validation: Option<&'a ValidationReport>,
    test_config: Option<&'a TestConfiguration>,
    smoothing_l: f64,
    model: ModelId,
    diagnostics: Option<&'a DiagnosticsResult>,
    auto_match: Option<AutoMatchResult>,
    parameters: ModelParameters,
    match_quality: Option<MatchQuality>,
    flow_capacity: Option<FlowCapacity>,
}

// ============================================================================
// Helpers
// ============================================================================

fn read_table(input: Option<&Path>) -> Result<RawTable> {
    match input {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse raw table from {}", path.display()))
        }
        None => serde_json::from_reader(std::io::stdin().lock())
            .context("Failed to parse raw table from stdin"),
    }
}

/// Setup file, else the configuration restored by the store, else defaults;
/// then flag overrides.
fn resolve_setup(args: &CliArgs, restored: Option<&TestConfiguration>) -> Result<TestConfiguration> {
    let mut setup = match &args.setup {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse test configuration {}", path.display()))?
        }
        None => restored.cloned().unwrap_or_default(),
    };

    if let Some(kind) = args.test_type {
        setup.test_type = kind.into();
    }
    let overrides = [
        (args.initial_pressure, &mut setup.initial_pressure_psi),
        (args.producing_time, &mut setup.producing_time_hours),
        (args.porosity, &mut setup.porosity),
        (args.compressibility, &mut setup.total_compressibility),
        (args.wellbore_radius, &mut setup.wellbore_radius_ft),
        (args.net_pay, &mut setup.net_pay_ft),
        (args.viscosity, &mut setup.viscosity_cp),
        (args.fvf, &mut setup.formation_volume_factor),
    ];
    for (value, field) in overrides {
        if let Some(v) = value {
            *field = v;
        }
    }
    Ok(setup)
}

async fn interpret(args: &CliArgs, handle: &SessionHandle, table: RawTable) -> Result<()> {
    handle.dispatch(SessionCommand::SubmitRawData(table)).await?;

    let mut mapping = ColumnMapping::new(&args.time_column, &args.pressure_column)
        .with_time_unit(args.time_unit.into());
    if let Some(rate) = &args.rate_column {
        mapping = mapping.with_rate(rate);
    }
    let snapshot = handle
        .dispatch(SessionCommand::ConfirmColumnMapping(mapping))
        .await?;
    if snapshot.stage != ImportStage::Setup {
        let errors = snapshot
            .validation
            .as_ref()
            .map(|r| r.errors.join("; "))
            .unwrap_or_default();
        bail!("Import failed: {errors}");
    }

    if let Some(smoothing_l) = args.smoothing {
        handle
            .dispatch(SessionCommand::UpdateProcessingSettings(ProcessingSettings { smoothing_l }))
            .await?;
    }
    if let Some(model) = args.model {
        handle.dispatch(SessionCommand::SelectModel(model)).await?;
    }

    let setup = resolve_setup(args, snapshot.test_config.as_deref())?;
    let snapshot = handle.dispatch(SessionCommand::CompleteSetup(setup)).await?;
    if snapshot.stage != ImportStage::Complete {
        bail!("Test configuration rejected; see log for details");
    }

    let mut snapshot = handle.run_diagnostics().await?;
    if snapshot.diagnostics.is_none() {
        bail!("Diagnostics produced no result");
    }

    let mut auto_match = None;
    if !args.no_match {
        snapshot = handle.auto_match().await?;
        auto_match = snapshot.pending_match;
        if auto_match.is_some() {
            snapshot = handle.dispatch(SessionCommand::AcceptAutoMatch).await?;
        } else {
            warn!("Auto-match produced no result; reporting starting parameters");
        }
    }

    let report = Report {
        validation: snapshot.validation.as_ref(),
        test_config: snapshot.test_config.as_deref(),
        smoothing_l: snapshot.processing.smoothing_l,
        model: snapshot.model,
        diagnostics: snapshot.diagnostics.as_deref(),
        auto_match,
        parameters: snapshot.parameters,
        match_quality: snapshot.match_quality,
        flow_capacity: snapshot.flow_capacity,
    };
    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (stderr keeps stdout for the report)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    let engine = match &args.config {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load engine configuration {}", path.display()))?,
        None => EngineConfig::load(),
    };
    config::init(engine);

    let store: Option<Arc<dyn KeyValueStore>> = match &args.store {
        Some(path) => {
            let store = SledStore::open(path)
                .with_context(|| format!("Failed to open store at {}", path.display()))?;
            info!(path = %path.display(), "Settings store opened");
            Some(Arc::new(store))
        }
        None => None,
    };

    let table = read_table(args.input.as_deref())?;
    info!(rows = table.rows.len(), columns = table.headers.len(), "Raw table loaded");

    let handle = SessionActor::spawn(Arc::new(config::get().clone()), store);
    interpret(&args, &handle, table).await
}
