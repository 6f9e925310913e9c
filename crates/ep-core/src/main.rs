//! epiphase - phase-segmented compartmental epidemic modeling
//!
//! The driver handles:
//! - Example record generation from model example values
//! - Trend segmentation of records into phases
//! - Per-phase parameter estimation
//! - Summaries, histories and tracking of the fitted series
//! - Configuration inspection

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use ep_common::{format_error_human, Error, OutputFormat, RecordSet, RecordSupply, StructuredError};
use ep_config::{
    list_presets, load_config, load_config_file, validate_config, ConfigOptions, ConfigSource,
    PresetName, ResolvedConfig,
};
use ep_core::exit_codes::ExitCode;
use ep_core::logging::{
    event_names, generate_run_id, get_host_id, init_logging, LogConfig, LogContext, LogFormat,
    LogLevel, Stage,
};
use ep_core::{
    config_error, log_event, ExampleData, HistoryTarget, ModelKind, ParamMap, PhaseAddition,
    Scenario, Tau,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};

/// Phase-segmented compartmental epidemic modeling
#[derive(Parser)]
#[command(name = "epiphase")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Preset used when no config file is found (default, quick, thorough)
    #[arg(long, global = true)]
    preset: Option<String>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a model's example values into a records document
    Example(ExampleArgs),

    /// Segment records into phases by S-R trend analysis
    Trend(TrendArgs),

    /// Segment records and fit a model to every phase
    Estimate(EstimateArgs),

    /// Per-phase summary table
    Summary(SummaryArgs),

    /// Simulate the fitted phases day by day
    Track(TrackArgs),

    /// Per-phase or daily history of one quantity
    History(HistoryArgs),

    /// Configuration management
    Config(ConfigArgs),
}

// ============================================================================
// Command argument structs
// ============================================================================

#[derive(Args, Debug)]
struct ExampleArgs {
    /// Model to simulate (SIR, SIR-D, SIR-F, SEWIR-F)
    #[arg(long, short = 'm')]
    model: ModelKind,

    /// Number of simulated days after the start date
    #[arg(long, default_value_t = 180)]
    days: usize,

    /// Minutes per simulation step
    #[arg(long, default_value_t = 1440)]
    tau: u32,

    /// Date of the first record
    #[arg(long, default_value = "2022-01-01")]
    start: NaiveDate,

    /// Override an example parameter (name=value), repeatable
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, f64)>,
}

#[derive(Args, Debug)]
struct RecordsArgs {
    /// Records document ({"population": N, "records": [...]}); "-" reads stdin
    #[arg(long, short = 'r')]
    records: PathBuf,

    /// Series to work on
    #[arg(long, short = 's')]
    series: Option<String>,
}

#[derive(Args, Debug)]
struct FitArgs {
    /// Model to fit (SIR, SIR-D, SIR-F, SEWIR-F)
    #[arg(long, short = 'm')]
    model: ModelKind,

    /// Fixed tau in minutes; searched when omitted and not configured
    #[arg(long)]
    tau: Option<u32>,

    /// Override the configured trial budget per phase
    #[arg(long)]
    trials: Option<usize>,
}

#[derive(Args, Debug)]
struct TrendArgs {
    #[command(flatten)]
    input: RecordsArgs,
}

#[derive(Args, Debug)]
struct EstimateArgs {
    #[command(flatten)]
    input: RecordsArgs,

    #[command(flatten)]
    fit: FitArgs,
}

#[derive(Args, Debug)]
struct SummaryArgs {
    #[command(flatten)]
    input: RecordsArgs,

    /// Fit this model before summarizing
    #[arg(long, short = 'm')]
    model: Option<ModelKind>,

    /// Fixed tau in minutes
    #[arg(long)]
    tau: Option<u32>,

    /// Restrict output to these columns (e.g. Start,ODE,Rt,rho)
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,
}

#[derive(Args, Debug)]
struct TrackArgs {
    #[command(flatten)]
    input: RecordsArgs,

    #[command(flatten)]
    fit: FitArgs,

    /// Extend the series this many days past the last record
    #[arg(long)]
    future_days: Option<usize>,

    /// Parameter changes for the future phase (name=value), repeatable
    #[arg(long = "param", value_parser = parse_param, requires = "future_days")]
    params: Vec<(String, f64)>,
}

#[derive(Args, Debug)]
struct HistoryArgs {
    #[command(flatten)]
    input: RecordsArgs,

    #[command(flatten)]
    fit: FitArgs,

    /// Quantity: a parameter, a day parameter, Rt or a model variable
    #[arg(long, short = 't')]
    target: HistoryTarget,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the resolved configuration
    Show,

    /// Validate a configuration file
    Validate {
        /// File to validate; the resolved configuration when omitted
        path: Option<PathBuf>,
    },

    /// List built-in presets
    Presets,
}

fn parse_param(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got {s:?}"))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value for {name}: {e}"))?;
    Ok((name.trim().to_string(), value))
}

// ============================================================================
// Output
// ============================================================================

/// What a command produced.
struct Report {
    command: &'static str,
    /// Main payload, merged into the JSON envelope.
    payload: Value,
    /// Row-shaped data written one per line in JSONL mode.
    rows: Vec<Value>,
    summary: String,
    exit: ExitCode,
}

impl Report {
    fn new(command: &'static str, payload: Value, summary: String) -> Self {
        Report {
            command,
            payload,
            rows: Vec::new(),
            summary,
            exit: ExitCode::Clean,
        }
    }

    fn with_rows<T: Serialize>(mut self, rows: &[T]) -> ep_common::Result<Self> {
        self.rows = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    fn with_exit(mut self, exit: ExitCode) -> Self {
        self.exit = exit;
        self
    }
}

fn emit(global: &GlobalOpts, ctx: &LogContext, report: &Report) -> ep_common::Result<()> {
    match global.format {
        OutputFormat::Json => {
            let mut envelope = json!({
                "schema_version": ep_config::CONFIG_SCHEMA_VERSION,
                "run_id": ctx.run_id,
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "command": report.command,
                "status": report.exit.code_name(),
            });
            if let (Some(envelope), Value::Object(payload)) =
                (envelope.as_object_mut(), report.payload.clone())
            {
                envelope.extend(payload);
            }
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        OutputFormat::Jsonl => {
            if report.rows.is_empty() {
                println!("{}", serde_json::to_string(&report.payload)?);
            }
            for row in &report.rows {
                println!("{}", serde_json::to_string(row)?);
            }
        }
        OutputFormat::Summary => {
            println!("[{}] {}: {}", ctx.run_id, report.command, report.summary)
        }
    }
    Ok(())
}

fn emit_error(global: &GlobalOpts, ctx: &LogContext, command: &str, err: &Error) -> ExitCode {
    let exit = ExitCode::from(err);
    log_event!(
        ctx,
        ERROR,
        event_names::INTERNAL_ERROR,
        Stage::Report,
        "command failed",
        command = command,
        code = err.code(),
        exit = exit.as_i32()
    );
    match global.format {
        OutputFormat::Json | OutputFormat::Jsonl => {
            let structured = StructuredError::from(err)
                .with_context("command", command)
                .with_context("run_id", &ctx.run_id);
            eprintln!("{}", structured.to_json());
        }
        OutputFormat::Summary => {
            eprintln!("{}", format_error_human(err, std::io::stderr().is_terminal()));
        }
    }
    exit
}

// ============================================================================
// Entry point
// ============================================================================

fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::from_env(cli.global.log_level, cli.global.log_format);
    init_logging(&log_config);
    let ctx = LogContext::new(generate_run_id(), get_host_id());

    let command = command_name(&cli.command);
    log_event!(
        ctx,
        DEBUG,
        event_names::RUN_STARTED,
        Stage::Init,
        "run started",
        command = command
    );

    let result = match &cli.command {
        Commands::Example(args) => run_example(args),
        Commands::Trend(args) => run_trend(&cli.global, &ctx, args),
        Commands::Estimate(args) => run_estimate(&cli.global, &ctx, args),
        Commands::Summary(args) => run_summary(&cli.global, &ctx, args),
        Commands::Track(args) => run_track(&cli.global, &ctx, args),
        Commands::History(args) => run_history(&cli.global, &ctx, args),
        Commands::Config(args) => run_config(&cli.global, args),
    };

    let emitted = result.and_then(|report| emit(&cli.global, &ctx, &report).map(|_| report.exit));
    let exit_code = match emitted {
        Ok(exit) => exit,
        Err(err) => emit_error(&cli.global, &ctx, command, &err),
    };

    log_event!(
        ctx,
        DEBUG,
        event_names::RUN_FINISHED,
        Stage::Report,
        "run finished",
        command = command,
        exit = exit_code.as_i32()
    );
    std::process::exit(exit_code.as_i32());
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Example(_) => "example",
        Commands::Trend(_) => "trend",
        Commands::Estimate(_) => "estimate",
        Commands::Summary(_) => "summary",
        Commands::Track(_) => "track",
        Commands::History(_) => "history",
        Commands::Config(_) => "config",
    }
}

// ============================================================================
// Shared setup
// ============================================================================

fn resolve(global: &GlobalOpts) -> ep_common::Result<ResolvedConfig> {
    let preset = global
        .preset
        .as_deref()
        .map(|name| {
            PresetName::parse(name)
                .ok_or_else(|| Error::Config(format!("unknown preset {name:?}")))
        })
        .transpose()?;
    load_config(&ConfigOptions {
        path: global.config.clone(),
        preset,
    })
    .map_err(config_error)
}

fn read_records(path: &Path) -> ep_common::Result<RecordSet> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };
    let supply: RecordSupply = serde_json::from_str(&content)?;
    RecordSet::from_supply(supply)
}

/// Load configuration and records into a scenario with trend phases in the
/// selected series.
fn open_scenario(
    global: &GlobalOpts,
    ctx: &LogContext,
    input: &RecordsArgs,
    trials: Option<usize>,
) -> ep_common::Result<Scenario> {
    let resolved = resolve(global)?;
    match resolved.source {
        ConfigSource::BuiltinDefault => log_event!(
            ctx,
            DEBUG,
            event_names::CONFIG_DEFAULT_USED,
            Stage::Init,
            "using built-in configuration"
        ),
        _ => log_event!(
            ctx,
            DEBUG,
            event_names::CONFIG_LOADED,
            Stage::Init,
            "configuration loaded",
            source = tracing::field::display(&resolved.source)
        ),
    }
    let mut config = resolved.config;
    if let Some(trials) = trials {
        config.estimation.trial_budget = trials;
    }

    let records = read_records(&input.records)?;
    log_event!(
        ctx,
        INFO,
        event_names::RECORDS_LOADED,
        Stage::Load,
        "records loaded",
        records = records.len(),
        population = records.population()
    );

    let mut scenario = Scenario::new(records, config)?;
    scenario.clear(input.series.as_deref(), None)?;
    Ok(scenario)
}

/// Fit `model` to the selected series and return the batch as JSON with its
/// exit code.
fn fit(
    scenario: &mut Scenario,
    input: &RecordsArgs,
    model: ModelKind,
    tau: Option<u32>,
) -> ep_common::Result<(Value, ExitCode)> {
    let tau = tau.map(Tau::new).transpose()?;
    let batch = scenario.estimate(model, input.series.as_deref(), tau)?;
    let exit = match (batch.failed(), batch.estimated()) {
        (0, _) => ExitCode::Clean,
        (_, 0) => ExitCode::EstimationError,
        _ => ExitCode::PartialFail,
    };
    Ok((serde_json::to_value(&batch)?, exit))
}

// ============================================================================
// Command implementations
// ============================================================================

/// The payload carries `population` and `records` at the top level, so the
/// output can be passed back as `--records`.
fn run_example(args: &ExampleArgs) -> ep_common::Result<Report> {
    let overrides: ParamMap = args.params.iter().cloned().collect();
    let records = ExampleData::new(Tau::new(args.tau)?, args.start).generate(
        args.model,
        args.days,
        &overrides,
    )?;
    let supply = RecordSupply {
        population: records.population(),
        records: records.records().to_vec(),
    };
    let summary = format!(
        "{} records of {} from {} to {}",
        records.len(),
        args.model,
        records.first_date(),
        records.last_date()
    );
    Ok(Report::new("example", serde_json::to_value(&supply)?, summary)
        .with_rows(&supply.records)?)
}

fn run_trend(global: &GlobalOpts, ctx: &LogContext, args: &TrendArgs) -> ep_common::Result<Report> {
    let mut scenario = open_scenario(global, ctx, &args.input, None)?;
    let trend = scenario.segment()?;
    let rows = scenario.summary(args.input.series.as_deref())?;
    let summary = format!(
        "{} phases, change dates {:?}",
        trend.phase_count(),
        trend.change_dates
    );
    let payload = json!({
        "series": args.input.series.as_deref().unwrap_or(ep_core::MAIN),
        "trend": trend,
        "phases": rows,
    });
    Ok(Report::new("trend", payload, summary).with_rows(&rows)?)
}

fn run_estimate(
    global: &GlobalOpts,
    ctx: &LogContext,
    args: &EstimateArgs,
) -> ep_common::Result<Report> {
    let mut scenario = open_scenario(global, ctx, &args.input, args.fit.trials)?;
    let (batch, exit) = fit(&mut scenario, &args.input, args.fit.model, args.fit.tau)?;
    let rows = scenario.summary(args.input.series.as_deref())?;
    let summary = format!(
        "{} phases estimated with {} (tau {})",
        rows.iter().filter(|r| r.rmsle.is_some()).count(),
        args.fit.model,
        scenario.tau().map_or("-".to_string(), |t| t.to_string())
    );
    let payload = json!({ "estimation": batch, "phases": rows });
    Ok(Report::new("estimate", payload, summary)
        .with_rows(&rows)?
        .with_exit(exit))
}

fn run_summary(
    global: &GlobalOpts,
    ctx: &LogContext,
    args: &SummaryArgs,
) -> ep_common::Result<Report> {
    let mut scenario = open_scenario(global, ctx, &args.input, None)?;
    let exit = match args.model {
        Some(model) => fit(&mut scenario, &args.input, model, args.tau)?.1,
        None => ExitCode::Clean,
    };
    let series = args.input.series.as_deref();
    let rows: Vec<Value> = if args.columns.is_empty() {
        scenario
            .summary(series)?
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()?
    } else {
        let columns: Vec<&str> = args.columns.iter().map(String::as_str).collect();
        scenario
            .summary_table(series, &columns)?
            .into_iter()
            .map(Value::Object)
            .collect()
    };
    let summary = format!("{} enabled phases", rows.len());
    Ok(Report::new("summary", json!({ "rows": rows }), summary)
        .with_rows(&rows)?
        .with_exit(exit))
}

fn run_track(global: &GlobalOpts, ctx: &LogContext, args: &TrackArgs) -> ep_common::Result<Report> {
    let mut scenario = open_scenario(global, ctx, &args.input, args.fit.trials)?;
    let (_, exit) = fit(&mut scenario, &args.input, args.fit.model, args.fit.tau)?;
    let series = args.input.series.as_deref();
    if let Some(days) = args.future_days {
        let addition = args
            .params
            .iter()
            .fold(PhaseAddition::for_days(days), |add, (name, value)| {
                add.with_param(name.clone(), *value)
            });
        scenario.add(&addition, series)?;
    }
    let rows = scenario.track(series)?;
    let description = scenario
        .describe()?
        .into_iter()
        .find(|d| d.series == series.unwrap_or(ep_core::MAIN));
    let summary = match &description {
        Some(d) => format!(
            "{} days tracked, peak infected {:.0} on {}",
            rows.len(),
            d.max_infected.unwrap_or(0.0),
            d.max_infected_date
                .map_or("-".to_string(), |date| date.to_string())
        ),
        None => format!("{} days tracked", rows.len()),
    };
    let payload = json!({ "description": description, "rows": rows });
    Ok(Report::new("track", payload, summary)
        .with_rows(&rows)?
        .with_exit(exit))
}

fn run_history(
    global: &GlobalOpts,
    ctx: &LogContext,
    args: &HistoryArgs,
) -> ep_common::Result<Report> {
    let mut scenario = open_scenario(global, ctx, &args.input, args.fit.trials)?;
    let (_, exit) = fit(&mut scenario, &args.input, args.fit.model, args.fit.tau)?;
    let names: Vec<&str> = args.input.series.as_deref().into_iter().collect();
    let history = scenario.history(
        &args.target,
        (!names.is_empty()).then_some(names.as_slice()),
    )?;
    let summary = format!("{} points of {}", history.points.len(), history.target);
    Ok(Report::new("history", serde_json::to_value(&history)?, summary)
        .with_rows(&history.points)?
        .with_exit(exit))
}

fn run_config(global: &GlobalOpts, args: &ConfigArgs) -> ep_common::Result<Report> {
    match &args.command {
        ConfigCommands::Show => {
            let resolved = resolve(global)?;
            let summary = format!("{} ({})", resolved.source, display_path(&resolved.path));
            let payload = json!({
                "source": resolved.source.to_string(),
                "path": resolved.path,
                "config": resolved.config,
            });
            Ok(Report::new("config show", payload, summary))
        }
        ConfigCommands::Validate { path } => {
            let (config, path) = match path {
                Some(path) => {
                    let config = load_config_file(path).map_err(config_error)?;
                    validate_config(&config)
                        .map_err(|e| config_error(ep_config::ConfigError::from(e)))?;
                    (config, Some(path.clone()))
                }
                None => {
                    let resolved = resolve(global)?;
                    (resolved.config, resolved.path)
                }
            };
            let payload = json!({
                "valid": true,
                "path": path,
                "schema_version": config.schema_version,
            });
            let summary = format!("{} is valid", display_path(&path));
            Ok(Report::new("config validate", payload, summary))
        }
        ConfigCommands::Presets => {
            let presets = list_presets();
            let summary = presets
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            Ok(Report::new("config presets", json!({ "presets": presets }), summary)
                .with_rows(&presets)?)
        }
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map_or("built-in defaults".to_string(), |p| p.display().to_string())
}
