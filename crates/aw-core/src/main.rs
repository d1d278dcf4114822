//! Agentwatch command-line interface.
//!
//! - `aw correlate`: merge raw activity records into conversations
//! - `aw export`: sanitize conversations into a shareable bundle
//! - `aw profiles`: inspect redaction profiles
//! - `aw check`: verify a bundle before upload
//!
//! Command payloads go to stdout as JSON. Logs and errors go to stderr.

use aw_bundle::BundleFormat;
use aw_common::StructuredError;
use aw_core::config::{load_config, ConfigOptions, ResolvedConfig};
use aw_core::exit_codes::ExitCode;
use aw_core::logging::{generate_run_id, init_logging, LogConfig, LogFormat, LogLevel};
use aw_core::pipeline::{self, ExportRequest};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info_span};

/// Correlate AI coding-agent activity and export it safely
#[derive(Parser)]
#[command(name = "aw")]
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
    /// Config file (overrides AW_CONFIG and the default locations)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Print compact JSON instead of pretty JSON
    #[arg(long, global = true)]
    compact: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge raw records into conversations
    Correlate(CorrelateArgs),

    /// Prepare conversations and write an export bundle
    Export(ExportArgs),

    /// Inspect redaction profiles
    #[command(subcommand)]
    Profiles(ProfilesCommand),

    /// Verify a bundle's structure, hashes and residue
    Check(CheckArgs),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Correlate(_) => "correlate",
            Commands::Export(_) => "export",
            Commands::Profiles(_) => "profiles",
            Commands::Check(_) => "check",
        }
    }
}

// ============================================================================
// Command argument structs
// ============================================================================

#[derive(Args, Debug)]
struct CorrelateArgs {
    /// Record document (JSON), or `-` for stdin
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Reference time in epoch milliseconds for open-ended sessions
    #[arg(long)]
    now: Option<i64>,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Record document (JSON), or `-` for stdin
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Redaction profile id
    #[arg(long, short = 'p')]
    profile: Option<String>,

    /// Bundle path; a `.zip` extension selects the ZIP format
    #[arg(long, short = 'o')]
    output: PathBuf,

    /// Write a ZIP bundle regardless of the output extension
    #[arg(long)]
    zip: bool,

    /// Export only these correlation ids (repeatable)
    #[arg(long = "session", short = 's')]
    sessions: Vec<String>,

    /// Record the export time in the manifest
    #[arg(long)]
    timestamp: bool,

    /// Reference time in epoch milliseconds for open-ended sessions
    #[arg(long)]
    now: Option<i64>,
}

#[derive(Subcommand, Debug)]
enum ProfilesCommand {
    /// List built-in and user profiles
    List,
    /// Print one profile in full
    Show {
        /// Profile id
        id: String,
    },
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Bundle file (JSONL or ZIP)
    bundle: PathBuf,
}

// ============================================================================
// Main entry point
// ============================================================================

fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::from_env(cli.global.log_level, cli.global.log_format);
    init_logging(&log_config);

    let run_id = generate_run_id();
    let span = info_span!("aw", run_id = %run_id, command = cli.command.name());
    let _guard = span.enter();

    let exit_code = match run(&cli) {
        Ok(code) => code,
        Err(err) => output_error(&err),
    };

    debug!(exit_code = exit_code.as_i32(), "Command finished");
    std::process::exit(exit_code.as_i32());
}

fn run(cli: &Cli) -> aw_common::Result<ExitCode> {
    let global = &cli.global;
    match &cli.command {
        Commands::Correlate(args) => run_correlate(global, args),
        Commands::Export(args) => run_export(global, args),
        Commands::Profiles(command) => run_profiles(global, command),
        Commands::Check(args) => run_check(global, args),
    }
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_correlate(global: &GlobalOpts, args: &CorrelateArgs) -> aw_common::Result<ExitCode> {
    let resolved = resolve(global)?;
    let records = pipeline::read_records(&args.input)?;
    let now = args.now.unwrap_or_else(now_ms);
    let output = pipeline::correlate_records(&records, &resolved.config, now)?;
    print_json(global, &output)?;
    Ok(ExitCode::Clean)
}

fn run_export(global: &GlobalOpts, args: &ExportArgs) -> aw_common::Result<ExitCode> {
    let resolved = resolve(global)?;
    let records = pipeline::read_records(&args.input)?;

    let format = if args.zip {
        BundleFormat::Zip
    } else {
        BundleFormat::from_path(&args.output)
    };
    let request = ExportRequest {
        profile: args.profile.clone(),
        sessions: args.sessions.clone(),
        output: args.output.clone(),
        format,
        created_at: args.timestamp.then(chrono::Utc::now),
        now_ms: args.now.unwrap_or_else(now_ms),
    };

    let summary = pipeline::export_bundle(&records, &resolved.config, &request)?;
    print_json(global, &summary)?;
    Ok(if summary.has_warnings() {
        ExitCode::Warnings
    } else {
        ExitCode::Clean
    })
}

fn run_profiles(global: &GlobalOpts, command: &ProfilesCommand) -> aw_common::Result<ExitCode> {
    let resolved = resolve(global)?;
    let store = resolved.config.load_profile_store()?;
    match command {
        ProfilesCommand::List => print_json(global, &pipeline::list_profiles(&store))?,
        ProfilesCommand::Show { id } => {
            let profile = pipeline::show_profile(id, &store, &resolved.config)?;
            print_json(global, &profile)?;
        }
    }
    Ok(ExitCode::Clean)
}

fn run_check(global: &GlobalOpts, args: &CheckArgs) -> aw_common::Result<ExitCode> {
    let report = pipeline::check_bundle(&args.bundle)?;
    print_json(global, &report)?;

    let code = if report.blocked {
        ExitCode::Blocked
    } else if !report.is_valid() {
        ExitCode::BundleInvalid
    } else if !report.residue.is_empty() {
        ExitCode::Warnings
    } else {
        ExitCode::Clean
    };
    Ok(code)
}

// ============================================================================
// Helpers
// ============================================================================

fn resolve(global: &GlobalOpts) -> aw_common::Result<ResolvedConfig> {
    let resolved = load_config(&ConfigOptions {
        config_path: global.config.clone(),
    })?;
    debug!(source = %resolved.source, hash = ?resolved.hash, "Config resolved");
    Ok(resolved)
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn print_json<T: Serialize>(global: &GlobalOpts, value: &T) -> aw_common::Result<()> {
    let text = if global.compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", text);
    Ok(())
}

/// Print an error as JSON on stderr and pick its exit code.
fn output_error(err: &aw_common::Error) -> ExitCode {
    let exit_code = ExitCode::from(err);
    debug!(code = err.code(), exit = %exit_code, "Command failed");
    eprintln!("{}", StructuredError::from(err).to_json());
    exit_code
}
