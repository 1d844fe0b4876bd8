//! shiftsat CLI - CP-SAT model compiler for workforce scheduling
//!
//! Command-line interface for checking a normalized schedule input,
//! compiling it to a solver wire request, and analyzing a solver's
//! response against the configured rules.

mod diagnostics;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shiftsat_compiler::{resolve_assignments, ModelBuilder};
use shiftsat_core::reporter::ReportItem;

use crate::diagnostics::{DiagnosticConfig, ExitCode, JsonEmitter, TerminalEmitter};

#[derive(Parser)]
#[command(name = "shiftsat")]
#[command(author, version, about = "CP-SAT model compiler for workforce scheduling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a schedule input and report configuration/coverage errors
    /// without emitting a solver request.
    Check {
        /// Normalized schedule input (.json or .toml)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Suppress non-error output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Compile a schedule input into a solver wire request.
    Compile {
        /// Normalized schedule input (.json or .toml)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output file for the solver request (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Suppress non-error output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Analyze a solver response against the compiled rules: resolves
    /// assignments, re-runs each rule's post-solve validation, and joins
    /// soft-constraint violations back against their tracked constraints.
    Analyze {
        /// Normalized schedule input (.json or .toml)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Solver response document (.json)
        #[arg(value_name = "RESPONSE")]
        response: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Suppress passed/violation output, show only errors
        #[arg(short, long)]
        quiet: bool,
    },
}

fn main() -> Result<process::ExitCode> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let exit = match cli.command {
        Commands::Check {
            file,
            format,
            quiet,
        } => cmd_check(&file, &format, quiet)?,
        Commands::Compile {
            file,
            output,
            quiet,
        } => cmd_compile(&file, output.as_deref(), quiet)?,
        Commands::Analyze {
            input,
            response,
            format,
            quiet,
        } => cmd_analyze(&input, &response, &format, quiet)?,
    };

    Ok(exit.into())
}

fn build_model(file: &Path) -> Result<ModelBuilder> {
    let input = shiftsat_io::load_schedule_input(file)
        .with_context(|| format!("failed to load '{}'", file.display()))?;
    let config = input.into_builder_config();
    ModelBuilder::new(config).with_context(|| "invalid schedule configuration")
}

fn emit_report_items(items: &[&ReportItem], format: &str, quiet: bool) -> ExitCode {
    let config = DiagnosticConfig { quiet };
    match format {
        "json" => {
            let mut emitter = JsonEmitter::new(config);
            for item in items {
                emitter.emit(item);
            }
            println!(
                "{}",
                serde_json::to_string_pretty(&emitter.to_json_value()).unwrap()
            );
            emitter.exit_code()
        }
        _ => {
            let mut emitter = TerminalEmitter::new(std::io::stderr(), config);
            for item in items {
                emitter.emit(item);
            }
            emitter.exit_code()
        }
    }
}

/// Reconstructs a [`Qualifier::key`] from the roles/skills recorded on a
/// coverage error's context, so `check` can ask `explain_coverage` why the
/// bucket could not be covered.
fn qualifier_key_from_context(roles: &[String], skills: &[String]) -> String {
    let mut roles = roles.to_vec();
    roles.sort_unstable();
    let mut skills = skills.to_vec();
    skills.sort_unstable();
    if roles.is_empty() {
        format!("skills:{}", if skills.is_empty() { "_" } else { &skills.join(",") })
    } else {
        format!(
            "roles:{}:skills:{}",
            roles.join(","),
            if skills.is_empty() { "_" } else { &skills.join(",") }
        )
    }
}

/// Check command: loads the input, compiles it (surfacing configuration and
/// coverage errors through the reporter), and reports without ever handing
/// the request to a solver.
fn cmd_check(file: &Path, format: &str, quiet: bool) -> Result<ExitCode> {
    let mut builder = build_model(file)?;
    builder
        .compile()
        .with_context(|| "failed to compile schedule to a solver request")?;

    let errors: Vec<&ReportItem> = builder.reporter().errors().iter().collect();
    let exit = emit_report_items(&errors, format, quiet);

    if !quiet && format != "json" {
        for item in &errors {
            if item.kind != "coverage" {
                continue;
            }
            let Some(day) = item.context.day.as_deref() else {
                continue;
            };
            let Ok(day) = chrono::NaiveDate::parse_from_str(day, "%Y-%m-%d") else {
                continue;
            };
            let qualifier_key = qualifier_key_from_context(&item.context.roles, &item.context.skills);
            for line in builder.explain_coverage(day, &qualifier_key) {
                eprintln!("   = explain: {line}");
            }
        }
    }

    if !quiet && exit == ExitCode::Success {
        eprintln!(
            "Checked '{}': {} members, {} patterns, {} coverage requirements",
            file.display(),
            builder.members().len(),
            builder.shift_patterns().len(),
            builder.coverage().len(),
        );
    }

    Ok(exit)
}

/// Compile command: writes the solver request to `output` (or stdout).
fn cmd_compile(file: &Path, output: Option<&Path>, quiet: bool) -> Result<ExitCode> {
    let mut builder = build_model(file)?;
    let request = builder
        .compile()
        .with_context(|| "failed to compile schedule to a solver request")?;

    match output {
        Some(path) => {
            shiftsat_io::save_solver_request(request, path)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            if !quiet {
                eprintln!("Solver request written to: {}", path.display());
            }
        }
        None => {
            println!("{}", serde_json::to_string_pretty(request)?);
        }
    }

    let error_count = builder.reporter().errors().len();
    Ok(ExitCode::from_error_count(error_count))
}

/// Analyze command: resolves the response's assignments, re-validates every
/// rule against them, joins soft violations against tracked constraints,
/// and reports the full error/violation/passed set.
fn cmd_analyze(
    input: &Path,
    response_path: &Path,
    format: &str,
    quiet: bool,
) -> Result<ExitCode> {
    let mut builder = build_model(input)?;
    builder
        .compile()
        .with_context(|| "failed to compile schedule to a solver request")?;

    let response = shiftsat_io::load_solver_response(response_path)
        .with_context(|| format!("failed to load '{}'", response_path.display()))?;

    let patterns = builder.shift_patterns().to_vec();
    let assignments = resolve_assignments(&response, &patterns, builder.reporter_mut());
    builder.validate_solution(&assignments);
    builder.analyze_solution(&response);

    let reporter = builder.reporter();
    let mut all: Vec<&ReportItem> = Vec::new();
    all.extend(reporter.errors());
    all.extend(reporter.violations());
    all.extend(reporter.passed());

    Ok(emit_report_items(&all, format, quiet))
}
