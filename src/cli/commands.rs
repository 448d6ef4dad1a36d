//! Command implementation for the bufr2nc CLI
//!
//! Runs the pre-flight checks, drives a conversion into a temporary file
//! next to the requested output, and reports a summary of the run.

use crate::app::models::{ObsKind, SourceFormat};
use crate::app::services::schema::{SchemaTemplate, resolve_descriptor};
use crate::cli::args::Args;
use crate::config::ConverterConfig;
use crate::{Error, Result};
use colored::*;
use indicatif::HumanDuration;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::error;

/// What a finished run reports to the user
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub kind: ObsKind,
    pub format: SourceFormat,
    pub output: PathBuf,
    pub matching_messages: usize,
    pub selected_messages: usize,
    pub observations: usize,
    pub reference_date: i64,
    pub truncated_values: usize,
    pub elapsed: Duration,
}

/// Set up structured logging based on CLI arguments
pub fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bufr2nc={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
            .map_err(|e| Error::configuration(format!("Failed to set up logging: {e}")))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .map_err(|e| Error::configuration(format!("Failed to set up logging: {e}")))?;
    }

    Ok(())
}

/// Collect every problem detectable before the input is read
///
/// Returns the schema template when no problem was found.
pub fn check_run(
    args: &Args,
    config: &ConverterConfig,
) -> std::result::Result<SchemaTemplate, Vec<Error>> {
    let mut problems = Vec::new();

    if !args.input.exists() {
        problems.push(Error::InputNotFound {
            path: args.input.clone(),
        });
    }
    if args.output.exists() && !config.clobber {
        problems.push(Error::OutputExists {
            path: args.output.clone(),
        });
    }
    if let Err(e) = config.validate() {
        problems.push(e);
    }

    let template = match args.obs_kind() {
        Ok(kind) => match resolve_descriptor(kind, args.source_format(), &config.ceilings) {
            Ok(template) => match template.require_defined() {
                Ok(()) => Some(template),
                Err(e) => {
                    problems.push(e);
                    None
                }
            },
            Err(e) => {
                problems.push(e);
                None
            }
        },
        Err(e) => {
            problems.push(e);
            None
        }
    };

    match template {
        Some(template) if problems.is_empty() => Ok(template),
        _ => Err(problems),
    }
}

/// Fold the pre-flight problems into one error, logging each of them
///
/// A single problem is returned unchanged so its exit code is preserved.
pub fn combine_problems(mut problems: Vec<Error>) -> Error {
    for problem in &problems {
        error!("{}", problem);
    }
    if problems.len() == 1 {
        if let Some(problem) = problems.pop() {
            return problem;
        }
    }
    let message = problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    Error::configuration(format!("{} problems found: {}", problems.len(), message))
}

/// Directory the temporary output is created in
#[cfg_attr(not(feature = "netcdf"), allow(dead_code))]
fn staging_dir(output: &Path) -> &Path {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Main command runner
///
/// The dataset is written to a temporary file in the destination directory
/// and renamed into place only when the conversion succeeds.
#[cfg(feature = "netcdf")]
pub fn run(args: Args) -> Result<RunSummary> {
    use crate::app::adapters::json_source::JsonDumpSource;
    use crate::app::adapters::netcdf_dataset::NetcdfDataset;
    use crate::app::services::conversion::run_conversion;
    use std::time::Instant;
    use tracing::{info, warn};

    setup_logging(&args)?;
    let start = Instant::now();

    let config = args.to_config();
    let template = check_run(&args, &config).map_err(combine_problems)?;
    if args.output.exists() {
        warn!("Overwriting existing output file {}", args.output.display());
    }
    info!(
        "Converting {} ({}) from {} to {}",
        template.kind(),
        template.format(),
        args.input.display(),
        args.output.display()
    );

    let staging = tempfile::Builder::new()
        .prefix(".bufr2nc-")
        .suffix(".nc")
        .tempfile_in(staging_dir(&args.output))
        .map_err(|e| Error::io("Failed to create temporary output file", e))?
        .into_temp_path();

    let mut source = JsonDumpSource::open(&args.input)?;
    let mut writer = NetcdfDataset::create(&staging)?;
    let outcome = run_conversion(&template, &mut source, &mut writer, &config)?;
    drop(writer);

    let persisted = if config.clobber {
        staging.persist(&args.output)
    } else {
        staging.persist_noclobber(&args.output)
    };
    persisted.map_err(|e| {
        Error::io(
            format!("Failed to move output into place at {}", args.output.display()),
            e.error,
        )
    })?;

    let summary = RunSummary {
        kind: template.kind(),
        format: template.format(),
        output: args.output.clone(),
        matching_messages: outcome.scan.matching_messages,
        selected_messages: outcome.scan.selected_messages,
        observations: outcome.stats.observations_written,
        reference_date: outcome.reference_time.yyyymmddhh(),
        truncated_values: outcome.stats.truncated_values,
        elapsed: start.elapsed(),
    };

    if !args.quiet {
        print_summary(&summary);
    }
    Ok(summary)
}

/// Print the run summary to stdout
pub fn print_summary(summary: &RunSummary) {
    println!();
    println!("{}", "Conversion complete".bright_green().bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "   • Observation type: {} ({})",
        summary.kind.to_string().bright_yellow(),
        summary.format
    );
    println!("   • Matching messages: {}", summary.matching_messages);
    println!("   • Selected messages: {}", summary.selected_messages);
    println!("   • Observations written: {}", summary.observations);
    println!("   • Reference date: {}", summary.reference_date);
    if summary.truncated_values > 0 {
        println!(
            "   • {}",
            format!(
                "Values dropped at dimension ceilings: {}",
                summary.truncated_values
            )
            .yellow()
        );
    }
    println!("   • Output file: {}", summary.output.display());
    println!("   • Elapsed time: {}", HumanDuration(summary.elapsed));
    println!();
}
