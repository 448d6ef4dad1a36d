//! Two-pass conversion
//!
//! The output format needs every dimension sized before data is written, so
//! a run first scans the input to count the records it will select, then
//! sizes and materializes the schema, then reads the input again and writes
//! each selected record as one observation. Both passes select messages the
//! same way; any disagreement between them is fatal.

pub mod progress;
pub mod projection;
pub mod strategies;

#[cfg(test)]
mod tests;

use crate::app::adapters::dataset_writer::DatasetWriter;
use crate::app::adapters::message_source::MessageSource;
use crate::app::models::{ConversionStats, ScanSummary};
use crate::app::services::materializer::{materialize, write_coordinates, write_program_codes};
use crate::app::services::prescan::{Selection, prescan};
use crate::app::services::reference_time::{ReferenceTime, resolve_reference_time};
use crate::app::services::schema::{SchemaTemplate, SizedSchema};
use crate::config::ConverterConfig;
use crate::constants::VIRTMP_PROGRAM;
use crate::{Error, Result};
use progress::ProgressReporter;
use strategies::RecordConverter;
use tracing::{debug, info};

/// Everything a finished run reports
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    pub scan: ScanSummary,
    pub stats: ConversionStats,
    pub reference_time: ReferenceTime,
    pub schema: SizedSchema,
}

/// Run the whole pipeline: scan, size, materialize, convert, finalize
///
/// The writer is flushed and closed on success. On failure it is left as
/// is; callers wanting an all-or-nothing file write to a temporary path.
pub fn run_conversion<S, W>(
    template: &SchemaTemplate,
    source: &mut S,
    writer: &mut W,
    config: &ConverterConfig,
) -> Result<ConversionOutcome>
where
    S: MessageSource + ?Sized,
    W: DatasetWriter + ?Sized,
{
    template.require_defined()?;
    let limit = config.message_limit();

    let scan = prescan(source, template.matcher(), limit)?;
    let Some(earliest) = scan.earliest_timestamp.filter(|_| scan.selected_messages > 0) else {
        return Err(Error::NoSelectedMessages {
            pattern: template.matcher().to_string(),
        });
    };

    // a zero-length dimension would be created as unlimited
    if scan.record_count == 0 {
        return Err(Error::EmptySelection {
            pattern: template.matcher().to_string(),
            messages: scan.selected_messages,
        });
    }

    let reference_time = resolve_reference_time(earliest)?;
    info!(
        "Earliest message {} gives reference time {}",
        earliest, reference_time
    );

    let schema = template
        .finalize(scan.record_count)
        .with_reference_time(reference_time);
    materialize(&schema, writer)?;

    let progress = ProgressReporter::new(scan.record_count, config.show_progress);
    let stats = match convert_records(&schema, source, writer, limit, &progress) {
        Ok(stats) => stats,
        Err(e) => {
            progress.abandon();
            return Err(e);
        }
    };
    progress.finish(&stats);

    write_coordinates(&schema, writer)?;
    write_program_codes(&schema, writer, source.program_code(VIRTMP_PROGRAM))?;
    writer.close()?;

    Ok(ConversionOutcome {
        scan,
        stats,
        reference_time,
        schema,
    })
}

/// Second pass: write every selected record as one observation
///
/// Stops at end of stream or once the scanned record count has been written
/// and the current message is complete. Writing more or fewer observations
/// than the schema was sized for is a consistency error.
pub fn convert_records<S, W>(
    schema: &SizedSchema,
    source: &mut S,
    writer: &mut W,
    limit: Option<usize>,
    progress: &ProgressReporter,
) -> Result<ConversionStats>
where
    S: MessageSource + ?Sized,
    W: DatasetWriter + ?Sized,
{
    let expected = schema.observation_count();
    let mut selection = Selection::new(limit);
    let mut stats = ConversionStats::default();
    let mut observation = 0usize;

    while observation < expected && source.advance()? {
        if !selection.offer(schema.matcher(), source.message_type()) {
            if selection.limit_reached() {
                break;
            }
            continue;
        }

        let declared = source.message_record_count();
        let mut records = 0usize;
        while source.load_next_record()? {
            if observation >= expected {
                return Err(Error::consistency(format!(
                    "conversion pass found more than the {expected} records counted by the pre-scan"
                )));
            }
            RecordConverter::new(schema, &*source, writer, &mut stats, observation).convert()?;
            observation += 1;
            records += 1;
            progress.increment();
        }

        if records != declared {
            return Err(Error::consistency(format!(
                "message {} declared {} records but {} were read",
                source.message_type(),
                declared,
                records
            )));
        }
        debug!(
            "Converted message {} ({} records)",
            source.message_type(),
            records
        );
    }

    if observation != expected {
        return Err(Error::consistency(format!(
            "pre-scan counted {expected} records but the conversion pass found {observation}"
        )));
    }

    stats.observations_written = observation;
    stats.selected_messages = selection.selected();
    writer.flush()?;

    info!(
        "Wrote {} observations from {} messages ({} values truncated, {} optional fields absent)",
        stats.observations_written,
        stats.selected_messages,
        stats.truncated_values,
        stats.absent_optional_fields
    );
    Ok(stats)
}
