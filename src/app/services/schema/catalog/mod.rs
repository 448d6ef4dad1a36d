//! Schema catalog: variable tables per observation kind and source format.
//!
//! The raw and pre-processed formats name and structure their fields so
//! differently that they are separate schemas under the same kind name.
//! Pairs without a table resolve to a template whose matcher is
//! [`MessageMatcher::Undefined`].

mod aircraft;
mod amsua;
mod sondes;

use super::{MessageMatcher, SchemaTemplate, SchemaTemplateBuilder, TimeSource, VariableDef};
use crate::Result;
use crate::app::models::{ObsKind, Presence, SemanticType, SourceFormat, VariableGroup};
use crate::config::DimensionCeilings;
use crate::constants::dims;

pub(crate) const OBS: &[&str] = &[dims::NOBS];
pub(crate) const OBS_STRING: &[&str] = &[dims::NOBS, dims::NSTRING];
pub(crate) const OBS_EVENTS: &[&str] = &[dims::NOBS, dims::NEVENTS];
pub(crate) const OBS_LEVELS: &[&str] = &[dims::NOBS, dims::NLEVS];
pub(crate) const OBS_LEVEL_EVENTS: &[&str] = &[dims::NOBS, dims::NLEVS, dims::NEVENTS];
pub(crate) const OBS_CHANNELS: &[&str] = &[dims::NOBS, dims::NCHANS];

/// Variable tables for one kind and format
#[derive(Debug, Default)]
pub(crate) struct KindTables {
    pub pattern: Option<&'static str>,
    pub header: Vec<VariableDef>,
    pub interior: Vec<VariableDef>,
    pub event: Vec<VariableDef>,
    pub replication: Vec<VariableDef>,
    pub sequence: Vec<VariableDef>,
    pub time_source: Option<TimeSource>,
}

impl KindTables {
    /// Tables for a pair with no schema
    pub fn undefined() -> Self {
        Self::default()
    }
}

/// A variable whose mnemonic must be present in every record
pub(crate) fn required(
    label: &str,
    semantic_type: SemanticType,
    dims: &'static [&'static str],
) -> VariableDef {
    VariableDef {
        output_name: label.to_string(),
        source_label: label.to_string(),
        semantic_type,
        dims,
        presence: Presence::Required,
    }
}

/// A variable left as fill when its mnemonic is absent
pub(crate) fn optional(
    label: &str,
    semantic_type: SemanticType,
    dims: &'static [&'static str],
) -> VariableDef {
    VariableDef {
        presence: Presence::Optional,
        ..required(label, semantic_type, dims)
    }
}

/// Event history of a quantity, stored as `<label>_bevn`
pub(crate) fn events(
    label: &str,
    semantic_type: SemanticType,
    dims: &'static [&'static str],
) -> VariableDef {
    VariableDef {
        output_name: format!("{label}_bevn"),
        ..optional(label, semantic_type, dims)
    }
}

/// Calendar-field time source with the standard raw BUFR mnemonics
pub(crate) fn calendar_time(with_seconds: bool) -> TimeSource {
    TimeSource::CalendarFields {
        year: "YEAR".to_string(),
        month: "MNTH".to_string(),
        day: "DAYS".to_string(),
        hour: "HOUR".to_string(),
        minute: "MINU".to_string(),
        second: with_seconds.then(|| "SECO".to_string()),
    }
}

/// prepBUFR time source: hours relative to the cycle time
pub(crate) fn cycle_time() -> TimeSource {
    TimeSource::CycleOffset {
        hours: "DHR".to_string(),
    }
}

fn tables_for(kind: ObsKind, format: SourceFormat) -> KindTables {
    match kind {
        ObsKind::Aircraft => aircraft::tables(format),
        ObsKind::Sondes => sondes::tables(format),
        ObsKind::Amsua => amsua::tables(format),
    }
}

/// Resolve the schema template for an observation kind and source format
///
/// Always returns a template for a known kind; when the pair has no schema
/// the template's matcher is undefined and [`SchemaTemplate::require_defined`]
/// reports it. Fails only when a table references a dimension outside the
/// ceilings lookup.
pub fn resolve_descriptor(
    kind: ObsKind,
    format: SourceFormat,
    ceilings: &DimensionCeilings,
) -> Result<SchemaTemplate> {
    let tables = tables_for(kind, format);
    let Some(pattern) = tables.pattern else {
        return Ok(SchemaTemplateBuilder::new(kind, format, *ceilings).build());
    };

    let mut builder = SchemaTemplateBuilder::new(kind, format, *ceilings)
        .matcher(MessageMatcher::pattern(pattern)?)
        .variables(VariableGroup::Header, tables.header)?
        .variables(VariableGroup::Interior, tables.interior)?
        .variables(VariableGroup::Event, tables.event)?
        .variables(VariableGroup::Replication, tables.replication)?
        .variables(VariableGroup::Sequence, tables.sequence)?;

    if let Some(time_source) = tables.time_source {
        builder = builder.time_source(time_source);
    }

    Ok(builder.build())
}
