//! Observation-type schemas
//!
//! A schema describes, for one observation kind and source format, which
//! output variables exist, where their values come from, their semantic type
//! and their shape. Schemas are built in two stages:
//!
//! - [`SchemaTemplate`]: produced when the observation kind is resolved. The
//!   observation-count dimension is still unsized.
//! - [`SizedSchema`]: produced by [`SchemaTemplate::finalize`] once the
//!   pre-scan knows how many observations will be written.
//!
//! Both stages are immutable; finalizing builds a new value rather than
//! rewriting sizes in place.
//!
//! The per-kind variable tables live in [`catalog`].

pub mod catalog;


use crate::app::models::{
    ObsKind, Presence, SemanticType, SourceFormat, StorageType, VariableGroup,
};
use crate::app::services::reference_time::ReferenceTime;
use crate::config::DimensionCeilings;
use crate::constants::dims;
use crate::{Error, Result};
use regex::Regex;
use std::fmt;
use tracing::debug;

pub use catalog::resolve_descriptor;

/// Size recorded for the observation dimension before the pre-scan
pub const UNSIZED: usize = 0;

/// Declarative description of one output variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSpec {
    /// Variable name in the output file
    pub output_name: String,
    /// Mnemonic read from the source record
    pub source_label: String,
    pub semantic_type: SemanticType,
    /// Dimension names, outermost first; the first is always the observation dimension
    pub dim_names: Vec<String>,
    /// Sizes parallel to `dim_names`
    pub dim_sizes: Vec<usize>,
    pub presence: Presence,
}

impl VariableSpec {
    pub fn storage_type(&self) -> StorageType {
        self.semantic_type.storage_type()
    }

    /// Whether the outermost axis is the observation dimension
    pub fn is_per_observation(&self) -> bool {
        self.dim_names.first().is_some_and(|d| d == dims::NOBS)
    }

    /// Sizes of the axes below the outermost one, i.e. the shape of one slice
    pub fn inner_sizes(&self) -> &[usize] {
        self.dim_sizes.get(1..).unwrap_or(&[])
    }

    /// Element count of one slice
    pub fn inner_len(&self) -> usize {
        self.inner_sizes().iter().product()
    }

    fn with_observation_count(&self, observation_count: usize) -> Self {
        let dim_sizes = self
            .dim_names
            .iter()
            .zip(&self.dim_sizes)
            .map(|(name, &size)| if name == dims::NOBS { observation_count } else { size })
            .collect();
        Self {
            dim_sizes,
            ..self.clone()
        }
    }
}

/// One output dimension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionSpec {
    pub name: String,
    pub size: usize,
}

/// Selects the source messages that belong to an observation kind
#[derive(Debug, Clone)]
pub enum MessageMatcher {
    /// Regular expression searched for in the message type label
    Pattern(Regex),
    /// The kind has no schema for this source format
    Undefined,
}

impl MessageMatcher {
    pub fn pattern(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(MessageMatcher::Pattern)
            .map_err(|e| Error::configuration(format!("invalid message pattern '{pattern}': {e}")))
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, MessageMatcher::Pattern(_))
    }

    /// Search semantics: the pattern may match anywhere in the label
    pub fn is_match(&self, message_type: &str) -> bool {
        match self {
            MessageMatcher::Pattern(re) => re.is_match(message_type),
            MessageMatcher::Undefined => false,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MessageMatcher::Pattern(re) => re.as_str(),
            MessageMatcher::Undefined => "UnDef",
        }
    }
}

impl fmt::Display for MessageMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the observation time of a record is derived
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeSource {
    /// Calendar fields carried in the record header
    CalendarFields {
        year: String,
        month: String,
        day: String,
        hour: String,
        minute: String,
        second: Option<String>,
    },
    /// Hour offset relative to the message (cycle) timestamp
    CycleOffset { hours: String },
}

/// Variables of a descriptor, partitioned into the five groups
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableGroups {
    pub header: Vec<VariableSpec>,
    pub interior: Vec<VariableSpec>,
    pub event: Vec<VariableSpec>,
    pub replication: Vec<VariableSpec>,
    pub sequence: Vec<VariableSpec>,
}

impl VariableGroups {
    pub fn group(&self, group: VariableGroup) -> &[VariableSpec] {
        match group {
            VariableGroup::Header => &self.header,
            VariableGroup::Interior => &self.interior,
            VariableGroup::Event => &self.event,
            VariableGroup::Replication => &self.replication,
            VariableGroup::Sequence => &self.sequence,
        }
    }

    fn group_mut(&mut self, group: VariableGroup) -> &mut Vec<VariableSpec> {
        match group {
            VariableGroup::Header => &mut self.header,
            VariableGroup::Interior => &mut self.interior,
            VariableGroup::Event => &mut self.event,
            VariableGroup::Replication => &mut self.replication,
            VariableGroup::Sequence => &mut self.sequence,
        }
    }

    /// Every variable in group order
    pub fn iter(&self) -> impl Iterator<Item = (VariableGroup, &VariableSpec)> {
        VariableGroup::ALL
            .into_iter()
            .flat_map(move |g| self.group(g).iter().map(move |spec| (g, spec)))
    }

    pub fn len(&self) -> usize {
        VariableGroup::ALL.iter().map(|&g| self.group(g).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Union of all referenced dimension names, in first-seen order
    pub fn dimension_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for (_, spec) in self.iter() {
            for name in &spec.dim_names {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    fn with_observation_count(&self, observation_count: usize) -> Self {
        let mut sized = VariableGroups::default();
        for (group, spec) in self.iter() {
            sized
                .group_mut(group)
                .push(spec.with_observation_count(observation_count));
        }
        sized
    }
}

/// A row of a catalog table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDef {
    pub output_name: String,
    pub source_label: String,
    pub semantic_type: SemanticType,
    pub dims: &'static [&'static str],
    pub presence: Presence,
}

/// Builds a [`SchemaTemplate`], validating dimension names as variables are added
#[derive(Debug)]
pub struct SchemaTemplateBuilder {
    kind: ObsKind,
    format: SourceFormat,
    ceilings: DimensionCeilings,
    matcher: MessageMatcher,
    groups: VariableGroups,
    time_source: Option<TimeSource>,
}

impl SchemaTemplateBuilder {
    pub fn new(kind: ObsKind, format: SourceFormat, ceilings: DimensionCeilings) -> Self {
        Self {
            kind,
            format,
            ceilings,
            matcher: MessageMatcher::Undefined,
            groups: VariableGroups::default(),
            time_source: None,
        }
    }

    pub fn matcher(mut self, matcher: MessageMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn time_source(mut self, time_source: TimeSource) -> Self {
        self.time_source = Some(time_source);
        self
    }

    /// Add catalog rows to a group
    pub fn variables(
        mut self,
        group: VariableGroup,
        defs: impl IntoIterator<Item = VariableDef>,
    ) -> Result<Self> {
        for def in defs {
            let spec = self.spec_from_def(def)?;
            self.groups.group_mut(group).push(spec);
        }
        Ok(self)
    }

    fn spec_from_def(&self, def: VariableDef) -> Result<VariableSpec> {
        if def.dims.first() != Some(&dims::NOBS) {
            return Err(Error::configuration(format!(
                "variable '{}' must have '{}' as its outermost dimension",
                def.output_name,
                dims::NOBS
            )));
        }

        let dim_sizes = def
            .dims
            .iter()
            .map(|&name| {
                self.ceilings
                    .resolve(name, UNSIZED)
                    .ok_or_else(|| Error::unknown_dimension(name, def.output_name.as_str()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(VariableSpec {
            output_name: def.output_name,
            source_label: def.source_label,
            semantic_type: def.semantic_type,
            dim_names: def.dims.iter().map(|d| d.to_string()).collect(),
            dim_sizes,
            presence: def.presence,
        })
    }

    pub fn build(self) -> SchemaTemplate {
        debug!(
            "Built {} {} template: matcher={}, {} variables, dimensions={:?}",
            self.kind,
            self.format,
            self.matcher,
            self.groups.len(),
            self.groups.dimension_names()
        );
        SchemaTemplate {
            kind: self.kind,
            format: self.format,
            ceilings: self.ceilings,
            matcher: self.matcher,
            groups: self.groups,
            time_source: self.time_source,
        }
    }
}

/// Schema for one observation kind and source format, before sizing
#[derive(Debug, Clone)]
pub struct SchemaTemplate {
    kind: ObsKind,
    format: SourceFormat,
    ceilings: DimensionCeilings,
    matcher: MessageMatcher,
    groups: VariableGroups,
    time_source: Option<TimeSource>,
}

impl SchemaTemplate {
    pub fn kind(&self) -> ObsKind {
        self.kind
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn matcher(&self) -> &MessageMatcher {
        &self.matcher
    }

    pub fn groups(&self) -> &VariableGroups {
        &self.groups
    }

    pub fn ceilings(&self) -> &DimensionCeilings {
        &self.ceilings
    }

    pub fn time_source(&self) -> Option<&TimeSource> {
        self.time_source.as_ref()
    }

    /// Fail with a configuration error when the kind has no schema for the format
    ///
    /// Callers check this before opening the input so an unsupported pair is
    /// never discovered mid-conversion.
    pub fn require_defined(&self) -> Result<()> {
        if self.matcher.is_defined() {
            Ok(())
        } else {
            Err(Error::undefined_schema(self.kind.name(), self.format.to_string()))
        }
    }

    /// Size the observation dimension, producing the schema used for output
    pub fn finalize(&self, observation_count: usize) -> SizedSchema {
        let groups = self.groups.with_observation_count(observation_count);
        let dimensions = groups
            .dimension_names()
            .into_iter()
            .filter_map(|name| {
                self.ceilings
                    .resolve(&name, observation_count)
                    .map(|size| DimensionSpec { name, size })
            })
            .collect();

        SizedSchema {
            kind: self.kind,
            format: self.format,
            ceilings: self.ceilings,
            matcher: self.matcher.clone(),
            groups,
            dimensions,
            observation_count,
            time_source: self.time_source.clone(),
            reference_time: None,
        }
    }
}

/// Schema with every dimension sized, ready to be materialized
#[derive(Debug, Clone)]
pub struct SizedSchema {
    kind: ObsKind,
    format: SourceFormat,
    ceilings: DimensionCeilings,
    matcher: MessageMatcher,
    groups: VariableGroups,
    dimensions: Vec<DimensionSpec>,
    observation_count: usize,
    time_source: Option<TimeSource>,
    reference_time: Option<ReferenceTime>,
}

impl SizedSchema {
    /// Attach the reference time resolved by the pre-scan
    pub fn with_reference_time(mut self, reference_time: ReferenceTime) -> Self {
        self.reference_time = Some(reference_time);
        self
    }

    pub fn kind(&self) -> ObsKind {
        self.kind
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn matcher(&self) -> &MessageMatcher {
        &self.matcher
    }

    pub fn groups(&self) -> &VariableGroups {
        &self.groups
    }

    pub fn ceilings(&self) -> &DimensionCeilings {
        &self.ceilings
    }

    pub fn dimensions(&self) -> &[DimensionSpec] {
        &self.dimensions
    }

    pub fn dimension(&self, name: &str) -> Option<&DimensionSpec> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn observation_count(&self) -> usize {
        self.observation_count
    }

    pub fn time_source(&self) -> Option<&TimeSource> {
        self.time_source.as_ref()
    }

    pub fn reference_time(&self) -> Option<&ReferenceTime> {
        self.reference_time.as_ref()
    }

    /// "seconds since ..." units string, once the reference time is known
    pub fn time_units(&self) -> Option<String> {
        self.reference_time.as_ref().map(ReferenceTime::time_units)
    }

    /// Coordinate variables, one per dimension, holding 1..=size
    pub fn coordinate_specs(&self) -> Vec<VariableSpec> {
        self.dimensions
            .iter()
            .map(|d| VariableSpec {
                output_name: d.name.clone(),
                source_label: d.name.clone(),
                semantic_type: SemanticType::UnsignedInt,
                dim_names: vec![d.name.clone()],
                dim_sizes: vec![d.size],
                presence: Presence::Optional,
            })
            .collect()
    }

    /// Look up a variable in any group
    pub fn variable(&self, output_name: &str) -> Option<&VariableSpec> {
        self.groups
            .iter()
            .map(|(_, spec)| spec)
            .find(|spec| spec.output_name == output_name)
    }
}
