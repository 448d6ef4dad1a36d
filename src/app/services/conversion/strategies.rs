//! Per-kind record conversion
//!
//! Every record goes through a header step and an observation step. The
//! generic steps read each variable's mnemonic once and lay the result onto
//! the variable's slice. Kinds whose source layout does not fit that
//! one-field-per-variable model pick a different strategy for either step.

use super::projection::{Projection, project};
use crate::app::adapters::dataset_writer::DatasetWriter;
use crate::app::adapters::message_source::MessageSource;
use crate::app::models::{
    ConversionStats, FieldData, FieldSelection, ObsKind, Presence, Slab, SourceValue,
    VariableGroup,
};
use crate::app::services::reference_time::parse_yyyymmddhh;
use crate::app::services::schema::{SizedSchema, TimeSource, VariableSpec};
use crate::constants::{TIME_VARIABLE, dims, fill};
use crate::{Error, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::trace;

/// How header variables are extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStrategy {
    /// One read per variable
    Generic,
    /// Header values repeated on every level of the record
    BroadcastLevels,
}

/// How interior, event, replication and sequence variables are extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObsStrategy {
    /// One read per variable
    Generic,
    /// Replicated values placed by their channel number
    ChannelPlacement,
}

/// Strategy pair for an observation kind
pub fn strategies_for(kind: ObsKind) -> (HeaderStrategy, ObsStrategy) {
    match kind {
        ObsKind::Aircraft => (HeaderStrategy::Generic, ObsStrategy::Generic),
        ObsKind::Sondes => (HeaderStrategy::BroadcastLevels, ObsStrategy::Generic),
        ObsKind::Amsua => (HeaderStrategy::Generic, ObsStrategy::ChannelPlacement),
    }
}

/// Mnemonic whose level count decides how far sonde headers are broadcast
const LEVEL_PROBE: &str = "POB";

/// Mnemonic carrying the channel number of each replication
const CHANNEL_NUMBER: &str = "CHNM";

/// Converts the loaded record into one observation of the output
pub struct RecordConverter<'a, S: ?Sized, W: ?Sized> {
    schema: &'a SizedSchema,
    source: &'a S,
    writer: &'a mut W,
    stats: &'a mut ConversionStats,
    observation: usize,
}

impl<'a, S, W> RecordConverter<'a, S, W>
where
    S: MessageSource + ?Sized,
    W: DatasetWriter + ?Sized,
{
    pub fn new(
        schema: &'a SizedSchema,
        source: &'a S,
        writer: &'a mut W,
        stats: &'a mut ConversionStats,
        observation: usize,
    ) -> Self {
        Self {
            schema,
            source,
            writer,
            stats,
            observation,
        }
    }

    /// Header step, observation step, then the derived time
    pub fn convert(&mut self) -> Result<()> {
        let (header, obs) = strategies_for(self.schema.kind());
        match header {
            HeaderStrategy::Generic => self.convert_header()?,
            HeaderStrategy::BroadcastLevels => self.convert_header_broadcast()?,
        }
        match obs {
            ObsStrategy::Generic => self.convert_obs()?,
            ObsStrategy::ChannelPlacement => self.convert_obs_by_channel()?,
        }
        self.write_time()
    }

    /// Read a variable's field, enforcing its presence rule
    fn read(&mut self, group: VariableGroup, spec: &VariableSpec) -> Result<Option<FieldData>> {
        match self.source.read_field(&spec.source_label, group.selection())? {
            Some(data) => Ok(Some(data)),
            None => match spec.presence {
                Presence::Required => Err(Error::missing_field(
                    spec.source_label.as_str(),
                    self.observation,
                )),
                Presence::Optional => {
                    trace!(
                        "Optional field {} absent from observation {}",
                        spec.source_label, self.observation
                    );
                    self.stats.absent_optional_fields += 1;
                    Ok(None)
                }
            },
        }
    }

    fn write(&mut self, spec: &VariableSpec, data: Option<&FieldData>) -> Result<()> {
        let projection = match data {
            Some(data) => project(spec, data)?,
            None => Projection::fill(spec),
        };
        self.stats.truncated_values += projection.truncated;
        self.writer
            .write_slice(&spec.output_name, self.observation, &projection.slab)
    }

    fn convert_group(&mut self, group: VariableGroup) -> Result<()> {
        let schema = self.schema;
        for spec in schema.groups().group(group) {
            let data = self.read(group, spec)?;
            self.write(spec, data.as_ref())?;
        }
        Ok(())
    }

    /// Generic header step
    pub fn convert_header(&mut self) -> Result<()> {
        self.convert_group(VariableGroup::Header)
    }

    /// Generic observation step
    pub fn convert_obs(&mut self) -> Result<()> {
        for group in [
            VariableGroup::Interior,
            VariableGroup::Event,
            VariableGroup::Replication,
            VariableGroup::Sequence,
        ] {
            self.convert_group(group)?;
        }
        Ok(())
    }

    /// Header values repeated over the levels present in the record
    ///
    /// The level count comes from the pressure profile. Header variables
    /// without a level axis are written generically.
    pub fn convert_header_broadcast(&mut self) -> Result<()> {
        let levels = self
            .source
            .read_field(LEVEL_PROBE, FieldSelection::Value)?
            .map_or(1, |probe| probe.squeeze_to(1).leading_len());

        let schema = self.schema;
        for spec in schema.groups().group(VariableGroup::Header) {
            let data = self.read(VariableGroup::Header, spec)?;
            let has_levels = spec.dim_names.get(1).is_some_and(|d| d == dims::NLEVS);
            let data = match data {
                Some(data) if has_levels => {
                    let value = data.values().first().cloned().flatten();
                    Some(FieldData::new(vec![levels], vec![value; levels])?)
                }
                other => other,
            };
            self.write(spec, data.as_ref())?;
        }
        Ok(())
    }

    /// Replicated channel values placed at index CHNM - 1
    ///
    /// Replications whose channel number is missing or beyond the channel
    /// ceiling are dropped and counted as truncated. Other groups are
    /// written generically.
    pub fn convert_obs_by_channel(&mut self) -> Result<()> {
        self.convert_group(VariableGroup::Interior)?;
        self.convert_group(VariableGroup::Event)?;

        let channels: Vec<Option<usize>> = self
            .source
            .read_field(CHANNEL_NUMBER, FieldSelection::Replication)?
            .map(|data| {
                data.values()
                    .iter()
                    .map(|v| match v {
                        Some(SourceValue::Number(n)) if *n >= 1.0 => Some(n.round() as usize),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let schema = self.schema;
        for spec in schema.groups().group(VariableGroup::Replication) {
            let data = self.read(VariableGroup::Replication, spec)?;
            let placed = match data {
                Some(data) => Some(self.place_by_channel(spec, data, &channels)?),
                None => None,
            };
            self.write(spec, placed.as_ref())?;
        }

        self.convert_group(VariableGroup::Sequence)
    }

    fn place_by_channel(
        &mut self,
        spec: &VariableSpec,
        data: FieldData,
        channels: &[Option<usize>],
    ) -> Result<FieldData> {
        let data = data.squeeze_to(1);
        if data.rank() > 1 {
            return Err(Error::shape_mismatch(
                &spec.output_name,
                format!("replicated channel data of shape {:?}", data.shape()),
            ));
        }

        let slots = spec.inner_sizes().first().copied().unwrap_or(1);
        let mut placed = vec![None; slots];
        for (i, value) in data.values().iter().enumerate() {
            match channels.get(i).copied().flatten() {
                Some(channel) if channel <= slots => placed[channel - 1] = value.clone(),
                _ if value.is_some() => self.stats.truncated_values += 1,
                _ => {}
            }
        }
        FieldData::new(vec![slots], placed)
    }

    /// Observation time as seconds from the reference time
    fn write_time(&mut self) -> Result<()> {
        let schema = self.schema;
        let (Some(time_source), Some(reference)) = (schema.time_source(), schema.reference_time())
        else {
            return Ok(());
        };

        let time = match time_source {
            TimeSource::CalendarFields {
                year,
                month,
                day,
                hour,
                minute,
                second,
            } => self.calendar_time(year, month, day, hour, minute, second.as_deref())?,
            TimeSource::CycleOffset { hours } => self.cycle_time(hours)?,
        };

        let slab = match time {
            Some(time) => Slab::Double(vec![reference.seconds_until(time)]),
            None => Slab::Double(vec![fill::DOUBLE]),
        };
        self.writer.write_slice(TIME_VARIABLE, self.observation, &slab)
    }

    fn number(&self, label: &str) -> Result<Option<f64>> {
        Ok(self
            .source
            .read_field(label, FieldSelection::Value)?
            .and_then(|data| data.first_number()))
    }

    fn calendar_time(
        &self,
        year: &str,
        month: &str,
        day: &str,
        hour: &str,
        minute: &str,
        second: Option<&str>,
    ) -> Result<Option<NaiveDateTime>> {
        let parts = [year, month, day, hour, minute]
            .into_iter()
            .map(|label| self.number(label))
            .collect::<Result<Vec<_>>>()?;
        let [Some(y), Some(mo), Some(d), Some(h), Some(mi)] = parts.as_slice() else {
            return Ok(None);
        };
        let seconds = match second {
            Some(label) => self.number(label)?.unwrap_or(0.0),
            None => 0.0,
        };

        let time = NaiveDate::from_ymd_opt(*y as i32, *mo as u32, *d as u32)
            .and_then(|date| date.and_hms_opt(*h as u32, *mi as u32, 0))
            .and_then(|t| offset_by(t, seconds * 1000.0));
        if time.is_none() {
            trace!("Observation {} has an invalid calendar time", self.observation);
        }
        Ok(time)
    }

    fn cycle_time(&self, hours: &str) -> Result<Option<NaiveDateTime>> {
        let timestamp = self.source.message_timestamp();
        let Ok(cycle) = parse_yyyymmddhh(timestamp) else {
            trace!(
                "Observation {} is in a message with invalid timestamp {}",
                self.observation, timestamp
            );
            return Ok(None);
        };
        let time = self
            .number(hours)?
            .and_then(|dhr| offset_by(cycle, dhr * 3_600_000.0));
        Ok(time)
    }
}

/// `time` shifted by a millisecond offset, `None` when out of range
fn offset_by(time: NaiveDateTime, milliseconds: f64) -> Option<NaiveDateTime> {
    if !milliseconds.is_finite() {
        return None;
    }
    Duration::try_milliseconds(milliseconds.round() as i64)
        .and_then(|offset| time.checked_add_signed(offset))
}
