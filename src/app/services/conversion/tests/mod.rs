//! Tests for the conversion pipeline

mod driver_tests;

use crate::app::adapters::memory_dataset::MemoryDataset;
use crate::app::adapters::memory_source::{MemoryMessage, MemoryRecord, MemorySource};
use crate::app::models::{FieldData, ObsKind, SourceFormat};
use crate::app::services::schema::{SchemaTemplate, resolve_descriptor};
use crate::config::{ConverterConfig, DimensionCeilings};

pub fn template(kind: ObsKind, format: SourceFormat) -> SchemaTemplate {
    resolve_descriptor(kind, format, &DimensionCeilings::default()).unwrap()
}

pub fn config() -> ConverterConfig {
    ConverterConfig::default().without_progress()
}

/// A prepBUFR aircraft report with every required header field
pub fn aircraft_record(sid: &str, dhr: f64) -> MemoryRecord {
    MemoryRecord::new()
        .with_value("SID", FieldData::text(sid))
        .with_value("XOB", FieldData::number(262.5))
        .with_value("YOB", FieldData::number(40.1))
        .with_value("DHR", FieldData::number(dhr))
        .with_value("TYP", FieldData::number(131.0))
        .with_value("TOB", FieldData::number(-41.5))
        .with_value("POB", FieldData::number(250.0))
}

/// Three matching messages with 2, 1 and 3 records, plus one that does not match
pub fn six_record_source() -> MemorySource {
    MemorySource::new(vec![
        MemoryMessage::new("AIRCAR", 2021060103)
            .with_record(aircraft_record("UAL123", 0.5))
            .with_record(aircraft_record("UAL124", -0.5)),
        MemoryMessage::new("ADPUPA", 2021053112).with_empty_records(4),
        MemoryMessage::new("AIRCFT", 2021060106).with_record(aircraft_record("DAL9", 0.0)),
        MemoryMessage::new("AIRCAR", 2021060101)
            .with_records((0..3).map(|i| aircraft_record("SWA7", f64::from(i)))),
    ])
    .with_program_code("VIRTMP", 8)
}

pub fn dataset() -> MemoryDataset {
    MemoryDataset::new()
}
