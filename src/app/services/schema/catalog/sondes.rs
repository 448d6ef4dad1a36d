//! Radiosondes (ADPUPA)
//!
//! Only the prepBUFR layout is catalogued. The list is not exhaustive: it
//! covers the header, the observed quantities, quality markers, error
//! estimates and drift positions that analysis systems read. Variables are
//! per level, and header values are broadcast onto every level of the
//! sounding by the sondes conversion strategy.

use super::{KindTables, OBS_LEVEL_EVENTS, OBS_LEVELS, cycle_time, events, optional, required};
use crate::app::models::SemanticType::{Double, Float, IntegerEnum};
use crate::app::models::SourceFormat;

pub(super) fn tables(format: SourceFormat) -> KindTables {
    match format {
        SourceFormat::Bufr => KindTables::undefined(),
        SourceFormat::PrepBufr => prepbufr(),
    }
}

fn prepbufr() -> KindTables {
    KindTables {
        pattern: Some("ADPUPA"),
        header: vec![
            required("SID", Double, OBS_LEVELS),
            required("XOB", Float, OBS_LEVELS),
            required("YOB", Float, OBS_LEVELS),
            required("DHR", Float, OBS_LEVELS),
            required("TYP", IntegerEnum, OBS_LEVELS),
            required("ELV", Float, OBS_LEVELS),
            optional("T29", IntegerEnum, OBS_LEVELS),
        ],
        interior: [
            ("POB", Float),
            ("QOB", Float),
            ("TOB", Float),
            ("ZOB", Float),
            ("UOB", Float),
            ("VOB", Float),
            ("PWO", Float),
            ("TDO", Float),
            ("PQM", IntegerEnum),
            ("QQM", IntegerEnum),
            ("TQM", IntegerEnum),
            ("ZQM", IntegerEnum),
            ("WQM", IntegerEnum),
            ("PWQ", IntegerEnum),
            ("PMQ", IntegerEnum),
            ("POE", Float),
            ("QOE", Float),
            ("TOE", Float),
            ("WOE", Float),
            ("PWE", Float),
            ("XDR", Float),
            ("YDR", Float),
            ("HRDR", Float),
        ]
        .into_iter()
        .map(|(label, semantic_type)| optional(label, semantic_type, OBS_LEVELS))
        .collect(),
        event: vec![
            events("TPC", IntegerEnum, OBS_LEVEL_EVENTS),
            events("TOB", Float, OBS_LEVEL_EVENTS),
            events("TQM", IntegerEnum, OBS_LEVEL_EVENTS),
        ],
        time_source: Some(cycle_time()),
        ..KindTables::default()
    }
}
