//! Aircraft reports (AIREP/PIREP/AMDAR/ACARS)

use super::{
    KindTables, OBS, OBS_EVENTS, OBS_STRING, calendar_time, cycle_time, events, optional,
    required,
};
use crate::app::models::SemanticType::{Double, Float, IntegerEnum, String as Text};
use crate::app::models::SourceFormat;

pub(super) fn tables(format: SourceFormat) -> KindTables {
    match format {
        SourceFormat::Bufr => bufr(),
        SourceFormat::PrepBufr => prepbufr(),
    }
}

fn bufr() -> KindTables {
    KindTables {
        pattern: Some("^NC004001"),
        header: vec![
            required("YEAR", IntegerEnum, OBS),
            required("MNTH", IntegerEnum, OBS),
            required("DAYS", IntegerEnum, OBS),
            required("HOUR", IntegerEnum, OBS),
            required("MINU", IntegerEnum, OBS),
            optional("ACID", Double, OBS),
            optional("CORN", IntegerEnum, OBS),
            required("CLAT", Float, OBS),
            required("CLON", Float, OBS),
            optional("FLVL", Float, OBS),
        ],
        interior: vec![
            optional("TMDB", Float, OBS),
            optional("TMDP", Float, OBS),
            optional("REHU", Float, OBS),
            optional("WSPD", Float, OBS),
            optional("WDIR", Float, OBS),
            optional("QMAT", IntegerEnum, OBS),
            optional("QMDD", IntegerEnum, OBS),
            optional("QMWN", IntegerEnum, OBS),
            optional("SEQNUM", Text, OBS_STRING),
            optional("BUHD", Text, OBS_STRING),
            optional("BORG", Text, OBS_STRING),
            optional("BULTIM", Text, OBS_STRING),
            optional("BBB", Text, OBS_STRING),
            optional("RPID", Text, OBS_STRING),
        ],
        time_source: Some(calendar_time(false)),
        ..KindTables::default()
    }
}

fn prepbufr() -> KindTables {
    KindTables {
        pattern: Some("AIRC[AF][RT]"),
        header: vec![
            required("SID", Double, OBS),
            optional("ACID", Double, OBS),
            required("XOB", Float, OBS),
            required("YOB", Float, OBS),
            required("DHR", Float, OBS),
            required("TYP", IntegerEnum, OBS),
            optional("ELV", Float, OBS),
            optional("SAID", IntegerEnum, OBS),
            optional("T29", IntegerEnum, OBS),
        ],
        interior: [
            ("POB", Float),
            ("QOB", Float),
            ("TOB", Float),
            ("ZOB", Float),
            ("UOB", Float),
            ("VOB", Float),
            ("PWO", Float),
            ("MXGS", Float),
            ("PRSS", Float),
            ("TDO", Float),
            ("PMO", Float),
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
            ("HOVI", Float),
            ("CAT", IntegerEnum),
            ("XDR", Float),
            ("YDR", Float),
            ("HRDR", Float),
            ("POAF", IntegerEnum),
            ("IALR", Float),
        ]
        .into_iter()
        .map(|(label, semantic_type)| optional(label, semantic_type, OBS))
        .collect(),
        event: vec![
            events("TPC", IntegerEnum, OBS_EVENTS),
            events("TOB", Float, OBS_EVENTS),
            events("TQM", IntegerEnum, OBS_EVENTS),
        ],
        time_source: Some(cycle_time()),
        ..KindTables::default()
    }
}
