//! AMSU-A brightness temperatures (NC021023)

use super::{KindTables, OBS, OBS_CHANNELS, calendar_time, optional, required};
use crate::app::models::SemanticType::{Float, IntegerEnum};
use crate::app::models::SourceFormat;

pub(super) fn tables(format: SourceFormat) -> KindTables {
    match format {
        SourceFormat::Bufr => bufr(),
        SourceFormat::PrepBufr => KindTables::undefined(),
    }
}

fn bufr() -> KindTables {
    KindTables {
        pattern: Some("^NC021023"),
        header: vec![
            required("SAID", IntegerEnum, OBS),
            required("FOVN", IntegerEnum, OBS),
            required("YEAR", IntegerEnum, OBS),
            required("MNTH", IntegerEnum, OBS),
            required("DAYS", IntegerEnum, OBS),
            required("HOUR", IntegerEnum, OBS),
            required("MINU", IntegerEnum, OBS),
            required("SECO", IntegerEnum, OBS),
            required("CLAT", Float, OBS),
            required("CLON", Float, OBS),
            optional("HOLS", Float, OBS),
        ],
        interior: vec![
            optional("SAZA", Float, OBS),
            optional("SOZA", Float, OBS),
            optional("BEARAZ", Float, OBS),
            optional("SOLAZI", Float, OBS),
        ],
        replication: vec![
            required("CHNM", IntegerEnum, OBS_CHANNELS),
            optional("TMBR", Float, OBS_CHANNELS),
            optional("CSTC", Float, OBS_CHANNELS),
        ],
        time_source: Some(calendar_time(true)),
        ..KindTables::default()
    }
}
