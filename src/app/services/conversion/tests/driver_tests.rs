use super::*;
use crate::Error;
use crate::app::adapters::message_source::MessageSource;
use crate::app::models::{AttributeValue, SourceValue};
use crate::app::services::conversion::progress::ProgressReporter;
use crate::app::services::conversion::projection::char_bytes;
use crate::app::services::conversion::{convert_records, run_conversion};
use crate::app::services::materializer::materialize;
use crate::app::services::prescan::prescan;
use crate::app::services::reference_time::resolve_reference_time;
use crate::app::services::schema::SizedSchema;
use crate::constants::{attrs, fill};

#[test]
fn test_six_record_scenario() {
    let mut source = six_record_source();
    let mut ds = dataset();
    let t = template(ObsKind::Aircraft, SourceFormat::PrepBufr);

    let outcome = run_conversion(&t, &mut source, &mut ds, &config()).unwrap();

    assert_eq!(outcome.scan.record_count, 6);
    assert_eq!(outcome.scan.selected_messages, 3);
    assert_eq!(outcome.scan.matching_messages, 3);
    assert_eq!(outcome.scan.earliest_timestamp, Some(2021060101));
    assert_eq!(outcome.reference_time.yyyymmddhh(), 2021060106);
    assert_eq!(outcome.stats.observations_written, 6);
    assert_eq!(outcome.stats.selected_messages, 3);

    assert_eq!(ds.dimension("nobs"), Some(6));
    assert_eq!(ds.uints("nobs"), Some(&[1, 2, 3, 4, 5, 6][..]));
    assert_eq!(
        ds.attribute(attrs::TIME_UNITS),
        Some(&AttributeValue::Text("seconds since 2021-06-01 06:00 UTC".into()))
    );
    assert_eq!(ds.attribute(attrs::VIRTMP_CODE), Some(&AttributeValue::Int(8)));
    assert!(ds.is_closed());
    assert_eq!(source.rewind_count(), 1);
}

#[test]
fn test_records_written_in_stream_order() {
    let mut source = six_record_source();
    let mut ds = dataset();
    let t = template(ObsKind::Aircraft, SourceFormat::PrepBufr);
    run_conversion(&t, &mut source, &mut ds, &config()).unwrap();

    let sids: Vec<Vec<u8>> = ds
        .doubles("SID")
        .unwrap()
        .iter()
        .map(|&x| char_bytes(&SourceValue::Number(x)))
        .collect();
    assert_eq!(sids[0], b"UAL123");
    assert_eq!(sids[1], b"UAL124");
    assert_eq!(sids[2], b"DAL9");
    assert_eq!(sids[5], b"SWA7");

    assert_eq!(
        ds.doubles("time").unwrap(),
        &[-9000.0, -12600.0, 0.0, -18000.0, -14400.0, -10800.0]
    );
    assert_eq!(ds.floats("TOB").unwrap(), &[-41.5; 6]);
    assert_eq!(ds.ints("TYP").unwrap(), &[131; 6]);
}

#[test]
fn test_missing_optional_field_is_fill() {
    let record = aircraft_record("UAL1", 0.0);
    let sparse = MemoryRecord::new()
        .with_value("SID", FieldData::text("UAL2"))
        .with_value("XOB", FieldData::number(262.5))
        .with_value("YOB", FieldData::number(40.1))
        .with_value("DHR", FieldData::number(0.0))
        .with_value("TYP", FieldData::number(131.0))
        .with_value("TOB", FieldData::missing());

    let mut source = MemorySource::new(vec![
        MemoryMessage::new("AIRCAR", 2021060100).with_records([record, sparse]),
    ]);
    let mut ds = dataset();
    let t = template(ObsKind::Aircraft, SourceFormat::PrepBufr);
    let outcome = run_conversion(&t, &mut source, &mut ds, &config()).unwrap();

    assert_eq!(outcome.stats.observations_written, 2);
    assert_eq!(ds.floats("TOB").unwrap(), &[-41.5, fill::FLOAT]);
    assert_eq!(ds.floats("POB").unwrap(), &[250.0, fill::FLOAT]);
    assert_eq!(ds.floats("QOB").unwrap(), &[fill::FLOAT, fill::FLOAT]);
    assert!(outcome.stats.absent_optional_fields > 0);
}

#[test]
fn test_event_history_truncated_to_ceiling() {
    let events = FieldData::numbers((1..=25).map(|i| Some(f64::from(i))));
    let record = aircraft_record("UAL1", 0.0).with_events("TOB", events);
    let mut source =
        MemorySource::new(vec![MemoryMessage::new("AIRCAR", 2021060100).with_record(record)]);
    let mut ds = dataset();
    let t = template(ObsKind::Aircraft, SourceFormat::PrepBufr);
    let outcome = run_conversion(&t, &mut source, &mut ds, &config()).unwrap();

    let expected: Vec<f32> = (1..=20).map(|i| i as f32).collect();
    assert_eq!(ds.shape("TOB_bevn"), Some(&[1, 20][..]));
    assert_eq!(ds.floats("TOB_bevn").unwrap(), expected.as_slice());
    assert_eq!(outcome.stats.truncated_values, 5);
}

#[test]
fn test_passes_agree_on_record_count() {
    let mut messages = Vec::new();
    for i in 0..10usize {
        let label = if i % 3 == 0 { "AIRCFT" } else { "SATWND" };
        messages.push(
            MemoryMessage::new(label, 2021060100 + (i as i64 % 4))
                .with_records((0..=i % 4).map(|_| aircraft_record("X", 0.0))),
        );
    }

    for limit in [-1, 0, 1, 2, 3, 10] {
        let mut source = MemorySource::new(messages.clone());
        let mut ds = dataset();
        let t = template(ObsKind::Aircraft, SourceFormat::PrepBufr);
        let outcome =
            run_conversion(&t, &mut source, &mut ds, &config().with_max_messages(limit)).unwrap();
        assert_eq!(outcome.stats.observations_written, outcome.scan.record_count);
        assert_eq!(outcome.stats.selected_messages, outcome.scan.selected_messages);
        assert_eq!(outcome.scan.matching_messages, 4);
    }
}

#[test]
fn test_message_limit() {
    let mut source = six_record_source();
    let mut ds = dataset();
    let t = template(ObsKind::Aircraft, SourceFormat::PrepBufr);
    let outcome =
        run_conversion(&t, &mut source, &mut ds, &config().with_max_messages(2)).unwrap();

    assert_eq!(outcome.scan.selected_messages, 2);
    assert_eq!(outcome.scan.matching_messages, 3);
    assert_eq!(ds.dimension("nobs"), Some(3));
    assert_eq!(outcome.reference_time.yyyymmddhh(), 2021060106);
}

/// Scan, size and materialize, leaving the source ready for the second pass
fn prepared(source: &mut MemorySource, ds: &mut MemoryDataset) -> SizedSchema {
    let t = template(ObsKind::Aircraft, SourceFormat::PrepBufr);
    let scan = prescan(source, t.matcher(), None).unwrap();
    let schema = t
        .finalize(scan.record_count)
        .with_reference_time(resolve_reference_time(2021060101).unwrap());
    materialize(&schema, ds).unwrap();
    schema
}

#[test]
fn test_label_change_between_passes_is_fatal() {
    let mut source = six_record_source();
    let mut ds = dataset();
    let schema = prepared(&mut source, &mut ds);

    // the unmatched message now matches and pushes the count past the scan
    source.messages_mut()[1] = MemoryMessage::new("AIRCAR", 2021053112)
        .with_records((0..5).map(|_| aircraft_record("EXTRA", 0.0)));

    let err = convert_records(&schema, &mut source, &mut ds, None, &ProgressReporter::hidden())
        .unwrap_err();
    assert!(matches!(err, Error::Consistency { .. }), "{err}");
}

#[test]
fn test_fewer_records_in_second_pass_are_fatal() {
    let mut source = six_record_source();
    let mut ds = dataset();
    let schema = prepared(&mut source, &mut ds);

    source.messages_mut().pop();

    let err = convert_records(&schema, &mut source, &mut ds, None, &ProgressReporter::hidden())
        .unwrap_err();
    assert!(matches!(err, Error::Consistency { .. }), "{err}");
}

#[test]
fn test_overflow_inside_message_is_fatal() {
    let mut source = six_record_source();
    let mut ds = dataset();
    let schema = prepared(&mut source, &mut ds);

    source.messages_mut()[3]
        .records
        .push(aircraft_record("EXTRA", 0.0));

    let err = convert_records(&schema, &mut source, &mut ds, None, &ProgressReporter::hidden())
        .unwrap_err();
    assert!(matches!(err, Error::Consistency { .. }), "{err}");
}

#[test]
fn test_missing_required_field() {
    let bad = MemoryRecord::new()
        .with_value("XOB", FieldData::number(262.5))
        .with_value("YOB", FieldData::number(40.1));
    let mut source = MemorySource::new(vec![
        MemoryMessage::new("AIRCAR", 2021060100)
            .with_record(aircraft_record("UAL1", 0.0))
            .with_record(bad),
    ]);
    let mut ds = dataset();
    let t = template(ObsKind::Aircraft, SourceFormat::PrepBufr);

    match run_conversion(&t, &mut source, &mut ds, &config()) {
        Err(Error::MissingField { label, observation }) => {
            assert_eq!(label, "SID");
            assert_eq!(observation, 1);
        }
        other => panic!("Expected MissingField, got {other:?}"),
    }
    assert!(!ds.is_closed());
}

#[test]
fn test_undefined_schema_fails_before_reading() {
    let mut source = six_record_source();
    let mut ds = dataset();
    let t = template(ObsKind::Sondes, SourceFormat::Bufr);

    let err = run_conversion(&t, &mut source, &mut ds, &config()).unwrap_err();
    assert!(matches!(err, Error::UndefinedSchema { .. }));
    assert_eq!(source.rewind_count(), 0);
    assert!(source.message_type().is_empty());
    assert!(ds.dimension_names().is_empty());
}

#[test]
fn test_no_selected_messages() {
    let mut source = six_record_source();
    let mut ds = dataset();
    let t = template(ObsKind::Amsua, SourceFormat::Bufr);

    let err = run_conversion(&t, &mut source, &mut ds, &config()).unwrap_err();
    match err {
        Error::NoSelectedMessages { pattern } => assert_eq!(pattern, "^NC021023"),
        other => panic!("Expected NoSelectedMessages, got {other:?}"),
    }
    assert!(ds.dimension_names().is_empty());
}

#[test]
fn test_selected_messages_without_records() {
    let mut source = MemorySource::new(vec![
        MemoryMessage::new("AIRCAR", 2021060100),
        MemoryMessage::new("ADPSFC", 2021060100).with_empty_records(2),
    ]);
    let mut ds = dataset();
    let t = template(ObsKind::Aircraft, SourceFormat::PrepBufr);

    let err = run_conversion(&t, &mut source, &mut ds, &config()).unwrap_err();
    match &err {
        Error::EmptySelection { messages, .. } => assert_eq!(*messages, 1),
        other => panic!("Expected EmptySelection, got {other:?}"),
    }
    assert_eq!(err.exit_code(), crate::constants::exit_codes::FAILURE);
    assert!(ds.dimension_names().is_empty());
    assert!(!ds.is_closed());
}

#[test]
fn test_invalid_message_timestamp_gives_fill_time() {
    let mut source = MemorySource::new(vec![
        MemoryMessage::new("AIRCAR", 2021060100).with_record(aircraft_record("UAL1", 0.0)),
        MemoryMessage::new("AIRCAR", 2021063124).with_record(aircraft_record("UAL2", 0.0)),
    ]);
    let mut ds = dataset();
    let t = template(ObsKind::Aircraft, SourceFormat::PrepBufr);

    let outcome = run_conversion(&t, &mut source, &mut ds, &config()).unwrap();
    assert_eq!(outcome.reference_time.yyyymmddhh(), 2021060106);
    assert_eq!(outcome.stats.observations_written, 2);
    assert_eq!(ds.doubles("time").unwrap(), &[-21600.0, fill::DOUBLE]);
    assert!(ds.is_closed());
}

#[test]
fn test_time_offset_out_of_range_gives_fill_time() {
    let mut source = MemorySource::new(vec![
        MemoryMessage::new("AIRCAR", 2021060100)
            .with_record(aircraft_record("UAL1", 9.0e9))
            .with_record(aircraft_record("UAL2", -9.0e9))
            .with_record(aircraft_record("UAL3", 1.0)),
    ]);
    let mut ds = dataset();
    let t = template(ObsKind::Aircraft, SourceFormat::PrepBufr);

    run_conversion(&t, &mut source, &mut ds, &config()).unwrap();
    assert_eq!(
        ds.doubles("time").unwrap(),
        &[fill::DOUBLE, fill::DOUBLE, -5.0 * 3600.0]
    );
}
