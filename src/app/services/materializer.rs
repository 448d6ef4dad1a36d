//! Output schema creation
//!
//! Turns a sized schema into dimensions, variables and metadata in the
//! output file, and fills in the parts of the file that do not come from
//! records: coordinate values and program codes.

use crate::Result;
use crate::app::adapters::dataset_writer::DatasetWriter;
use crate::app::models::{AttributeValue, Presence, SemanticType, Slab, SourceFormat};
use crate::app::services::schema::{SizedSchema, VariableSpec};
use crate::constants::{TIME_VARIABLE, VIRTMP_PROGRAM, attrs, dims};
use tracing::{debug, info, warn};

/// Chunk shape for a variable
///
/// One-dimensional variables are a single chunk. Otherwise the observation
/// axis is chunked one observation at a time and inner axes are whole, which
/// bounds the memory of each slice write.
pub fn chunk_sizes(spec: &VariableSpec) -> Vec<usize> {
    match spec.dim_sizes.as_slice() {
        [size] => vec![(*size).max(1)],
        [_, inner @ ..] => std::iter::once(1)
            .chain(inner.iter().map(|&s| s.max(1)))
            .collect(),
        [] => Vec::new(),
    }
}

/// The derived observation time variable, when the schema knows how to compute it
pub fn time_variable_spec(schema: &SizedSchema) -> Option<VariableSpec> {
    schema.time_source()?;
    Some(VariableSpec {
        output_name: TIME_VARIABLE.to_string(),
        source_label: TIME_VARIABLE.to_string(),
        semantic_type: SemanticType::Double,
        dim_names: vec![dims::NOBS.to_string()],
        dim_sizes: vec![schema.observation_count()],
        presence: Presence::Optional,
    })
}

fn create<W: DatasetWriter + ?Sized>(writer: &mut W, spec: &VariableSpec) -> Result<()> {
    writer.create_variable(
        &spec.output_name,
        spec.storage_type(),
        &spec.dim_names,
        &chunk_sizes(spec),
    )
}

/// Create every dimension and variable of the schema, plus global metadata
///
/// Must be called once per file: writers reject a second definition of any
/// dimension or variable.
pub fn materialize<W: DatasetWriter + ?Sized>(schema: &SizedSchema, writer: &mut W) -> Result<()> {
    for dimension in schema.dimensions() {
        debug!("Dimension {} = {}", dimension.name, dimension.size);
        writer.create_dimension(&dimension.name, dimension.size)?;
    }

    let coordinates = schema.coordinate_specs();
    for spec in &coordinates {
        create(writer, spec)?;
    }

    for (group, spec) in schema.groups().iter() {
        debug!(
            "Variable {} ({:?}, {:?}) {:?}",
            spec.output_name, group, spec.semantic_type, spec.dim_names
        );
        create(writer, spec)?;
    }

    let time_spec = time_variable_spec(schema);
    if let Some(spec) = &time_spec {
        create(writer, spec)?;
    }

    writer.put_attribute(
        attrs::OBSERVATION_TYPE,
        AttributeValue::Text(schema.kind().to_string()),
    )?;
    writer.put_attribute(
        attrs::SOURCE_FORMAT,
        AttributeValue::Text(schema.format().to_string()),
    )?;

    if let Some(reference) = schema.reference_time() {
        let units = reference.time_units();
        writer.put_attribute(attrs::TIME_UNITS, AttributeValue::Text(units.clone()))?;
        writer.put_attribute(
            attrs::REFERENCE_DATE,
            AttributeValue::Text(reference.to_string()),
        )?;
        if time_spec.is_some() {
            writer.put_variable_attribute(TIME_VARIABLE, attrs::UNITS, AttributeValue::Text(units))?;
        }
    }

    info!(
        "Materialized {} dimensions, {} variables",
        schema.dimensions().len(),
        coordinates.len() + schema.groups().len() + usize::from(time_spec.is_some())
    );
    Ok(())
}

/// Write 1..=size into every coordinate variable
pub fn write_coordinates<W: DatasetWriter + ?Sized>(
    schema: &SizedSchema,
    writer: &mut W,
) -> Result<()> {
    for dimension in schema.dimensions() {
        for i in 0..dimension.size {
            let value = u32::try_from(i + 1).unwrap_or(u32::MAX);
            writer.write_slice(&dimension.name, i, &Slab::UInt(vec![value]))?;
        }
    }
    Ok(())
}

/// Record the virtual temperature program code for prepBUFR input
pub fn write_program_codes<W: DatasetWriter + ?Sized>(
    schema: &SizedSchema,
    writer: &mut W,
    virtmp_code: Option<i64>,
) -> Result<()> {
    if schema.format() != SourceFormat::PrepBufr {
        return Ok(());
    }
    match virtmp_code.and_then(|code| i32::try_from(code).ok()) {
        Some(code) => writer.put_attribute(attrs::VIRTMP_CODE, AttributeValue::Int(code)),
        None => {
            warn!("No usable {} program code in input", VIRTMP_PROGRAM);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::adapters::memory_dataset::MemoryDataset;
    use crate::app::models::{ObsKind, StorageType};
    use crate::app::services::reference_time::resolve_reference_time;
    use crate::app::services::schema::resolve_descriptor;
    use crate::config::DimensionCeilings;

    fn sized(kind: ObsKind, format: SourceFormat, nobs: usize) -> SizedSchema {
        resolve_descriptor(kind, format, &DimensionCeilings::default())
            .unwrap()
            .finalize(nobs)
            .with_reference_time(resolve_reference_time(2021060101).unwrap())
    }

    #[test]
    fn test_chunk_policy() {
        let schema = sized(ObsKind::Sondes, SourceFormat::PrepBufr, 6);
        assert_eq!(chunk_sizes(schema.variable("TOB_bevn").unwrap()), vec![1, 255, 20]);
        assert_eq!(chunk_sizes(schema.variable("POB").unwrap()), vec![1, 255]);

        let coords = schema.coordinate_specs();
        assert_eq!(chunk_sizes(&coords[0]), vec![6]);
    }

    #[test]
    fn test_materialize_sondes() {
        let schema = sized(ObsKind::Sondes, SourceFormat::PrepBufr, 6);
        let mut ds = MemoryDataset::new();
        materialize(&schema, &mut ds).unwrap();

        assert_eq!(ds.dimension_names(), vec!["nobs", "nlevs", "nevents"]);
        assert_eq!(ds.dimension("nobs"), Some(6));
        assert_eq!(ds.storage_type("nobs"), Some(StorageType::UInt));
        assert_eq!(ds.storage_type("SID"), Some(StorageType::Double));
        assert_eq!(ds.storage_type("TQM_bevn"), Some(StorageType::Int));
        assert_eq!(ds.shape("TOB_bevn"), Some(&[6, 255, 20][..]));
        assert_eq!(ds.shape("time"), Some(&[6][..]));

        assert_eq!(
            ds.attribute(attrs::TIME_UNITS),
            Some(&AttributeValue::Text("seconds since 2021-06-01 06:00 UTC".into()))
        );
        assert_eq!(
            ds.attribute(attrs::REFERENCE_DATE),
            Some(&AttributeValue::Text("2021060106".into()))
        );
        assert_eq!(
            ds.attribute(attrs::SOURCE_FORMAT),
            Some(&AttributeValue::Text("prepBUFR".into()))
        );
        assert!(ds.variable_attribute("time", attrs::UNITS).is_some());

        // coordinates, group variables, time
        assert_eq!(
            ds.variable_names().len(),
            3 + schema.groups().len() + 1
        );
    }

    #[test]
    fn test_dead_dimension_not_materialized() {
        let schema = sized(ObsKind::Aircraft, SourceFormat::Bufr, 2);
        let mut ds = MemoryDataset::new();
        materialize(&schema, &mut ds).unwrap();
        assert_eq!(ds.dimension("nevents"), None);
        assert!(!ds.has_variable("nevents"));
        assert_eq!(ds.storage_type("RPID"), Some(StorageType::Char));
    }

    #[test]
    fn test_materialize_twice_fails() {
        let schema = sized(ObsKind::Aircraft, SourceFormat::PrepBufr, 2);
        let mut ds = MemoryDataset::new();
        materialize(&schema, &mut ds).unwrap();
        assert!(materialize(&schema, &mut ds).is_err());
    }

    #[test]
    fn test_coordinates_and_program_codes() {
        let schema = sized(ObsKind::Aircraft, SourceFormat::PrepBufr, 3);
        let mut ds = MemoryDataset::new();
        materialize(&schema, &mut ds).unwrap();
        write_coordinates(&schema, &mut ds).unwrap();
        write_program_codes(&schema, &mut ds, Some(8)).unwrap();

        assert_eq!(ds.uints("nobs"), Some(&[1, 2, 3][..]));
        let events = ds.uints("nevents").unwrap();
        assert_eq!(events.first(), Some(&1));
        assert_eq!(events.last(), Some(&20));
        assert_eq!(ds.attribute(attrs::VIRTMP_CODE), Some(&AttributeValue::Int(8)));
    }

    #[test]
    fn test_program_codes_only_for_prepbufr() {
        let schema = sized(ObsKind::Aircraft, SourceFormat::Bufr, 1);
        let mut ds = MemoryDataset::new();
        materialize(&schema, &mut ds).unwrap();
        write_program_codes(&schema, &mut ds, Some(8)).unwrap();
        assert_eq!(ds.attribute(attrs::VIRTMP_CODE), None);
    }
}
