//! Core data structures shared by the conversion services.
//!
//! Observation kinds and source formats, the semantic and physical value
//! types of output variables, the shaped field data handed over by a
//! message source, and the typed slabs handed to a dataset writer.

use crate::constants::fill;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Observation kinds and source formats
// =============================================================================

/// Observation kinds with a schema catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObsKind {
    Aircraft,
    Sondes,
    Amsua,
}

impl ObsKind {
    /// All supported kinds, in catalog order
    pub const ALL: [ObsKind; 3] = [ObsKind::Aircraft, ObsKind::Sondes, ObsKind::Amsua];

    /// Token used on the command line and in file metadata
    pub fn name(&self) -> &'static str {
        match self {
            ObsKind::Aircraft => "Aircraft",
            ObsKind::Sondes => "Sondes",
            ObsKind::Amsua => "Amsua",
        }
    }
}

impl fmt::Display for ObsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ObsKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ObsKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::unknown_observation_type(s))
    }
}

/// Source sub-format of the input file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceFormat {
    /// Raw BUFR as disseminated
    Bufr,
    /// NCEP pre-processed BUFR with events and quality markers
    PrepBufr,
}

impl SourceFormat {
    pub fn from_prepbufr_flag(prepbufr: bool) -> Self {
        if prepbufr {
            SourceFormat::PrepBufr
        } else {
            SourceFormat::Bufr
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Bufr => f.write_str("BUFR"),
            SourceFormat::PrepBufr => f.write_str("prepBUFR"),
        }
    }
}

// =============================================================================
// Variable types
// =============================================================================

/// Meaning of a field's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SemanticType {
    /// CCITT IA5 character data
    String,
    /// Code and flag table values
    IntegerEnum,
    /// All other measured quantities
    Float,
    /// Dimension coordinates
    UnsignedInt,
    /// Identifiers consumed downstream as 8-byte reals
    Double,
}

impl SemanticType {
    /// Physical storage type used in the output file
    pub fn storage_type(&self) -> StorageType {
        match self {
            SemanticType::String => StorageType::Char,
            SemanticType::IntegerEnum => StorageType::Int,
            SemanticType::UnsignedInt => StorageType::UInt,
            SemanticType::Float => StorageType::Float,
            SemanticType::Double => StorageType::Double,
        }
    }
}

/// Physical storage types of the output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageType {
    /// Fixed-width character array element
    Char,
    /// 32-bit signed integer
    Int,
    /// 32-bit unsigned integer
    UInt,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
}

/// Whether a missing source field aborts the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Presence {
    Required,
    Optional,
}

/// The five variable groups of a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableGroup {
    Header,
    Interior,
    Event,
    Replication,
    Sequence,
}

impl VariableGroup {
    pub const ALL: [VariableGroup; 5] = [
        VariableGroup::Header,
        VariableGroup::Interior,
        VariableGroup::Event,
        VariableGroup::Replication,
        VariableGroup::Sequence,
    ];

    /// How fields of this group are requested from the source
    pub fn selection(&self) -> FieldSelection {
        match self {
            VariableGroup::Header | VariableGroup::Interior => FieldSelection::Value,
            VariableGroup::Event => FieldSelection::Events,
            VariableGroup::Replication => FieldSelection::Replication,
            VariableGroup::Sequence => FieldSelection::Sequence,
        }
    }
}

// =============================================================================
// Source field data
// =============================================================================

/// Sub-selection applied when reading a field from the current record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldSelection {
    /// Plain values, one per level
    Value,
    /// Revision history, trailing axis is the event index
    Events,
    /// Delayed replication, trailing axis is the repeat index
    Replication,
    /// Nested sequence, trailing axis is the sequence index
    Sequence,
}

/// One decoded source value
#[derive(Debug, Clone, PartialEq)]
pub enum SourceValue {
    Number(f64),
    Text(String),
}

/// A shaped, row-major block of possibly-missing source values
#[derive(Debug, Clone, PartialEq)]
pub struct FieldData {
    shape: Vec<usize>,
    values: Vec<Option<SourceValue>>,
}

impl FieldData {
    /// Build field data, checking that the values fill the shape exactly
    pub fn new(shape: Vec<usize>, values: Vec<Option<SourceValue>>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(Error::consistency(format!(
                "field of shape {:?} needs {} values, got {}",
                shape,
                expected,
                values.len()
            )));
        }
        Ok(Self { shape, values })
    }

    /// A rank-0 value
    pub fn scalar(value: Option<SourceValue>) -> Self {
        Self {
            shape: Vec::new(),
            values: vec![value],
        }
    }

    pub fn number(value: f64) -> Self {
        Self::scalar(Some(SourceValue::Number(value)))
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::scalar(Some(SourceValue::Text(value.into())))
    }

    /// Present in the record structure, but without data
    pub fn missing() -> Self {
        Self::scalar(None)
    }

    /// A rank-1 run of numbers (levels, channels, events)
    pub fn numbers(values: impl IntoIterator<Item = Option<f64>>) -> Self {
        let values: Vec<_> = values
            .into_iter()
            .map(|v| v.map(SourceValue::Number))
            .collect();
        Self {
            shape: vec![values.len()],
            values,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn values(&self) -> &[Option<SourceValue>] {
        &self.values
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Length of the leading axis (1 for scalars)
    pub fn leading_len(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    /// Drop leading axes of length one until the rank is at most `rank`
    pub fn squeeze_to(mut self, rank: usize) -> Self {
        while self.shape.len() > rank && self.shape.first() == Some(&1) {
            self.shape.remove(0);
        }
        self
    }

    /// First present numeric value, if any
    pub fn first_number(&self) -> Option<f64> {
        self.values.iter().flatten().find_map(|v| match v {
            SourceValue::Number(n) => Some(*n),
            SourceValue::Text(_) => None,
        })
    }
}

// =============================================================================
// Output values
// =============================================================================

/// A typed block of output values covering a variable's inner axes
#[derive(Debug, Clone, PartialEq)]
pub enum Slab {
    Char(Vec<u8>),
    Int(Vec<i32>),
    UInt(Vec<u32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl Slab {
    /// A slab of `len` fill values
    pub fn filled(storage: StorageType, len: usize) -> Self {
        match storage {
            StorageType::Char => Slab::Char(vec![fill::CHAR; len]),
            StorageType::Int => Slab::Int(vec![fill::INT; len]),
            StorageType::UInt => Slab::UInt(vec![fill::UINT; len]),
            StorageType::Float => Slab::Float(vec![fill::FLOAT; len]),
            StorageType::Double => Slab::Double(vec![fill::DOUBLE; len]),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Slab::Char(v) => v.len(),
            Slab::Int(v) => v.len(),
            Slab::UInt(v) => v.len(),
            Slab::Float(v) => v.len(),
            Slab::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn storage_type(&self) -> StorageType {
        match self {
            Slab::Char(_) => StorageType::Char,
            Slab::Int(_) => StorageType::Int,
            Slab::UInt(_) => StorageType::UInt,
            Slab::Float(_) => StorageType::Float,
            Slab::Double(_) => StorageType::Double,
        }
    }

    /// Whether the element at `index` still holds the fill value
    pub fn is_fill(&self, index: usize) -> bool {
        match self {
            Slab::Char(v) => v.get(index) == Some(&fill::CHAR),
            Slab::Int(v) => v.get(index) == Some(&fill::INT),
            Slab::UInt(v) => v.get(index) == Some(&fill::UINT),
            Slab::Float(v) => v.get(index) == Some(&fill::FLOAT),
            Slab::Double(v) => v.get(index) == Some(&fill::DOUBLE),
        }
    }

    /// Copy `other` into this slab starting at element `offset`
    pub fn splice(&mut self, offset: usize, other: &Slab) -> Result<()> {
        fn copy<T: Copy>(dst: &mut [T], offset: usize, src: &[T]) -> Result<()> {
            let end = offset + src.len();
            if end > dst.len() {
                return Err(Error::dataset(format!(
                    "slice of {} values at offset {} overruns {} elements",
                    src.len(),
                    offset,
                    dst.len()
                )));
            }
            dst[offset..end].copy_from_slice(src);
            Ok(())
        }

        match (self, other) {
            (Slab::Char(d), Slab::Char(s)) => copy(d, offset, s),
            (Slab::Int(d), Slab::Int(s)) => copy(d, offset, s),
            (Slab::UInt(d), Slab::UInt(s)) => copy(d, offset, s),
            (Slab::Float(d), Slab::Float(s)) => copy(d, offset, s),
            (Slab::Double(d), Slab::Double(s)) => copy(d, offset, s),
            (d, s) => Err(Error::dataset(format!(
                "cannot write {:?} values into {:?} storage",
                s.storage_type(),
                d.storage_type()
            ))),
        }
    }
}

/// Global or variable attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Int(i32),
    Double(f64),
}

// =============================================================================
// Pass summaries
// =============================================================================

/// Outcome of the pre-scan pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Records (subsets) inside the selected messages
    pub record_count: usize,
    /// Messages selected for conversion
    pub selected_messages: usize,
    /// Messages whose type matched, regardless of the limit
    pub matching_messages: usize,
    /// Minimum YYYYMMDDHH timestamp over the selected messages
    pub earliest_timestamp: Option<i64>,
}

/// Outcome of the conversion pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionStats {
    /// Observations written along the observation dimension
    pub observations_written: usize,
    /// Messages selected during the conversion pass
    pub selected_messages: usize,
    /// Source values dropped because they exceeded a dimension ceiling
    pub truncated_values: usize,
    /// Optional fields absent from a record and left as fill
    pub absent_optional_fields: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obs_kind_parsing() {
        assert_eq!("Aircraft".parse::<ObsKind>().unwrap(), ObsKind::Aircraft);
        assert_eq!("sondes".parse::<ObsKind>().unwrap(), ObsKind::Sondes);
        assert_eq!(" AMSUA ".parse::<ObsKind>().unwrap(), ObsKind::Amsua);

        match "Ships".parse::<ObsKind>() {
            Err(Error::UnknownObservationType { name }) => assert_eq!(name, "Ships"),
            other => panic!("Expected UnknownObservationType, got {other:?}"),
        }
    }

    #[test]
    fn test_semantic_to_storage_mapping() {
        assert_eq!(SemanticType::String.storage_type(), StorageType::Char);
        assert_eq!(SemanticType::IntegerEnum.storage_type(), StorageType::Int);
        assert_eq!(SemanticType::UnsignedInt.storage_type(), StorageType::UInt);
        assert_eq!(SemanticType::Float.storage_type(), StorageType::Float);
        assert_eq!(SemanticType::Double.storage_type(), StorageType::Double);
    }

    #[test]
    fn test_field_data_shape_check() {
        assert!(FieldData::new(vec![2, 3], vec![None; 6]).is_ok());
        assert!(FieldData::new(vec![2, 3], vec![None; 5]).is_err());

        let scalar = FieldData::number(4.5);
        assert_eq!(scalar.rank(), 0);
        assert_eq!(scalar.leading_len(), 1);
        assert_eq!(scalar.first_number(), Some(4.5));
    }

    #[test]
    fn test_squeeze_leading_axes() {
        let data = FieldData::new(vec![1, 1, 4], vec![None; 4]).unwrap();
        assert_eq!(data.clone().squeeze_to(1).shape(), &[4]);
        assert_eq!(data.squeeze_to(2).shape(), &[1, 4]);

        let data = FieldData::new(vec![2, 4], vec![None; 8]).unwrap();
        assert_eq!(data.squeeze_to(1).shape(), &[2, 4]);
    }

    #[test]
    fn test_slab_fill_and_splice() {
        let mut slab = Slab::filled(StorageType::Float, 4);
        assert!(slab.is_fill(0));
        slab.splice(1, &Slab::Float(vec![1.0, 2.0])).unwrap();
        assert_eq!(slab, Slab::Float(vec![fill::FLOAT, 1.0, 2.0, fill::FLOAT]));

        assert!(slab.splice(3, &Slab::Float(vec![1.0, 2.0])).is_err());
        assert!(slab.splice(0, &Slab::Int(vec![1])).is_err());
    }
}
