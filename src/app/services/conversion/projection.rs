//! Projection of source field data onto one output slice
//!
//! A slice covers every inner axis of a variable (all axes below the
//! observation axis). Source data is laid onto that grid in row-major order:
//!
//! - leading source axes of length one are dropped until the ranks match,
//!   and a source of lower rank gets trailing axes of length one, so a scalar
//!   lands at the first cell;
//! - every axis is clipped to the variable's declared size and the dropped
//!   values are counted;
//! - missing values and cells with no source value keep the fill value.
//!
//! Character variables take their last axis as the string width: each
//! source element becomes one string along that axis.

use crate::app::models::{FieldData, Slab, SourceValue, StorageType};
use crate::app::services::schema::VariableSpec;
use crate::constants::BUFR_CHARS_PER_VALUE;
use crate::{Error, Result};

/// A slice ready to write, with the number of source values that did not fit
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub slab: Slab,
    pub truncated: usize,
}

impl Projection {
    /// An all-fill slice
    pub fn fill(spec: &VariableSpec) -> Self {
        Self {
            slab: Slab::filled(spec.storage_type(), spec.inner_len()),
            truncated: 0,
        }
    }
}

/// Element grid and per-element width of a variable's slice
fn element_layout(spec: &VariableSpec) -> (Vec<usize>, usize) {
    let inner = spec.inner_sizes();
    if spec.storage_type() == StorageType::Char {
        match inner.split_last() {
            Some((width, grid)) => (grid.to_vec(), *width),
            None => (Vec::new(), 1),
        }
    } else {
        (inner.to_vec(), 1)
    }
}

/// Project `data` onto one slice of `spec`
pub fn project(spec: &VariableSpec, data: &FieldData) -> Result<Projection> {
    let (grid, width) = element_layout(spec);
    let data = data.clone().squeeze_to(grid.len());
    if data.rank() > grid.len() {
        return Err(Error::shape_mismatch(
            &spec.output_name,
            format!(
                "source shape {:?} does not fit slice shape {:?}",
                data.shape(),
                grid
            ),
        ));
    }

    let mut shape = data.shape().to_vec();
    shape.resize(grid.len(), 1);

    let mut projection = Projection::fill(spec);
    let mut index = vec![0usize; shape.len()];

    for value in data.values() {
        let fits = index.iter().zip(&grid).all(|(i, size)| i < size);
        if !fits {
            if value.is_some() {
                projection.truncated += 1;
            }
        } else if let Some(value) = value {
            let element = ravel(&index, &grid);
            let clipped = write_element(&mut projection.slab, element, width, value, spec)?;
            projection.truncated += usize::from(clipped);
        }
        advance_index(&mut index, &shape);
    }

    Ok(projection)
}

fn ravel(index: &[usize], sizes: &[usize]) -> usize {
    index
        .iter()
        .zip(sizes)
        .fold(0, |flat, (i, size)| flat * size + i)
}

fn advance_index(index: &mut [usize], shape: &[usize]) {
    for axis in (0..index.len()).rev() {
        index[axis] += 1;
        if index[axis] < shape[axis] {
            return;
        }
        index[axis] = 0;
    }
}

/// Store one value; returns whether characters were clipped to the width
fn write_element(
    slab: &mut Slab,
    element: usize,
    width: usize,
    value: &SourceValue,
    spec: &VariableSpec,
) -> Result<bool> {
    match (slab, value) {
        (Slab::Char(cells), value) => {
            let bytes = char_bytes(value);
            let start = element * width;
            for (cell, byte) in cells[start..start + width].iter_mut().zip(&bytes) {
                *cell = *byte;
            }
            Ok(bytes.len() > width)
        }
        (Slab::Int(cells), SourceValue::Number(x)) => {
            cells[element] = to_integer(*x, spec)?;
            Ok(false)
        }
        (Slab::UInt(cells), SourceValue::Number(x)) => {
            let n = to_integer::<i64>(*x, spec)?;
            cells[element] = u32::try_from(n).map_err(|_| out_of_range(*x, spec))?;
            Ok(false)
        }
        (Slab::Float(cells), SourceValue::Number(x)) => {
            cells[element] = *x as f32;
            Ok(false)
        }
        (Slab::Double(cells), SourceValue::Number(x)) => {
            cells[element] = *x;
            Ok(false)
        }
        (Slab::Double(cells), SourceValue::Text(s)) => {
            cells[element] = pack_text(s);
            Ok(false)
        }
        (_, SourceValue::Text(s)) => Err(Error::value_conversion(
            &spec.output_name,
            format!("text '{s}' in a numeric variable"),
        )),
    }
}

fn out_of_range(x: f64, spec: &VariableSpec) -> Error {
    Error::value_conversion(
        &spec.output_name,
        format!("{x} is outside the range of {:?} storage", spec.storage_type()),
    )
}

fn to_integer<T: TryFrom<i64>>(x: f64, spec: &VariableSpec) -> Result<T> {
    if !x.is_finite() || x.abs() > i64::MAX as f64 {
        return Err(out_of_range(x, spec));
    }
    T::try_from(x.round() as i64).map_err(|_| out_of_range(x, spec))
}

/// Characters of a string value
///
/// Character mnemonics read numerically arrive as the eight bytes of a
/// double. Bytes outside printable 7-bit ASCII become spaces, and trailing
/// blanks are dropped so the rest of the cell stays fill.
pub fn char_bytes(value: &SourceValue) -> Vec<u8> {
    let mut bytes = match value {
        SourceValue::Text(s) => s.as_bytes().to_vec(),
        SourceValue::Number(x) => x
            .to_ne_bytes()
            .iter()
            .map(|&b| if (1..=127).contains(&b) { b } else { b' ' })
            .collect(),
    };
    while bytes.last().is_some_and(|b| *b == b' ' || *b == 0) {
        bytes.pop();
    }
    bytes
}

/// Pack up to eight characters into a double, blank padded
pub fn pack_text(text: &str) -> f64 {
    let mut bytes = [b' '; BUFR_CHARS_PER_VALUE];
    for (slot, byte) in bytes.iter_mut().zip(text.bytes()) {
        *slot = byte;
    }
    f64::from_ne_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{Presence, SemanticType};
    use crate::constants::fill;

    fn spec(semantic_type: SemanticType, dim_sizes: &[usize]) -> VariableSpec {
        let names = ["nobs", "nlevs", "nevents"];
        VariableSpec {
            output_name: "X".to_string(),
            source_label: "X".to_string(),
            semantic_type,
            dim_names: names[..dim_sizes.len()].iter().map(|s| s.to_string()).collect(),
            dim_sizes: dim_sizes.to_vec(),
            presence: Presence::Optional,
        }
    }

    #[test]
    fn test_scalar_into_per_observation() {
        let p = project(&spec(SemanticType::Float, &[4]), &FieldData::number(12.5)).unwrap();
        assert_eq!(p.slab, Slab::Float(vec![12.5]));
        assert_eq!(p.truncated, 0);

        let data = FieldData::numbers([Some(3.0)]);
        let p = project(&spec(SemanticType::IntegerEnum, &[4]), &data).unwrap();
        assert_eq!(p.slab, Slab::Int(vec![3]));
    }

    #[test]
    fn test_scalar_lands_in_first_cell() {
        let p = project(&spec(SemanticType::Float, &[4, 3]), &FieldData::number(1.0)).unwrap();
        assert_eq!(p.slab, Slab::Float(vec![1.0, fill::FLOAT, fill::FLOAT]));
    }

    #[test]
    fn test_missing_values_stay_fill() {
        let data = FieldData::numbers([Some(1.0), None, Some(3.0)]);
        let p = project(&spec(SemanticType::Float, &[1, 4]), &data).unwrap();
        assert_eq!(p.slab, Slab::Float(vec![1.0, fill::FLOAT, 3.0, fill::FLOAT]));

        let p = project(&spec(SemanticType::Float, &[1]), &FieldData::missing()).unwrap();
        assert_eq!(p.slab, Slab::Float(vec![fill::FLOAT]));
    }

    #[test]
    fn test_event_axis_truncated() {
        let data = FieldData::numbers((1..=25).map(|i| Some(f64::from(i))));
        let p = project(&spec(SemanticType::Float, &[1, 20]), &data).unwrap();
        let expected: Vec<f32> = (1..=20).map(|i| i as f32).collect();
        assert_eq!(p.slab, Slab::Float(expected));
        assert_eq!(p.truncated, 5);
    }

    #[test]
    fn test_two_axis_clip() {
        // 3 levels x 3 events into 2 levels x 2 events
        let values = (0..9).map(|i| Some(SourceValue::Number(f64::from(i)))).collect();
        let data = FieldData::new(vec![3, 3], values).unwrap();
        let p = project(&spec(SemanticType::Float, &[1, 2, 2]), &data).unwrap();
        assert_eq!(p.slab, Slab::Float(vec![0.0, 1.0, 3.0, 4.0]));
        assert_eq!(p.truncated, 5);
    }

    #[test]
    fn test_lower_rank_pads_trailing_axes() {
        let data = FieldData::numbers([Some(1.0), Some(2.0)]);
        let p = project(&spec(SemanticType::Float, &[1, 2, 2]), &data).unwrap();
        assert_eq!(p.slab, Slab::Float(vec![1.0, fill::FLOAT, 2.0, fill::FLOAT]));
    }

    #[test]
    fn test_leading_unit_axes_squeezed() {
        let values = vec![Some(SourceValue::Number(7.0)); 2];
        let data = FieldData::new(vec![1, 1, 2], values).unwrap();
        let p = project(&spec(SemanticType::Float, &[1, 2]), &data).unwrap();
        assert_eq!(p.slab, Slab::Float(vec![7.0, 7.0]));
    }

    #[test]
    fn test_higher_rank_rejected() {
        let data = FieldData::new(vec![2, 2], vec![None; 4]).unwrap();
        let err = project(&spec(SemanticType::Float, &[1, 4]), &data).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_strings() {
        let s = spec(SemanticType::String, &[1, 6]);
        let p = project(&s, &FieldData::text("N123AB")).unwrap();
        assert_eq!(p.slab, Slab::Char(b"N123AB".to_vec()));

        let p = project(&s, &FieldData::text("KLAX")).unwrap();
        assert_eq!(p.slab, Slab::Char(vec![b'K', b'L', b'A', b'X', 0, 0]));

        let p = project(&s, &FieldData::text("TOOLONGID")).unwrap();
        assert_eq!(p.slab, Slab::Char(b"TOOLON".to_vec()));
        assert_eq!(p.truncated, 1);
    }

    #[test]
    fn test_packed_number_as_string() {
        let s = spec(SemanticType::String, &[1, 10]);
        let p = project(&s, &FieldData::number(pack_text("72518"))).unwrap();
        let Slab::Char(cells) = p.slab else {
            panic!("expected char slab");
        };
        assert_eq!(&cells[..5], b"72518");
        assert!(cells[5..].iter().all(|&c| c == fill::CHAR));
    }

    #[test]
    fn test_text_into_double_is_packed() {
        let p = project(&spec(SemanticType::Double, &[1]), &FieldData::text("72518")).unwrap();
        let Slab::Double(cells) = p.slab else {
            panic!("expected double slab");
        };
        assert_eq!(char_bytes(&SourceValue::Number(cells[0])), b"72518".to_vec());
    }

    #[test]
    fn test_conversion_errors() {
        let err = project(&spec(SemanticType::Float, &[1]), &FieldData::text("abc")).unwrap_err();
        assert!(matches!(err, Error::ValueConversion { .. }));

        let err =
            project(&spec(SemanticType::IntegerEnum, &[1]), &FieldData::number(1e12)).unwrap_err();
        assert!(matches!(err, Error::ValueConversion { .. }));

        let err =
            project(&spec(SemanticType::UnsignedInt, &[1]), &FieldData::number(-1.0)).unwrap_err();
        assert!(matches!(err, Error::ValueConversion { .. }));
    }
}
