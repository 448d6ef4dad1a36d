//! In-memory dataset
//!
//! Keeps every variable as a full row-major array initialised to its fill
//! value, so tests can inspect exactly what a conversion wrote.

use super::dataset_writer::DatasetWriter;
use crate::app::models::{AttributeValue, Slab, StorageType};
use crate::{Error, Result};

#[derive(Debug, Clone)]
struct MemoryVariable {
    name: String,
    dims: Vec<String>,
    shape: Vec<usize>,
    chunks: Vec<usize>,
    data: Slab,
    attributes: Vec<(String, AttributeValue)>,
}

impl MemoryVariable {
    fn slice_len(&self) -> usize {
        self.shape.iter().skip(1).product()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    dimensions: Vec<(String, usize)>,
    variables: Vec<MemoryVariable>,
    attributes: Vec<(String, AttributeValue)>,
    flushes: usize,
    closed: bool,
}

impl MemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::dataset("dataset is closed"))
        } else {
            Ok(())
        }
    }

    fn find(&self, name: &str) -> Option<&MemoryVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    fn find_mut(&mut self, name: &str) -> Result<&mut MemoryVariable> {
        self.variables
            .iter_mut()
            .find(|v| v.name == name)
            .ok_or_else(|| Error::dataset(format!("no variable named '{name}'")))
    }

    // Inspection

    pub fn dimension(&self, name: &str) -> Option<usize> {
        self.dimensions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, size)| *size)
    }

    pub fn dimension_names(&self) -> Vec<&str> {
        self.dimensions.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn variable_dims(&self, name: &str) -> Option<&[String]> {
        self.find(name).map(|v| v.dims.as_slice())
    }

    pub fn shape(&self, name: &str) -> Option<&[usize]> {
        self.find(name).map(|v| v.shape.as_slice())
    }

    pub fn chunks(&self, name: &str) -> Option<&[usize]> {
        self.find(name).map(|v| v.chunks.as_slice())
    }

    pub fn storage_type(&self, name: &str) -> Option<StorageType> {
        self.find(name).map(|v| v.data.storage_type())
    }

    pub fn values(&self, name: &str) -> Option<&Slab> {
        self.find(name).map(|v| &v.data)
    }

    pub fn chars(&self, name: &str) -> Option<&[u8]> {
        match self.values(name)? {
            Slab::Char(v) => Some(v),
            _ => None,
        }
    }

    pub fn ints(&self, name: &str) -> Option<&[i32]> {
        match self.values(name)? {
            Slab::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn uints(&self, name: &str) -> Option<&[u32]> {
        match self.values(name)? {
            Slab::UInt(v) => Some(v),
            _ => None,
        }
    }

    pub fn floats(&self, name: &str) -> Option<&[f32]> {
        match self.values(name)? {
            Slab::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn doubles(&self, name: &str) -> Option<&[f64]> {
        match self.values(name)? {
            Slab::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn variable_attribute(&self, variable: &str, name: &str) -> Option<&AttributeValue> {
        self.find(variable)?
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

fn upsert(attributes: &mut Vec<(String, AttributeValue)>, name: &str, value: AttributeValue) {
    match attributes.iter_mut().find(|(n, _)| n == name) {
        Some((_, existing)) => *existing = value,
        None => attributes.push((name.to_string(), value)),
    }
}

impl DatasetWriter for MemoryDataset {
    fn create_dimension(&mut self, name: &str, size: usize) -> Result<()> {
        self.ensure_open()?;
        if self.dimension(name).is_some() {
            return Err(Error::dataset(format!("dimension '{name}' already defined")));
        }
        self.dimensions.push((name.to_string(), size));
        Ok(())
    }

    fn create_variable(
        &mut self,
        name: &str,
        storage: StorageType,
        dims: &[String],
        chunks: &[usize],
    ) -> Result<()> {
        self.ensure_open()?;
        if self.has_variable(name) {
            return Err(Error::dataset(format!("variable '{name}' already defined")));
        }
        if chunks.len() != dims.len() {
            return Err(Error::dataset(format!(
                "variable '{name}' has {} dimensions but {} chunk sizes",
                dims.len(),
                chunks.len()
            )));
        }

        let shape = dims
            .iter()
            .map(|d| {
                self.dimension(d).ok_or_else(|| {
                    Error::dataset(format!("variable '{name}' uses undefined dimension '{d}'"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.variables.push(MemoryVariable {
            name: name.to_string(),
            dims: dims.to_vec(),
            data: Slab::filled(storage, shape.iter().product()),
            shape,
            chunks: chunks.to_vec(),
            attributes: Vec::new(),
        });
        Ok(())
    }

    fn write_slice(&mut self, name: &str, index: usize, values: &Slab) -> Result<()> {
        self.ensure_open()?;
        let variable = self.find_mut(name)?;
        let outer = variable.shape.first().copied().unwrap_or(1);
        if index >= outer {
            return Err(Error::dataset(format!(
                "index {index} outside '{name}' of length {outer}"
            )));
        }
        let slice_len = variable.slice_len();
        if values.len() != slice_len {
            return Err(Error::dataset(format!(
                "slice for '{name}' has {} values, expected {slice_len}",
                values.len()
            )));
        }
        variable.data.splice(index * slice_len, values)
    }

    fn put_attribute(&mut self, name: &str, value: AttributeValue) -> Result<()> {
        self.ensure_open()?;
        upsert(&mut self.attributes, name, value);
        Ok(())
    }

    fn put_variable_attribute(
        &mut self,
        variable: &str,
        name: &str,
        value: AttributeValue,
    ) -> Result<()> {
        self.ensure_open()?;
        let variable = self.find_mut(variable)?;
        upsert(&mut variable.attributes, name, value);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.flushes += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.flush()?;
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::fill;

    fn dims(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_define_and_write() {
        let mut ds = MemoryDataset::new();
        ds.create_dimension("nobs", 2).unwrap();
        ds.create_dimension("nevents", 3).unwrap();
        ds.create_variable("TOB_bevn", StorageType::Float, &dims(&["nobs", "nevents"]), &[1, 3])
            .unwrap();

        ds.write_slice("TOB_bevn", 1, &Slab::Float(vec![1.0, 2.0, 3.0]))
            .unwrap();

        let values = ds.floats("TOB_bevn").unwrap();
        assert_eq!(values.len(), 6);
        assert_eq!(&values[..3], &[fill::FLOAT; 3]);
        assert_eq!(&values[3..], &[1.0, 2.0, 3.0]);
        assert_eq!(ds.chunks("TOB_bevn"), Some(&[1, 3][..]));
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut ds = MemoryDataset::new();
        ds.create_dimension("nobs", 2).unwrap();
        assert!(ds.create_dimension("nobs", 2).is_err());

        ds.create_variable("nobs", StorageType::UInt, &dims(&["nobs"]), &[2])
            .unwrap();
        assert!(
            ds.create_variable("nobs", StorageType::UInt, &dims(&["nobs"]), &[2])
                .is_err()
        );
    }

    #[test]
    fn test_bad_writes_rejected() {
        let mut ds = MemoryDataset::new();
        ds.create_dimension("nobs", 2).unwrap();
        assert!(
            ds.create_variable("SID", StorageType::Double, &dims(&["nobs", "nstring"]), &[1, 10])
                .is_err()
        );
        ds.create_variable("SID", StorageType::Double, &dims(&["nobs"]), &[2])
            .unwrap();

        assert!(ds.write_slice("SID", 2, &Slab::Double(vec![1.0])).is_err());
        assert!(ds.write_slice("SID", 0, &Slab::Double(vec![1.0, 2.0])).is_err());
        assert!(ds.write_slice("SID", 0, &Slab::Float(vec![1.0])).is_err());
        assert!(ds.write_slice("XOB", 0, &Slab::Float(vec![1.0])).is_err());
    }

    #[test]
    fn test_attributes_and_close() {
        let mut ds = MemoryDataset::new();
        ds.create_dimension("nobs", 1).unwrap();
        ds.create_variable("time", StorageType::Double, &dims(&["nobs"]), &[1])
            .unwrap();
        ds.put_attribute("observation_type", AttributeValue::Text("Aircraft".into()))
            .unwrap();
        ds.put_attribute("observation_type", AttributeValue::Text("Sondes".into()))
            .unwrap();
        ds.put_variable_attribute("time", "units", AttributeValue::Text("s".into()))
            .unwrap();

        assert_eq!(
            ds.attribute("observation_type"),
            Some(&AttributeValue::Text("Sondes".into()))
        );
        assert_eq!(
            ds.variable_attribute("time", "units"),
            Some(&AttributeValue::Text("s".into()))
        );

        ds.close().unwrap();
        assert!(ds.is_closed());
        assert_eq!(ds.flush_count(), 1);
        assert!(ds.write_slice("time", 0, &Slab::Double(vec![0.0])).is_err());
    }
}
