//! netCDF-4 output through the `netcdf` crate
//!
//! Character data is stored as NC_CHAR along the string dimension.
//! Slices are addressed by an outer index followed by full ranges over the
//! remaining axes.

use super::dataset_writer::DatasetWriter;
use crate::app::models::{AttributeValue, Slab, StorageType};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct NetcdfDataset {
    path: PathBuf,
    file: Option<netcdf::FileMut>,
}

impl NetcdfDataset {
    /// Create (or truncate) a netCDF-4 file
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = netcdf::create(&path).map_err(|e| Error::Netcdf {
            message: format!("Failed to create {}", path.display()),
            source: e,
        })?;
        debug!("Created netCDF file {}", path.display());
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_mut(&mut self) -> Result<&mut netcdf::FileMut> {
        self.file
            .as_mut()
            .ok_or_else(|| Error::dataset(format!("{} is closed", self.path.display())))
    }

    fn variable_mut<'f>(
        file: &'f mut netcdf::FileMut,
        name: &str,
    ) -> Result<netcdf::VariableMut<'f>> {
        file.variable_mut(name)
            .ok_or_else(|| Error::dataset(format!("no variable named '{name}'")))
    }
}

fn to_attribute(value: AttributeValue) -> netcdf::AttributeValue {
    match value {
        AttributeValue::Text(s) => netcdf::AttributeValue::Str(s),
        AttributeValue::Int(i) => netcdf::AttributeValue::Int(i),
        AttributeValue::Double(d) => netcdf::AttributeValue::Double(d),
    }
}

/// One byte of NC_CHAR data
///
/// Plain `u8` maps to NC_UBYTE, whose default fill is 255.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NcChar(u8);

// SAFETY: NcChar is a transparent u8, the in-memory layout of NC_CHAR
unsafe impl netcdf::NcTypeDescriptor for NcChar {
    fn type_descriptor() -> netcdf::NcVariableType {
        netcdf::NcVariableType::Char
    }
}

fn put_slice<T>(variable: &mut netcdf::VariableMut<'_>, index: usize, values: &[T]) -> Result<()>
where
    T: netcdf::NcTypeDescriptor + Copy,
{
    let result = match variable.dimensions().len() {
        1 => variable.put_values(values, (index,)),
        2 => variable.put_values(values, (index, ..)),
        3 => variable.put_values(values, (index, .., ..)),
        4 => variable.put_values(values, (index, .., .., ..)),
        rank => {
            return Err(Error::dataset(format!(
                "variable '{}' has unsupported rank {rank}",
                variable.name()
            )));
        }
    };
    result.map_err(Error::from)
}

impl DatasetWriter for NetcdfDataset {
    fn create_dimension(&mut self, name: &str, size: usize) -> Result<()> {
        let file = self.file_mut()?;
        if file.dimension(name).is_some() {
            return Err(Error::dataset(format!("dimension '{name}' already defined")));
        }
        file.add_dimension(name, size)?;
        Ok(())
    }

    fn create_variable(
        &mut self,
        name: &str,
        storage: StorageType,
        dims: &[String],
        chunks: &[usize],
    ) -> Result<()> {
        let file = self.file_mut()?;
        if file.variable(name).is_some() {
            return Err(Error::dataset(format!("variable '{name}' already defined")));
        }

        let dims: Vec<&str> = dims.iter().map(String::as_str).collect();
        let mut variable = match storage {
            StorageType::Char => file.add_variable::<NcChar>(name, &dims)?,
            StorageType::Int => file.add_variable::<i32>(name, &dims)?,
            StorageType::UInt => file.add_variable::<u32>(name, &dims)?,
            StorageType::Float => file.add_variable::<f32>(name, &dims)?,
            StorageType::Double => file.add_variable::<f64>(name, &dims)?,
        };
        variable.set_chunking(chunks)?;
        Ok(())
    }

    fn write_slice(&mut self, name: &str, index: usize, values: &Slab) -> Result<()> {
        let file = self.file_mut()?;
        let mut variable = Self::variable_mut(file, name)?;
        match values {
            Slab::Char(v) => {
                let chars: Vec<NcChar> = v.iter().copied().map(NcChar).collect();
                put_slice(&mut variable, index, &chars)
            }
            Slab::Int(v) => put_slice(&mut variable, index, v),
            Slab::UInt(v) => put_slice(&mut variable, index, v),
            Slab::Float(v) => put_slice(&mut variable, index, v),
            Slab::Double(v) => put_slice(&mut variable, index, v),
        }
    }

    fn put_attribute(&mut self, name: &str, value: AttributeValue) -> Result<()> {
        self.file_mut()?.add_attribute(name, to_attribute(value))?;
        Ok(())
    }

    fn put_variable_attribute(
        &mut self,
        variable: &str,
        name: &str,
        value: AttributeValue,
    ) -> Result<()> {
        let file = self.file_mut()?;
        Self::variable_mut(file, variable)?.put_attribute(name, to_attribute(value))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        // the library syncs on close; nothing is buffered on this side
        self.file_mut().map(|_| ())
    }

    fn close(&mut self) -> Result<()> {
        match self.file.take() {
            Some(file) => {
                drop(file);
                debug!("Closed netCDF file {}", self.path.display());
                Ok(())
            }
            None => Err(Error::dataset(format!(
                "{} is already closed",
                self.path.display()
            ))),
        }
    }
}
