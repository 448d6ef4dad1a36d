//! Output file interface
//!
//! The writer follows the netCDF define-then-write model: dimensions first,
//! then variables, then data. Data is written one outer-axis slice at a time;
//! a slice covers every inner axis of the variable in row-major order.

use crate::Result;
use crate::app::models::{AttributeValue, Slab, StorageType};

pub trait DatasetWriter {
    /// Define a fixed-size dimension; names must be unique
    fn create_dimension(&mut self, name: &str, size: usize) -> Result<()>;

    /// Define a variable over previously created dimensions; names must be unique
    fn create_variable(
        &mut self,
        name: &str,
        storage: StorageType,
        dims: &[String],
        chunks: &[usize],
    ) -> Result<()>;

    /// Write the slice at `index` along the variable's outermost axis
    fn write_slice(&mut self, name: &str, index: usize, values: &Slab) -> Result<()>;

    /// Set a global attribute
    fn put_attribute(&mut self, name: &str, value: AttributeValue) -> Result<()>;

    /// Set an attribute on a variable
    fn put_variable_attribute(
        &mut self,
        variable: &str,
        name: &str,
        value: AttributeValue,
    ) -> Result<()>;

    fn flush(&mut self) -> Result<()>;

    /// Flush and release the file; further calls fail
    fn close(&mut self) -> Result<()>;
}
