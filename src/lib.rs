//! bufr2nc library
//!
//! Converts decoded BUFR and prepBUFR observation messages into fixed-schema
//! netCDF datasets for data assimilation systems.
//!
//! This library provides tools for:
//! - Describing each observation type as a schema of dimensions and variables
//! - Counting the records a run will convert before any output is created
//! - Deriving the synoptic reference time of a file from its messages
//! - Materializing and filling the output dataset one observation at a time

pub mod config;
pub mod constants;
pub mod error;

// Core application modules
pub mod app {
    pub mod models;
    pub mod services {
        pub mod conversion;
        pub mod materializer;
        pub mod prescan;
        pub mod reference_time;
        pub mod schema;
    }
    pub mod adapters {
        pub mod dataset_writer;
        pub mod json_source;
        pub mod memory_dataset;
        pub mod memory_source;
        pub mod message_source;
        #[cfg(feature = "netcdf")]
        pub mod netcdf_dataset;
    }
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use app::models::{FieldData, ObsKind, SourceFormat, SourceValue};
pub use app::services::conversion::{ConversionOutcome, run_conversion};
pub use app::services::schema::{SchemaTemplate, SizedSchema, resolve_descriptor};
pub use config::{ConverterConfig, DimensionCeilings};
pub use error::{Error, Result};
