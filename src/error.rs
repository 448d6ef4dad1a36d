//! Error handling for BUFR to netCDF conversion.
//!
//! Errors fall into three families: configuration problems detected before
//! either pass begins, consistency problems detected mid-run, and unknown
//! dimensions detected while a descriptor is being built. All of them are
//! fatal for the run.

use crate::constants::exit_codes;
use std::path::PathBuf;

/// Result type alias for the converter
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error types for conversion operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// A decoded message dump could not be parsed
    #[error("Message decoding error in '{file}' at line {line}: {message}")]
    MessageDecoding {
        file: String,
        line: usize,
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Observation type token is not recognised
    #[error("Unknown observation type: {name}")]
    UnknownObservationType { name: String },

    /// Observation type has no schema for the requested source format
    #[error("Observation type {kind} for {format} format is undefined")]
    UndefinedSchema { kind: String, format: String },

    /// Input file does not exist
    #[error("Specified input BUFR file does not exist: {path}")]
    InputNotFound { path: PathBuf },

    /// Output file exists and clobbering was not requested
    #[error("Specified nc file already exists: {path} (use --clobber to overwrite)")]
    OutputExists { path: PathBuf },

    /// A variable references a dimension outside the fixed lookup table
    #[error("Unknown dimension name '{dimension}' referenced by variable '{variable}'")]
    UnknownDimension { dimension: String, variable: String },

    /// The two passes over the input disagree
    #[error("Consistency error: {message}")]
    Consistency { message: String },

    /// A required field is structurally absent from a record
    #[error("Required field '{label}' missing from observation {observation}")]
    MissingField { label: String, observation: usize },

    /// Source data does not fit the declared variable shape
    #[error("Shape mismatch for variable '{variable}': {message}")]
    ShapeMismatch { variable: String, message: String },

    /// A source value cannot be converted to the variable's type
    #[error("Cannot convert value for variable '{variable}': {message}")]
    ValueConversion { variable: String, message: String },

    /// Timestamp is not a valid YYYYMMDDHH value
    #[error("Invalid timestamp {value}: {reason}")]
    InvalidTimestamp { value: i64, reason: String },

    /// The pre-scan found nothing to convert
    #[error("No messages matching '{pattern}' found in input")]
    NoSelectedMessages { pattern: String },

    /// Messages were selected but none of them carries a record
    #[error("{messages} messages matching '{pattern}' contain no records")]
    EmptySelection { pattern: String, messages: usize },

    /// The output dataset rejected an operation
    #[error("Output dataset error: {message}")]
    Dataset { message: String },

    /// netCDF library error
    #[cfg(feature = "netcdf")]
    #[error("netCDF error: {message}")]
    Netcdf {
        message: String,
        #[source]
        source: netcdf::Error,
    },
}

impl Error {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a message decoding error
    pub fn message_decoding(
        file: impl Into<String>,
        line: usize,
        message: impl Into<String>,
        source: Option<serde_json::Error>,
    ) -> Self {
        Self::MessageDecoding {
            file: file.into(),
            line,
            message: message.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an unknown observation type error
    pub fn unknown_observation_type(name: impl Into<String>) -> Self {
        Self::UnknownObservationType { name: name.into() }
    }

    /// Create an undefined schema error
    pub fn undefined_schema(kind: impl Into<String>, format: impl Into<String>) -> Self {
        Self::UndefinedSchema {
            kind: kind.into(),
            format: format.into(),
        }
    }

    /// Create an unknown dimension error
    pub fn unknown_dimension(dimension: impl Into<String>, variable: impl Into<String>) -> Self {
        Self::UnknownDimension {
            dimension: dimension.into(),
            variable: variable.into(),
        }
    }

    /// Create a consistency error
    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency {
            message: message.into(),
        }
    }

    /// Create a missing required field error
    pub fn missing_field(label: impl Into<String>, observation: usize) -> Self {
        Self::MissingField {
            label: label.into(),
            observation,
        }
    }

    /// Create a shape mismatch error
    pub fn shape_mismatch(variable: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            variable: variable.into(),
            message: message.into(),
        }
    }

    /// Create a value conversion error
    pub fn value_conversion(variable: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValueConversion {
            variable: variable.into(),
            message: message.into(),
        }
    }

    /// Create an invalid timestamp error
    pub fn invalid_timestamp(value: i64, reason: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            value,
            reason: reason.into(),
        }
    }

    /// Create a dataset error
    pub fn dataset(message: impl Into<String>) -> Self {
        Self::Dataset {
            message: message.into(),
        }
    }

    /// Errors detected before any pass over the input begins
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. }
                | Self::UnknownObservationType { .. }
                | Self::UndefinedSchema { .. }
                | Self::InputNotFound { .. }
                | Self::OutputExists { .. }
        )
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnknownDimension { .. } => exit_codes::UNKNOWN_DIMENSION,
            e if e.is_configuration() => exit_codes::CONFIGURATION,
            _ => exit_codes::FAILURE,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: "I/O operation failed".to_string(),
            source: error,
        }
    }
}

#[cfg(feature = "netcdf")]
impl From<netcdf::Error> for Error {
    fn from(error: netcdf::Error) -> Self {
        Self::Netcdf {
            message: "netCDF operation failed".to_string(),
            source: error,
        }
    }
}
