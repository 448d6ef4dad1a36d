//! Application constants for the BUFR to netCDF converter
//!
//! Dimension names, default ceilings, netCDF fill values and the markers
//! used by the BUFR decoding libraries. Everything that is tunable per run
//! lives in [`crate::config`]; the values here are the defaults and the
//! fixed vocabulary shared across the crate.

// =============================================================================
// Dimension Names
// =============================================================================

/// Dimension names used in the output file
pub mod dims {
    /// Number of selected observations (subsets); sized by the pre-scan
    pub const NOBS: &str = "nobs";

    /// Vertical levels in a sounding
    pub const NLEVS: &str = "nlevs";

    /// Revision history entries per quantity
    pub const NEVENTS: &str = "nevents";

    /// Characters in a fixed-width string
    pub const NSTRING: &str = "nstring";

    /// Radiance channels in a replicated channel group
    pub const NCHANS: &str = "nchans";
}

// =============================================================================
// Default Ceilings
// =============================================================================

/// Level ceiling imposed by the array sizes of the BUFR library interface
pub const DEFAULT_MAX_LEVELS: usize = 255;

/// Events are sparse (a handful per quantity), so stay well below the
/// library's 255 limit to keep files small
pub const DEFAULT_MAX_EVENTS: usize = 20;

/// Long form date/time strings are 10 characters, most ids are 6 or 8
pub const DEFAULT_MAX_STRING_LEN: usize = 10;

/// AMSU-A carries 15 channels; 20 leaves headroom for other microwave sounders
pub const DEFAULT_MAX_CHANNELS: usize = 20;

/// Hard upper bound for level and event ceilings
pub const HARD_MAX_REPLICATIONS: usize = 255;

/// Non-positive message limits mean "convert every matching message"
pub const DEFAULT_MAX_MESSAGES: i64 = -1;

// =============================================================================
// Source Format Markers
// =============================================================================

/// Values at or above this are the BUFR library's "missing" marker
pub const BUFR_MISSING_THRESHOLD: f64 = 1.0e10;

/// Characters packed into one BUFR character value
pub const BUFR_CHARS_PER_VALUE: usize = 8;

/// Program code recorded as a global attribute for prepBUFR input
pub const VIRTMP_PROGRAM: &str = "VIRTMP";

// =============================================================================
// netCDF Fill Values
// =============================================================================

/// Default fill values of the netCDF library, used for cells with no data
pub mod fill {
    pub const CHAR: u8 = 0;
    pub const INT: i32 = -2_147_483_647;
    pub const UINT: u32 = 4_294_967_295;
    pub const FLOAT: f32 = 9.969_209_968_386_869e36;
    pub const DOUBLE: f64 = 9.969_209_968_386_869e36;
}

// =============================================================================
// Output Metadata
// =============================================================================

/// Global and variable attribute names written to the output file
pub mod attrs {
    pub const TIME_UNITS: &str = "time_units";
    pub const REFERENCE_DATE: &str = "reference_date";
    pub const OBSERVATION_TYPE: &str = "observation_type";
    pub const SOURCE_FORMAT: &str = "source_format";
    pub const VIRTMP_CODE: &str = "virtmp_code";
    pub const UNITS: &str = "units";
}

/// Name of the derived observation time variable
pub const TIME_VARIABLE: &str = "time";

/// Canonical analysis hours, plus 24 standing in for 00Z of the next day
pub const SYNOPTIC_HOURS: [u32; 5] = [0, 6, 12, 18, 24];

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit statuses
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const CONFIGURATION: i32 = 2;
    pub const UNKNOWN_DIMENSION: i32 = 3;
}
