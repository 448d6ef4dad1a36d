//! Command-line argument definitions for bufr2nc
//!
//! This module defines the CLI interface using the clap derive API.

use crate::app::models::{ObsKind, SourceFormat};
use crate::config::ConverterConfig;
use crate::constants::{
    DEFAULT_MAX_CHANNELS, DEFAULT_MAX_EVENTS, DEFAULT_MAX_LEVELS, DEFAULT_MAX_MESSAGES,
    DEFAULT_MAX_STRING_LEN,
};
use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the BUFR to netCDF converter
///
/// Reads every message of the selected observation type from a decoded
/// BUFR dump and writes the records as observations of a netCDF file whose
/// layout is fixed by the observation type.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "bufr2nc",
    version,
    about = "Convert BUFR/prepBUFR observations into fixed-schema netCDF files",
    long_about = "Converts the messages of one observation type from a decoded BUFR or prepBUFR \
                  dump into a netCDF file. The input is read twice: once to size the observation \
                  dimension and find the reference time, once to write the data."
)]
pub struct Args {
    /// Observation type to extract (Aircraft, Sondes, Amsua)
    #[arg(value_name = "OBS_TYPE")]
    pub obs_type: String,

    /// Decoded BUFR dump to read
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// netCDF file to create
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Maximum number of matching messages to convert
    ///
    /// Zero or a negative value converts every matching message.
    #[arg(
        short = 'm',
        long = "max-msgs",
        value_name = "COUNT",
        default_value_t = DEFAULT_MAX_MESSAGES,
        allow_negative_numbers = true,
        help = "Maximum number of matching messages to convert (<= 0 for all)"
    )]
    pub max_msgs: i64,

    /// Replace the output file if it already exists
    #[arg(short = 'c', long = "clobber", help = "Overwrite an existing output file")]
    pub clobber: bool,

    /// Treat the input as prepBUFR rather than raw BUFR
    #[arg(short = 'p', long = "prepbufr", help = "Input file is in prepBUFR format")]
    pub prepbufr: bool,

    /// Vertical level ceiling
    #[arg(
        long = "max-levels",
        value_name = "N",
        default_value_t = DEFAULT_MAX_LEVELS,
        help = "Maximum number of levels kept per sounding"
    )]
    pub max_levels: usize,

    /// Event history ceiling
    #[arg(
        long = "max-events",
        value_name = "N",
        default_value_t = DEFAULT_MAX_EVENTS,
        help = "Maximum number of events kept per quantity"
    )]
    pub max_events: usize,

    /// Fixed string width
    #[arg(
        long = "max-string-len",
        value_name = "N",
        default_value_t = DEFAULT_MAX_STRING_LEN,
        help = "Characters kept per string value"
    )]
    pub max_string_len: usize,

    /// Channel ceiling
    #[arg(
        long = "max-channels",
        value_name = "N",
        default_value_t = DEFAULT_MAX_CHANNELS,
        help = "Maximum number of channels kept per report"
    )]
    pub max_channels: usize,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    ///
    /// Only show errors. Overrides verbose settings.
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Disable the progress bar
    #[arg(long = "no-progress", help = "Disable the progress bar")]
    pub no_progress: bool,
}

impl Args {
    /// Get the log level based on verbosity settings
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Source format selected by the prepBUFR flag
    pub fn source_format(&self) -> SourceFormat {
        SourceFormat::from_prepbufr_flag(self.prepbufr)
    }

    /// Parsed observation type, if the name is known
    pub fn obs_kind(&self) -> crate::Result<ObsKind> {
        self.obs_type.parse()
    }

    /// Convert CLI arguments to a converter configuration
    pub fn to_config(&self) -> ConverterConfig {
        let mut config = ConverterConfig::default()
            .with_max_messages(self.max_msgs)
            .with_max_levels(self.max_levels)
            .with_max_events(self.max_events)
            .with_max_string_len(self.max_string_len)
            .with_max_channels(self.max_channels);

        if self.clobber {
            config = config.with_clobber();
        }
        if self.no_progress || self.quiet {
            config = config.without_progress();
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("bufr2nc").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_positionals_and_defaults() {
        let args = parse(&["Aircraft", "in.json", "out.nc"]);
        assert_eq!(args.obs_type, "Aircraft");
        assert_eq!(args.input, PathBuf::from("in.json"));
        assert_eq!(args.output, PathBuf::from("out.nc"));
        assert_eq!(args.max_msgs, -1);
        assert!(!args.clobber);
        assert_eq!(args.source_format(), SourceFormat::Bufr);
        assert_eq!(args.get_log_level(), "warn");

        let config = args.to_config();
        assert_eq!(config.message_limit(), None);
        assert_eq!(config.ceilings.max_levels, 255);
        assert!(config.show_progress);
    }

    #[test]
    fn test_flags() {
        let args = parse(&[
            "-p", "-c", "-m", "3", "--max-events", "5", "-vv", "Sondes", "in.json", "out.nc",
        ]);
        assert_eq!(args.source_format(), SourceFormat::PrepBufr);
        assert_eq!(args.obs_kind().unwrap(), ObsKind::Sondes);
        assert_eq!(args.get_log_level(), "debug");

        let config = args.to_config();
        assert!(config.clobber);
        assert_eq!(config.message_limit(), Some(3));
        assert_eq!(config.ceilings.max_events, 5);
    }

    #[test]
    fn test_negative_message_limit() {
        let args = parse(&["-m", "-5", "Aircraft", "in.json", "out.nc"]);
        assert_eq!(args.max_msgs, -5);
        assert_eq!(args.to_config().message_limit(), None);
    }

    #[test]
    fn test_quiet_disables_progress() {
        let args = parse(&["-q", "Amsua", "in.json", "out.nc"]);
        assert_eq!(args.get_log_level(), "error");
        assert!(!args.to_config().show_progress);
    }

    #[test]
    fn test_missing_positionals_rejected() {
        assert!(Args::try_parse_from(["bufr2nc", "Aircraft"]).is_err());
        assert!(Args::try_parse_from(["bufr2nc", "-q", "-v", "Aircraft", "a", "b"]).is_err());
    }
}
