//! Configuration management and validation.
//!
//! The fixed-size dimension ceilings are threaded through descriptor
//! construction as an explicit value, so a run (or a unit test) can shrink
//! them without touching module-level constants.

use crate::constants::{
    DEFAULT_MAX_CHANNELS, DEFAULT_MAX_EVENTS, DEFAULT_MAX_LEVELS, DEFAULT_MAX_MESSAGES,
    DEFAULT_MAX_STRING_LEN, HARD_MAX_REPLICATIONS, dims,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sizes for every dimension except the observation count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionCeilings {
    /// Vertical levels per sounding
    pub max_levels: usize,

    /// Revision history entries kept per quantity
    pub max_events: usize,

    /// Characters per fixed-width string
    pub max_string_len: usize,

    /// Channels per replicated radiance group
    pub max_channels: usize,
}

impl Default for DimensionCeilings {
    fn default() -> Self {
        Self {
            max_levels: DEFAULT_MAX_LEVELS,
            max_events: DEFAULT_MAX_EVENTS,
            max_string_len: DEFAULT_MAX_STRING_LEN,
            max_channels: DEFAULT_MAX_CHANNELS,
        }
    }
}

impl DimensionCeilings {
    /// Look up the size of a fixed dimension
    ///
    /// Returns `None` for the observation-count dimension, whose size is only
    /// known after the pre-scan, and for names outside the lookup table.
    pub fn fixed_size(&self, name: &str) -> Option<usize> {
        match name {
            dims::NLEVS => Some(self.max_levels),
            dims::NEVENTS => Some(self.max_events),
            dims::NSTRING => Some(self.max_string_len),
            dims::NCHANS => Some(self.max_channels),
            _ => None,
        }
    }

    /// Resolve a dimension size, with the observation count supplied by the caller
    pub fn resolve(&self, name: &str, observation_count: usize) -> Option<usize> {
        if name == dims::NOBS {
            Some(observation_count)
        } else {
            self.fixed_size(name)
        }
    }
}

/// Per-run converter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Dimension ceilings used when building descriptors
    pub ceilings: DimensionCeilings,

    /// Maximum number of matching messages to convert (non-positive = all)
    pub max_messages: i64,

    /// Allow an existing output file to be replaced
    pub clobber: bool,

    /// Show a progress bar during the conversion pass
    pub show_progress: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ceilings: DimensionCeilings::default(),
            max_messages: DEFAULT_MAX_MESSAGES,
            clobber: false,
            show_progress: true,
        }
    }
}

impl ConverterConfig {
    /// Limit the number of selected messages
    pub fn with_max_messages(mut self, max_messages: i64) -> Self {
        self.max_messages = max_messages;
        self
    }

    /// Set the level ceiling
    pub fn with_max_levels(mut self, max_levels: usize) -> Self {
        self.ceilings.max_levels = max_levels;
        self
    }

    /// Set the event ceiling
    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.ceilings.max_events = max_events;
        self
    }

    /// Set the string width
    pub fn with_max_string_len(mut self, max_string_len: usize) -> Self {
        self.ceilings.max_string_len = max_string_len;
        self
    }

    /// Set the channel ceiling
    pub fn with_max_channels(mut self, max_channels: usize) -> Self {
        self.ceilings.max_channels = max_channels;
        self
    }

    /// Allow overwriting an existing output file
    pub fn with_clobber(mut self) -> Self {
        self.clobber = true;
        self
    }

    /// Disable the progress bar
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Message limit as an option, `None` meaning unlimited
    pub fn message_limit(&self) -> Option<usize> {
        usize::try_from(self.max_messages).ok().filter(|&n| n > 0)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let c = &self.ceilings;
        for (name, value) in [
            ("max_levels", c.max_levels),
            ("max_events", c.max_events),
            ("max_string_len", c.max_string_len),
            ("max_channels", c.max_channels),
        ] {
            if value == 0 {
                return Err(Error::configuration(format!("{name} must be at least 1")));
            }
        }

        if c.max_levels > HARD_MAX_REPLICATIONS || c.max_events > HARD_MAX_REPLICATIONS {
            return Err(Error::configuration(format!(
                "level and event ceilings cannot exceed {HARD_MAX_REPLICATIONS} (got {} levels, {} events)",
                c.max_levels, c.max_events
            )));
        }

        debug!("Validated configuration: {:?}", self);
        Ok(())
    }
}
