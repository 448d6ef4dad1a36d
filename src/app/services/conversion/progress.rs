//! Progress reporting for the conversion pass

use crate::app::models::ConversionStats;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

/// Progress bar over the expected observation count
pub struct ProgressReporter {
    progress_bar: Option<ProgressBar>,
}

impl ProgressReporter {
    /// A reporter that shows nothing
    pub fn hidden() -> Self {
        Self { progress_bar: None }
    }

    pub fn new(total_observations: usize, enabled: bool) -> Self {
        if !enabled {
            return Self::hidden();
        }

        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} observations ({percent}%) | {msg}",
        )
        .map(|style| style.progress_chars("█▉▊▋▌▍▎▏  "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());

        let pb = ProgressBar::new(total_observations as u64);
        pb.set_style(style);
        pb.set_message("Converting");
        debug!(
            "Progress bar initialized for {} observations",
            total_observations
        );

        Self {
            progress_bar: Some(pb),
        }
    }

    pub fn increment(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(1);
        }
    }

    pub fn finish(&self, stats: &ConversionStats) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_with_message(format!(
                "Completed: {} observations from {} messages",
                stats.observations_written, stats.selected_messages
            ));
        }
    }

    /// Clear the bar after a failure
    pub fn abandon(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.abandon_with_message("Conversion failed");
        }
    }
}
