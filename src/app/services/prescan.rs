//! First pass over the input stream
//!
//! Counts the messages and records a conversion will select and finds the
//! earliest selected message timestamp. Only the message header is looked
//! at, so the pass stays cheap next to the conversion pass. The stream is
//! rewound before returning.

use crate::Result;
use crate::app::adapters::message_source::MessageSource;
use crate::app::models::ScanSummary;
use crate::app::services::schema::MessageMatcher;
use tracing::{debug, info};

/// Tracks message selection with a limit on selected messages
///
/// Both passes select through this type so they cannot disagree on which
/// messages count.
#[derive(Debug, Clone, Copy)]
pub struct Selection {
    limit: Option<usize>,
    selected: usize,
    matching: usize,
}

impl Selection {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            selected: 0,
            matching: 0,
        }
    }

    /// Decide whether the message with this type label is selected
    pub fn offer(&mut self, matcher: &MessageMatcher, message_type: &str) -> bool {
        if !matcher.is_match(message_type) {
            return false;
        }
        self.matching += 1;
        if self.limit_reached() {
            return false;
        }
        self.selected += 1;
        true
    }

    pub fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.selected >= limit)
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn matching(&self) -> usize {
        self.matching
    }
}

/// Walk every message once and summarise the selection
///
/// `limit` caps the number of selected messages (`None` for all). Matching
/// messages past the limit still count towards `matching_messages`.
pub fn prescan<S: MessageSource + ?Sized>(
    source: &mut S,
    matcher: &MessageMatcher,
    limit: Option<usize>,
) -> Result<ScanSummary> {
    let mut selection = Selection::new(limit);
    let mut record_count = 0usize;
    let mut earliest: Option<i64> = None;

    while source.advance()? {
        if !selection.offer(matcher, source.message_type()) {
            continue;
        }
        record_count += source.message_record_count();
        let timestamp = source.message_timestamp();
        earliest = Some(earliest.map_or(timestamp, |e| e.min(timestamp)));
    }

    source.rewind()?;

    let summary = ScanSummary {
        record_count,
        selected_messages: selection.selected(),
        matching_messages: selection.matching(),
        earliest_timestamp: earliest,
    };

    info!(
        "Pre-scan: {} of {} matching messages selected, {} records",
        summary.selected_messages, summary.matching_messages, summary.record_count
    );
    debug!("Earliest selected timestamp: {:?}", summary.earliest_timestamp);

    Ok(summary)
}
