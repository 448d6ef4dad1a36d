//! Input stream interface
//!
//! A message source walks a decoded BUFR stream message by message and, inside
//! a message, record by record. The cursor model mirrors the BUFR library
//! interface: `advance` moves to the next message, `load_next_record` moves to
//! the next subset of the current message, and field reads address the
//! currently loaded record.

use crate::Result;
use crate::app::models::{FieldData, FieldSelection};

pub trait MessageSource {
    /// Move to the next message; `false` at end of stream
    fn advance(&mut self) -> Result<bool>;

    /// Type label of the current message (empty before the first `advance`)
    fn message_type(&self) -> &str;

    /// Timestamp of the current message as YYYYMMDDHH
    fn message_timestamp(&self) -> i64;

    /// Number of records (subsets) in the current message
    fn message_record_count(&self) -> usize;

    /// Load the next record of the current message; `false` at end of message
    fn load_next_record(&mut self) -> Result<bool>;

    /// Read a field from the loaded record
    ///
    /// `Ok(None)` means the label is not part of the record at all. A label
    /// that is present but carries no data comes back as field data with
    /// missing values.
    fn read_field(&self, label: &str, selection: FieldSelection) -> Result<Option<FieldData>>;

    /// Program code recorded by the pre-processing system, if known
    fn program_code(&self, mnemonic: &str) -> Option<i64>;

    /// Reposition before the first message
    fn rewind(&mut self) -> Result<()>;
}
