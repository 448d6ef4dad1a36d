//! In-memory message source
//!
//! Holds fabricated messages so the scan and conversion passes can be driven
//! without a decoded file on disk.

use super::message_source::MessageSource;
use crate::app::models::{FieldData, FieldSelection};
use crate::{Error, Result};
use std::collections::HashMap;

/// One record: field data keyed by mnemonic and selection
#[derive(Debug, Clone, Default)]
pub struct MemoryRecord {
    fields: HashMap<(String, FieldSelection), FieldData>,
}

impl MemoryRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(
        mut self,
        label: impl Into<String>,
        selection: FieldSelection,
        data: FieldData,
    ) -> Self {
        self.fields.insert((label.into(), selection), data);
        self
    }

    pub fn with_value(self, label: impl Into<String>, data: FieldData) -> Self {
        self.with_field(label, FieldSelection::Value, data)
    }

    pub fn with_events(self, label: impl Into<String>, data: FieldData) -> Self {
        self.with_field(label, FieldSelection::Events, data)
    }

    pub fn with_replication(self, label: impl Into<String>, data: FieldData) -> Self {
        self.with_field(label, FieldSelection::Replication, data)
    }

    pub fn get(&self, label: &str, selection: FieldSelection) -> Option<&FieldData> {
        self.fields.get(&(label.to_string(), selection))
    }
}

/// One message with its records
#[derive(Debug, Clone)]
pub struct MemoryMessage {
    pub message_type: String,
    pub timestamp: i64,
    pub records: Vec<MemoryRecord>,
}

impl MemoryMessage {
    pub fn new(message_type: impl Into<String>, timestamp: i64) -> Self {
        Self {
            message_type: message_type.into(),
            timestamp,
            records: Vec::new(),
        }
    }

    pub fn with_record(mut self, record: MemoryRecord) -> Self {
        self.records.push(record);
        self
    }

    pub fn with_records(mut self, records: impl IntoIterator<Item = MemoryRecord>) -> Self {
        self.records.extend(records);
        self
    }

    /// Add `count` records with no fields, for scan-only tests
    pub fn with_empty_records(self, count: usize) -> Self {
        self.with_records(std::iter::repeat_with(MemoryRecord::new).take(count))
    }
}

/// Message source over fabricated messages
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    messages: Vec<MemoryMessage>,
    program_codes: HashMap<String, i64>,
    message_index: Option<usize>,
    record_index: Option<usize>,
    rewinds: usize,
}

impl MemorySource {
    pub fn new(messages: Vec<MemoryMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn with_program_code(mut self, mnemonic: impl Into<String>, code: i64) -> Self {
        self.program_codes.insert(mnemonic.into(), code);
        self
    }

    /// Times the source has been rewound
    pub fn rewind_count(&self) -> usize {
        self.rewinds
    }

    /// Mutable access to the messages, for simulating a stream that changes between passes
    pub fn messages_mut(&mut self) -> &mut Vec<MemoryMessage> {
        &mut self.messages
    }

    fn current_message(&self) -> Option<&MemoryMessage> {
        self.message_index.and_then(|i| self.messages.get(i))
    }

    fn current_record(&self) -> Option<&MemoryRecord> {
        let message = self.current_message()?;
        self.record_index.and_then(|i| message.records.get(i))
    }
}

impl MessageSource for MemorySource {
    fn advance(&mut self) -> Result<bool> {
        let next = self.message_index.map_or(0, |i| i + 1);
        self.record_index = None;
        if next < self.messages.len() {
            self.message_index = Some(next);
            Ok(true)
        } else {
            self.message_index = Some(self.messages.len());
            Ok(false)
        }
    }

    fn message_type(&self) -> &str {
        self.current_message()
            .map(|m| m.message_type.as_str())
            .unwrap_or("")
    }

    fn message_timestamp(&self) -> i64 {
        self.current_message().map_or(0, |m| m.timestamp)
    }

    fn message_record_count(&self) -> usize {
        self.current_message().map_or(0, |m| m.records.len())
    }

    fn load_next_record(&mut self) -> Result<bool> {
        let count = self.message_record_count();
        let next = self.record_index.map_or(0, |i| i + 1);
        if next < count {
            self.record_index = Some(next);
            Ok(true)
        } else {
            self.record_index = Some(count);
            Ok(false)
        }
    }

    fn read_field(&self, label: &str, selection: FieldSelection) -> Result<Option<FieldData>> {
        let record = self.current_record().ok_or_else(|| {
            Error::consistency(format!("read of '{label}' with no record loaded"))
        })?;
        Ok(record.get(label, selection).cloned())
    }

    fn program_code(&self, mnemonic: &str) -> Option<i64> {
        self.program_codes.get(mnemonic).copied()
    }

    fn rewind(&mut self) -> Result<()> {
        self.message_index = None;
        self.record_index = None;
        self.rewinds += 1;
        Ok(())
    }
}
