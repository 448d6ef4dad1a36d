//! Message source over line-delimited JSON dumps of decoded BUFR files
//!
//! Each non-blank line is one decoded message:
//!
//! ```json
//! {"type": "ADPUPA", "date": 2021060100, "records": [
//!   {"fields": {"SID": "72518", "POB": [1000.0, 850.0]},
//!    "events": {"TOB": [[21.5, 21.4], [14.0, 13.9]]},
//!    "replications": {}, "sequences": {}}
//! ]}
//! ```
//!
//! A line of the form `{"program_codes": {"VIRTMP": 8}}` records program
//! codes instead of a message and may appear anywhere in the stream.
//!
//! Field values are numbers, strings, `null` or rectangular nested arrays of
//! those. `null` and numbers at or above the BUFR missing marker are missing
//! values. Only the message header is decoded while scanning; records are
//! decoded when the first record of a message is loaded.

use super::message_source::MessageSource;
use crate::app::models::{FieldData, FieldSelection, SourceValue};
use crate::constants::BUFR_MISSING_THRESHOLD;
use crate::{Error, Result};
use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct MessageHeader {
    #[serde(rename = "type")]
    message_type: String,
    date: i64,
    #[serde(default)]
    records: Vec<IgnoredAny>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DumpLine {
    ProgramCodes { program_codes: HashMap<String, i64> },
    Message(MessageHeader),
}

#[derive(Debug, Default, Deserialize)]
struct JsonRecord {
    #[serde(default)]
    fields: HashMap<String, Value>,
    #[serde(default)]
    events: HashMap<String, Value>,
    #[serde(default)]
    replications: HashMap<String, Value>,
    #[serde(default)]
    sequences: HashMap<String, Value>,
}

impl JsonRecord {
    fn get(&self, label: &str, selection: FieldSelection) -> Option<&Value> {
        let map = match selection {
            FieldSelection::Value => &self.fields,
            FieldSelection::Events => &self.events,
            FieldSelection::Replication => &self.replications,
            FieldSelection::Sequence => &self.sequences,
        };
        map.get(label)
    }
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    records: Vec<JsonRecord>,
}

#[derive(Debug)]
struct CurrentMessage {
    line: String,
    line_number: usize,
    message_type: String,
    timestamp: i64,
    record_count: usize,
    records: Option<Vec<JsonRecord>>,
    record_index: Option<usize>,
}

/// Message source reading a JSON dump file
#[derive(Debug)]
pub struct JsonDumpSource {
    path: PathBuf,
    reader: BufReader<File>,
    line_number: usize,
    current: Option<CurrentMessage>,
    program_codes: HashMap<String, i64>,
}

impl JsonDumpSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = Self::open_reader(&path)?;
        debug!("Opened message dump {}", path.display());
        Ok(Self {
            path,
            reader,
            line_number: 0,
            current: None,
            program_codes: HashMap::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_reader(path: &Path) -> Result<BufReader<File>> {
        let file = File::open(path)
            .map_err(|e| Error::io(format!("Failed to open input {}", path.display()), e))?;
        Ok(BufReader::new(file))
    }

    fn decoding_error(
        &self,
        line: usize,
        message: impl Into<String>,
        source: Option<serde_json::Error>,
    ) -> Error {
        Error::message_decoding(self.path.display().to_string(), line, message, source)
    }
}

impl MessageSource for JsonDumpSource {
    fn advance(&mut self) -> Result<bool> {
        self.current = None;
        loop {
            let mut line = String::new();
            let read = self.reader.read_line(&mut line).map_err(|e| {
                Error::io(format!("Failed to read input {}", self.path.display()), e)
            })?;
            if read == 0 {
                return Ok(false);
            }
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }

            let parsed: DumpLine = serde_json::from_str(&line).map_err(|e| {
                self.decoding_error(
                    self.line_number,
                    "line is neither a message nor a program code table",
                    Some(e),
                )
            })?;

            match parsed {
                DumpLine::ProgramCodes { program_codes } => {
                    debug!("Read {} program codes", program_codes.len());
                    self.program_codes.extend(program_codes);
                }
                DumpLine::Message(header) => {
                    self.current = Some(CurrentMessage {
                        line,
                        line_number: self.line_number,
                        message_type: header.message_type,
                        timestamp: header.date,
                        record_count: header.records.len(),
                        records: None,
                        record_index: None,
                    });
                    return Ok(true);
                }
            }
        }
    }

    fn message_type(&self) -> &str {
        self.current
            .as_ref()
            .map(|m| m.message_type.as_str())
            .unwrap_or("")
    }

    fn message_timestamp(&self) -> i64 {
        self.current.as_ref().map_or(0, |m| m.timestamp)
    }

    fn message_record_count(&self) -> usize {
        self.current.as_ref().map_or(0, |m| m.record_count)
    }

    fn load_next_record(&mut self) -> Result<bool> {
        let Some(message) = self.current.as_mut() else {
            return Ok(false);
        };

        if message.records.is_none() {
            let body: MessageBody = serde_json::from_str(&message.line).map_err(|e| {
                Error::message_decoding(
                    self.path.display().to_string(),
                    message.line_number,
                    "malformed records",
                    Some(e),
                )
            })?;
            message.records = Some(body.records);
        }

        let count = message.records.as_ref().map_or(0, Vec::len);
        let next = message.record_index.map_or(0, |i| i + 1);
        if next < count {
            message.record_index = Some(next);
            Ok(true)
        } else {
            message.record_index = Some(count);
            Ok(false)
        }
    }

    fn read_field(&self, label: &str, selection: FieldSelection) -> Result<Option<FieldData>> {
        let message = self.current.as_ref();
        let record = message.and_then(|m| {
            let index = m.record_index?;
            m.records.as_ref()?.get(index)
        });
        let (Some(message), Some(record)) = (message, record) else {
            return Err(Error::consistency(format!(
                "read of '{label}' with no record loaded"
            )));
        };

        record
            .get(label, selection)
            .map(|value| {
                field_from_json(value).map_err(|reason| {
                    self.decoding_error(
                        message.line_number,
                        format!("field '{label}': {reason}"),
                        None,
                    )
                })
            })
            .transpose()
    }

    fn program_code(&self, mnemonic: &str) -> Option<i64> {
        self.program_codes.get(mnemonic).copied()
    }

    fn rewind(&mut self) -> Result<()> {
        self.reader = Self::open_reader(&self.path)?;
        self.line_number = 0;
        self.current = None;
        debug!("Reopened message dump {}", self.path.display());
        Ok(())
    }
}

/// Convert a JSON value into shaped field data
fn field_from_json(value: &Value) -> std::result::Result<FieldData, String> {
    let mut shape = Vec::new();
    let mut probe = value;
    while let Value::Array(items) = probe {
        shape.push(items.len());
        match items.first() {
            Some(first) => probe = first,
            None => break,
        }
    }

    let mut values = Vec::with_capacity(shape.iter().product());
    flatten(value, &shape, 0, &mut values)?;
    FieldData::new(shape, values).map_err(|e| e.to_string())
}

fn flatten(
    value: &Value,
    shape: &[usize],
    depth: usize,
    out: &mut Vec<Option<SourceValue>>,
) -> std::result::Result<(), String> {
    match value {
        Value::Array(items) => {
            if shape.get(depth) != Some(&items.len()) {
                return Err("ragged nested array".to_string());
            }
            for item in items {
                flatten(item, shape, depth + 1, out)?;
            }
            Ok(())
        }
        leaf => {
            if depth != shape.len() {
                return Err("ragged nested array".to_string());
            }
            out.push(leaf_value(leaf)?);
            Ok(())
        }
    }
}

fn leaf_value(value: &Value) -> std::result::Result<Option<SourceValue>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => {
            let x = n
                .as_f64()
                .ok_or_else(|| format!("number {n} is not representable"))?;
            Ok((x < BUFR_MISSING_THRESHOLD).then_some(SourceValue::Number(x)))
        }
        Value::String(s) => Ok(Some(SourceValue::Text(s.clone()))),
        other => Err(format!("unsupported value {other}")),
    }
}
