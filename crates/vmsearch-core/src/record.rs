//! Strict decoder for one line of a newline-delimited JSON corpus.
//!
//! Decoding is a pure function: a line either becomes a `Document` or a
//! `RejectReason` that explains why it never reached the engine.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::{Document, REQUIRED_FIELDS};

/// Why a line did not end up in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RejectReason {
    /// Not a single JSON object.
    Malformed(String),
    /// Object lacks one or more of the seven required fields.
    MissingFields(Vec<String>),
    /// All fields present but one has the wrong type.
    InvalidField(String),
    /// The document's `ID` already exists in the collection or earlier in the run.
    Conflict(String),
    /// Any other rejection by the engine.
    Service(String),
}

impl RejectReason {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(detail) => write!(f, "malformed record: {}", detail),
            Self::MissingFields(fields) => write!(f, "Missing required fields: {}", fields.join(", ")),
            Self::InvalidField(detail) => write!(f, "invalid field: {}", detail),
            Self::Conflict(detail) => write!(f, "duplicate ID: {}", detail),
            Self::Service(detail) => f.write_str(detail),
        }
    }
}

/// Decode one non-blank line.
pub fn decode_line(line: &str) -> Result<Document, RejectReason> {
    let value: Value = serde_json::from_str(line).map_err(|e| RejectReason::Malformed(e.to_string()))?;
    let Value::Object(object) = value else {
        return Err(RejectReason::Malformed(format!("expected a JSON object, found {}", json_kind(&value))));
    };
    let missing = missing_fields(&object);
    if !missing.is_empty() {
        return Err(RejectReason::MissingFields(missing));
    }
    let document: Document =
        serde_json::from_value(Value::Object(object)).map_err(|e| RejectReason::InvalidField(e.to_string()))?;
    // the schema stores `ID` as int32
    if i32::try_from(document.id).is_err() {
        return Err(RejectReason::InvalidField(format!("ID {} is out of int32 range", document.id)));
    }
    Ok(document)
}

/// Required fields absent from `object`, in schema order.
pub fn missing_fields(object: &Map<String, Value>) -> Vec<String> {
    REQUIRED_FIELDS
        .iter()
        .filter(|field| !object.contains_key(**field))
        .map(|field| (*field).to_string())
        .collect()
}

/// First `max_chars` characters of `line`, with `...` appended when cut.
pub fn preview(line: &str, max_chars: usize) -> String {
    match line.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &line[..cut]),
        None => line.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
