//! Typed attribute encoding used by tracking-table change records.
//!
//! Change-data-capture events carry every attribute as a single-key object
//! whose key names the type, e.g. `{"S": "abc"}` or
//! `{"L": [{"M": {...}}]}`. [`AttributeValue`] models that encoding with an
//! externally-tagged serde enum, and [`StreamEvent`] models the envelope the
//! event source delivers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// An attribute map, as found in `NewImage` / `OldImage`.
pub type Item = HashMap<String, AttributeValue>;

/// One typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    #[serde(rename = "S")]
    S(String),
    /// Numbers travel as strings to preserve precision.
    #[serde(rename = "N")]
    N(String),
    /// Binary, base64-encoded on the wire.
    #[serde(rename = "B")]
    B(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
    #[serde(rename = "SS")]
    Ss(Vec<String>),
    #[serde(rename = "NS")]
    Ns(Vec<String>),
    #[serde(rename = "BS")]
    Bs(Vec<String>),
    #[serde(rename = "L")]
    L(Vec<AttributeValue>),
    #[serde(rename = "M")]
    M(HashMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Short type tag used in error messages.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::B(_) => "B",
            Self::Bool(_) => "BOOL",
            Self::Null(_) => "NULL",
            Self::Ss(_) => "SS",
            Self::Ns(_) => "NS",
            Self::Bs(_) => "BS",
            Self::L(_) => "L",
            Self::M(_) => "M",
        }
    }
}

// ---------------------------------------------------------------------------
// Typed field access
// ---------------------------------------------------------------------------

/// Read a required string attribute from `item`.
///
/// `path` is the dotted location reported in errors, e.g. `Images[0].ImageName`.
pub fn require_string<'a>(item: &'a Item, field: &str, path: &str) -> Result<&'a str, CoreError> {
    match item.get(field) {
        Some(AttributeValue::S(s)) => Ok(s),
        Some(other) => Err(CoreError::Validation(format!(
            "'{path}' must be a string attribute, got {}",
            other.type_tag()
        ))),
        None => Err(CoreError::MissingField(path.to_string())),
    }
}

/// Read a required list attribute from `item`.
pub fn require_list<'a>(
    item: &'a Item,
    field: &str,
    path: &str,
) -> Result<&'a [AttributeValue], CoreError> {
    match item.get(field) {
        Some(AttributeValue::L(values)) => Ok(values),
        Some(other) => Err(CoreError::Validation(format!(
            "'{path}' must be a list attribute, got {}",
            other.type_tag()
        ))),
        None => Err(CoreError::MissingField(path.to_string())),
    }
}

/// Interpret a list element as a map attribute.
pub fn expect_map<'a>(value: &'a AttributeValue, path: &str) -> Result<&'a Item, CoreError> {
    match value {
        AttributeValue::M(map) => Ok(map),
        other => Err(CoreError::Validation(format!(
            "'{path}' must be a map attribute, got {}",
            other.type_tag()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Stream envelope
// ---------------------------------------------------------------------------

/// A batch of change records as delivered by the table's change stream.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<StreamRecord>,
}

/// One row-level change.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamRecord {
    /// `INSERT`, `MODIFY` or `REMOVE`.
    #[serde(rename = "eventName", default)]
    pub event_name: Option<String>,
    pub dynamodb: StreamRecordBody,
}

/// The `dynamodb` section of a change record.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamRecordBody {
    #[serde(rename = "NewImage", default)]
    pub new_image: Option<Item>,
}

impl StreamEvent {
    /// Parse a raw event payload.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, CoreError> {
        Ok(Self::deserialize(value)?)
    }
}
