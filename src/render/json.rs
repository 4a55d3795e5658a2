//! JSON rendering: the middle document and the content list.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::MiddleDocument;

use super::ContentRecord;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

fn serialize<T: Serialize + ?Sized>(value: &T, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value),
        JsonFormat::Compact => serde_json::to_string(value),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

/// Serialize the full middle document.
pub fn to_middle_json(doc: &MiddleDocument, format: JsonFormat) -> Result<String> {
    serialize(doc, format)
}

/// Read a middle document back from its JSON form.
pub fn from_middle_json(json: &str) -> Result<MiddleDocument> {
    Ok(serde_json::from_str(json)?)
}

/// Serialize a content list.
pub fn to_content_list_json(records: &[ContentRecord], format: JsonFormat) -> Result<String> {
    serialize(records, format)
}
