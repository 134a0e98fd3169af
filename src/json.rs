//! JSON Output Extraction
//!
//! Models asked for JSON do not always return bare JSON: the document may be
//! wrapped in a fenced code block or surrounded by prose. [`JsonExtractor`]
//! finds the first valid document and deserializes it.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::ChatCompletionResponse;
use crate::error::{DeepseekError, Result};

/// Pulls a JSON document out of completion content
#[derive(Debug, Clone, Default)]
pub struct JsonExtractor {
    schema: Option<Value>,
}

impl JsonExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the document's top-level type against `schema["type"]`
    /// (`"object"` or `"array"`) before deserializing
    pub fn with_schema(schema: Value) -> Self {
        Self {
            schema: Some(schema),
        }
    }

    /// Extract from the first choice of a response
    pub fn extract<T: DeserializeOwned>(&self, response: &ChatCompletionResponse) -> Result<T> {
        let content = response
            .content()
            .ok_or_else(|| DeepseekError::decode("no choices in response", ""))?;
        self.extract_from_str(content)
    }

    /// Extract from raw completion text
    pub fn extract_from_str<T: DeserializeOwned>(&self, content: &str) -> Result<T> {
        if content.trim().is_empty() {
            return Err(DeepseekError::decode("empty content in response", content));
        }

        let value = find_json(content)
            .ok_or_else(|| DeepseekError::decode("no valid JSON content found", content))?;

        if let Some(schema) = &self.schema {
            check_type(schema, &value).map_err(|e| DeepseekError::decode(e, value.to_string()))?;
        }

        let raw = value.to_string();
        serde_json::from_value(value).map_err(|e| DeepseekError::decode(e, raw))
    }
}

fn check_type(schema: &Value, value: &Value) -> std::result::Result<(), String> {
    let ok = match schema.get("type").and_then(Value::as_str) {
        Some("object") => value.is_object(),
        Some("array") => value.is_array(),
        _ => true,
    };

    if ok {
        Ok(())
    } else {
        Err(format!(
            "JSON does not match schema type {}",
            schema["type"]
        ))
    }
}

fn parse(candidate: &str) -> Option<Value> {
    serde_json::from_str(candidate.trim()).ok()
}

/// Whole content, then fenced blocks, then the first balanced object or array
fn find_json(content: &str) -> Option<Value> {
    let content = content.trim();

    parse(content)
        .or_else(|| fenced_block(content, "```json"))
        .or_else(|| fenced_block(content, "```"))
        .or_else(|| balanced(content, '{', '}'))
        .or_else(|| balanced(content, '[', ']'))
}

fn fenced_block(content: &str, open: &str) -> Option<Value> {
    let start = content.find(open)? + open.len();
    let rest = &content[start..];
    let end = rest.find("```")?;
    parse(&rest[..end])
}

/// Span from the first `open` to its matching `close`, skipping delimiters
/// inside string literals
fn balanced(content: &str, open: char, close: char) -> Option<Value> {
    let start = content.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in content[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return parse(&content[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}
