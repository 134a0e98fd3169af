//! Streaming Support
//!
//! Event types for streamed chat completions and the per-line framing rules
//! of the `data: <json>` protocol.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::completion::{FunctionCall, Logprobs, Message, Role, ToolCall, Usage};
use super::null_as_default;
use crate::error::{DeepseekError, Result};

/// Prefix carried by every event line
pub const DATA_PREFIX: &str = "data: ";

/// Line that terminates the stream
pub const DONE_SENTINEL: &str = "data: [DONE]";

/// A streaming chunk from the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub object: String,

    /// Creation timestamp, seconds since the epoch
    #[serde(default)]
    pub created: i64,

    #[serde(default)]
    pub model: String,

    #[serde(default)]
    pub choices: Vec<StreamChoice>,

    /// Cumulative usage. The server only fills this in on the last chunk;
    /// every other chunk decodes to zeroes.
    #[serde(default, deserialize_with = "null_as_default")]
    pub usage: Usage,
}

impl StreamChunk {
    /// Content delta of the first choice
    pub fn content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.delta.content.as_str())
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.created, 0)
    }
}

/// A choice in a streaming chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub index: u32,

    #[serde(default)]
    pub delta: StreamDelta,

    /// Set in the final chunk of this choice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<Logprobs>,
}

/// Delta content in a streaming chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamDelta {
    /// Role (usually only in first chunk)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,

    /// Reasoning delta from the reasoner model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// Fragment of a tool call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Index in the tool_calls array
    #[serde(default)]
    pub index: u32,

    /// Only present in the first fragment of a call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionDelta>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

/// Outcome of handling one line of the stream body
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine<T> {
    /// A decoded event
    Event(T),

    /// The `data: [DONE]` sentinel
    Done,

    /// Blank keep-alive, comment or any other non-data line
    Ignored,
}

/// Classify and decode one line of a stream body.
///
/// The line is trimmed first. A payload after `data: ` that fails to parse is
/// an error carrying the raw payload.
pub fn parse_sse_line<T: DeserializeOwned>(line: &str) -> Result<SseLine<T>> {
    let line = line.trim();
    if line == DONE_SENTINEL {
        return Ok(SseLine::Done);
    }

    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(SseLine::Ignored);
    };

    serde_json::from_str(payload)
        .map(SseLine::Event)
        .map_err(|e| DeepseekError::decode(format!("invalid stream event: {}", e), payload))
}

/// Folds streamed chunks back into a complete assistant message
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    pub content: String,

    pub reasoning_content: String,

    /// Tool calls keyed by the index the server assigned them
    pub tool_calls: BTreeMap<u32, ToolCallAccumulator>,

    /// Finish reason from the last chunk that carried one
    pub finish_reason: Option<String>,

    pub id: Option<String>,

    pub model: Option<String>,

    /// Last non-zero usage record seen
    pub usage: Usage,
}

/// Accumulator for a single tool call
#[derive(Debug, Default, Clone)]
pub struct ToolCallAccumulator {
    pub id: String,
    pub call_type: String,
    pub name: String,
    pub arguments: String,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a streaming chunk
    pub fn process_chunk(&mut self, chunk: &StreamChunk) {
        if self.id.is_none() && !chunk.id.is_empty() {
            self.id = Some(chunk.id.clone());
            self.model = Some(chunk.model.clone());
        }

        if chunk.usage != Usage::default() {
            self.usage = chunk.usage;
        }

        for choice in &chunk.choices {
            self.content.push_str(&choice.delta.content);

            if let Some(reasoning) = &choice.delta.reasoning_content {
                self.reasoning_content.push_str(reasoning);
            }

            for tc_delta in choice.delta.tool_calls.iter().flatten() {
                let tc = self.tool_calls.entry(tc_delta.index).or_default();

                if let Some(id) = &tc_delta.id {
                    tc.id = id.clone();
                }
                if let Some(call_type) = &tc_delta.call_type {
                    tc.call_type = call_type.clone();
                }
                if let Some(func) = &tc_delta.function {
                    if let Some(name) = &func.name {
                        tc.name.push_str(name);
                    }
                    if let Some(args) = &func.arguments {
                        tc.arguments.push_str(args);
                    }
                }
            }

            if let Some(reason) = &choice.finish_reason {
                self.finish_reason = Some(reason.clone());
            }
        }
    }

    /// Convert into the assistant message to append to the conversation
    pub fn into_message(self) -> Message {
        let tool_calls = (!self.tool_calls.is_empty()).then(|| {
            self.tool_calls
                .into_iter()
                .map(|(index, tc)| ToolCall {
                    index: Some(index),
                    id: tc.id,
                    call_type: if tc.call_type.is_empty() {
                        "function".to_string()
                    } else {
                        tc.call_type
                    },
                    function: FunctionCall {
                        name: tc.name,
                        arguments: tc.arguments,
                    },
                })
                .collect()
        });

        Message {
            role: Role::Assistant,
            content: self.content,
            reasoning_content: (!self.reasoning_content.is_empty())
                .then_some(self.reasoning_content),
            tool_calls,
            ..Default::default()
        }
    }
}
