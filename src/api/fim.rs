//! Fill-In-the-Middle Completion API
//!
//! Types for `POST completions`, the prompt/suffix completion endpoint served
//! from the beta base URL.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::completion::{StreamOptions, Usage};
use super::null_as_default;

/// FIM completion request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FimCompletionRequest {
    pub model: String,

    /// Text before the gap
    pub prompt: String,

    /// Text after the gap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    /// Maximum tokens to generate (up to 4096)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Number of log probabilities to return (up to 20)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<u32>,

    /// Echo the prompt back in the completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub echo: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,
}

impl FimCompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// One generated completion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FimChoice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,

    #[serde(default)]
    pub index: u32,

    /// Shape varies with the `logprobs` request field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// FIM completion response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FimCompletionResponse {
    pub id: String,

    #[serde(default)]
    pub object: String,

    pub created: i64,

    pub model: String,

    pub choices: Vec<FimChoice>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub usage: Usage,
}

impl FimCompletionResponse {
    /// Text of the first choice
    pub fn text(&self) -> Option<&str> {
        self.choices.first().map(|c| c.text.as_str())
    }
}

/// A streaming chunk from the FIM endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FimStreamChunk {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub object: String,

    #[serde(default)]
    pub created: i64,

    #[serde(default)]
    pub model: String,

    #[serde(default)]
    pub choices: Vec<FimChoice>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub usage: Usage,
}

impl FimStreamChunk {
    pub fn text(&self) -> Option<&str> {
        self.choices.first().map(|c| c.text.as_str())
    }
}
