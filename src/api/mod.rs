//! API Module
//!
//! Wire types for chat completion, fill-in-the-middle, streaming and the
//! account endpoints.

pub mod completion;
pub mod fim;
pub mod models;
pub mod streaming;

use serde::{Deserialize, Deserializer};

pub use completion::{
    ChatCompletionRequest, ChatCompletionResponse, Choice, Function, FunctionCall, Logprobs,
    Message, ResponseFormat, Role, Stop, StreamOptions, Tool, ToolCall, ToolChoice,
    ToolChoiceMode, Usage,
};
pub use fim::{FimChoice, FimCompletionRequest, FimCompletionResponse, FimStreamChunk};
pub use models::{BalanceInfo, BalanceResponse, Model, ModelList};
pub use streaming::{
    parse_sse_line, SseLine, StreamAccumulator, StreamChoice, StreamChunk, StreamDelta,
    ToolCallDelta,
};

/// Decode a missing or `null` field as the type's default
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
