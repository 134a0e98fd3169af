//! Configuration Module
//!
//! Client settings and where they come from.

pub mod loader;
pub mod timeout;

use std::fmt;
use std::time::Duration;

pub use loader::ConfigLoader;
pub use timeout::{parse_duration, resolve_timeout, DEFAULT_TIMEOUT, TIMEOUT_ENV};

/// Regular API
pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/";

/// Beta API: chat prefix completion and fill-in-the-middle
pub const BETA_BASE_URL: &str = "https://api.deepseek.com/beta/";

/// DeepSeek models hosted on Azure AI inference
pub const AZURE_BASE_URL: &str = "https://models.inference.ai.azure.com/";

/// Path used for chat completions unless overridden
pub const DEFAULT_PATH: &str = "chat/completions";

/// Settings a [`DeepseekClient`](crate::DeepseekClient) is built from
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Bearer token
    pub api_key: String,

    pub base_url: String,

    /// Chat completion path, relative to `base_url`
    pub path: String,

    /// Explicit request timeout. `None` defers to `DEEPSEEK_TIMEOUT`, then
    /// to five minutes
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            path: DEFAULT_PATH.to_string(),
            timeout: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("path", &self.path)
            .field("timeout", &self.timeout)
            .finish()
    }
}
