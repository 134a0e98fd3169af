//! DeepSeek Client - Async client for the DeepSeek completion API
//!
//! Chat and fill-in-the-middle completions, either as one JSON response or as
//! a cancellable stream of incremental events, plus the model listing and
//! balance endpoints.
//!
//! ```no_run
//! use deepseek_client::{ChatCompletionRequest, DeepseekClient, Message, DEEPSEEK_CHAT};
//!
//! # async fn run() -> deepseek_client::Result<()> {
//! let client = DeepseekClient::from_env()?;
//! let request = ChatCompletionRequest::new(DEEPSEEK_CHAT, vec![Message::user("Hi")]);
//!
//! let mut stream = client.create_chat_completion_stream(&request).await?;
//! while let Some(chunk) = stream.recv().await? {
//!     print!("{}", chunk.content().unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod json;
pub mod tokens;

pub use api::models::{AZURE_DEEPSEEK_R1, DEEPSEEK_CHAT, DEEPSEEK_CODER, DEEPSEEK_REASONER};
pub use api::{
    BalanceResponse, ChatCompletionRequest, ChatCompletionResponse, FimCompletionRequest,
    FimCompletionResponse, Message, ModelList, Role, StreamAccumulator, StreamChunk, Tool,
    ToolChoice, Usage,
};
pub use client::{ChatCompletionStream, EventStream, FimCompletionStream};
pub use config::{ClientConfig, ConfigLoader};
pub use error::{ApiError, DeepseekError, Result};
pub use json::JsonExtractor;
pub use tokens::{estimate_request_tokens, estimate_token_count, TokenEstimate};
pub use tokio_util::sync::CancellationToken;

use client::{decode_json, HttpClient, RequestBuilder};
use config::timeout::{parse_duration, resolve_timeout, timeout_from_env};
use config::{AZURE_BASE_URL, BETA_BASE_URL, DEFAULT_PATH};

/// Fill-in-the-middle endpoint, relative to the base URL
const FIM_PATH: &str = "completions";
const MODELS_PATH: &str = "models";
const BALANCE_PATH: &str = "user/balance";

/// The DeepSeek API client
///
/// Cloning is cheap: clones share the connection pool.
#[derive(Debug, Clone)]
pub struct DeepseekClient {
    config: ClientConfig,
    http: HttpClient,
}

impl DeepseekClient {
    /// Client for the regular API
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::builder(api_key).build()
    }

    pub fn builder(api_key: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(api_key)
    }

    /// Client for the beta API, needed for prefix completion and FIM
    pub fn beta(api_key: impl Into<String>) -> Result<Self> {
        Self::builder(api_key).base_url(BETA_BASE_URL).build()
    }

    /// Client for DeepSeek models hosted on Azure AI inference
    pub fn azure(api_key: impl Into<String>) -> Result<Self> {
        Self::builder(api_key).base_url(AZURE_BASE_URL).build()
    }

    pub fn from_config(config: ClientConfig) -> Result<Self> {
        ClientBuilder { config, http: None }.build()
    }

    /// Load `.env`, the config file and environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(ConfigLoader::new()?.into_config()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Effective request timeout
    pub fn timeout(&self) -> Duration {
        self.http.timeout()
    }

    fn request(&self, path: &str) -> RequestBuilder {
        RequestBuilder::new(self.config.api_key.as_str())
            .base_url(self.config.base_url.as_str())
            .path(path)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .request(path)
            .json_body(body)?
            .build(self.http.client())?;
        let response = self.http.execute(request).await?;
        decode_json(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.request(path).build_get(self.http.client())?;
        let response = self.http.execute(request).await?;
        decode_json(response).await
    }

    /// Send a streaming request and hand back a reader over its body.
    ///
    /// Failure statuses are decoded here, so a returned reader always wraps a
    /// successful response.
    async fn open_stream<B, T>(
        &self,
        path: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<EventStream<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .request(path)
            .json_body(body)?
            .build_stream(self.http.client())?;

        let token = cancel.child_token();
        let response = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(DeepseekError::Cancelled),
            response = self.http.execute_stream(request) => response?,
        };

        if response.status().as_u16() >= 400 {
            return Err(client::api_error(response).await);
        }

        debug!(path, "stream opened");
        Ok(EventStream::from_response(response, token))
    }

    /// Create a chat completion.
    ///
    /// Requests with `stream: Some(true)` are rejected; use
    /// [`create_chat_completion_stream`](Self::create_chat_completion_stream).
    pub async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        if request.stream == Some(true) {
            return Err(DeepseekError::Config(
                "streaming is not supported by create_chat_completion; \
                 use create_chat_completion_stream"
                    .to_string(),
            ));
        }

        self.post(&self.config.path, request).await
    }

    /// Create a streaming chat completion. `stream` is forced on.
    pub async fn create_chat_completion_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionStream> {
        self.create_chat_completion_stream_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Create a streaming chat completion that stops when `cancel` fires.
    ///
    /// The reader gets a child of `cancel`: cancelling the parent ends the
    /// stream, closing the stream leaves the parent untouched.
    pub async fn create_chat_completion_stream_with_cancel(
        &self,
        request: &ChatCompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletionStream> {
        let mut request = request.clone();
        request.stream = Some(true);
        self.open_stream(&self.config.path, &request, cancel).await
    }

    /// Fill-in-the-middle completion (beta API)
    pub async fn create_fim_completion(
        &self,
        request: &FimCompletionRequest,
    ) -> Result<FimCompletionResponse> {
        let mut request = request.clone();
        request.stream = None;
        self.post(FIM_PATH, &request).await
    }

    /// Streaming fill-in-the-middle completion (beta API)
    pub async fn create_fim_completion_stream(
        &self,
        request: &FimCompletionRequest,
    ) -> Result<FimCompletionStream> {
        let mut request = request.clone();
        request.stream = Some(true);
        self.open_stream(FIM_PATH, &request, &CancellationToken::new())
            .await
    }

    /// Models available to this API key
    pub async fn list_models(&self) -> Result<ModelList> {
        self.get(MODELS_PATH).await
    }

    /// Account balance
    pub async fn get_balance(&self) -> Result<BalanceResponse> {
        self.get(BALANCE_PATH).await
    }
}

/// Builder for [`DeepseekClient`]
#[derive(Debug)]
pub struct ClientBuilder {
    config: ClientConfig,
    http: Option<reqwest::Client>,
}

impl ClientBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            config: ClientConfig::new(api_key),
            http: None,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Chat completion path. An empty path restores `chat/completions`.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Explicit timeout; takes precedence over `DEEPSEEK_TIMEOUT`.
    /// `Duration::ZERO` means unset.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Timeout as a duration string such as `"90s"` or `"2m"`
    pub fn timeout_str(self, timeout: &str) -> Result<Self> {
        Ok(self.timeout(parse_duration(timeout)?))
    }

    /// Send requests through a preconfigured reqwest client (proxies,
    /// custom TLS, shared pools)
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self
    }

    pub fn build(self) -> Result<DeepseekClient> {
        let mut config = self.config;

        if config.api_key.trim().is_empty() {
            return Err(DeepseekError::Config("API key is empty".to_string()));
        }
        reqwest::Url::parse(&config.base_url).map_err(|e| {
            DeepseekError::Config(format!("invalid base URL {:?}: {}", config.base_url, e))
        })?;
        if config.path.trim().is_empty() {
            config.path = DEFAULT_PATH.to_string();
        }

        let timeout = resolve_timeout(config.timeout, timeout_from_env().as_deref())?;
        debug!(base_url = %config.base_url, ?timeout, "building client");

        let http = match self.http {
            Some(client) => HttpClient::from_client(client, timeout),
            None => HttpClient::new(timeout)?,
        };

        Ok(DeepseekClient { config, http })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    async fn client_for(server: &mockito::ServerGuard) -> DeepseekClient {
        DeepseekClient::builder("sk-test")
            .base_url(server.url())
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    fn chat_request() -> ChatCompletionRequest {
        ChatCompletionRequest::new(DEEPSEEK_CHAT, vec![Message::user("Hello")])
    }

    #[test]
    fn test_builder_validation() {
        assert!(DeepseekClient::new("").is_err());
        assert!(DeepseekClient::builder("sk").base_url("not a url").build().is_err());

        let client = DeepseekClient::builder("sk").path("").build().unwrap();
        assert_eq!(client.config().path, DEFAULT_PATH);
    }

    #[test]
    fn test_explicit_timeout_wins() {
        let client = DeepseekClient::builder("sk")
            .timeout_str("90s")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(90));
    }

    #[test]
    fn test_constructors_pick_base_url() {
        assert_eq!(
            DeepseekClient::beta("sk").unwrap().config().base_url,
            BETA_BASE_URL
        );
        assert_eq!(
            DeepseekClient::azure("sk").unwrap().config().base_url,
            AZURE_BASE_URL
        );
    }

    #[tokio::test]
    async fn test_chat_completion() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({"model": "deepseek-chat"})))
            .with_status(200)
            .with_body(
                json!({
                    "id": "c1",
                    "object": "chat.completion",
                    "created": 1700000000,
                    "model": "deepseek-chat",
                    "choices": [{
                        "index": 0,
                        "message": {"role": "assistant", "content": "Hi there"},
                        "finish_reason": "stop"
                    }],
                    "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let response = client_for(&server)
            .await
            .create_chat_completion(&chat_request())
            .await
            .unwrap();

        assert_eq!(response.content(), Some("Hi there"));
        assert_eq!(response.usage.total_tokens, 5);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_chat_completion_rejects_stream_flag() {
        let client = DeepseekClient::new("sk").unwrap();
        let mut request = chat_request();
        request.stream = Some(true);

        let err = client.create_chat_completion(&request).await.unwrap_err();
        assert!(matches!(err, DeepseekError::Config(_)));
    }

    #[tokio::test]
    async fn test_stream_failure_status_decoded_before_reader() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Authentication Fails","type":"authentication_error"}}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .await
            .create_chat_completion_stream(&chat_request())
            .await
            .unwrap_err();

        let api = err.api_error().unwrap();
        assert_eq!(api.status, 401);
        assert_eq!(api.message, "Authentication Fails");
    }

    #[tokio::test]
    async fn test_cancelled_before_open() {
        let server = mockito::Server::new_async().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client_for(&server)
            .await
            .create_chat_completion_stream_with_cancel(&chat_request(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, DeepseekError::Cancelled));
    }

    #[tokio::test]
    async fn test_get_balance() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/user/balance")
            .with_status(200)
            .with_body(
                json!({
                    "is_available": true,
                    "balance_infos": [{
                        "currency": "CNY",
                        "total_balance": "110.00",
                        "granted_balance": "10.00",
                        "topped_up_balance": "100.00"
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let balance = client_for(&server).await.get_balance().await.unwrap();
        assert!(balance.is_available);
        assert_eq!(balance.balance_infos[0].total_balance, "110.00");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_models() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/models")
            .with_status(200)
            .with_body(
                r#"{"object":"list","data":[
                    {"id":"deepseek-chat","object":"model","owned_by":"deepseek"},
                    {"id":"deepseek-reasoner","object":"model","owned_by":"deepseek"}]}"#,
            )
            .create_async()
            .await;

        let models = client_for(&server).await.list_models().await.unwrap();
        assert_eq!(
            models.ids().collect::<Vec<_>>(),
            vec!["deepseek-chat", "deepseek-reasoner"]
        );
    }
}
