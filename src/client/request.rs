//! Request Builder
//!
//! Assembles authenticated requests: bearer token, JSON content type, and for
//! streaming requests, headers that keep proxies from caching the event stream.

use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE,
};
use reqwest::{Client, Method, Request};
use serde::Serialize;

use crate::error::{DeepseekError, Result};

/// Builder for one authenticated API request
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    auth_token: String,
    base_url: String,
    path: String,
    body: Option<Vec<u8>>,
}

impl RequestBuilder {
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
            ..Default::default()
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Serialize `body` as the JSON payload
    pub fn json_body<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body).map_err(DeepseekError::Serialize)?);
        Ok(self)
    }

    /// Full request URL. Exactly one `/` separates base URL and path.
    pub fn url(&self) -> Result<String> {
        let base = self.base_url.trim();
        let path = self.path.trim();
        if base.is_empty() || path.is_empty() {
            return Err(DeepseekError::Config("base URL or path not set".to_string()));
        }

        Ok(format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }

    /// POST with a JSON body
    pub fn build(self, client: &Client) -> Result<Request> {
        self.build_with(client, Method::POST, false)
    }

    /// POST expecting an event stream back
    pub fn build_stream(self, client: &Client) -> Result<Request> {
        self.build_with(client, Method::POST, true)
    }

    /// GET, body ignored
    pub fn build_get(mut self, client: &Client) -> Result<Request> {
        self.body = None;
        self.build_with(client, Method::GET, false)
    }

    fn headers(&self, streaming: bool) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", self.auth_token))
            .map_err(|e| DeepseekError::Config(format!("Invalid API key format: {}", e)))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        if streaming {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        } else {
            headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        }

        Ok(headers)
    }

    fn build_with(self, client: &Client, method: Method, streaming: bool) -> Result<Request> {
        let url = self.url()?;
        let headers = self.headers(streaming)?;

        let mut builder = client.request(method, &url).headers(headers);
        if let Some(body) = self.body {
            builder = builder.body(body);
        }

        builder.build().map_err(|e| {
            DeepseekError::Config(format!("Failed to build request for {}: {}", url, e))
        })
    }
}
