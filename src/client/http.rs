//! HTTP Transport
//!
//! Executes prepared requests under the client timeout. Any HTTP status comes
//! back as a response; only network failures and timeouts are errors here.

use reqwest::{Client, Request, Response};
use std::time::Duration;
use tracing::debug;

use crate::error::{DeepseekError, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client bound to one request timeout
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Create a client with its own connection pool
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| DeepseekError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// Wrap a caller-supplied client (proxies, custom TLS, test doubles)
    pub fn from_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Underlying reqwest client, used to build requests
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send a request whose body will be read in full. The timeout covers
    /// the whole exchange, body included.
    pub async fn execute(&self, mut request: Request) -> Result<Response> {
        *request.timeout_mut() = Some(self.timeout);
        debug!(method = %request.method(), url = %request.url(), "sending request");

        let response = self.client.execute(request).await?;
        debug!(status = response.status().as_u16(), "received response");
        Ok(response)
    }

    /// Send a request that opens an event stream.
    ///
    /// The timeout only bounds the wait for response headers; the stream
    /// itself may outlive it. Bound the stream with a cancellation token.
    pub async fn execute_stream(&self, request: Request) -> Result<Response> {
        debug!(method = %request.method(), url = %request.url(), "opening stream");

        let response = tokio::time::timeout(self.timeout, self.client.execute(request))
            .await
            .map_err(|_| {
                DeepseekError::Timeout(format!("no response within {:?}", self.timeout))
            })??;

        debug!(status = response.status().as_u16(), "stream response");
        Ok(response)
    }
}
