//! Response Decoder
//!
//! Turns a finished HTTP response into either a typed body or an [`ApiError`].

use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::{ApiError, DeepseekError, Result};

const HTML_MESSAGE: &str = "Unexpected HTML response (model may not exist)";

/// Decode a complete JSON response.
///
/// Statuses of 400 and above become [`DeepseekError::Api`]. Otherwise the
/// body is read once and deserialized; an empty or malformed body is a
/// [`DeepseekError::Decode`].
pub async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    if response.status().as_u16() >= 400 {
        return Err(api_error(response).await);
    }

    let body = response.text().await?;
    if body.trim().is_empty() {
        return Err(DeepseekError::decode("empty response body", body));
    }

    serde_json::from_str(&body).map_err(|e| DeepseekError::decode(e, body))
}

/// Consume a failure response into an API error.
///
/// A body that cannot be read is treated as empty, so the status table
/// still yields a message.
pub async fn api_error(response: Response) -> DeepseekError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    api_error_from_body(status, &body).into()
}

/// Build an [`ApiError`] from a status and the raw failure body
pub fn api_error_from_body(status: u16, body: &str) -> ApiError {
    let trimmed = body.trim_start();
    if trimmed.starts_with('<') && trimmed.to_ascii_lowercase().contains("<html") {
        return ApiError {
            status,
            code: None,
            message: HTML_MESSAGE.to_string(),
            body: body.to_string(),
        };
    }

    match parse_envelope(body) {
        Some((code, message)) => ApiError {
            status,
            code,
            message,
            body: body.to_string(),
        },
        None => {
            warn!(status, "error body is not an API error envelope");
            ApiError {
                status,
                code: None,
                message: default_error_message(status),
                body: body.to_string(),
            }
        }
    }
}

/// Canned message for a status whose body carried nothing usable
pub fn default_error_message(status: u16) -> String {
    match status {
        400 => "Bad request".to_string(),
        401 => "Invalid authentication credentials".to_string(),
        402 => "Insufficient account balance".to_string(),
        404 => "Requested resource not found".to_string(),
        429 => "Rate limit exceeded".to_string(),
        500 => "Internal server error".to_string(),
        other => format!("Unexpected API response (HTTP {})", other),
    }
}

/// `{"code": 40201, "message": "..."}` at the top level, or the same fields
/// nested under `"error"`. Top-level envelopes need a non-zero code; a nested
/// one only needs a message.
fn parse_envelope(body: &str) -> Option<(Option<i64>, String)> {
    let value: Value = serde_json::from_str(body).ok()?;

    let message_of = |obj: &Value| {
        obj.get("message")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
    };
    let code_of = |obj: &Value| {
        obj.get("code")
            .and_then(|c| c.as_i64().or_else(|| c.as_str()?.parse().ok()))
            .filter(|c| *c != 0)
    };

    if let Some(nested) = value.get("error").filter(|e| e.is_object()) {
        let message = message_of(nested)?;
        return Some((code_of(nested), message));
    }

    let code = code_of(&value)?;
    let message = message_of(&value)?;
    Some((Some(code), message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChatCompletionResponse;

    async fn fetch(status: usize, body: &str) -> (mockito::ServerGuard, Response) {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let response = reqwest::get(server.url()).await.unwrap();
        (server, response)
    }

    #[test]
    fn test_envelope_message_used() {
        let err = api_error_from_body(402, r#"{"code": 40201, "message": "Insufficient Balance"}"#);
        assert_eq!(err.code, Some(40201));
        assert_eq!(err.message, "Insufficient Balance");
    }

    #[test]
    fn test_zero_code_falls_back() {
        let err = api_error_from_body(429, r#"{"code": 0, "message": ""}"#);
        assert_eq!(err.code, None);
        assert_eq!(err.message, "Rate limit exceeded");
    }

    #[test]
    fn test_nested_envelope() {
        let body = r#"{"error": {"message": "Model Not Exist", "type": "invalid_request_error", "code": "invalid_request_error"}}"#;
        let err = api_error_from_body(400, body);
        assert_eq!(err.message, "Model Not Exist");
        assert_eq!(err.code, None);
        assert_eq!(err.body, body);
    }

    #[test]
    fn test_html_body() {
        let err = api_error_from_body(404, "<html><body>Not Found</body></html>");
        assert_eq!(err.message, HTML_MESSAGE);
    }

    #[test]
    fn test_status_table() {
        assert_eq!(default_error_message(401), "Invalid authentication credentials");
        assert_eq!(default_error_message(404), "Requested resource not found");
        assert_eq!(default_error_message(500), "Internal server error");
        assert_eq!(
            default_error_message(503),
            "Unexpected API response (HTTP 503)"
        );
    }

    #[tokio::test]
    async fn test_unparseable_402() {
        let (_server, response) = fetch(402, "payment required!!").await;
        let err = decode_json::<ChatCompletionResponse>(response)
            .await
            .unwrap_err();

        let api = err.api_error().unwrap();
        assert_eq!(api.status, 402);
        assert_eq!(api.message, "Insufficient account balance");
        assert_eq!(api.body, "payment required!!");
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_decode_error() {
        let (_server, response) = fetch(200, "{\"id\": ").await;
        let err = decode_json::<ChatCompletionResponse>(response)
            .await
            .unwrap_err();

        assert!(err.api_error().is_none());
        match err {
            DeepseekError::Decode { body, .. } => assert_eq!(body, "{\"id\": "),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_success_body() {
        let (_server, response) = fetch(200, "").await;
        let err = decode_json::<ChatCompletionResponse>(response)
            .await
            .unwrap_err();
        assert!(matches!(err, DeepseekError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_success_body_decoded() {
        let body = r#"{"id":"x","object":"chat.completion","created":1,"model":"deepseek-chat",
            "choices":[{"index":0,"message":{"role":"assistant","content":"hi"},"finish_reason":"stop"}]}"#;
        let (_server, response) = fetch(200, body).await;
        let decoded: ChatCompletionResponse = decode_json(response).await.unwrap();
        assert_eq!(decoded.content(), Some("hi"));
        assert_eq!(decoded.usage.total_tokens, 0);
    }
}
