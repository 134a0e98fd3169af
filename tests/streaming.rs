use deepseek_client::{
    CancellationToken, ChatCompletionRequest, DeepseekClient, DeepseekError, FimCompletionRequest,
    Message, StreamAccumulator, DEEPSEEK_CHAT,
};
use futures::StreamExt;
use mockito::Matcher;
use serde_json::json;
use std::time::Duration;

fn client(server: &mockito::ServerGuard) -> DeepseekClient {
    DeepseekClient::builder("sk-test")
        .base_url(server.url())
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

fn request() -> ChatCompletionRequest {
    ChatCompletionRequest::new(DEEPSEEK_CHAT, vec![Message::user("Count to three")])
}

const CHAT_BODY: &str = concat!(
    "data: {\"id\":\"s1\",\"object\":\"chat.completion.chunk\",\"created\":1700000000,\"model\":\"deepseek-chat\",",
    "\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
    ": keep-alive\n\n",
    "data: {\"id\":\"s1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"one, \"}}]}\n\n",
    "data: {\"id\":\"s1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"two, three\"},\"finish_reason\":\"stop\"}],",
    "\"usage\":{\"prompt_tokens\":6,\"completion_tokens\":4,\"total_tokens\":10}}\n\n",
    "data: [DONE]\n\n",
);

#[tokio::test]
async fn chat_stream_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("accept", "text/event-stream")
        .match_header("cache-control", "no-cache")
        .match_body(Matcher::PartialJson(json!({"stream": true})))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(CHAT_BODY)
        .create_async()
        .await;

    let mut stream = client(&server)
        .create_chat_completion_stream(&request())
        .await
        .unwrap();

    let mut accumulator = StreamAccumulator::new();
    let mut events = 0;
    while let Some(chunk) = stream.recv().await.unwrap() {
        accumulator.process_chunk(&chunk);
        events += 1;
    }

    assert_eq!(events, 3);
    assert_eq!(accumulator.content, "one, two, three");
    assert_eq!(accumulator.finish_reason.as_deref(), Some("stop"));
    assert_eq!(accumulator.usage.total_tokens, 10);

    // terminated streams stay terminated
    assert!(stream.recv().await.unwrap().is_none());
    mock.assert_async().await;
}

#[tokio::test]
async fn stream_without_sentinel_ends_cleanly() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body("data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n")
        .create_async()
        .await;

    let chunks: Vec<_> = client(&server)
        .create_chat_completion_stream(&request())
        .await
        .unwrap()
        .into_stream()
        .collect()
        .await;

    assert_eq!(chunks.len(), 1);
    let chunk = chunks.into_iter().next().unwrap().unwrap();
    assert_eq!(chunk.content(), Some("partial"));
    assert_eq!(chunk.usage.total_tokens, 0);
}

#[tokio::test]
async fn malformed_event_surfaces_payload() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body("data: not-json\n")
        .create_async()
        .await;

    let mut stream = client(&server)
        .create_chat_completion_stream(&request())
        .await
        .unwrap();

    match stream.recv().await {
        Err(DeepseekError::Decode { body, .. }) => assert_eq!(body, "not-json"),
        other => panic!("expected decode error, got {:?}", other),
    }
}

#[tokio::test]
async fn parent_cancellation_stops_stream() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(CHAT_BODY)
        .create_async()
        .await;

    let parent = CancellationToken::new();
    let mut stream = client(&server)
        .create_chat_completion_stream_with_cancel(&request(), &parent)
        .await
        .unwrap();

    assert!(stream.recv().await.unwrap().is_some());
    parent.cancel();
    assert!(matches!(stream.recv().await, Err(DeepseekError::Cancelled)));
}

#[tokio::test]
async fn closing_stream_leaves_parent_alone() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(CHAT_BODY)
        .create_async()
        .await;

    let parent = CancellationToken::new();
    let mut stream = client(&server)
        .create_chat_completion_stream_with_cancel(&request(), &parent)
        .await
        .unwrap();

    stream.close();
    stream.close();
    assert!(!parent.is_cancelled());
    assert!(matches!(stream.recv().await, Err(DeepseekError::Cancelled)));
}

#[tokio::test]
async fn stream_rate_limited() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_body("slow down")
        .create_async()
        .await;

    let err = client(&server)
        .create_chat_completion_stream(&request())
        .await
        .unwrap_err();

    let api = err.api_error().unwrap();
    assert_eq!(api.status, 429);
    assert_eq!(api.message, "Rate limit exceeded");
}

#[tokio::test]
async fn fim_stream() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/completions")
        .match_body(Matcher::PartialJson(
            json!({"prompt": "fn add(a: i32, b: i32) -> i32 {", "stream": true}),
        ))
        .with_status(200)
        .with_body(concat!(
            "data: {\"id\":\"f1\",\"choices\":[{\"text\":\"\\n    a + b\",\"index\":0}]}\n",
            "data: {\"id\":\"f1\",\"choices\":[{\"text\":\"\\n}\",\"index\":0,\"finish_reason\":\"stop\"}]}\n",
            "data: [DONE]\n",
        ))
        .create_async()
        .await;

    let request = FimCompletionRequest::new(DEEPSEEK_CHAT, "fn add(a: i32, b: i32) -> i32 {");
    let mut stream = client(&server)
        .create_fim_completion_stream(&request)
        .await
        .unwrap();

    let mut text = String::new();
    while let Some(chunk) = stream.recv().await.unwrap() {
        text.push_str(chunk.text().unwrap_or_default());
    }

    assert_eq!(text, "\n    a + b\n}");
    mock.assert_async().await;
}
