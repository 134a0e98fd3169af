//! Streaming chat with reasoning output and Ctrl-C cancellation.
//!
//! ```sh
//! DEEPSEEK_API_KEY=sk-... RUST_LOG=deepseek_client=debug cargo run --example chat_stream
//! ```

use deepseek_client::{
    CancellationToken, ChatCompletionRequest, DeepseekClient, DeepseekError, Message,
    StreamAccumulator, DEEPSEEK_REASONER,
};
use std::io::Write;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client = DeepseekClient::from_env()?;
    let request = ChatCompletionRequest::new(
        DEEPSEEK_REASONER,
        vec![Message::user("Is 9.11 greater than 9.8?")],
    )
    .with_stream_usage();

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let mut stream = client
        .create_chat_completion_stream_with_cancel(&request, &cancel)
        .await?;

    let mut accumulator = StreamAccumulator::new();
    let mut stdout = std::io::stdout();
    loop {
        let chunk = match stream.recv().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(DeepseekError::Cancelled) => {
                println!("\n[cancelled]");
                break;
            }
            Err(e) => return Err(e.into()),
        };

        for choice in &chunk.choices {
            if let Some(reasoning) = &choice.delta.reasoning_content {
                write!(stdout, "{}", reasoning)?;
            }
            write!(stdout, "{}", choice.delta.content)?;
        }
        stdout.flush()?;
        accumulator.process_chunk(&chunk);
    }
    stream.close();

    println!("\n\ntotal tokens: {}", accumulator.usage.total_tokens);
    Ok(())
}
