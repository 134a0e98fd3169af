//! Streaming fill-in-the-middle completion against the beta API.
//!
//! ```sh
//! DEEPSEEK_API_KEY=sk-... cargo run --example fim_stream
//! ```

use deepseek_client::config::loader::API_KEY_ENV;
use deepseek_client::{DeepseekClient, FimCompletionRequest, DEEPSEEK_CHAT};
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let _ = dotenvy::dotenv();
    let api_key = std::env::var(API_KEY_ENV)?;
    let client = DeepseekClient::beta(api_key)?;

    let request = FimCompletionRequest::new(
        DEEPSEEK_CHAT,
        "def fib(n):\n    \"\"\"Return the n-th Fibonacci number.\"\"\"\n",
    )
    .with_suffix("\n\nprint(fib(10))\n")
    .with_max_tokens(128);

    let mut events = client
        .create_fim_completion_stream(&request)
        .await?
        .into_stream()
        .boxed();

    while let Some(chunk) = events.next().await {
        print!("{}", chunk?.text().unwrap_or_default());
    }
    println!();

    Ok(())
}
