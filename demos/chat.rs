//! Single chat completion with token accounting.
//!
//! ```sh
//! DEEPSEEK_API_KEY=sk-... cargo run --example chat
//! ```

use deepseek_client::{
    estimate_request_tokens, ChatCompletionRequest, DeepseekClient, Message, DEEPSEEK_CHAT,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client = DeepseekClient::from_env()?;
    let request = ChatCompletionRequest::new(
        DEEPSEEK_CHAT,
        vec![
            Message::system("You are a concise assistant."),
            Message::user("Name three Rust async runtimes."),
        ],
    )
    .with_temperature(0.7);

    let estimate = estimate_request_tokens(&request);
    println!("estimated prompt tokens: {}", estimate.estimated_tokens);

    let response = client.create_chat_completion(&request).await?;
    println!("{}", response.content().unwrap_or_default());
    println!(
        "usage: prompt={} completion={} total={}",
        response.usage.prompt_tokens, response.usage.completion_tokens, response.usage.total_tokens
    );

    let balance = client.get_balance().await?;
    for info in &balance.balance_infos {
        println!("balance: {} {}", info.total_balance, info.currency);
    }

    Ok(())
}
