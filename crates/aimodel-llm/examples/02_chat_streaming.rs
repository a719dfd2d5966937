use aimodel_llm::{ChatModel, MoonshotClient, Prompt};
use anyhow::Result;
use futures::StreamExt;
use std::io::Write;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let api_key = std::env::var("MOONSHOT_API_KEY")?;
    let client = MoonshotClient::new(api_key)?;

    let mut stream = client
        .stream(Prompt::from("Write a haiku about the sea."))
        .await?;

    while let Some(response) = stream.next().await {
        let response = response?;
        print!("{}", response.text());
        std::io::stdout().flush()?;
    }
    println!();

    Ok(())
}
