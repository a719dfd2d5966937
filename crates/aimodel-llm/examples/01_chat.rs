use aimodel_llm::{ChatModel, Message, MoonshotClient, Prompt};
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let api_key = std::env::var("MOONSHOT_API_KEY")?;
    let client = MoonshotClient::new(api_key)?;

    let prompt = Prompt::new(vec![
        Message::system("Answer in one sentence."),
        Message::user("What is the capital of France?"),
    ]);

    let response = client.call(prompt).await?;

    println!("Response: {}", response.text());
    println!("Tokens used: {}", response.metadata.usage.total_tokens);

    Ok(())
}
