use aimodel_llm::{
    ChatModel, ChatOptions, IncompleteToolCallPolicy, Message, MoonshotClient, Prompt,
    StreamConfig, Tool, ToolResponse,
};
use anyhow::Result;
use futures::StreamExt;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let api_key = std::env::var("MOONSHOT_API_KEY")?;

    let weather = Tool::new(
        "get_weather",
        "Current weather for a city",
        json!({
            "type": "object",
            "properties": { "city": { "type": "string" } },
            "required": ["city"]
        }),
    );

    let client = MoonshotClient::builder()
        .api_key(api_key)
        .default_options(ChatOptions::new().tools(vec![weather]))
        .stream_config(StreamConfig {
            incomplete_tool_call: IncompleteToolCallPolicy::Error,
        })
        .build()?;

    let prompt = Prompt::from("What's the weather in Paris?");
    let mut stream = client.stream(prompt.clone()).await?;

    // Tool calls arrive once, with their arguments fully assembled.
    let mut follow_up = Vec::new();
    while let Some(response) = stream.next().await {
        let response = response?;
        for generation in &response.generations {
            if !generation.output.has_tool_calls() {
                print!("{}", generation.output.text());
                continue;
            }
            follow_up.push(generation.output.clone().into_message());
            let responses = generation
                .output
                .tool_calls
                .iter()
                .map(|call| {
                    println!("\n-> {}({})", call.name(), call.function.arguments);
                    let weather = r#"{"temperature":"18C","sky":"clear"}"#;
                    ToolResponse::new(&call.id, call.name(), weather)
                })
                .collect();
            follow_up.push(Message::tool_responses(responses));
        }
    }

    if follow_up.is_empty() {
        println!();
        return Ok(());
    }

    let answer = client.call(prompt.augment(follow_up)).await?;
    println!("\nAnswer: {}", answer.text());

    Ok(())
}
