use aimodel_llm::{ChatModel, ClientFactory, MoonshotConfig, ProviderConfig};
use anyhow::Result;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    println!("Provider Factory Pattern Example");
    println!("=================================\n");

    // Example 1: config/default.toml, config/{ENV}.toml, AIMODEL_PROVIDER__* env vars
    println!("Example 1: Provider from config files");
    println!("-------------------------------------");

    match ProviderConfig::load() {
        Ok(config) => {
            println!("Loaded provider: {:?}", config.provider_type());
            let model: Arc<dyn ChatModel> = ClientFactory::create_chat_model(config)?;
            println!("Response: {}\n", model.call_text("Say hello!").await?);
        }
        Err(e) => println!("Skipped ({e})\n"),
    }

    // Example 2: Provider built in code
    println!("Example 2: Provider built in code");
    println!("---------------------------------");

    if let Ok(api_key) = std::env::var("MOONSHOT_API_KEY") {
        let config = ProviderConfig::from_moonshot(
            MoonshotConfig::new(api_key).with_model("moonshot-v1-32k"),
        );
        let model = ClientFactory::create_chat_model(config)?;
        println!("Default model: {:?}", model.default_options().model);
        println!("Response: {}\n", model.call_text("What is 2+2?").await?);
    } else {
        println!("Skipped (MOONSHOT_API_KEY not set)\n");
    }

    Ok(())
}
