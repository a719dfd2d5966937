use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::{LlmError, Result};
use crate::prompt::{ChatOptions, Prompt};
use crate::response::ChatResponse;

pub type ChatResponseStream = Pin<Box<dyn Stream<Item = Result<ChatResponse>> + Send>>;

/// Chat model with blocking-style and streaming completions.
///
/// Each streamed item is one complete window: an ordinary fragment, or a
/// fully reassembled tool call.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Non-streaming completion
    async fn call(&self, prompt: Prompt) -> Result<ChatResponse>;

    /// Streaming completion
    async fn stream(&self, _prompt: Prompt) -> Result<ChatResponseStream> {
        Err(LlmError::Unsupported("streaming is not supported".to_string()))
    }

    /// Options applied when the prompt does not override them
    fn default_options(&self) -> ChatOptions {
        ChatOptions::default()
    }

    /// Send a single user message and return the reply text
    async fn call_text(&self, message: &str) -> Result<String> {
        let response = self.call(Prompt::from(message)).await?;
        Ok(response.text().to_string())
    }
}
