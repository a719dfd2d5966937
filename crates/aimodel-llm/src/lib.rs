//! Chat model client with tool-call aware streaming.
//!
//! Streamed chat completions arrive as fragments. Ordinary fragments are
//! delivered one by one, while the fragments of a streamed tool call are
//! merged and delivered once, as a single complete record. See
//! [`streaming`] for the aggregation pipeline and [`moonshot`] for the
//! provider client built on it.

pub mod buffer_utils;
pub mod config;
pub mod error;
pub mod moonshot;
pub mod prompt;
pub mod response;
pub mod streaming;
pub mod traits;
pub mod types;

pub use crate::config::{
    ClientFactory, MoonshotConfig, ProviderConfig, ProviderDetails, ProviderType, StreamConfig,
};
pub use error::{LlmError, Result};
pub use moonshot::{MoonshotClient, MoonshotClientBuilder};
pub use prompt::{ChatOptions, Prompt, PromptTemplate};
pub use response::{
    AssistantMessage, ChatResponse, ChatResponseMetadata, Generation, GenerationMetadata,
    TokenUsage,
};
pub use streaming::{
    aggregate_chunks, aggregate_sse_body, merge_chunks, ChatCompletionChunk, ChunkAggregator,
    ChunkStream, FinishReason, IncompleteToolCallPolicy, Role,
};
pub use traits::{ChatModel, ChatResponseStream};
pub use types::{Content, Message, Tool, ToolCall, ToolChoice, ToolResponse};

pub use buffer_utils::CircularLineBuffer;
