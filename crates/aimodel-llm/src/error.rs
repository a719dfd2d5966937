use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Failed to decode stream frame `{frame}`: {source}")]
    Decode {
        frame: String,
        #[source]
        source: serde_json::Error,
    },

    /// A single fragment carried more than one tool call entry.
    #[error("Only one tool call is supported per streamed fragment, got {count}")]
    UnsupportedMultiToolCall { count: usize },

    /// The stream ended while a tool call window was still open.
    #[error("Stream ended inside tool call (id: {id:?}, name: {name:?})")]
    IncompleteToolCall {
        id: Option<String>,
        name: Option<String>,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Invalid UTF-8 in stream: {0}")]
    InvalidUtf8(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, LlmError>;
