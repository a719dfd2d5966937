use serde::{Deserialize, Serialize};
use super::content::Content;
use super::tool::{ToolCall, ToolResponse};

/// Conversation message, one variant per author role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    /// System prompt (instructions)
    System {
        content: Content,

        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    User {
        content: Content,

        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    Assistant {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<Content>,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,

        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    /// Results of one or more tool calls
    Tool {
        responses: Vec<ToolResponse>,
    },
}

impl Message {
    pub fn system(content: impl Into<Content>) -> Self {
        Self::System {
            content: content.into(),
            name: None,
        }
    }

    pub fn user(content: impl Into<Content>) -> Self {
        Self::User {
            content: content.into(),
            name: None,
        }
    }

    pub fn assistant(content: impl Into<Content>) -> Self {
        Self::Assistant {
            content: Some(content.into()),
            tool_calls: Vec::new(),
            name: None,
        }
    }

    /// Assistant turn that only requests tool calls
    pub fn assistant_with_tools(tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            content: None,
            tool_calls,
            name: None,
        }
    }

    pub fn tool_responses(responses: Vec<ToolResponse>) -> Self {
        Self::Tool { responses }
    }

    /// Single tool result
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        response_data: impl Into<String>,
    ) -> Self {
        Self::Tool {
            responses: vec![ToolResponse::new(tool_call_id, name, response_data)],
        }
    }

    pub fn role(&self) -> &str {
        match self {
            Self::System { .. } => "system",
            Self::User { .. } => "user",
            Self::Assistant { .. } => "assistant",
            Self::Tool { .. } => "tool",
        }
    }

    /// Plain text of the message, empty for tool results
    pub fn text(&self) -> String {
        match self {
            Self::System { content, .. } | Self::User { content, .. } => content.to_text(),
            Self::Assistant { content, .. } => {
                content.as_ref().map(Content::to_text).unwrap_or_default()
            }
            Self::Tool { .. } => String::new(),
        }
    }
}
