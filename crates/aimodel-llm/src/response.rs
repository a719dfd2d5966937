use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Content, Message, ToolCall};

/// Token counts of one call, or of a call plus the calls before it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// `current` plus whatever `previous` already accounted for.
    pub fn cumulative(current: TokenUsage, previous: Option<&ChatResponse>) -> TokenUsage {
        match previous {
            Some(previous) => {
                let before = previous.metadata.usage;
                TokenUsage {
                    input_tokens: current.input_tokens.saturating_add(before.input_tokens),
                    output_tokens: current.output_tokens.saturating_add(before.output_tokens),
                    total_tokens: current.total_tokens.saturating_add(before.total_tokens),
                }
            }
            None => current,
        }
    }
}

/// Assistant output of one generation. `properties` carries provider
/// metadata such as the response `id`, `role` and `finish_reason`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl AssistantMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Convert into a history message for the next turn
    pub fn into_message(self) -> Message {
        Message::Assistant {
            content: self.content.filter(|c| !c.is_empty()).map(Content::Text),
            tool_calls: self.tool_calls,
            name: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Provider finish reason, empty while generation is still running
    pub finish_reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub output: AssistantMessage,
    pub metadata: GenerationMetadata,
}

impl Generation {
    pub fn new(output: AssistantMessage) -> Self {
        Self {
            output,
            metadata: GenerationMetadata::default(),
        }
    }

    pub fn with_finish_reason(mut self, finish_reason: impl Into<String>) -> Self {
        self.metadata.finish_reason = finish_reason.into();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponseMetadata {
    pub id: String,
    pub model: String,
    /// Unix timestamp (seconds) reported by the provider, 0 when unknown
    pub created: i64,
    pub usage: TokenUsage,
}

impl ChatResponseMetadata {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.created, 0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub generations: Vec<Generation>,
    pub metadata: ChatResponseMetadata,
}

impl ChatResponse {
    pub fn new(generations: Vec<Generation>, metadata: ChatResponseMetadata) -> Self {
        Self {
            generations,
            metadata,
        }
    }

    /// First generation
    pub fn result(&self) -> Option<&Generation> {
        self.generations.first()
    }

    /// Text of the first generation, empty if there is none
    pub fn text(&self) -> &str {
        self.result().map(|g| g.output.text()).unwrap_or_default()
    }

    pub fn has_tool_calls(&self) -> bool {
        self.generations.iter().any(|g| g.output.has_tool_calls())
    }

    /// True if any generation finished with one of `finish_reasons`
    pub fn has_finish_reasons(&self, finish_reasons: &HashSet<&str>) -> bool {
        self.generations
            .iter()
            .any(|g| finish_reasons.contains(g.metadata.finish_reason.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with(output: AssistantMessage, finish_reason: &str) -> ChatResponse {
        ChatResponse::new(
            vec![Generation::new(output).with_finish_reason(finish_reason)],
            ChatResponseMetadata::default(),
        )
    }

    #[test]
    fn test_has_tool_calls() {
        let output = AssistantMessage {
            content: Some(String::new()),
            tool_calls: vec![ToolCall::function("toolA", "toolA", "{}")],
            ..Default::default()
        };
        assert!(response_with(output, "tool_calls").has_tool_calls());
        assert!(!response_with(AssistantMessage::new("Result"), "stop").has_tool_calls());
    }

    #[test]
    fn test_has_finish_reasons() {
        let response = response_with(AssistantMessage::new("Result"), "completed");
        assert!(response.has_finish_reasons(&HashSet::from(["completed"])));
        assert!(!response.has_finish_reasons(&HashSet::from(["failed"])));
        assert!(!response.has_finish_reasons(&HashSet::new()));
    }

    #[test]
    fn test_text_of_empty_response() {
        let response = ChatResponse::default();
        assert!(response.result().is_none());
        assert_eq!(response.text(), "");
    }

    #[test]
    fn test_cumulative_usage() {
        let previous = ChatResponse::new(
            vec![],
            ChatResponseMetadata {
                usage: TokenUsage::new(10, 5),
                ..Default::default()
            },
        );
        let current = TokenUsage::new(3, 2);

        assert_eq!(TokenUsage::cumulative(current, None), current);
        let total = TokenUsage::cumulative(current, Some(&previous));
        assert_eq!(
            total,
            TokenUsage {
                input_tokens: 13,
                output_tokens: 7,
                total_tokens: 20
            }
        );
    }

    #[test]
    fn test_usage_saturates_at_u32_max() {
        assert_eq!(TokenUsage::new(u32::MAX, 1).total_tokens, u32::MAX);

        let previous = ChatResponse::new(
            vec![],
            ChatResponseMetadata {
                usage: TokenUsage::new(u32::MAX, 0),
                ..Default::default()
            },
        );
        let total = TokenUsage::cumulative(TokenUsage::new(5, 5), Some(&previous));
        assert_eq!(total.input_tokens, u32::MAX);
        assert_eq!(total.output_tokens, 5);
        assert_eq!(total.total_tokens, u32::MAX);
    }

    #[test]
    fn test_into_message_drops_empty_content() {
        let output = AssistantMessage {
            content: Some(String::new()),
            tool_calls: vec![ToolCall::function("c1", "f", "{}")],
            ..Default::default()
        };
        match output.into_message() {
            Message::Assistant { content, tool_calls, .. } => {
                assert!(content.is_none());
                assert_eq!(tool_calls.len(), 1);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_created_at() {
        let metadata = ChatResponseMetadata {
            created: 1_700_000_000,
            ..Default::default()
        };
        assert_eq!(metadata.created_at().unwrap().timestamp(), 1_700_000_000);
    }
}
