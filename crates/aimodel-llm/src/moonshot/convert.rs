// Conversions between the portable types and the Moonshot wire format

use std::collections::{BTreeMap, HashMap};

use super::api::{ChatCompletion, ChatCompletionRequest, Choice};
use crate::error::{LlmError, Result};
use crate::prompt::{ChatOptions, Prompt};
use crate::response::{
    AssistantMessage, ChatResponse, ChatResponseMetadata, Generation, TokenUsage,
};
use crate::streaming::{
    ChatCompletionChunk, ChatCompletionMessage, FunctionDelta, Role, ToolCallDelta, Usage,
};
use crate::types::{FunctionCall, Message, ToolCall};

/// Build the wire request: prompt options layered over the client defaults.
pub fn create_request(
    prompt: &Prompt,
    defaults: &ChatOptions,
    stream: bool,
) -> Result<ChatCompletionRequest> {
    let options = match &prompt.options {
        Some(overrides) => defaults.merge(overrides),
        None => defaults.clone(),
    };
    let messages = to_wire_messages(&prompt.messages)?;
    Ok(ChatCompletionRequest::new(messages, &options, stream))
}

/// One wire message per portable message, except tool results which expand
/// into one wire message per response.
pub fn to_wire_messages(messages: &[Message]) -> Result<Vec<ChatCompletionMessage>> {
    let mut wire = Vec::with_capacity(messages.len());
    for message in messages {
        match message {
            Message::System { content, name } => wire.push(ChatCompletionMessage {
                name: name.clone(),
                ..ChatCompletionMessage::new(content.to_text(), Role::System)
            }),
            Message::User { content, name } => wire.push(ChatCompletionMessage {
                name: name.clone(),
                ..ChatCompletionMessage::new(content.to_text(), Role::User)
            }),
            Message::Assistant {
                content,
                tool_calls,
                name,
            } => wire.push(ChatCompletionMessage {
                content: content.as_ref().map(|c| c.to_text()),
                role: Some(Role::Assistant),
                name: name.clone(),
                tool_call_id: None,
                tool_calls: (!tool_calls.is_empty())
                    .then(|| tool_calls.iter().map(to_wire_tool_call).collect()),
            }),
            Message::Tool { responses } => {
                for response in responses {
                    if response.id.is_empty() {
                        return Err(LlmError::InvalidRequest(format!(
                            "tool response `{}` must have an id",
                            response.name
                        )));
                    }
                    wire.push(ChatCompletionMessage {
                        content: Some(response.response_data.clone()),
                        role: Some(Role::Tool),
                        name: Some(response.name.clone()),
                        tool_call_id: Some(response.id.clone()),
                        tool_calls: None,
                    });
                }
            }
        }
    }
    Ok(wire)
}

fn to_wire_tool_call(call: &ToolCall) -> ToolCallDelta {
    ToolCallDelta {
        id: Some(call.id.clone()),
        tool_type: Some(call.tool_type.clone()),
        function: Some(FunctionDelta {
            name: Some(call.function.name.clone()),
            arguments: Some(call.function.arguments.clone()),
        }),
    }
}

fn from_wire_tool_call(call: &ToolCallDelta) -> ToolCall {
    let function = call.function.clone().unwrap_or_default();
    ToolCall {
        id: call.id.clone().unwrap_or_default(),
        tool_type: "function".to_string(),
        function: FunctionCall {
            name: function.name.unwrap_or_default(),
            arguments: function.arguments.unwrap_or_default(),
        },
    }
}

impl From<&Usage> for TokenUsage {
    fn from(usage: &Usage) -> Self {
        let input_tokens = usage.prompt_tokens.unwrap_or_default();
        let output_tokens = usage.completion_tokens.unwrap_or_default();
        TokenUsage {
            input_tokens,
            output_tokens,
            total_tokens: usage
                .total_tokens
                .unwrap_or_else(|| input_tokens.saturating_add(output_tokens)),
        }
    }
}

/// Reshape a merged chunk as a completion. A missing delta becomes an empty
/// assistant message; usage is taken from the last choice.
pub fn chunk_to_completion(chunk: ChatCompletionChunk) -> ChatCompletion {
    let usage = chunk.usage().cloned();
    let choices = chunk
        .choices
        .into_iter()
        .map(|choice| Choice {
            index: choice.index,
            message: choice
                .delta
                .unwrap_or_else(|| ChatCompletionMessage::new("", Role::Assistant)),
            finish_reason: choice.finish_reason,
            usage: choice.usage,
        })
        .collect();

    ChatCompletion {
        id: chunk.id,
        object: Some("chat.completion".to_string()),
        created: chunk.created,
        model: chunk.model,
        choices,
        usage,
    }
}

/// First role seen per response id, for one streaming call.
///
/// Only the first fragment of a message carries its role; later windows of
/// the same response reuse it.
#[derive(Debug, Default)]
pub struct RoleCache {
    roles: HashMap<String, Role>,
}

impl RoleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `role` for `id` unless a role was already recorded.
    pub fn observe(&mut self, id: &str, role: Option<Role>) {
        if let Some(role) = role {
            self.roles.entry(id.to_string()).or_insert(role);
        }
    }

    pub fn get(&self, id: &str) -> Option<Role> {
        self.roles.get(id).copied()
    }
}

/// Build the response of a non-streamed call.
pub fn completion_to_response(
    completion: ChatCompletion,
    previous: Option<&ChatResponse>,
) -> ChatResponse {
    build_response(completion, previous, |choice| choice.message.role)
}

/// Build the response for one streamed window, resolving the role through
/// the call's [`RoleCache`].
pub fn chunk_to_chat_response(
    chunk: ChatCompletionChunk,
    roles: &mut RoleCache,
    previous: Option<&ChatResponse>,
) -> ChatResponse {
    let completion = chunk_to_completion(chunk);
    let id = completion.id.clone().unwrap_or_default();
    build_response(completion, previous, |choice| {
        roles.observe(&id, choice.message.role);
        roles.get(&id)
    })
}

fn build_response(
    completion: ChatCompletion,
    previous: Option<&ChatResponse>,
    mut resolve_role: impl FnMut(&Choice) -> Option<Role>,
) -> ChatResponse {
    let id = completion.id.unwrap_or_default();

    let generations = completion
        .choices
        .iter()
        .map(|choice| {
            let role = resolve_role(choice);
            build_generation(choice, &id, role)
        })
        .collect();

    let current = completion
        .usage
        .as_ref()
        .map(TokenUsage::from)
        .unwrap_or_default();

    ChatResponse::new(
        generations,
        ChatResponseMetadata {
            id,
            model: completion.model.unwrap_or_default(),
            created: completion.created.unwrap_or_default(),
            usage: TokenUsage::cumulative(current, previous),
        },
    )
}

fn build_generation(choice: &Choice, id: &str, role: Option<Role>) -> Generation {
    let finish_reason = choice
        .finish_reason
        .map(|r| r.as_str().to_string())
        .unwrap_or_default();

    let properties = BTreeMap::from([
        ("id".to_string(), id.to_string()),
        (
            "role".to_string(),
            role.map(|r| r.as_str().to_string()).unwrap_or_default(),
        ),
        ("finish_reason".to_string(), finish_reason.clone()),
    ]);

    let tool_calls = choice
        .message
        .tool_calls
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(from_wire_tool_call)
        .collect();

    let output = AssistantMessage {
        content: choice.message.content.clone(),
        tool_calls,
        properties,
    };

    Generation::new(output).with_finish_reason(finish_reason)
}
