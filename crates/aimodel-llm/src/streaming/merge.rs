//! Left-fold merge of streamed fragments.
//!
//! Every scalar field follows "current if present, else previous". The one
//! exception is `function.arguments`, which is concatenated in arrival order
//! because the provider sends it as consecutive slices of a single JSON value.
//!
//! The merge is not associative: whether a tool call entry opens a new call
//! depends on its `id`, so callers must fold strictly left to right.

use super::chunk::{
    ChatCompletionChunk, ChatCompletionMessage, ChunkChoice, FunctionDelta, Role, ToolCallDelta,
};
use crate::error::{LlmError, Result};

/// Merge `current` onto the accumulated `previous` fragment.
///
/// With no `previous` the fragment is returned as is. A fragment carrying
/// more than one tool call entry is rejected either way.
pub fn merge_chunks(
    previous: Option<ChatCompletionChunk>,
    current: ChatCompletionChunk,
) -> Result<ChatCompletionChunk> {
    ensure_single_tool_call(&current)?;

    let Some(previous) = previous else {
        return Ok(current);
    };

    let choice = merge_choice(
        previous.choices.into_iter().next(),
        current.choices.into_iter().next(),
    )?;

    Ok(ChatCompletionChunk {
        id: current.id.or(previous.id),
        object: current.object.or(previous.object),
        created: current.created.or(previous.created),
        model: current.model.or(previous.model),
        choices: choice.into_iter().collect(),
    })
}

fn ensure_single_tool_call(chunk: &ChatCompletionChunk) -> Result<()> {
    let count = chunk.tool_calls().len();
    if count > 1 {
        return Err(LlmError::UnsupportedMultiToolCall { count });
    }
    Ok(())
}

fn merge_choice(
    previous: Option<ChunkChoice>,
    current: Option<ChunkChoice>,
) -> Result<Option<ChunkChoice>> {
    let (previous, current) = match (previous, current) {
        (Some(previous), Some(current)) => (previous, current),
        (previous, current) => return Ok(current.or(previous)),
    };

    Ok(Some(ChunkChoice {
        index: current.index.or(previous.index),
        delta: merge_message(previous.delta, current.delta)?,
        finish_reason: current.finish_reason.or(previous.finish_reason),
        usage: current.usage.or(previous.usage),
    }))
}

fn merge_message(
    previous: Option<ChatCompletionMessage>,
    current: Option<ChatCompletionMessage>,
) -> Result<Option<ChatCompletionMessage>> {
    if previous.is_none() && current.is_none() {
        return Ok(None);
    }
    let previous = previous.unwrap_or_default();
    let current = current.unwrap_or_default();

    let mut tool_calls = previous.tool_calls.unwrap_or_default();
    let last_previous = tool_calls.pop();

    let mut current_calls = current.tool_calls.unwrap_or_default();
    if current_calls.len() > 1 {
        return Err(LlmError::UnsupportedMultiToolCall {
            count: current_calls.len(),
        });
    }

    match current_calls.pop() {
        None => tool_calls.extend(last_previous),
        Some(opening) if opening.id.is_some() => {
            tool_calls.extend(last_previous);
            tool_calls.push(opening);
        }
        Some(continuation) => tool_calls.push(merge_tool_call(last_previous, continuation)),
    }

    Ok(Some(ChatCompletionMessage {
        content: current
            .content
            .or(previous.content)
            .or_else(|| Some(String::new())),
        role: current.role.or(previous.role).or(Some(Role::Assistant)),
        name: current.name.or(previous.name),
        tool_call_id: current.tool_call_id.or(previous.tool_call_id),
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
    }))
}

pub(crate) fn merge_tool_call(
    previous: Option<ToolCallDelta>,
    current: ToolCallDelta,
) -> ToolCallDelta {
    let Some(previous) = previous else {
        return current;
    };

    ToolCallDelta {
        id: current.id.or(previous.id),
        tool_type: current.tool_type.or(previous.tool_type),
        function: merge_function(previous.function, current.function),
    }
}

pub(crate) fn merge_function(
    previous: Option<FunctionDelta>,
    current: Option<FunctionDelta>,
) -> Option<FunctionDelta> {
    let Some(previous) = previous else {
        return current;
    };
    let current = current.unwrap_or_default();

    let mut arguments = previous.arguments.unwrap_or_default();
    arguments.push_str(current.arguments.as_deref().unwrap_or_default());

    Some(FunctionDelta {
        name: current.name.or(previous.name),
        arguments: Some(arguments),
    })
}
