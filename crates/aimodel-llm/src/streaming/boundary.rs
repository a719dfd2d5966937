//! Tool-call boundary detection over single fragments.

use super::chunk::{ChatCompletionChunk, FinishReason};

/// How a fragment relates to a streamed tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Ordinary,
    Opens,
    Continues,
    Finishes,
}

/// True when the first choice's delta carries at least one tool call entry.
pub fn opens_or_continues_tool_call(chunk: &ChatCompletionChunk) -> bool {
    !chunk.tool_calls().is_empty()
}

/// True when the first choice finished with `tool_calls`.
pub fn finishes_tool_call(chunk: &ChatCompletionChunk) -> bool {
    chunk.finish_reason() == Some(FinishReason::ToolCalls)
}

pub fn classify(chunk: &ChatCompletionChunk) -> FragmentKind {
    if finishes_tool_call(chunk) {
        return FragmentKind::Finishes;
    }
    match chunk.tool_calls().first() {
        Some(call) if call.id.is_some() => FragmentKind::Opens,
        Some(_) => FragmentKind::Continues,
        None => FragmentKind::Ordinary,
    }
}
