//! Windowing state machine.
//!
//! A window is either one ordinary fragment or the full run of fragments of
//! one streamed tool call. Ordinary fragments pass straight through; a tool
//! call is accumulated until the fragment finishing it arrives.

use serde::{Deserialize, Serialize};

use super::boundary::{classify, finishes_tool_call, opens_or_continues_tool_call};
use super::chunk::ChatCompletionChunk;
use super::merge::merge_chunks;
use crate::error::{LlmError, Result};

/// What to do with a tool call window still open when the stream ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncompleteToolCallPolicy {
    /// Discard the partial call without emitting it.
    #[default]
    Drop,
    /// Fail the stream with [`LlmError::IncompleteToolCall`].
    Error,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum WindowState {
    #[default]
    Outside,
    /// Accumulated record of the open tool call window.
    Inside(ChatCompletionChunk),
}

impl WindowState {
    /// Feed one fragment. Returns the next state and the merged record of the
    /// window this fragment closed, if any.
    pub fn advance(
        self,
        chunk: ChatCompletionChunk,
    ) -> Result<(Self, Option<ChatCompletionChunk>)> {
        let closes = finishes_tool_call(&chunk);

        match self {
            Self::Outside if !opens_or_continues_tool_call(&chunk) => {
                let record = merge_chunks(None, chunk)?;
                Ok((Self::Outside, Some(record)))
            }
            Self::Outside => {
                let seed = merge_chunks(None, chunk)?;
                if closes {
                    Ok((Self::Outside, Some(seed)))
                } else {
                    Ok((Self::Inside(seed), None))
                }
            }
            Self::Inside(accumulated) => {
                let merged = merge_chunks(Some(accumulated), chunk)?;
                if closes {
                    Ok((Self::Outside, Some(merged)))
                } else {
                    Ok((Self::Inside(merged), None))
                }
            }
        }
    }

    /// Terminate the sequence. An open window is never emitted.
    pub fn finish(self, policy: IncompleteToolCallPolicy) -> Result<()> {
        let Self::Inside(accumulated) = self else {
            return Ok(());
        };

        let open_call = accumulated.tool_calls().last().cloned().unwrap_or_default();
        let id = open_call.id;
        let name = open_call.function.and_then(|f| f.name);

        match policy {
            IncompleteToolCallPolicy::Drop => {
                tracing::warn!(
                    tool_call_id = ?id,
                    tool_name = ?name,
                    "stream ended inside a tool call; dropping partial window"
                );
                Ok(())
            }
            IncompleteToolCallPolicy::Error => Err(LlmError::IncompleteToolCall { id, name }),
        }
    }

    pub fn is_inside(&self) -> bool {
        matches!(self, Self::Inside(_))
    }
}

/// Push-style wrapper around [`WindowState`] owning one call's state.
#[derive(Debug, Default)]
pub struct ChunkAggregator {
    state: WindowState,
    policy: IncompleteToolCallPolicy,
    fragments_seen: usize,
    windows_emitted: usize,
}

impl ChunkAggregator {
    pub fn new(policy: IncompleteToolCallPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn push(&mut self, chunk: ChatCompletionChunk) -> Result<Option<ChatCompletionChunk>> {
        self.fragments_seen += 1;
        let kind = classify(&chunk);

        let state = std::mem::take(&mut self.state);
        let (next, emitted) = state.advance(chunk)?;
        self.state = next;

        tracing::trace!(
            fragment = self.fragments_seen,
            ?kind,
            inside_tool_call = self.state.is_inside(),
            "fragment aggregated"
        );

        if emitted.is_some() {
            self.windows_emitted += 1;
            tracing::debug!(window = self.windows_emitted, "window closed");
        }

        Ok(emitted)
    }

    pub fn finish(self) -> Result<()> {
        tracing::debug!(
            fragments = self.fragments_seen,
            windows = self.windows_emitted,
            "stream finished"
        );
        self.state.finish(self.policy)
    }

    pub fn is_inside(&self) -> bool {
        self.state.is_inside()
    }

    pub fn windows_emitted(&self) -> usize {
        self.windows_emitted
    }
}
