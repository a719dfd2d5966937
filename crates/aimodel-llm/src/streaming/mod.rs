//! Tool-call aware aggregation of streamed chat completion fragments.
//!
//! Pipeline per streaming call:
//! body bytes → [`sse::sse_frames`] (stops at the `[DONE]` sentinel) →
//! [`sse::decode_frames`] → [`aggregate_chunks`] (window state machine and
//! left-fold merge) → one merged [`ChatCompletionChunk`] per closed window.

pub mod boundary;
pub mod chunk;
pub mod merge;
pub mod sse;
pub mod window;

use std::pin::Pin;

use futures::{Stream, StreamExt};

use crate::error::{LlmError, Result};

pub use boundary::{classify, finishes_tool_call, opens_or_continues_tool_call, FragmentKind};
pub use chunk::{
    ChatCompletionChunk, ChatCompletionMessage, ChunkChoice, FinishReason, FunctionDelta, Role,
    ToolCallDelta, Usage,
};
pub use merge::merge_chunks;
pub use sse::{decode_frame, decode_frames, is_sentinel, sse_frames, DONE_SENTINEL};
pub use window::{ChunkAggregator, IncompleteToolCallPolicy, WindowState};

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk>> + Send>>;

/// Group fragments into windows and emit one merged record per window, in
/// the order the windows close.
///
/// Errors are forwarded and end the stream; records emitted before the error
/// stay delivered. Dropping the returned stream drops the source with it.
pub fn aggregate_chunks<S>(chunks: S, policy: IncompleteToolCallPolicy) -> ChunkStream
where
    S: Stream<Item = Result<ChatCompletionChunk>> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut chunks = Box::pin(chunks);
        let mut aggregator = ChunkAggregator::new(policy);

        while let Some(chunk_result) = chunks.next().await {
            let pushed = chunk_result.and_then(|chunk| aggregator.push(chunk));
            match pushed {
                Ok(Some(record)) => yield Ok(record),
                Ok(None) => {}
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        if let Err(e) = aggregator.finish() {
            yield Err(e);
        }
    })
}

/// Full pipeline from a raw SSE body to merged records.
pub fn aggregate_sse_body<S, B, E>(body: S, policy: IncompleteToolCallPolicy) -> ChunkStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<LlmError> + Send + 'static,
{
    aggregate_chunks(decode_frames(sse_frames(body)), policy)
}
