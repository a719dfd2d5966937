//! Server-sent event framing for chat completion streams.

use std::pin::Pin;

use futures::{Stream, StreamExt};

use super::chunk::ChatCompletionChunk;
use crate::buffer_utils::CircularLineBuffer;
use crate::error::{LlmError, Result};

/// Terminal marker sent as the last `data:` payload.
pub const DONE_SENTINEL: &str = "[DONE]";

pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

pub fn is_sentinel(data: &str) -> bool {
    data.trim() == DONE_SENTINEL
}

/// Parse one `data:` payload into a fragment.
pub fn decode_frame(frame: &str) -> Result<ChatCompletionChunk> {
    serde_json::from_str(frame).map_err(|source| LlmError::Decode {
        frame: frame.to_string(),
        source,
    })
}

/// Payload of an SSE `data:` line. Other fields (`event:`, `id:`, comments)
/// carry nothing for chat completions.
fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Split a raw body into `data:` payloads.
///
/// The sentinel ends the sequence and is never yielded; a body that closes
/// without one ends it as well. The first error ends the sequence.
pub fn sse_frames<S, B, E>(body: S) -> FrameStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<LlmError> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut body = Box::pin(body);
        let mut buffer = CircularLineBuffer::with_capacity(4096);

        while let Some(bytes_result) = body.next().await {
            let bytes = match bytes_result {
                Ok(bytes) => bytes,
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            };
            buffer.extend(bytes.as_ref());

            while let Some(line_result) = buffer.next_line() {
                let line = match line_result {
                    Ok(line) => line,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                let Some(data) = data_payload(&line) else {
                    continue;
                };
                if data.is_empty() {
                    continue;
                }
                if is_sentinel(data) {
                    tracing::trace!("stream sentinel received");
                    return;
                }
                yield Ok(data.to_string());
            }
        }

        match buffer.take_remainder() {
            Some(Ok(line)) => {
                if let Some(data) = data_payload(&line) {
                    if !data.is_empty() && !is_sentinel(data) {
                        yield Ok(data.to_string());
                    }
                }
            }
            Some(Err(e)) => yield Err(e),
            None => {}
        }
    })
}

/// Decode every frame into a fragment; the first failure ends the sequence.
pub fn decode_frames(
    frames: FrameStream,
) -> Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk>> + Send>> {
    Box::pin(async_stream::stream! {
        let mut frames = frames;
        while let Some(frame_result) = frames.next().await {
            match frame_result.and_then(|frame| decode_frame(&frame)) {
                Ok(chunk) => yield Ok(chunk),
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
    })
}
