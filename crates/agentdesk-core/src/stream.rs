//! Server-Sent Events framing for streamed chat replies.
//!
//! The producer side splits a reply into [`StreamFrame::Chunk`]s followed by
//! a single [`StreamFrame::Done`]; on the wire each frame is
//! `data: <payload>\n\n` and the sentinel payload is `[DONE]`.
//!
//! The consumer side ([`SseAccumulator`], [`collect_stream`]) concatenates
//! the `content` field of every well-formed JSON payload, skips anything it
//! cannot parse, and distinguishes a clean finish (sentinel seen) from a
//! stream that closed early.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

pub const DONE_SENTINEL: &str = "[DONE]";

/// JSON payload of one streamed chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    Chunk(StreamChunk),
    Done,
}

impl StreamFrame {
    /// The text that follows `data: ` on the wire.
    pub fn data(&self) -> String {
        match self {
            StreamFrame::Chunk(chunk) => serde_json::to_string(chunk)
                .unwrap_or_else(|_| String::from("{}")),
            StreamFrame::Done => DONE_SENTINEL.to_owned(),
        }
    }

    /// The complete wire frame including the blank-line terminator.
    pub fn encode(&self) -> String {
        format!("data: {}\n\n", self.data())
    }
}

/// Split `reply` into chunk frames of at most `chunk_chars` characters and
/// terminate with the sentinel. An empty reply yields only the sentinel.
pub fn reply_frames(reply: &str, chunk_chars: usize) -> Vec<StreamFrame> {
    let size = chunk_chars.max(1);
    let chars: Vec<char> = reply.chars().collect();
    let mut frames: Vec<StreamFrame> = chars
        .chunks(size)
        .map(|c| {
            StreamFrame::Chunk(StreamChunk {
                content: c.iter().collect(),
            })
        })
        .collect();
    frames.push(StreamFrame::Done);
    frames
}

/// Result of consuming an event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The `[DONE]` sentinel was observed.
    Complete(String),
    /// The input ended before the sentinel; the text is what arrived.
    Incomplete(String),
}

impl StreamOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, StreamOutcome::Complete(_))
    }

    pub fn text(&self) -> &str {
        match self {
            StreamOutcome::Complete(t) | StreamOutcome::Incomplete(t) => t,
        }
    }
}

/// Incremental SSE consumer. Bytes may be fed in arbitrary splits,
/// including splits inside a multi-byte character.
#[derive(Debug, Default)]
pub struct SseAccumulator {
    pending: Vec<u8>,
    content: String,
    done: bool,
}

impl SseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed raw bytes. Returns `true` once the sentinel has been seen; any
    /// input after that is ignored.
    pub fn push(&mut self, bytes: &[u8]) -> bool {
        if self.done {
            return true;
        }
        self.pending.extend_from_slice(bytes);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.consume_line(&line);
            if self.done {
                self.pending.clear();
                break;
            }
        }
        self.done
    }

    fn consume_line(&mut self, raw: &[u8]) {
        let Ok(line) = std::str::from_utf8(raw) else {
            tracing::debug!("skipping non-UTF-8 event line");
            return;
        };
        let line = line.trim_end_matches(['\n', '\r']);
        let Some(data) = line.strip_prefix("data:") else {
            return;
        };
        let data = data.strip_prefix(' ').unwrap_or(data);
        if data.trim() == DONE_SENTINEL {
            self.done = true;
            return;
        }
        match serde_json::from_str::<serde_json::Value>(data) {
            Ok(value) => {
                if let Some(text) = value.get("content").and_then(|c| c.as_str()) {
                    self.content.push_str(text);
                }
            }
            Err(e) => tracing::debug!(error = %e, "skipping malformed event payload"),
        }
    }

    /// Close the accumulator. A trailing line without a newline is still
    /// considered, as if the stream had terminated it.
    pub fn finish(mut self) -> StreamOutcome {
        if !self.done && !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.consume_line(&rest);
        }
        if self.done {
            StreamOutcome::Complete(self.content)
        } else {
            StreamOutcome::Incomplete(self.content)
        }
    }
}

/// Drain `stream` until the sentinel or end of input.
///
/// Consumption stops at the sentinel without polling the stream further.
pub async fn collect_stream<S, E>(stream: S) -> Result<StreamOutcome, E>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    let mut acc = SseAccumulator::new();
    let mut stream = std::pin::pin!(stream);
    while let Some(chunk) = stream.next().await {
        if acc.push(&chunk?) {
            break;
        }
    }
    Ok(acc.finish())
}
