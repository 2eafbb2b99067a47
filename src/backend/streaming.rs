//! Streaming text support.
//!
//! A backend's streaming call hands back a [`StreamReceiver`] that yields
//! [`StreamChunk`] values in generation order. Providers that push chunks
//! from a background task use [`ChannelStreamReceiver`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// StreamChunk
// ---------------------------------------------------------------------------

/// A single chunk from a streaming generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    /// A text increment.
    TextDelta {
        /// The text fragment.
        text: String,
    },

    /// Generation ended normally (length cap or stop sequence).
    Done,

    /// The stream failed mid-flight.
    Error {
        /// Error message.
        message: String,
    },
}

impl StreamChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self::TextDelta { text: text.into() }
    }
}

// ---------------------------------------------------------------------------
// StreamReceiver
// ---------------------------------------------------------------------------

/// Receiver for streaming chunks.
///
/// Abstracts over the underlying transport (SSE, channel, in-memory script).
#[async_trait]
pub trait StreamReceiver: Send {
    /// Get the next chunk from the stream.
    ///
    /// Returns `None` once the stream is exhausted. A closed stream without a
    /// preceding `Done` is treated as a normal end.
    async fn next(&mut self) -> Option<StreamChunk>;
}

// ---------------------------------------------------------------------------
// ChannelStreamReceiver — wraps a tokio channel
// ---------------------------------------------------------------------------

/// A `StreamReceiver` backed by a tokio mpsc channel.
pub struct ChannelStreamReceiver {
    rx: tokio::sync::mpsc::Receiver<StreamChunk>,
}

impl ChannelStreamReceiver {
    pub fn new(rx: tokio::sync::mpsc::Receiver<StreamChunk>) -> Self {
        Self { rx }
    }

    /// Create a matched pair of sender + receiver.
    pub fn pair(buffer: usize) -> (tokio::sync::mpsc::Sender<StreamChunk>, Self) {
        let (tx, rx) = tokio::sync::mpsc::channel(buffer);
        (tx, Self { rx })
    }
}

#[async_trait]
impl StreamReceiver for ChannelStreamReceiver {
    async fn next(&mut self) -> Option<StreamChunk> {
        self.rx.recv().await
    }
}

// ---------------------------------------------------------------------------
// VecStreamReceiver — replays a fixed list
// ---------------------------------------------------------------------------

/// Replays a pre-built list of chunks.
pub struct VecStreamReceiver {
    chunks: std::collections::VecDeque<StreamChunk>,
}

impl VecStreamReceiver {
    pub fn new(chunks: Vec<StreamChunk>) -> Self {
        Self {
            chunks: chunks.into(),
        }
    }
}

#[async_trait]
impl StreamReceiver for VecStreamReceiver {
    async fn next(&mut self) -> Option<StreamChunk> {
        self.chunks.pop_front()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_chunk_serde() {
        let delta = StreamChunk::text("hello ");
        let json = serde_json::to_string(&delta).unwrap();
        assert_eq!(json, r#"{"type":"text_delta","text":"hello "}"#);
        let back: StreamChunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back, delta);
    }

    #[tokio::test]
    async fn test_channel_stream_receiver() {
        let (tx, mut rx) = ChannelStreamReceiver::pair(16);

        tx.send(StreamChunk::text("hi")).await.unwrap();
        tx.send(StreamChunk::Done).await.unwrap();
        drop(tx);

        assert_eq!(rx.next().await, Some(StreamChunk::text("hi")));
        assert_eq!(rx.next().await, Some(StreamChunk::Done));
        assert!(rx.next().await.is_none());
    }

    #[test]
    fn test_vec_stream_receiver() {
        let mut rx = VecStreamReceiver::new(vec![
            StreamChunk::text("a"),
            StreamChunk::Error { message: "boom".into() },
        ]);
        tokio_test::block_on(async {
            assert_eq!(rx.next().await, Some(StreamChunk::text("a")));
            assert!(matches!(rx.next().await, Some(StreamChunk::Error { .. })));
            assert!(rx.next().await.is_none());
        });
    }
}
