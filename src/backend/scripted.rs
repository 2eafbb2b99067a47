//! In-memory backend replaying canned output.
//!
//! Each `stream_text` call consumes the next scripted reply and streams it
//! word by word; each `generate_object` call consumes the next scripted
//! value. Every request is recorded for inspection. Used by the test suite
//! and by `think --dry-run`.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use super::streaming::{StreamChunk, StreamReceiver, VecStreamReceiver};
use super::{GenerationBackend, ObjectSchema, StreamRequest};
use crate::error::{Result, ThinkingError};

/// One scripted streaming reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    /// Stream the text, then finish normally.
    Text(String),
    /// Stream the text, then emit a stream error.
    FailAfter { text: String, message: String },
    /// Refuse the call before streaming anything.
    Refuse(String),
}

#[derive(Debug, Default)]
struct ScriptState {
    replies: VecDeque<ScriptedReply>,
    objects: VecDeque<Value>,
    stream_requests: Vec<StreamRequest>,
    object_prompts: Vec<String>,
}

/// Backend that replays a fixed script.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    state: Mutex<ScriptState>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose streaming replies are the given texts, in order.
    pub fn with_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let backend = Self::new();
        for segment in segments {
            backend.push_reply(ScriptedReply::Text(segment.into()));
        }
        backend
    }

    pub fn push_reply(&self, reply: ScriptedReply) {
        self.lock().replies.push_back(reply);
    }

    pub fn push_object(&self, value: Value) {
        self.lock().objects.push_back(value);
    }

    /// Streaming requests received so far.
    pub fn stream_requests(&self) -> Vec<StreamRequest> {
        self.lock().stream_requests.clone()
    }

    /// Structured-output prompts received so far.
    pub fn object_prompts(&self) -> Vec<String> {
        self.lock().object_prompts.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Split text into word-sized deltas that concatenate back to the input.
fn word_deltas(text: &str) -> Vec<StreamChunk> {
    text.split_inclusive(' ').map(StreamChunk::text).collect()
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn stream_text(&self, request: StreamRequest) -> Result<Box<dyn StreamReceiver>> {
        let reply = {
            let mut state = self.lock();
            state.stream_requests.push(request);
            state.replies.pop_front()
        };

        let chunks = match reply {
            Some(ScriptedReply::Text(text)) => {
                let mut chunks = word_deltas(&text);
                chunks.push(StreamChunk::Done);
                chunks
            }
            Some(ScriptedReply::FailAfter { text, message }) => {
                let mut chunks = word_deltas(&text);
                chunks.push(StreamChunk::Error { message });
                chunks
            }
            Some(ScriptedReply::Refuse(message)) => return Err(ThinkingError::Backend(message)),
            None => return Err(ThinkingError::backend("scripted backend has no replies left")),
        };
        Ok(Box::new(VecStreamReceiver::new(chunks)))
    }

    async fn generate_object(&self, prompt: &str, _schema: &ObjectSchema) -> Result<Value> {
        let mut state = self.lock();
        state.object_prompts.push(prompt.to_string());
        state
            .objects
            .pop_front()
            .ok_or_else(|| ThinkingError::backend("scripted backend has no objects left"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> StreamRequest {
        StreamRequest {
            system: "sys".into(),
            prompt: "Begin thinking.".into(),
            max_tokens: 10,
            stop: vec![],
        }
    }

    async fn collect(rx: &mut Box<dyn StreamReceiver>) -> Vec<StreamChunk> {
        let mut out = Vec::new();
        while let Some(chunk) = rx.next().await {
            out.push(chunk);
        }
        out
    }

    #[test]
    fn test_word_deltas_roundtrip() {
        let text = "one two  three";
        let joined: String = word_deltas(text)
            .into_iter()
            .map(|c| match c {
                StreamChunk::TextDelta { text } => text,
                _ => String::new(),
            })
            .collect();
        assert_eq!(joined, text);
    }

    #[tokio::test]
    async fn test_replays_in_order_and_records() {
        let backend = ScriptedBackend::with_segments(["first reply", "second"]);
        let mut rx = backend.stream_text(request()).await.unwrap();
        let chunks = collect(&mut rx).await;
        assert_eq!(chunks.last(), Some(&StreamChunk::Done));
        assert_eq!(chunks[0], StreamChunk::text("first "));

        let _ = backend.stream_text(request()).await.unwrap();
        assert_eq!(backend.stream_requests().len(), 2);
        assert!(backend.stream_text(request()).await.is_err());
    }

    #[tokio::test]
    async fn test_fail_after_and_refuse() {
        let backend = ScriptedBackend::new();
        backend.push_reply(ScriptedReply::FailAfter {
            text: "partial".into(),
            message: "socket closed".into(),
        });
        backend.push_reply(ScriptedReply::Refuse("401".into()));

        let mut rx = backend.stream_text(request()).await.unwrap();
        let chunks = collect(&mut rx).await;
        assert_eq!(
            chunks.last(),
            Some(&StreamChunk::Error { message: "socket closed".into() })
        );
        let err = backend.stream_text(request()).await.err().unwrap();
        assert!(err.is_backend());
    }

    #[tokio::test]
    async fn test_objects() {
        let backend = ScriptedBackend::new();
        backend.push_object(serde_json::json!({"shouldAdjust": false}));
        let schema = ObjectSchema::new("s", serde_json::json!({}));
        let value = backend.generate_object("watch", &schema).await.unwrap();
        assert_eq!(value["shouldAdjust"], false);
        assert_eq!(backend.object_prompts(), vec!["watch".to_string()]);
        assert!(backend.generate_object("again", &schema).await.is_err());
    }
}
