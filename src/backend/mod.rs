//! Generation backend capability.
//!
//! The engine and the meta-cognition observer consume text generation only
//! through [`GenerationBackend`]:
//!
//! - [`streaming`] - Chunk types and receivers for incremental generation
//! - [`openai`] - OpenAI-compatible Chat Completions backend over HTTP
//! - [`scripted`] - In-memory backend replaying canned output
//!
//! Backends own their transport concerns (timeouts, retries, auth). Errors
//! they return propagate unchanged through the engine.

pub mod openai;
pub mod scripted;
pub mod streaming;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

pub use openai::OpenAiBackend;
pub use scripted::ScriptedBackend;
pub use streaming::{ChannelStreamReceiver, StreamChunk, StreamReceiver, VecStreamReceiver};

/// Parameters of one streaming generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRequest {
    /// System prompt (voice framing, question, history).
    pub system: String,
    /// User turn (the continuation cue).
    pub prompt: String,
    /// Hard cap on generated tokens for this call.
    pub max_tokens: u32,
    /// Sequences at which generation stops.
    pub stop: Vec<String>,
}

/// Named JSON schema for structured-output calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSchema {
    /// Schema name, reported to providers that require one.
    pub name: String,
    /// JSON schema document.
    pub schema: Value,
}

impl ObjectSchema {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// A text-generation backend.
#[async_trait]
pub trait GenerationBackend: Send + Sync + std::fmt::Debug {
    /// Start a streaming generation; chunks arrive through the receiver.
    async fn stream_text(&self, request: StreamRequest) -> Result<Box<dyn StreamReceiver>>;

    /// Generate exactly one JSON value constrained to `schema`.
    async fn generate_object(&self, prompt: &str, schema: &ObjectSchema) -> Result<Value>;
}
