//! OpenAI-compatible Chat Completions backend.
//!
//! Streaming uses server-sent events: a spawned task reads the response body,
//! splits it into `data:` lines and pushes [`StreamChunk`]s into a channel.
//! Structured output uses `response_format: json_schema` in strict mode.
//!
//! Works against any server that speaks the Chat Completions wire format
//! (OpenAI, vLLM, Ollama's compatibility endpoint, ...).

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Buf, Bytes, BytesMut};
use futures::{Stream, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tokio::sync::mpsc;

use super::streaming::{ChannelStreamReceiver, StreamChunk, StreamReceiver};
use super::{GenerationBackend, ObjectSchema, StreamRequest};
use crate::config::BackendSettings;
use crate::error::{Result, ThinkingError};

/// Capacity of the chunk channel between the SSE reader task and the engine.
const STREAM_CHANNEL_CAPACITY: usize = 64;

/// Matches a fenced ```json block some servers wrap structured output in.
static FENCED_JSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```").expect("valid fenced-json regex")
});

/// Chat Completions backend over `reqwest`.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    settings: BackendSettings,
    client: reqwest::Client,
}

impl OpenAiBackend {
    /// Build a backend from settings. Fails when no API key is configured.
    pub fn new(settings: BackendSettings) -> Result<Self> {
        if settings.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(ThinkingError::Config(
                "API key not set. Set OPENAI_API_KEY or pass an api_key in BackendSettings.".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    /// Request body for a streaming segment.
    pub fn build_stream_body(&self, request: &StreamRequest) -> Value {
        let mut body = serde_json::json!({
            "model": self.settings.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.prompt},
            ],
            "max_tokens": request.max_tokens,
            "stream": true,
        });
        if !request.stop.is_empty() {
            body["stop"] = serde_json::json!(request.stop);
        }
        if let Some(temp) = self.settings.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        body
    }

    /// Request body for a structured-output call.
    pub fn build_object_body(&self, prompt: &str, schema: &ObjectSchema) -> Value {
        serde_json::json!({
            "model": self.settings.model,
            "messages": [{"role": "user", "content": prompt}],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "schema": schema.schema,
                    "strict": true,
                },
            },
        })
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response> {
        let api_key = self.settings.api_key.as_deref().unwrap_or_default();
        let mut request = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", api_key));
        if let Some(ref org) = self.settings.organization {
            request = request.header("OpenAI-Organization", org);
        }

        let response = request.json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ThinkingError::Backend(format!(
                "API error ({}): {}",
                status,
                text.chars().take(500).collect::<String>()
            )));
        }
        Ok(response)
    }
}

/// Outcome of parsing one SSE line.
#[derive(Debug, PartialEq, Eq)]
enum SseLine {
    Text(String),
    Done,
    Skip,
    Malformed(String),
}

fn parse_sse_line(line: &str) -> SseLine {
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseLine::Done;
    }
    match serde_json::from_str::<Value>(data) {
        Ok(event) => {
            if let Some(err) = event.get("error") {
                return SseLine::Malformed(err.to_string());
            }
            match event["choices"][0]["delta"]["content"].as_str() {
                Some(text) if !text.is_empty() => SseLine::Text(text.to_string()),
                _ => SseLine::Skip,
            }
        }
        Err(e) => SseLine::Malformed(format!("invalid stream event: {}", e)),
    }
}

/// Pull complete lines out of the buffer, leaving any partial tail.
fn drain_lines(buffer: &mut BytesMut) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
        let line = buffer.split_to(pos);
        buffer.advance(1);
        lines.push(String::from_utf8_lossy(&line).trim_end_matches('\r').to_string());
    }
    lines
}

/// Forward one SSE line. Returns false once the stream should stop.
async fn forward_line(tx: &mpsc::Sender<StreamChunk>, line: &str) -> bool {
    let chunk = match parse_sse_line(line) {
        SseLine::Text(text) => StreamChunk::TextDelta { text },
        SseLine::Done => StreamChunk::Done,
        SseLine::Skip => return true,
        SseLine::Malformed(message) => StreamChunk::Error { message },
    };
    let terminal = !matches!(chunk, StreamChunk::TextDelta { .. });
    tx.send(chunk).await.is_ok() && !terminal
}

/// Read an SSE body and push chunks into `tx` until `[DONE]`, an error or
/// the end of the body. A final line without a trailing newline still counts.
async fn pump_sse<S, E>(stream: S, tx: mpsc::Sender<StreamChunk>)
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: std::fmt::Display,
{
    futures::pin_mut!(stream);
    let mut buffer = BytesMut::new();
    while let Some(next) = stream.next().await {
        let bytes = match next {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tx.send(StreamChunk::Error { message: e.to_string() }).await;
                return;
            }
        };
        buffer.extend_from_slice(&bytes);
        for line in drain_lines(&mut buffer) {
            if !forward_line(&tx, &line).await {
                return;
            }
        }
    }
    if !buffer.is_empty() {
        let tail = String::from_utf8_lossy(&buffer).trim_end_matches('\r').to_string();
        if !forward_line(&tx, &tail).await {
            return;
        }
    }
    let _ = tx.send(StreamChunk::Done).await;
}

/// Extract the JSON object from a structured-output message body.
fn extract_json(content: &str) -> &str {
    match FENCED_JSON.captures(content).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => content.trim(),
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    async fn stream_text(&self, request: StreamRequest) -> Result<Box<dyn StreamReceiver>> {
        log::debug!(
            "OpenAiBackend.stream_text: model={}, max_tokens={}",
            self.settings.model,
            request.max_tokens
        );
        let body = self.build_stream_body(&request);
        let response = self.post(&body).await?;

        let (tx, rx) = ChannelStreamReceiver::pair(STREAM_CHANNEL_CAPACITY);
        tokio::spawn(pump_sse(response.bytes_stream(), tx));

        Ok(Box::new(rx))
    }

    async fn generate_object(&self, prompt: &str, schema: &ObjectSchema) -> Result<Value> {
        log::debug!(
            "OpenAiBackend.generate_object: model={}, schema={}",
            self.settings.model,
            schema.name
        );
        let body = self.build_object_body(prompt, schema);
        let response: Value = self.post(&body).await?.json().await?;

        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ThinkingError::backend("response has no message content"))?;
        serde_json::from_str(extract_json(content)).map_err(|e| {
            ThinkingError::SchemaViolation(format!("structured output is not valid JSON: {}", e))
        })
    }
}
