//! OpenAI-compatible streaming adapter
//!
//! Speaks the `chat/completions` wire format with `stream: true` and reads
//! the response line by line. Only `data: ` lines matter; `[DONE]` ends the
//! stream and lines that fail to parse (bad JSON or bad UTF-8) are skipped.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio_util::codec::{AnyDelimiterCodec, FramedRead};
use tokio_util::io::StreamReader;

use super::{CHAT_SYSTEM_PROMPT, ChatStream, StreamAdapter};
use crate::protocol::UnifiedChunk;
use crate::registry::ModelEntry;
use crate::types::{ChatMessage, ChatRequest};

const DATA_PREFIX: &str = "data: ";
const DONE_MARKER: &str = "[DONE]";

/// Longest accepted response line. Longer lines end the stream with an error.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Request body for a streaming chat completion.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub stream: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl From<&ChatMessage> for WireMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
        }
    }
}

/// One streamed `chat.completion.chunk`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    pub content: Option<String>,
}

/// What a single response line means to the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLine {
    /// Not a `data: ` line, or a chunk carrying no text.
    Ignored,
    Done,
    /// `data: ` payload that is not a valid chunk.
    Malformed,
    Delta(String),
}

/// Classify one line of the response body.
pub fn parse_data_line(line: &str) -> DataLine {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return DataLine::Ignored;
    };
    if payload.trim() == DONE_MARKER {
        return DataLine::Done;
    }
    match serde_json::from_str::<ChatCompletionChunk>(payload) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
            .map(DataLine::Delta)
            .unwrap_or(DataLine::Ignored),
        Err(_) => DataLine::Malformed,
    }
}

/// Classify one raw line, newline already stripped. Lines that are not valid
/// UTF-8 count as malformed.
pub fn classify_line(raw: &[u8]) -> DataLine {
    match std::str::from_utf8(raw) {
        Ok(line) => parse_data_line(line.trim_end_matches('\r')),
        Err(_) if raw.starts_with(DATA_PREFIX.as_bytes()) => DataLine::Malformed,
        Err(_) => DataLine::Ignored,
    }
}

/// Turn a `200` response body into chunks.
///
/// A read error or an over-long line ends the stream with one error chunk.
/// A body that ends without `[DONE]` yields no terminal chunk.
pub fn data_line_chunks<S>(provider: &'static str, body: S) -> ChatStream
where
    S: Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let reader = StreamReader::new(body);
        let codec = AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), Vec::new(), MAX_LINE_BYTES);
        let lines = FramedRead::new(reader, codec);
        futures::pin_mut!(lines);
        let mut skipped = 0usize;
        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(provider, error = %e, "stream read failed");
                    yield UnifiedChunk::error(format!("Streaming error: {e}"));
                    return;
                }
            };
            match classify_line(&line) {
                DataLine::Delta(text) => yield UnifiedChunk::Text(text),
                DataLine::Done => {
                    tracing::debug!(provider, skipped, "upstream stream finished");
                    yield UnifiedChunk::stop();
                    return;
                }
                DataLine::Malformed => {
                    skipped += 1;
                    tracing::debug!(provider, "skipping malformed data line");
                }
                DataLine::Ignored => {}
            }
        }

        tracing::debug!(provider, skipped, "upstream closed without terminator");
    })
}

/// Streaming adapter for OpenAI-compatible endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleAdapter {
    name: &'static str,
    label: &'static str,
    http_client: reqwest::Client,
    endpoint: String,
    extra_headers: Vec<(&'static str, &'static str)>,
}

impl OpenAiCompatibleAdapter {
    pub fn new(
        name: &'static str,
        label: &'static str,
        http_client: reqwest::Client,
        base_url: &str,
    ) -> Self {
        Self {
            name,
            label,
            http_client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            extra_headers: Vec::new(),
        }
    }

    /// OpenRouter, with the attribution headers it asks callers to send.
    pub fn openrouter(http_client: reqwest::Client, base_url: &str) -> Self {
        Self::new("openrouter", "OpenRouter", http_client, base_url)
            .with_header("HTTP-Referer", "https://chat0.dev")
            .with_header("X-Title", "Chat0")
    }

    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.extra_headers.push((name, value));
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Body with the chat system prompt as the leading message.
    pub fn build_request(&self, request: &ChatRequest, model: &ModelEntry) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(WireMessage {
            role: "system".to_string(),
            content: CHAT_SYSTEM_PROMPT.to_string(),
        });
        messages.extend(request.messages.iter().map(WireMessage::from));
        ChatCompletionRequest {
            model: model.model_id.clone(),
            messages,
            stream: true,
        }
    }
}

impl StreamAdapter for OpenAiCompatibleAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn stream(&self, request: ChatRequest, model: ModelEntry, api_key: SecretString) -> ChatStream {
        let name = self.name;
        let label = self.label;
        let body = self.build_request(&request, &model);
        let mut builder = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(api_key.expose_secret())
            .json(&body);
        for (header, value) in &self.extra_headers {
            builder = builder.header(*header, *value);
        }

        Box::pin(async_stream::stream! {
            tracing::info!(provider = name, model = %model.model_id, "upstream stream started");

            let response = match builder.send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(provider = name, error = %e, "upstream request failed");
                    yield UnifiedChunk::error(format!("Failed to connect to {label}: {e}"));
                    return;
                }
            };

            let status = response.status();
            if status != reqwest::StatusCode::OK {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(provider = name, status = status.as_u16(), "upstream rejected request");
                yield UnifiedChunk::error(format!("{label} API error {}: {}", status.as_u16(), body));
                return;
            }

            let body = response.bytes_stream().map(|r| r.map_err(std::io::Error::other));
            let mut chunks = data_line_chunks(name, body);
            while let Some(chunk) = chunks.next().await {
                yield chunk;
            }
        })
    }
}
