//! Shared helpers for relay integration tests: fixture loading, mock
//! upstream responses and chunk collection.
#![allow(dead_code)]

use chat0::protocol::UnifiedChunk;
use chat0::registry::{ModelEntry, ModelRegistry};
use chat0::streaming::ChatStream;
use chat0::types::{ChatMessage, ChatRequest};
use futures::StreamExt;
use secrecy::SecretString;
use wiremock::ResponseTemplate;

/// Read a file under `tests/fixtures/`.
pub fn load_fixture(relative: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), relative);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("load fixture {path}: {e}"))
}

/// A `200 text/event-stream` response replaying a fixture.
pub fn sse_response(relative: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(load_fixture(relative), "text/event-stream")
}

pub fn chat_request(model: &str, messages: Vec<ChatMessage>) -> ChatRequest {
    ChatRequest {
        messages,
        model: model.to_string(),
    }
}

/// Registry entry for a display name from the built-in table.
pub fn entry(display_name: &str) -> ModelEntry {
    ModelRegistry::global()
        .lookup(display_name)
        .cloned()
        .unwrap_or_else(|| panic!("{display_name} is not registered"))
}

pub fn key(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

pub async fn collect_chunks(stream: ChatStream) -> Vec<UnifiedChunk> {
    stream.collect().await
}

/// Concatenated text of every `Text` chunk.
pub fn text_of(chunks: &[UnifiedChunk]) -> String {
    chunks
        .iter()
        .filter_map(|chunk| match chunk {
            UnifiedChunk::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// Decode a full protocol body into chunks, asserting every line parses.
pub fn decode_body(body: &str) -> Vec<UnifiedChunk> {
    body.lines()
        .map(|line| UnifiedChunk::decode(line).unwrap_or_else(|| panic!("bad protocol line: {line}")))
        .collect()
}
