//! Gemini streaming adapter
//!
//! Calls `models/{model}:streamGenerateContent?alt=sse` and converts every
//! SSE frame into text chunks using eventsource-stream for frame parsing.
//!
//! Gemini has no system role in this request shape, so the chat system
//! prompt is folded into the first user message (see [`build_contents`]).
//! That quirk lives here and nowhere else.

use eventsource_stream::{Event, Eventsource};
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{CHAT_SYSTEM_PROMPT, ChatStream, StreamAdapter};
use crate::protocol::UnifiedChunk;
use crate::registry::ModelEntry;
use crate::types::{ChatMessage, ChatRequest, Role};

/// Header Gemini reads the API key from.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// `generateContent` request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![Part {
                text: Some(text.into()),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// `generateContent` response body, also the payload of each stream frame.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
}

/// Error object Gemini embeds in a frame or a failed response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    pub status: Option<String>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.code, &self.status) {
            (Some(code), Some(status)) => write!(f, "Error {code}, Status: {status}, Message: {}", self.message),
            (Some(code), None) => write!(f, "Error {code}, Message: {}", self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// Map the conversation into Gemini contents.
///
/// `assistant` becomes `model`; `system` turns are sent as `user` since
/// Gemini only accepts those two roles here. The chat system prompt is
/// prepended to the first user message only.
pub fn build_contents(messages: &[ChatMessage]) -> Vec<Content> {
    let mut system_added = false;
    messages
        .iter()
        .map(|msg| {
            let role = match msg.role {
                Role::Assistant => "model",
                Role::User | Role::System => "user",
            };
            let text = if !system_added && msg.role == Role::User {
                system_added = true;
                format!("{CHAT_SYSTEM_PROMPT}\n\nUser: {}", msg.content)
            } else {
                msg.content.clone()
            };
            Content::text(role, text)
        })
        .collect()
}

/// Converts Gemini SSE frames into text fragments.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiEventConverter;

impl GeminiEventConverter {
    pub fn new() -> Self {
        Self
    }

    /// Text fragments in one frame, or the error message the stream must end
    /// with. Empty frames yield no fragments.
    pub fn convert_event(&self, event: &Event) -> Result<Vec<String>, String> {
        if event.data.trim().is_empty() {
            return Ok(Vec::new());
        }
        let response: GenerateContentResponse = serde_json::from_str(&event.data)
            .map_err(|e| format!("Failed to parse Gemini stream frame: {e}"))?;
        if let Some(error) = response.error {
            return Err(error.to_string());
        }
        Ok(Self::extract_text(&response))
    }

    /// Every non-empty text part of every candidate, in order.
    pub fn extract_text(response: &GenerateContentResponse) -> Vec<String> {
        response
            .candidates
            .iter()
            .filter_map(|candidate| candidate.content.as_ref())
            .flat_map(|content| content.parts.iter())
            .filter_map(|part| part.text.as_ref())
            .filter(|text| !text.is_empty())
            .cloned()
            .collect()
    }
}

/// Streaming adapter for Gemini models.
#[derive(Debug, Clone)]
pub struct GeminiAdapter {
    http_client: reqwest::Client,
    base_url: String,
    converter: GeminiEventConverter,
}

impl GeminiAdapter {
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            converter: GeminiEventConverter::new(),
        }
    }

    pub fn stream_url(&self, model_id: &str) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, model_id
        )
    }
}

impl StreamAdapter for GeminiAdapter {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn stream(&self, request: ChatRequest, model: ModelEntry, api_key: SecretString) -> ChatStream {
        let http = self.http_client.clone();
        let url = self.stream_url(&model.model_id);
        let converter = self.converter;
        let body = GenerateContentRequest {
            contents: build_contents(&request.messages),
        };

        Box::pin(async_stream::stream! {
            tracing::info!(provider = "gemini", model = %model.model_id, url = %url, "upstream stream started");

            let response = match http
                .post(&url)
                .header(API_KEY_HEADER, api_key.expose_secret())
                .json(&body)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(provider = "gemini", error = %e, "upstream request failed");
                    yield UnifiedChunk::error(format!("Failed to connect to Gemini: {e}"));
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let detail = serde_json::from_str::<GenerateContentResponse>(&body)
                    .ok()
                    .and_then(|r| r.error)
                    .map(|e| e.to_string())
                    .unwrap_or(body);
                tracing::warn!(provider = "gemini", status = status.as_u16(), "upstream rejected request");
                yield UnifiedChunk::error(format!("Gemini API error {}: {}", status.as_u16(), detail));
                return;
            }

            let events = response.bytes_stream().eventsource();
            futures::pin_mut!(events);
            let mut fragments = 0usize;
            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(provider = "gemini", error = %e, "stream read failed");
                        yield UnifiedChunk::error(format!("Streaming error: {e}"));
                        return;
                    }
                };
                match converter.convert_event(&event) {
                    Ok(texts) => {
                        for text in texts {
                            fragments += 1;
                            yield UnifiedChunk::Text(text);
                        }
                    }
                    Err(message) => {
                        tracing::warn!(provider = "gemini", error = %message, "upstream stream error");
                        yield UnifiedChunk::error(message);
                        return;
                    }
                }
            }

            tracing::debug!(provider = "gemini", fragments, "upstream stream finished");
            yield UnifiedChunk::stop();
        })
    }
}
