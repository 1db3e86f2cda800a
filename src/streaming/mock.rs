//! Mock adapter
//!
//! Serves providers that have a registry entry and a resolved key but no
//! live integration. Emits a fixed token sequence followed by the content of
//! the last message, pausing after every chunk so clients see a real stream.

use std::time::Duration;

use secrecy::SecretString;

use super::{ChatStream, StreamAdapter};
use crate::protocol::UnifiedChunk;
use crate::registry::ModelEntry;
use crate::types::ChatRequest;

/// Tokens emitted before the echo, each followed by a single space.
pub const MOCK_TOKENS: [&str; 6] = ["Mock", "streaming", "response", "to", "your", "message"];

/// Canned streaming adapter.
#[derive(Debug, Clone)]
pub struct MockAdapter {
    delay: Duration,
}

impl MockAdapter {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// The chunks one request produces, without timing.
    ///
    /// Concatenating the text chunks yields
    /// `"Mock streaming response to your message " + last_content`.
    pub fn script(last_content: &str) -> Vec<UnifiedChunk> {
        MOCK_TOKENS
            .iter()
            .map(|token| UnifiedChunk::text(format!("{token} ")))
            .chain(std::iter::once(UnifiedChunk::text(last_content)))
            .chain(std::iter::once(UnifiedChunk::stop()))
            .collect()
    }
}

impl StreamAdapter for MockAdapter {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn stream(&self, request: ChatRequest, model: ModelEntry, _api_key: SecretString) -> ChatStream {
        let delay = self.delay;
        let last_content = request
            .last_message()
            .map(|msg| msg.content.clone())
            .unwrap_or_default();

        Box::pin(async_stream::stream! {
            tracing::info!(provider = %model.provider, model = %model.model_id, "serving mock stream");
            for chunk in MockAdapter::script(&last_content) {
                let terminal = chunk.is_terminal();
                yield chunk;
                if !terminal && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ProviderKind;
    use crate::types::ChatMessage;
    use futures::StreamExt;

    fn request(last: &str) -> ChatRequest {
        ChatRequest {
            messages: vec![ChatMessage::user("first"), ChatMessage::user(last)],
            model: "GPT-4o".to_string(),
        }
    }

    #[tokio::test]
    async fn echoes_last_message_after_fixed_tokens() {
        let adapter = MockAdapter::new(Duration::ZERO);
        let chunks: Vec<_> = adapter
            .stream(
                request("Hi"),
                ModelEntry::new("gpt-4o", ProviderKind::OpenAi),
                SecretString::from("k".to_string()),
            )
            .collect()
            .await;

        assert_eq!(chunks.len(), 8);
        assert_eq!(chunks.last(), Some(&UnifiedChunk::stop()));
        let text: String = chunks
            .iter()
            .filter_map(|c| match c {
                UnifiedChunk::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Mock streaming response to your message Hi");
    }

    #[tokio::test]
    async fn pauses_between_chunks() {
        let adapter = MockAdapter::new(Duration::from_millis(10));
        let started = std::time::Instant::now();
        let chunks: Vec<_> = adapter
            .stream(
                request("Hi"),
                ModelEntry::new("gpt-4o", ProviderKind::OpenAi),
                SecretString::from("k".to_string()),
            )
            .collect()
            .await;
        assert_eq!(chunks.len(), 8);
        assert!(started.elapsed() >= Duration::from_millis(70));
    }

    #[test]
    fn script_is_deterministic() {
        assert_eq!(MockAdapter::script("x"), MockAdapter::script("x"));
        assert_eq!(MockAdapter::script("x")[0], UnifiedChunk::text("Mock "));
    }
}
