//! Stream Adapters
//!
//! One [`StreamAdapter`] per provider family turns that provider's native
//! response stream into a [`ChatStream`] of [`UnifiedChunk`]s. The HTTP
//! layer writes each chunk as its own body frame, so a chunk reaches the
//! client as soon as the adapter yields it.
//!
//! ## Adapters
//!
//! - [`gemini::GeminiAdapter`] - Gemini `streamGenerateContent` SSE frames
//! - [`openai_compatible::OpenAiCompatibleAdapter`] - OpenAI-style
//!   `data:` lines (OpenRouter)
//! - [`mock::MockAdapter`] - canned tokens for providers without a live
//!   integration
//!
//! ## Termination
//!
//! A stream ends after its first terminal chunk. A stream that ends with an
//! [`UnifiedChunk::Error`] never carries a `Finish` chunk, and a stream may
//! also end with neither (upstream closed without a terminator), so
//! consumers must treat "no terminal chunk" as a valid outcome.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use secrecy::SecretString;

use crate::error::RelayError;
use crate::protocol::UnifiedChunk;
use crate::registry::{ModelEntry, ProviderKind};
use crate::types::ChatRequest;

pub mod gemini;
pub mod mock;
pub mod openai_compatible;

pub use gemini::GeminiAdapter;
pub use mock::MockAdapter;
pub use openai_compatible::OpenAiCompatibleAdapter;

/// Stream of unified protocol chunks for one chat request.
pub type ChatStream = Pin<Box<dyn Stream<Item = UnifiedChunk> + Send>>;

/// System instruction sent with every chat conversation.
pub const CHAT_SYSTEM_PROMPT: &str = "You are Chat0, an ai assistant that can answer questions and help with tasks.
Be helpful and provide relevant information.
Be respectful and polite in all interactions.
Be engaging and maintain a conversational tone.
Always use LaTeX for mathematical expressions:
Inline math must be wrapped in single dollar signs: $content$
Display math must be wrapped in double dollar signs: $$content$$
Display math should be placed on its own line, with nothing else on that line.
Do not nest math delimiters or mix styles.
Examples:
- Inline: The equation $E = mc^2$ shows mass-energy equivalence.
- Display:
$$\\frac{d}{dx}\\sin(x) = \\cos(x)$$";

/// Converts one provider's response stream into the unified protocol.
///
/// The returned stream is lazy: the upstream call is made on first poll,
/// so every failure after validation is reported in-band.
pub trait StreamAdapter: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn stream(&self, request: ChatRequest, model: ModelEntry, api_key: SecretString) -> ChatStream;
}

/// Provider -> adapter lookup with a fallback for providers that have no
/// live integration.
#[derive(Clone)]
pub struct AdapterTable {
    adapters: HashMap<ProviderKind, Arc<dyn StreamAdapter>>,
    fallback: Arc<dyn StreamAdapter>,
}

impl AdapterTable {
    pub fn new(fallback: Arc<dyn StreamAdapter>) -> Self {
        Self {
            adapters: HashMap::new(),
            fallback,
        }
    }

    pub fn with_adapter(mut self, provider: ProviderKind, adapter: Arc<dyn StreamAdapter>) -> Self {
        self.adapters.insert(provider, adapter);
        self
    }

    /// Adapter for `provider`, or the fallback.
    pub fn select(&self, provider: ProviderKind) -> &Arc<dyn StreamAdapter> {
        self.adapters.get(&provider).unwrap_or(&self.fallback)
    }

    pub fn has_live_adapter(&self, provider: ProviderKind) -> bool {
        self.adapters.contains_key(&provider)
    }
}

impl std::fmt::Debug for AdapterTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let live: HashMap<_, _> = self
            .adapters
            .iter()
            .map(|(provider, adapter)| (provider.id(), adapter.name()))
            .collect();
        f.debug_struct("AdapterTable")
            .field("live", &live)
            .field("fallback", &self.fallback.name())
            .finish()
    }
}

/// Bound a chunk stream by a wall-clock deadline.
///
/// When the deadline passes while waiting on the inner stream, the inner
/// stream (and with it the upstream request) is dropped and a single error
/// chunk ends the stream. Chunks after the first terminal chunk are dropped.
pub fn with_deadline(inner: ChatStream, timeout: Duration) -> ChatStream {
    Box::pin(async_stream::stream! {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut inner = inner;
        loop {
            match tokio::time::timeout_at(deadline, inner.next()).await {
                Ok(Some(chunk)) => {
                    let terminal = chunk.is_terminal();
                    yield chunk;
                    if terminal {
                        break;
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(timeout_secs = timeout.as_secs(), "upstream stream deadline exceeded");
                    yield UnifiedChunk::error(RelayError::Timeout(timeout).to_string());
                    break;
                }
            }
        }
    })
}
