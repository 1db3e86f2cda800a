//! Request Dispatcher
//!
//! Validates incoming bodies, resolves model and credentials, then hands the
//! request to the adapter registered for the model's provider. Nothing
//! upstream is contacted until validation, model lookup and credential
//! resolution have all succeeded.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::Validate;

use crate::config::RelayConfig;
use crate::credentials::CredentialResolver;
use crate::error::RelayError;
use crate::registry::{ModelRegistry, ProviderKind};
use crate::streaming::{
    AdapterTable, ChatStream, GeminiAdapter, MockAdapter, OpenAiCompatibleAdapter, with_deadline,
};
use crate::title::TitleGenerator;
use crate::types::{ChatRequest, CompletionRequest, CompletionResponse};

/// Routes validated requests to stream adapters and the title generator.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: &'static ModelRegistry,
    resolver: CredentialResolver,
    adapters: AdapterTable,
    titles: TitleGenerator,
    chat_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        registry: &'static ModelRegistry,
        resolver: CredentialResolver,
        adapters: AdapterTable,
        titles: TitleGenerator,
        chat_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            resolver,
            adapters,
            titles,
            chat_timeout,
        }
    }

    /// Wire up the built-in registry and the live adapters. OpenAI has no
    /// live integration and is served by the mock adapter.
    pub fn from_config(config: &RelayConfig, http_client: reqwest::Client) -> Self {
        let adapters = AdapterTable::new(Arc::new(MockAdapter::new(config.mock_chunk_delay)))
            .with_adapter(
                ProviderKind::Google,
                Arc::new(GeminiAdapter::new(http_client.clone(), &config.gemini_base_url)),
            )
            .with_adapter(
                ProviderKind::OpenRouter,
                Arc::new(OpenAiCompatibleAdapter::openrouter(
                    http_client.clone(),
                    &config.openrouter_base_url,
                )),
            );

        Self::new(
            ModelRegistry::global(),
            CredentialResolver::new(config.provider_keys.clone()),
            adapters,
            TitleGenerator::new(http_client, &config.gemini_base_url, config.title_timeout),
            config.chat_timeout,
        )
    }

    pub fn registry(&self) -> &ModelRegistry {
        self.registry
    }

    /// Validate a chat body and start its stream.
    ///
    /// Every error returned here happens before the response starts; later
    /// failures arrive in-band as error chunks.
    pub fn handle_chat(&self, body: &[u8], headers: &HeaderMap) -> Result<ChatStream, RelayError> {
        let request: ChatRequest = parse_body(body)?;
        if request.messages.is_empty() {
            return Err(RelayError::EmptyConversation);
        }
        request
            .validate()
            .map_err(|e| RelayError::InvalidRequest(e.to_string()))?;

        let entry = self
            .registry
            .lookup(&request.model)
            .ok_or_else(|| RelayError::UnsupportedModel(request.model.clone()))?
            .clone();
        let api_key = self.resolver.resolve(&request.model, &entry, headers)?;
        let adapter = self.adapters.select(entry.provider);

        tracing::info!(
            request_id = %Uuid::new_v4(),
            model = %request.model,
            provider = %entry.provider,
            adapter = adapter.name(),
            live = self.adapters.has_live_adapter(entry.provider),
            messages = request.messages.len(),
            "dispatching chat request"
        );

        Ok(with_deadline(
            adapter.stream(request, entry, api_key),
            self.chat_timeout,
        ))
    }

    /// Generate a title for a completion request.
    pub async fn handle_completion(
        &self,
        body: &[u8],
        headers: &HeaderMap,
    ) -> Result<CompletionResponse, RelayError> {
        let request: CompletionRequest = parse_body(body)?;
        request
            .validate()
            .map_err(|e| RelayError::InvalidRequest(e.to_string()))?;

        let provider = ProviderKind::Google;
        let api_key = self
            .resolver
            .lookup(provider, provider.credential_header(), headers)
            .ok_or(RelayError::MissingTitleCredential)?;

        tracing::debug!(
            message_id = %request.message_id,
            thread_id = %request.thread_id,
            "generating title"
        );
        let title = self
            .titles
            .generate_title(&request.prompt, &api_key)
            .await
            .map_err(|e| RelayError::TitleGeneration(Box::new(e)))?;

        Ok(CompletionResponse {
            title,
            is_title: request.is_title,
            message_id: request.message_id,
            thread_id: request.thread_id,
        })
    }
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, RelayError> {
    serde_json::from_slice(body).map_err(|e| RelayError::InvalidRequest(e.to_string()))
}
