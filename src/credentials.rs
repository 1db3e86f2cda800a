//! Credential Resolver
//!
//! A request may carry its own provider key in a header; otherwise the key
//! captured from the environment at startup is used. Keys are never
//! validated here: a bad key only surfaces when the upstream call is made.

use axum::http::HeaderMap;
use secrecy::SecretString;

use crate::config::ProviderKeys;
use crate::error::RelayError;
use crate::registry::{ModelEntry, ProviderKind};

/// Resolves API keys from request headers with environment fallback.
#[derive(Debug, Clone, Default)]
pub struct CredentialResolver {
    fallback: ProviderKeys,
}

impl CredentialResolver {
    pub fn new(fallback: ProviderKeys) -> Self {
        Self { fallback }
    }

    /// Try the header, then the fallback. `None` when neither is set.
    pub fn lookup(
        &self,
        provider: ProviderKind,
        header_name: &str,
        headers: &HeaderMap,
    ) -> Option<SecretString> {
        header_value(headers, header_name)
            .map(SecretString::from)
            .or_else(|| self.fallback.get(provider).cloned())
    }

    /// Resolve the key for a registry entry, failing with a message that
    /// names both the header and the environment variable.
    pub fn resolve(
        &self,
        display_name: &str,
        entry: &ModelEntry,
        headers: &HeaderMap,
    ) -> Result<SecretString, RelayError> {
        self.lookup(entry.provider, entry.credential_header, headers)
            .ok_or_else(|| RelayError::MissingCredential {
                model: display_name.to_string(),
                header: entry.credential_header,
                env_var: entry.provider.env_var(),
            })
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use secrecy::ExposeSecret;

    fn openrouter_entry() -> ModelEntry {
        ModelEntry::new("deepseek/deepseek-chat-v3-0324:free", ProviderKind::OpenRouter)
    }

    #[test]
    fn header_wins_over_environment() {
        let resolver = CredentialResolver::new(
            ProviderKeys::new().with_key(ProviderKind::OpenRouter, "env-key"),
        );
        let mut headers = HeaderMap::new();
        headers.insert("x-openrouter-api-key", HeaderValue::from_static("header-key"));

        let key = resolver
            .resolve("Deepseek V3", &openrouter_entry(), &headers)
            .unwrap();
        assert_eq!(key.expose_secret(), "header-key");
    }

    #[test]
    fn empty_header_falls_back_to_environment() {
        let resolver = CredentialResolver::new(
            ProviderKeys::new().with_key(ProviderKind::OpenRouter, "env-key"),
        );
        let mut headers = HeaderMap::new();
        headers.insert("X-OpenRouter-API-Key", HeaderValue::from_static(""));

        let key = resolver
            .resolve("Deepseek V3", &openrouter_entry(), &headers)
            .unwrap();
        assert_eq!(key.expose_secret(), "env-key");
    }

    #[test]
    fn missing_everywhere_names_header_and_env() {
        let resolver = CredentialResolver::default();
        let err = resolver
            .resolve("Deepseek V3", &openrouter_entry(), &HeaderMap::new())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "API key required for Deepseek V3. Provide via X-OpenRouter-API-Key header or OPENROUTER_API_KEY environment variable."
        );
    }

    #[test]
    fn fallback_is_per_provider() {
        let resolver =
            CredentialResolver::new(ProviderKeys::new().with_key(ProviderKind::Google, "g"));
        assert!(
            resolver
                .lookup(ProviderKind::OpenAi, "X-OpenAI-API-Key", &HeaderMap::new())
                .is_none()
        );
    }
}
