//! Model Registry
//!
//! Static table mapping the display names the frontend shows to the
//! provider that serves them, the upstream model id and the request header
//! that may carry the caller's own key.
//!
//! ```rust
//! use chat0::registry::{ModelRegistry, ProviderKind};
//!
//! let entry = ModelRegistry::global().lookup("Gemini 2.5 Flash").unwrap();
//! assert_eq!(entry.provider, ProviderKind::Google);
//! assert_eq!(entry.model_id, "gemini-2.5-flash");
//! ```

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// Upstream provider family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Google,
    OpenAi,
    OpenRouter,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Google,
        ProviderKind::OpenAi,
        ProviderKind::OpenRouter,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::OpenAi => "openai",
            ProviderKind::OpenRouter => "openrouter",
        }
    }

    /// Human-readable name used in startup logs.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Google => "Google",
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::OpenRouter => "OpenRouter",
        }
    }

    /// Request header carrying a caller-supplied key.
    pub fn credential_header(&self) -> &'static str {
        match self {
            ProviderKind::Google => "X-Google-API-Key",
            ProviderKind::OpenAi => "X-OpenAI-API-Key",
            ProviderKind::OpenRouter => "X-OpenRouter-API-Key",
        }
    }

    /// Environment variable used when the header is absent.
    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderKind::Google => "GOOGLE_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::OpenRouter => "OPENROUTER_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One registry row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    pub model_id: String,
    pub provider: ProviderKind,
    pub credential_header: &'static str,
}

impl ModelEntry {
    pub fn new(model_id: impl Into<String>, provider: ProviderKind) -> Self {
        Self {
            model_id: model_id.into(),
            provider,
            credential_header: provider.credential_header(),
        }
    }
}

/// Read-only lookup table of supported models.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    entries: HashMap<String, ModelEntry>,
}

lazy_static! {
    static ref GLOBAL_REGISTRY: ModelRegistry = ModelRegistry::builtin();
}

impl ModelRegistry {
    /// Empty registry, mostly useful in tests.
    pub fn new() -> Self {
        Self::default()
    }

    /// The models the frontend ships with.
    pub fn builtin() -> Self {
        Self::new()
            .with_model(
                "Deepseek R1 0528",
                ModelEntry::new("deepseek/deepseek-r1-0528:free", ProviderKind::OpenRouter),
            )
            .with_model(
                "Deepseek V3",
                ModelEntry::new("deepseek/deepseek-chat-v3-0324:free", ProviderKind::OpenRouter),
            )
            .with_model(
                "Gemini 2.5 Pro",
                ModelEntry::new("gemini-2.5-pro", ProviderKind::Google),
            )
            .with_model(
                "Gemini 2.5 Flash",
                ModelEntry::new("gemini-2.5-flash", ProviderKind::Google),
            )
            .with_model(
                "Gemini 1.5 Flash",
                ModelEntry::new("gemini-1.5-flash", ProviderKind::Google),
            )
            .with_model("GPT-4o", ModelEntry::new("gpt-4o", ProviderKind::OpenAi))
            .with_model(
                "GPT-4o-mini",
                ModelEntry::new("gpt-4o-mini", ProviderKind::OpenAi),
            )
    }

    /// Shared process-wide instance of [`ModelRegistry::builtin`].
    pub fn global() -> &'static ModelRegistry {
        &GLOBAL_REGISTRY
    }

    pub fn with_model(mut self, display_name: impl Into<String>, entry: ModelEntry) -> Self {
        self.entries.insert(display_name.into(), entry);
        self
    }

    pub fn lookup(&self, display_name: &str) -> Option<&ModelEntry> {
        self.entries.get(display_name)
    }

    /// Display names, sorted.
    pub fn list_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_every_frontend_model() {
        let registry = ModelRegistry::builtin();
        assert_eq!(
            registry.list_names(),
            vec![
                "Deepseek R1 0528",
                "Deepseek V3",
                "GPT-4o",
                "GPT-4o-mini",
                "Gemini 1.5 Flash",
                "Gemini 2.5 Flash",
                "Gemini 2.5 Pro",
            ]
        );
    }

    #[test]
    fn lookup_returns_provider_and_header() {
        let entry = ModelRegistry::global().lookup("Deepseek V3").unwrap();
        assert_eq!(entry.provider, ProviderKind::OpenRouter);
        assert_eq!(entry.model_id, "deepseek/deepseek-chat-v3-0324:free");
        assert_eq!(entry.credential_header, "X-OpenRouter-API-Key");
    }

    #[test]
    fn unknown_name_is_not_found() {
        assert!(ModelRegistry::global().lookup("Claude 9").is_none());
        assert!(ModelRegistry::global().lookup("gemini 2.5 flash").is_none());
    }

    #[test]
    fn every_provider_has_distinct_credential_rule() {
        let headers: std::collections::HashSet<_> =
            ProviderKind::ALL.iter().map(|p| p.credential_header()).collect();
        let envs: std::collections::HashSet<_> =
            ProviderKind::ALL.iter().map(|p| p.env_var()).collect();
        assert_eq!(headers.len(), ProviderKind::ALL.len());
        assert_eq!(envs.len(), ProviderKind::ALL.len());
    }
}
