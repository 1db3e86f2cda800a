//! Process configuration
//!
//! Settings come from command-line flags or, more usually, the environment
//! (clap's `env` support). [`RelayArgs`] is parsed once at startup and turned
//! into a [`RelayConfig`] that is threaded through the dispatcher and
//! adapters.
//!
//! ```rust
//! use chat0::config::{RelayArgs, RelayConfig};
//! use clap::Parser;
//!
//! let args = RelayArgs::try_parse_from([
//!     "chat0",
//!     "--port",
//!     "9000",
//!     "--allowed-origins",
//!     "https://a.dev, https://b.dev",
//! ])
//! .unwrap();
//! let config = RelayConfig::from(args);
//! assert_eq!(config.port, 9000);
//! assert_eq!(config.allowed_origins, vec!["https://a.dev", "https://b.dev"]);
//! ```

use std::collections::HashMap;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use secrecy::{ExposeSecret, SecretString};

use crate::registry::ProviderKind;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_CHAT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_TITLE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MOCK_CHUNK_DELAY: Duration = Duration::from_millis(200);

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Command-line / environment settings.
#[derive(Debug, Clone, Parser)]
#[command(name = "chat0", about = "Streaming chat relay for the chat0 frontend", version)]
pub struct RelayArgs {
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Label logged at startup
    #[arg(long, env = "ENVIRONMENT", default_value = "development")]
    pub environment: String,

    /// Comma-separated CORS origins
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',', default_value = DEFAULT_ORIGIN)]
    pub allowed_origins: Vec<String>,

    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub google_api_key: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub openrouter_api_key: Option<String>,

    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_GEMINI_BASE_URL)]
    pub gemini_base_url: String,

    #[arg(long, env = "OPENROUTER_BASE_URL", default_value = DEFAULT_OPENROUTER_BASE_URL)]
    pub openrouter_base_url: String,

    #[arg(long, env = "CHAT_TIMEOUT_SECS", default_value_t = DEFAULT_CHAT_TIMEOUT.as_secs())]
    pub chat_timeout_secs: u64,

    #[arg(long, env = "TITLE_TIMEOUT_SECS", default_value_t = DEFAULT_TITLE_TIMEOUT.as_secs())]
    pub title_timeout_secs: u64,

    /// Pause between mock stream chunks
    #[arg(long, env = "MOCK_CHUNK_DELAY_MS", default_value_t = 200)]
    pub mock_chunk_delay_ms: u64,

    #[arg(long, env = "LOG_FORMAT", value_enum, ignore_case = true, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Fallback API keys read from the environment, one per provider.
#[derive(Clone, Default)]
pub struct ProviderKeys {
    keys: HashMap<ProviderKind, SecretString>,
}

impl ProviderKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key; empty values are ignored so they behave like unset ones.
    pub fn with_key(mut self, provider: ProviderKind, key: impl Into<String>) -> Self {
        let key = key.into();
        if !key.is_empty() {
            self.keys.insert(provider, SecretString::from(key));
        }
        self
    }

    pub fn get(&self, provider: ProviderKind) -> Option<&SecretString> {
        self.keys
            .get(&provider)
            .filter(|key| !key.expose_secret().is_empty())
    }

    /// Providers with a fallback key, in declaration order.
    pub fn loaded(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|p| self.get(*p).is_some())
            .collect()
    }

    /// `Google, OpenRouter`-style summary for the startup log.
    pub fn summary(&self) -> String {
        let loaded = self.loaded();
        if loaded.is_empty() {
            return "None (will use headers)".to_string();
        }
        loaded
            .iter()
            .map(ProviderKind::display_name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Debug for ProviderKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderKeys")
            .field("loaded", &self.loaded())
            .finish()
    }
}

/// Resolved relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub port: u16,
    pub environment: String,
    pub allowed_origins: Vec<String>,
    pub provider_keys: ProviderKeys,
    pub gemini_base_url: String,
    pub openrouter_base_url: String,
    pub chat_timeout: Duration,
    pub title_timeout: Duration,
    pub mock_chunk_delay: Duration,
    pub log_format: LogFormat,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            environment: "development".to_string(),
            allowed_origins: vec![DEFAULT_ORIGIN.to_string()],
            provider_keys: ProviderKeys::default(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            openrouter_base_url: DEFAULT_OPENROUTER_BASE_URL.to_string(),
            chat_timeout: DEFAULT_CHAT_TIMEOUT,
            title_timeout: DEFAULT_TITLE_TIMEOUT,
            mock_chunk_delay: DEFAULT_MOCK_CHUNK_DELAY,
            log_format: LogFormat::default(),
        }
    }
}

impl From<RelayArgs> for RelayConfig {
    fn from(args: RelayArgs) -> Self {
        let provider_keys = [
            (ProviderKind::Google, args.google_api_key),
            (ProviderKind::OpenAi, args.openai_api_key),
            (ProviderKind::OpenRouter, args.openrouter_api_key),
        ]
        .into_iter()
        .fold(ProviderKeys::new(), |keys, (provider, key)| match key {
            Some(key) => keys.with_key(provider, key.trim()),
            None => keys,
        });

        Self {
            port: args.port,
            environment: args.environment,
            allowed_origins: clean_origins(args.allowed_origins),
            provider_keys,
            gemini_base_url: trim_base_url(args.gemini_base_url),
            openrouter_base_url: trim_base_url(args.openrouter_base_url),
            chat_timeout: Duration::from_secs(args.chat_timeout_secs),
            title_timeout: Duration::from_secs(args.title_timeout_secs),
            mock_chunk_delay: Duration::from_millis(args.mock_chunk_delay_ms),
            log_format: args.log_format,
        }
    }
}

impl RelayConfig {
    /// Parse flags and environment. Exits with usage on invalid values.
    pub fn from_env() -> Self {
        Self::from(RelayArgs::parse())
    }

    pub fn with_provider_keys(mut self, keys: ProviderKeys) -> Self {
        self.provider_keys = keys;
        self
    }

    pub fn with_gemini_base_url(mut self, url: impl Into<String>) -> Self {
        self.gemini_base_url = trim_base_url(url.into());
        self
    }

    pub fn with_openrouter_base_url(mut self, url: impl Into<String>) -> Self {
        self.openrouter_base_url = trim_base_url(url.into());
        self
    }

    pub fn with_chat_timeout(mut self, timeout: Duration) -> Self {
        self.chat_timeout = timeout;
        self
    }

    pub fn with_title_timeout(mut self, timeout: Duration) -> Self {
        self.title_timeout = timeout;
        self
    }

    pub fn with_mock_chunk_delay(mut self, delay: Duration) -> Self {
        self.mock_chunk_delay = delay;
        self
    }
}

fn clean_origins(origins: Vec<String>) -> Vec<String> {
    origins
        .into_iter()
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}

fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> RelayConfig {
        let argv = std::iter::once("chat0").chain(args.iter().copied());
        RelayConfig::from(RelayArgs::try_parse_from(argv).unwrap())
    }

    #[test]
    fn defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.allowed_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.chat_timeout, Duration::from_secs(60));
        assert_eq!(config.title_timeout, Duration::from_secs(30));
        assert_eq!(config.mock_chunk_delay, Duration::from_millis(200));
        assert_eq!(config.gemini_base_url, DEFAULT_GEMINI_BASE_URL);
        assert!(config.provider_keys.loaded().is_empty());
        assert_eq!(config.provider_keys.summary(), "None (will use headers)");
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--port",
            "9000",
            "--chat-timeout-secs",
            "5",
            "--title-timeout-secs",
            "7",
            "--mock-chunk-delay-ms",
            "0",
        ]);
        assert_eq!(config.port, 9000);
        assert_eq!(config.chat_timeout, Duration::from_secs(5));
        assert_eq!(config.title_timeout, Duration::from_secs(7));
        assert_eq!(config.mock_chunk_delay, Duration::ZERO);
    }

    #[test]
    fn origins_are_split_and_trimmed() {
        let config = parse(&[
            "--allowed-origins",
            " https://chat0.dev ,http://localhost:3000,, ",
        ]);
        assert_eq!(
            config.allowed_origins,
            vec!["https://chat0.dev", "http://localhost:3000"]
        );
    }

    #[test]
    fn provider_keys_are_captured() {
        let config = parse(&[
            "--google-api-key",
            "g-key",
            "--openrouter-api-key",
            "or-key",
            "--openai-api-key=",
        ]);
        let keys = &config.provider_keys;
        assert_eq!(
            keys.get(ProviderKind::Google).map(|k| k.expose_secret()),
            Some("g-key")
        );
        assert!(keys.get(ProviderKind::OpenAi).is_none());
        assert_eq!(keys.summary(), "Google, OpenRouter");
    }

    #[test]
    fn debug_output_hides_keys() {
        let keys = ProviderKeys::new().with_key(ProviderKind::Google, "super-secret");
        let rendered = format!("{keys:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("Google"));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        assert!(RelayArgs::try_parse_from(["chat0", "--port", "eighty"]).is_err());
        assert!(RelayArgs::try_parse_from(["chat0", "--chat-timeout-secs", "-1"]).is_err());
    }

    #[test]
    fn base_urls_drop_trailing_slash() {
        let config = parse(&["--openrouter-base-url", "http://127.0.0.1:9/v1/"]);
        assert_eq!(config.openrouter_base_url, "http://127.0.0.1:9/v1");
    }

    #[test]
    fn log_format_parsing() {
        assert_eq!(parse(&["--log-format", "JSON"]).log_format, LogFormat::Json);
        assert_eq!(parse(&["--log-format", "pretty"]).log_format, LogFormat::Pretty);
        assert!(RelayArgs::try_parse_from(["chat0", "--log-format", "xml"]).is_err());
    }
}
