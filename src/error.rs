//! Error types for the relay
//!
//! `RelayError` covers everything that can go wrong *before* a stream is
//! handed to the client: malformed input, unknown models, missing keys and
//! upstream failures on the non-streaming completion endpoint. Once a chat
//! stream has started, failures are reported in-band as
//! [`UnifiedChunk::Error`](crate::protocol::UnifiedChunk::Error) instead.

use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::types::ErrorResponse;

/// Relay error type
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Request body could not be parsed or failed validation.
    #[error("invalid request body: {0}")]
    InvalidRequest(String),

    /// The chat request carried no messages.
    #[error("at least one message is required")]
    EmptyConversation,

    /// The requested display name is not in the model registry.
    #[error("unsupported model: {0}")]
    UnsupportedModel(String),

    /// Neither the provider header nor the environment fallback was set.
    #[error(
        "API key required for {model}. Provide via {header} header or {env_var} environment variable."
    )]
    MissingCredential {
        model: String,
        header: &'static str,
        env_var: &'static str,
    },

    /// The title endpoint needs a Google key and none was found.
    #[error(
        "Google API key is required. Provide via X-Google-API-Key header or GOOGLE_API_KEY environment variable."
    )]
    MissingTitleCredential,

    /// Upstream provider answered with a non-success status.
    #[error("upstream error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Transport-level failure talking to the upstream provider.
    #[error("http error: {0}")]
    Http(String),

    /// Upstream call exceeded its deadline.
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Upstream response carried no candidates or no parts.
    #[error("no response generated")]
    NoResponse,

    /// Upstream response had a first part without text.
    #[error("unexpected response format")]
    UnexpectedResponse,

    /// Upstream payload could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// Title generation failed; wraps the upstream cause.
    #[error("failed to generate title: {0}")]
    TitleGeneration(#[source] Box<RelayError>),
}

impl RelayError {
    /// HTTP status this error maps to when returned before streaming starts.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_)
            | Self::EmptyConversation
            | Self::UnsupportedModel(_)
            | Self::MissingCredential { .. }
            | Self::MissingTitleCredential => StatusCode::BAD_REQUEST,
            Self::Upstream { .. }
            | Self::Http(_)
            | Self::Timeout(_)
            | Self::NoResponse
            | Self::UnexpectedResponse
            | Self::Parse(_)
            | Self::TitleGeneration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the error was caused by the client rather than a provider.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_client_error() {
            tracing::debug!(error = %self, "rejected request");
        } else {
            tracing::warn!(error = %self, "request failed upstream");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_bad_request() {
        let errors = [
            RelayError::InvalidRequest("eof".into()),
            RelayError::EmptyConversation,
            RelayError::UnsupportedModel("nope".into()),
            RelayError::MissingCredential {
                model: "GPT-4o".into(),
                header: "X-OpenAI-API-Key",
                env_var: "OPENAI_API_KEY",
            },
            RelayError::MissingTitleCredential,
        ];
        for err in errors {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST, "{err}");
            assert!(err.is_client_error());
        }
    }

    #[test]
    fn title_failure_wraps_upstream_message() {
        let err = RelayError::TitleGeneration(Box::new(RelayError::NoResponse));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "failed to generate title: no response generated");
    }

    #[test]
    fn missing_credential_names_header_and_env() {
        let err = RelayError::MissingCredential {
            model: "Deepseek V3".into(),
            header: "X-OpenRouter-API-Key",
            env_var: "OPENROUTER_API_KEY",
        };
        let msg = err.to_string();
        assert!(msg.contains("Deepseek V3"));
        assert!(msg.contains("X-OpenRouter-API-Key"));
        assert!(msg.contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn timeout_reports_seconds() {
        let err = RelayError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "request timed out after 30s");
    }
}
