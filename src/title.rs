//! Title Generator
//!
//! Single-shot, non-streaming Gemini call that turns a conversation's first
//! message into a short title.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::RelayError;
use crate::streaming::gemini::{API_KEY_HEADER, Content, GenerateContentRequest, GenerateContentResponse};

/// Model used for every title request.
pub const TITLE_MODEL: &str = "gemini-2.5-flash";

/// Instruction prepended to the user's message.
pub const TITLE_SYSTEM_PROMPT: &str = "- you will generate a short title based on the first message a user begins a conversation with
- ensure it is not more than 80 characters long
- the title should be a summary of the user's message
- you should NOT answer the user's message, you should only generate a summary/title
- do not use quotes or colons";

/// Generates conversation titles through Gemini `generateContent`.
#[derive(Debug, Clone)]
pub struct TitleGenerator {
    http_client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl TitleGenerator {
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, TITLE_MODEL)
    }

    /// Ask the model for a title. The whole exchange is bounded by the
    /// configured timeout.
    pub async fn generate_title(&self, prompt: &str, api_key: &SecretString) -> Result<String, RelayError> {
        match tokio::time::timeout(self.timeout, self.request_title(prompt, api_key)).await {
            Ok(result) => result,
            Err(_) => Err(RelayError::Timeout(self.timeout)),
        }
    }

    async fn request_title(&self, prompt: &str, api_key: &SecretString) -> Result<String, RelayError> {
        let body = GenerateContentRequest {
            contents: vec![Content::text(
                "user",
                format!("{TITLE_SYSTEM_PROMPT}\n\nUser message: {prompt}"),
            )],
        };

        let response = self
            .http_client
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RelayError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| RelayError::Parse(e.to_string()))?;
        extract_title(&payload)
    }
}

/// First text part of the first candidate, trimmed. A blank part is an
/// unexpected response, never an empty title.
pub fn extract_title(response: &GenerateContentResponse) -> Result<String, RelayError> {
    let part = response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .and_then(|content| content.parts.first())
        .ok_or(RelayError::NoResponse)?;

    match part.text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(RelayError::UnexpectedResponse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn extracts_first_part_text() {
        let resp = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"History of Rome\n"},{"text":"ignored"}]}}]}"#,
        );
        assert_eq!(extract_title(&resp).unwrap(), "History of Rome");
    }

    #[test]
    fn no_candidates_is_no_response() {
        assert!(matches!(
            extract_title(&parse(r#"{"candidates":[]}"#)),
            Err(RelayError::NoResponse)
        ));
        assert!(matches!(
            extract_title(&parse(r#"{"candidates":[{"content":{"parts":[]}}]}"#)),
            Err(RelayError::NoResponse)
        ));
    }

    #[test]
    fn textless_part_is_unexpected() {
        assert!(matches!(
            extract_title(&parse(r#"{"candidates":[{"content":{"parts":[{}]}}]}"#)),
            Err(RelayError::UnexpectedResponse)
        ));
    }

    #[test]
    fn whitespace_only_part_is_unexpected() {
        assert!(matches!(
            extract_title(&parse(r#"{"candidates":[{"content":{"parts":[{"text":"  \n"}]}}]}"#)),
            Err(RelayError::UnexpectedResponse)
        ));
    }

    #[test]
    fn endpoint_uses_title_model() {
        let generator = TitleGenerator::new(reqwest::Client::new(), "http://h/v1beta/", Duration::from_secs(1));
        assert_eq!(generator.endpoint(), "http://h/v1beta/models/gemini-2.5-flash:generateContent");
    }
}
