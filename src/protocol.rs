//! Unified stream protocol
//!
//! Every adapter, whatever the upstream wire format, produces the same
//! line-oriented micro-protocol so the frontend needs a single consumer:
//!
//! - `0:<json string>` - a text fragment
//! - `3:{"message":<json string>}` - an in-band error; the stream ends after it
//! - `d:{"finishReason":"stop","usage":{...}}` - terminal marker, always last
//!
//! Each chunk is encoded as exactly one newline-terminated line.

use serde::{Deserialize, Serialize};

/// Reason a generation finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    Stop,
}

/// Token counters reported in the terminal chunk. The relay does not track
/// usage, so these are always zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FinishPayload<'a> {
    finish_reason: &'a FinishReason,
    usage: &'a Usage,
}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    message: &'a str,
}

/// One frame of the unified protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnifiedChunk {
    Text(String),
    Error { message: String },
    Finish { finish_reason: FinishReason, usage: Usage },
}

impl UnifiedChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// The terminal `stop` marker with zeroed usage.
    pub fn stop() -> Self {
        Self::Finish {
            finish_reason: FinishReason::Stop,
            usage: Usage::default(),
        }
    }

    /// Protocol marker byte.
    pub fn marker(&self) -> char {
        match self {
            Self::Text(_) => '0',
            Self::Error { .. } => '3',
            Self::Finish { .. } => 'd',
        }
    }

    /// Whether no chunk may follow this one.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Text(_))
    }

    /// Encode as a single protocol line, including the trailing newline.
    pub fn encode(&self) -> String {
        let payload = match self {
            Self::Text(text) => serde_json::to_string(text),
            Self::Error { message } => serde_json::to_string(&ErrorPayload { message }),
            Self::Finish {
                finish_reason,
                usage,
            } => serde_json::to_string(&FinishPayload {
                finish_reason,
                usage,
            }),
        }
        .expect("strings and plain structs always serialize to JSON");
        format!("{}:{}\n", self.marker(), payload)
    }

    /// Parse one protocol line (with or without trailing newline).
    ///
    /// Used by tests and by clients written against this crate.
    pub fn decode(line: &str) -> Option<Self> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let (marker, payload) = line.split_once(':')?;
        match marker {
            "0" => serde_json::from_str::<String>(payload).ok().map(Self::Text),
            "3" => {
                let value: serde_json::Value = serde_json::from_str(payload).ok()?;
                let message = value.get("message")?.as_str()?.to_string();
                Some(Self::Error { message })
            }
            "d" => {
                #[derive(Deserialize)]
                #[serde(rename_all = "camelCase")]
                struct Finish {
                    finish_reason: FinishReason,
                    #[serde(default)]
                    usage: Usage,
                }
                let finish: Finish = serde_json::from_str(payload).ok()?;
                Some(Self::Finish {
                    finish_reason: finish.finish_reason,
                    usage: finish.usage,
                })
            }
            _ => None,
        }
    }
}
