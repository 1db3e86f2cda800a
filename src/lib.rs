//! # chat0 - streaming chat relay
//!
//! Sits between a chat frontend and several LLM providers. Every provider's
//! native streaming format is translated into one line-oriented protocol so
//! the frontend only ever parses a single format.
//!
//! ## Components
//!
//! - **Model Registry** ([`registry`]): display name -> provider, upstream id, credential header
//! - **Credential Resolver** ([`credentials`]): request header first, environment fallback second
//! - **Stream Adapters** ([`streaming`]): Gemini, OpenAI-compatible (OpenRouter) and mock
//! - **Request Dispatcher** ([`dispatch`]): validation and provider -> adapter selection
//! - **Title Generator** ([`title`]): one-shot Gemini call for conversation titles
//! - **HTTP server** ([`server`]): axum routes, CORS and request tracing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chat0::config::RelayConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RelayConfig::from_env();
//!     chat0::telemetry::init_tracing(config.log_format);
//!     chat0::server::serve(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Wire protocol
//!
//! ```text
//! 0:"Hello"
//! 0:" world"
//! d:{"finishReason":"stop","usage":{"promptTokens":0,"completionTokens":0}}
//! ```
//!
//! See [`protocol`] for the full format.

#![deny(unsafe_code)]

pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod streaming;
pub mod telemetry;
pub mod title;
pub mod types;

pub use config::RelayConfig;
pub use dispatch::Dispatcher;
pub use error::RelayError;
pub use protocol::UnifiedChunk;
pub use registry::{ModelEntry, ModelRegistry, ProviderKind};
