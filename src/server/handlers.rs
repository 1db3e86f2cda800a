//! Route handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};

use super::AppState;
use super::response::to_protocol_response;
use crate::error::RelayError;
use crate::types::CompletionResponse;

/// Service name reported by the health check.
pub const SERVICE_NAME: &str = "chat0-backend";

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "chat0 backend is running!",
        "status": "ok",
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
    }))
}

/// Registry row as listed by `GET /api/models`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    pub model_id: String,
    pub provider: String,
    pub credential_header: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ModelList {
    pub models: Vec<ModelInfo>,
}

pub async fn list_models(State(state): State<AppState>) -> Json<ModelList> {
    let registry = state.dispatcher.registry();
    let models = registry
        .list_names()
        .into_iter()
        .filter_map(|name| {
            registry.lookup(name).map(|entry| ModelInfo {
                name: name.to_string(),
                model_id: entry.model_id.clone(),
                provider: entry.provider.id().to_string(),
                credential_header: entry.credential_header,
            })
        })
        .collect();
    Json(ModelList { models })
}

pub async fn completion(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CompletionResponse>, RelayError> {
    state
        .dispatcher
        .handle_completion(&body, &headers)
        .await
        .map(Json)
}

pub async fn chat(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    match state.dispatcher.handle_chat(&body, &headers) {
        Ok(stream) => to_protocol_response(stream),
        Err(err) => err.into_response(),
    }
}
