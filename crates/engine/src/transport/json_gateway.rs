// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-over-HTTP gateway: one route, `POST /lom/rpc`, carrying the same
//! [`LomRequest`]/[`LomResponse`] envelopes the native binding speaks.
//! Exists for clients that can't link this crate directly.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use super::messages::{LomRequest, LomResponse};
use super::native::Transport;
use crate::error::ErrorCode;

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn rpc(
    State(transport): State<Arc<dyn Transport>>,
    Json(req): Json<LomRequest>,
) -> impl IntoResponse {
    let resp = match transport.call(req).await {
        Ok(resp) => resp,
        Err(e) => LomResponse::err(ErrorCode::Shutdown, e.to_string()),
    };
    Json(resp)
}

/// Builds the gateway's router over a shared [`Transport`] handle.
pub fn router(transport: Arc<dyn Transport>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/lom/rpc", post(rpc))
        .with_state(transport)
}

#[cfg(test)]
#[path = "json_gateway_tests.rs"]
mod tests;
