// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-side dial/call stub for talking to a remote engine's JSON gateway.
//! Plugins embedded in this process use [`crate::transport::native::Transport`]
//! directly; out-of-process plugins (or test harnesses standing in for one)
//! go through this over HTTP instead.

use std::time::Duration;

use super::messages::{LomRequest, LomResponse};
use super::native::{Transport, TransportError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Talks to one engine's `/lom/rpc` route.
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    base_url: String,
}

impl RpcClient {
    /// `base_url` is the engine's origin, e.g. `http://127.0.0.1:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build().unwrap_or_default();
        Self { http, base_url: base_url.into().trim_end_matches('/').to_owned() }
    }

    /// Checks the engine's `/api/v1/health` route without sending an RPC.
    pub async fn dial(&self) -> Result<(), String> {
        let url = format!("{}/api/v1/health", self.base_url);
        let resp = self.http.get(&url).send().await.map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        Ok(())
    }

    pub async fn call(&self, request: &LomRequest) -> Result<LomResponse, String> {
        let url = format!("{}/lom/rpc", self.base_url);
        let resp = self.http.post(&url).json(request).send().await.map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(format!("HTTP {status}: {text}"));
        }
        resp.json::<LomResponse>().await.map_err(|e| e.to_string())
    }
}

#[tonic::async_trait]
impl Transport for RpcClient {
    async fn dial(&self) -> Result<(), TransportError> {
        RpcClient::dial(self).await.map_err(TransportError::Dial)
    }

    async fn call(&self, request: LomRequest) -> Result<LomResponse, TransportError> {
        RpcClient::call(self, &request).await.map_err(TransportError::Rpc)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
