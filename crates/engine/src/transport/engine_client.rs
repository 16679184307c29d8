// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! High-level client stub a plugin links against: pins one `client` name and
//! `session` for its whole process lifetime and builds the matching
//! [`LomRequest`] for each operation, dispatching through whichever
//! [`Transport`] the caller wires up (in-process [`super::native::NativeServer`]
//! for same-binary tests, [`super::client::RpcClient`] over the JSON gateway
//! for everything else).

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::native::{Transport, TransportError};
use super::messages::{ActionResponseData, LomRequest, LomResponse, ReqPayload};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct EngineClient {
    client_name: String,
    session: Uuid,
    timeout: Duration,
    transport: Arc<dyn Transport>,
}

impl EngineClient {
    pub fn new(client_name: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self { client_name: client_name.into(), session: Uuid::new_v4(), timeout: DEFAULT_TIMEOUT, transport }
    }

    /// Checks transport reachability up front, separately from any RPC.
    /// `Err` here is always [`TransportError::Dial`]; it never reflects an
    /// application-level result, since no request has been sent yet.
    pub async fn dial(&self) -> Result<(), TransportError> {
        self.transport.dial().await
    }

    async fn send(&self, req_data: ReqPayload) -> Result<LomResponse, TransportError> {
        let request = LomRequest {
            client: self.client_name.clone(),
            session: self.session,
            timeout_secs: self.timeout.as_secs(),
            req_data,
        };
        self.transport.call(request).await
    }

    pub async fn register_client(&self) -> Result<LomResponse, TransportError> {
        self.send(ReqPayload::RegClient).await
    }

    pub async fn deregister_client(&self) -> Result<LomResponse, TransportError> {
        self.send(ReqPayload::DeregClient).await
    }

    pub async fn register_action(&self, action: impl Into<String>) -> Result<LomResponse, TransportError> {
        self.send(ReqPayload::RegAction { action: action.into() }).await
    }

    pub async fn deregister_action(&self, action: impl Into<String>) -> Result<LomResponse, TransportError> {
        self.send(ReqPayload::DeregAction { action: action.into() }).await
    }

    /// Long-polls for the next unsolicited request addressed to this client.
    pub async fn recv_server_request(&self) -> Result<LomResponse, TransportError> {
        self.send(ReqPayload::RecvServerRequest).await
    }

    pub async fn send_server_response(&self, response: ActionResponseData) -> Result<LomResponse, TransportError> {
        self.send(ReqPayload::SendServerResponse(response)).await
    }

    pub async fn notify_heartbeat(
        &self,
        action: impl Into<String>,
        timestamp_secs: u64,
    ) -> Result<LomResponse, TransportError> {
        self.send(ReqPayload::NotifyActionHeartbeat { action: action.into(), timestamp: timestamp_secs }).await
    }
}

#[cfg(test)]
#[path = "engine_client_tests.rs"]
mod tests;
