// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Native (in-process) transport binding: a thin RPC façade over the single
//! request-handler worker (C6). Clients compiled against this crate call
//! [`Transport::call`] directly; the JSON gateway calls the same trait.

use std::fmt;

use tokio::sync::{mpsc, oneshot};

use super::messages::{LomRequest, LomResponse};

/// One inbound call paired with the channel its reply travels back on.
pub struct Envelope {
    pub request: LomRequest,
    pub reply: oneshot::Sender<LomResponse>,
}

/// Transport-level failure, distinct from an application-level non-zero
/// `result_code` carried inside a successfully-delivered [`LomResponse`].
/// `Dial` is a reachability failure surfaced by [`Transport::dial`] before
/// any request is sent; `Rpc` is a failure in flight (or decoding the
/// reply) for a specific [`Transport::call`].
#[derive(Debug)]
pub enum TransportError {
    Dial(String),
    Rpc(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dial(msg) => write!(f, "dial failed: {msg}"),
            Self::Rpc(msg) => write!(f, "rpc failed: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// RPC surface every transport binding exposes: a reachability check
/// (`dial`) a caller can run once up front, and the per-request `call`.
/// Both report transport/dial failures through [`TransportError`]; an
/// application-level failure still arrives as `Ok(resp)` with a non-zero
/// `resp.result_code`, so callers can tell the three classes apart.
#[tonic::async_trait]
pub trait Transport: Send + Sync {
    async fn dial(&self) -> Result<(), TransportError>;
    async fn call(&self, request: LomRequest) -> Result<LomResponse, TransportError>;
}

/// Forwards every call onto the request-handler worker's inbox and awaits
/// its reply. Cheap to clone; many bindings can share one handle.
#[derive(Clone)]
pub struct NativeServer {
    inbox: mpsc::Sender<Envelope>,
}

impl NativeServer {
    pub fn new(inbox: mpsc::Sender<Envelope>) -> Self {
        Self { inbox }
    }
}

#[tonic::async_trait]
impl Transport for NativeServer {
    async fn dial(&self) -> Result<(), TransportError> {
        if self.inbox.is_closed() {
            return Err(TransportError::Dial("request-handler worker is gone".to_owned()));
        }
        Ok(())
    }

    async fn call(&self, request: LomRequest) -> Result<LomResponse, TransportError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.inbox.send(Envelope { request, reply: reply_tx }).await.is_err() {
            return Err(TransportError::Rpc("request-handler worker's inbox is closed".to_owned()));
        }
        match reply_rx.await {
            Ok(resp) => Ok(resp),
            Err(_) => Err(TransportError::Rpc("request handler dropped the reply".to_owned())),
        }
    }
}

#[cfg(test)]
#[path = "native_tests.rs"]
mod tests;
