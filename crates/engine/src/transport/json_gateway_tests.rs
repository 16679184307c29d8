// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::http::StatusCode;

use super::*;
use crate::transport::messages::{ReqPayload, RespPayload};
use crate::transport::native::Envelope;

struct EchoTransport;

#[tonic::async_trait]
impl Transport for EchoTransport {
    async fn dial(&self) -> Result<(), crate::transport::native::TransportError> {
        Ok(())
    }

    async fn call(
        &self,
        request: LomRequest,
    ) -> Result<crate::transport::messages::LomResponse, crate::transport::native::TransportError> {
        assert_eq!(request.client, "client-a");
        Ok(crate::transport::messages::LomResponse::ok(RespPayload::Empty))
    }
}

#[tokio::test]
async fn health_route_reports_ok() {
    let app = router(Arc::new(EchoTransport));
    let server = axum_test::TestServer::new(app).expect("test server");

    let resp = server.get("/api/v1/health").await;
    resp.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn rpc_route_forwards_to_the_transport_and_returns_its_response() {
    let app = router(Arc::new(EchoTransport));
    let server = axum_test::TestServer::new(app).expect("test server");

    let req = LomRequest {
        client: "client-a".into(),
        session: uuid::Uuid::nil(),
        timeout_secs: 5,
        req_data: ReqPayload::RegClient,
    };
    let resp = server.post("/lom/rpc").json(&req).await;
    resp.assert_status(StatusCode::OK);
    let body: crate::transport::messages::LomResponse = resp.json();
    assert!(body.is_ok());
}

struct RecordingTransport {
    seen: std::sync::Mutex<Option<LomRequest>>,
}

#[tonic::async_trait]
impl Transport for RecordingTransport {
    async fn dial(&self) -> Result<(), crate::transport::native::TransportError> {
        Ok(())
    }

    async fn call(
        &self,
        request: LomRequest,
    ) -> Result<crate::transport::messages::LomResponse, crate::transport::native::TransportError> {
        *self.seen.lock().expect("lock") = Some(request);
        Ok(crate::transport::messages::LomResponse::ok(RespPayload::Empty))
    }
}

/// A hand-built literal request — no `LomRequest`/`ReqPayload` construction
/// from this crate — proving an external client that only knows the
/// documented wire shape (an integer `req_type`, not a Rust variant name)
/// can still talk to this gateway.
#[tokio::test]
async fn rpc_route_decodes_a_literal_client_authored_request() {
    let transport = Arc::new(RecordingTransport { seen: std::sync::Mutex::new(None) });
    let app = router(transport.clone());
    let server = axum_test::TestServer::new(app).expect("test server");

    let literal = serde_json::json!({
        "client": "external-plugin",
        "session": "00000000-0000-0000-0000-000000000000",
        "timeout_secs": 5,
        "req_data": { "req_type": 3, "action": "Detect-0" },
    });
    let resp = server.post("/lom/rpc").json(&literal).await;
    resp.assert_status(StatusCode::OK);

    let seen = transport.seen.lock().expect("lock").clone().expect("request recorded");
    assert_eq!(seen.client, "external-plugin");
    match seen.req_data {
        ReqPayload::RegAction { action } => assert_eq!(action, "Detect-0"),
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[tokio::test]
async fn rpc_route_relays_a_native_server_backed_by_a_worker() {
    let (tx, mut rx) = tokio::sync::mpsc::channel(1);
    let worker = tokio::spawn(async move {
        let Envelope { request: _, reply } = rx.recv().await.expect("envelope");
        let _ = reply.send(crate::transport::messages::LomResponse::ok(RespPayload::Empty));
    });
    let transport: Arc<dyn Transport> = Arc::new(crate::transport::native::NativeServer::new(tx));
    let app = router(transport);
    let server = axum_test::TestServer::new(app).expect("test server");

    let req = LomRequest {
        client: "client-a".into(),
        session: uuid::Uuid::nil(),
        timeout_secs: 5,
        req_data: ReqPayload::DeregClient,
    };
    let resp = server.post("/lom/rpc").json(&req).await;
    resp.assert_status(StatusCode::OK);
    worker.await.expect("worker task");
}
