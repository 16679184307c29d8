// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request handler (C6): the single worker task that owns both
//! [`Registry`] and [`Orchestrator`] and drives every mutation of their
//! state. Reads from two sources in one `tokio::select!` loop — the native
//! transport's request/reply channel and the orchestrator's timer-event
//! channel — so neither [`Registry`] nor [`Orchestrator`] is ever touched
//! from more than one task, the single-writer discipline spec.md §5 and §9
//! call for.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::ErrorCode;
use crate::orchestrator::{Orchestrator, TimerEvent};
use crate::registry::Registry;
use crate::support::UuidGen;
use crate::transport::messages::{LomRequest, LomResponse, ReqPayload, RespPayload};
use crate::transport::native::Envelope;

pub struct RequestHandler {
    registry: Registry,
    orchestrator: Orchestrator,
    uuid_gen: std::sync::Arc<dyn UuidGen>,
}

impl RequestHandler {
    pub fn new(registry: Registry, orchestrator: Orchestrator, uuid_gen: std::sync::Arc<dyn UuidGen>) -> Self {
        Self { registry, orchestrator, uuid_gen }
    }

    /// Runs until `shutdown` is cancelled or both channels close.
    pub async fn run(
        mut self,
        mut inbox: mpsc::Receiver<Envelope>,
        mut timer_events: mpsc::UnboundedReceiver<TimerEvent>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    info!("request handler shutting down");
                    break;
                }
                envelope = inbox.recv() => {
                    let Some(Envelope { request, reply }) = envelope else { break };
                    self.handle_request(request, reply);
                }
                event = timer_events.recv() => {
                    let Some(event) = event else { break };
                    self.handle_timer_event(event);
                }
            }
        }
    }

    fn handle_timer_event(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::StepTimeout { anomaly_instance_id, step_index } => {
                self.orchestrator.handle_step_timeout(&mut self.registry, &anomaly_instance_id, step_index);
            }
            TimerEvent::SequenceTimeout { anomaly_instance_id } => {
                self.orchestrator.handle_sequence_timeout(&mut self.registry, &anomaly_instance_id);
            }
        }
    }

    /// Replies on `reply` itself for every variant except `RecvServerRequest`,
    /// which hands the sender to `Registry::pend_server_request` so a
    /// queue-empty long poll can be fulfilled later by `Dispatch`.
    fn handle_request(&mut self, request: LomRequest, reply: tokio::sync::oneshot::Sender<LomResponse>) {
        debug!(client = %request.client, req_type = ?request.req_type(), "handling request");

        if request.req_data == ReqPayload::RecvServerRequest {
            if !self.registry.is_registered(&request.client) {
                let _ = reply.send(LomResponse::err(ErrorCode::ActionNotRegistered, "client not registered"));
                return;
            }
            if let Err(e) = self.registry.pend_server_request(&request.client, reply) {
                tracing::warn!(error = %e, "pend_server_request failed after registration check");
            }
            return;
        }

        let response = self.dispatch(request);
        let _ = reply.send(response);
    }

    fn dispatch(&mut self, request: LomRequest) -> LomResponse {
        match request.req_data {
            ReqPayload::RegClient => match self.registry.register_client(&request.client, request.session) {
                Ok(()) => LomResponse::ok(RespPayload::Empty),
                Err(e) => LomResponse::err(ErrorCode::ReqFailed, e.to_string()),
            },
            ReqPayload::DeregClient => {
                let owned = self.registry.deregister_client(&request.client);
                for action in owned {
                    self.orchestrator.notify_action_deregistered(&mut self.registry, &action);
                }
                LomResponse::ok(RespPayload::Empty)
            }
            ReqPayload::RegAction { action } => {
                match self.registry.register_action(&request.client, &action, self.uuid_gen.as_ref()) {
                    Ok(()) => LomResponse::ok(RespPayload::Empty),
                    Err(e) => LomResponse::err(ErrorCode::ReqFailed, e.to_string()),
                }
            }
            ReqPayload::DeregAction { action } => {
                if self.registry.deregister_action(&action) {
                    self.orchestrator.notify_action_deregistered(&mut self.registry, &action);
                }
                LomResponse::ok(RespPayload::Empty)
            }
            ReqPayload::SendServerResponse(resp) => {
                if resp.action.is_empty() || resp.anomaly_instance_id.is_empty() {
                    return LomResponse::err(ErrorCode::IncorrectReqData, "");
                }
                self.orchestrator.process_response(&mut self.registry, resp);
                LomResponse::ok(RespPayload::Empty)
            }
            ReqPayload::NotifyActionHeartbeat { action, timestamp } => {
                self.registry.notify_heartbeat(&action, timestamp);
                LomResponse::ok(RespPayload::Empty)
            }
            ReqPayload::RecvServerRequest => unreachable!("handled in handle_request before dispatch"),
        }
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
