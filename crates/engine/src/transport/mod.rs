// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport layer (C3): wire/internal message types plus the two RPC
//! bindings clients can speak — native in-process calls and a JSON-over-HTTP
//! gateway — and a client stub for talking to the latter.

pub mod client;
pub mod engine_client;
pub mod json_gateway;
pub mod messages;
pub mod native;

pub use client::RpcClient;
pub use engine_client::EngineClient;
pub use messages::{
    ActionRequestData, ActionResponseData, LomRequest, LomResponse, ReqPayload, ReqType,
    RespPayload, ServerRequestData,
};
pub use native::{Envelope, NativeServer, Transport, TransportError};
