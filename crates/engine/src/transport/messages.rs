// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire/internal message types shared by both transport bindings (C3):
//! the `LomRequest`/`LomResponse` envelopes, their tagged payload variants,
//! and the action-level request/response bodies the orchestrator builds.

use std::time::Duration;

use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::ErrorCode;

/// `ReqType` integer values, per the wire protocol in spec.md §6. Carried
/// as a plain `req_type` integer field on the wire, never as a Rust variant
/// name, so any client built against the documented protocol can select a
/// payload variant without knowing this crate's enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReqType {
    RegClient = 1,
    DeregClient = 2,
    RegAction = 3,
    DeregAction = 4,
    RecvServerRequest = 5,
    SendServerResponse = 6,
    NotifyActionHeartbeat = 7,
}

impl ReqType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// One action's accumulated response, recorded in a sequence's context and
/// carried over the wire as both a request's context entry and a
/// response's own payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponseData {
    pub action: String,
    pub instance_id: String,
    pub anomaly_instance_id: String,
    pub anomaly_key: String,
    pub response_string: String,
    pub result_code: i32,
    pub result_string: String,
}

impl ActionResponseData {
    pub fn is_success(&self) -> bool {
        self.result_code == 0
    }

    /// True iff `instance_id == anomaly_instance_id`, the anchor-response
    /// shape described in spec.md §3.
    pub fn is_anchor(&self) -> bool {
        self.instance_id == self.anomaly_instance_id
    }
}

/// A request dispatched to a client for a single action step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequestData {
    pub action: String,
    pub instance_id: String,
    pub anomaly_instance_id: String,
    pub anomaly_key: String,
    pub timeout: Duration,
    pub context: Vec<ActionResponseData>,
}

/// Tagged union of requests the engine may push to a client, per spec.md
/// §3/§6 (`ServerRequestData.ReqType`: 0=Action, 1=Shutdown). Serializes as
/// the literal documented shape — an integer `req_type` field alongside
/// [`ActionRequestData`]'s own fields for the `Action` case — rather than
/// serde's default string-tagged-by-variant-name representation.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerRequestData {
    Action(ActionRequestData),
    Shutdown,
}

impl Serialize for ServerRequestData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut value = match self {
            ServerRequestData::Action(req) => serde_json::to_value(req).map_err(S::Error::custom)?,
            ServerRequestData::Shutdown => serde_json::Value::Object(serde_json::Map::new()),
        };
        let req_type = match self {
            ServerRequestData::Action(_) => 0u8,
            ServerRequestData::Shutdown => 1u8,
        };
        if let serde_json::Value::Object(map) = &mut value {
            map.insert("req_type".to_owned(), req_type.into());
        }
        value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ServerRequestData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let req_type = value
            .get("req_type")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| D::Error::missing_field("req_type"))?;
        match req_type {
            0 => {
                let req: ActionRequestData = serde_json::from_value(value).map_err(D::Error::custom)?;
                Ok(ServerRequestData::Action(req))
            }
            1 => Ok(ServerRequestData::Shutdown),
            other => Err(D::Error::custom(format!("unknown ServerRequestData req_type {other}"))),
        }
    }
}

/// Client → server request payload variants, keyed by the documented
/// `req_type` integer (1-7, per spec.md §6) rather than serde's default
/// string-tagged-by-Rust-variant-name representation.
#[derive(Debug, Clone, PartialEq)]
pub enum ReqPayload {
    RegClient,
    DeregClient,
    RegAction { action: String },
    DeregAction { action: String },
    RecvServerRequest,
    SendServerResponse(ActionResponseData),
    NotifyActionHeartbeat { action: String, timestamp: u64 },
}

impl ReqPayload {
    pub fn req_type(&self) -> ReqType {
        match self {
            Self::RegClient => ReqType::RegClient,
            Self::DeregClient => ReqType::DeregClient,
            Self::RegAction { .. } => ReqType::RegAction,
            Self::DeregAction { .. } => ReqType::DeregAction,
            Self::RecvServerRequest => ReqType::RecvServerRequest,
            Self::SendServerResponse(_) => ReqType::SendServerResponse,
            Self::NotifyActionHeartbeat { .. } => ReqType::NotifyActionHeartbeat,
        }
    }
}

impl Serialize for ReqPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = match self {
            ReqPayload::RegClient | ReqPayload::DeregClient | ReqPayload::RecvServerRequest => {
                serde_json::json!({ "req_type": self.req_type().as_u8() })
            }
            ReqPayload::RegAction { action } | ReqPayload::DeregAction { action } => {
                serde_json::json!({ "req_type": self.req_type().as_u8(), "action": action })
            }
            ReqPayload::SendServerResponse(resp) => {
                let mut value = serde_json::to_value(resp).map_err(S::Error::custom)?;
                if let serde_json::Value::Object(map) = &mut value {
                    map.insert("req_type".to_owned(), self.req_type().as_u8().into());
                }
                value
            }
            ReqPayload::NotifyActionHeartbeat { action, timestamp } => {
                serde_json::json!({
                    "req_type": self.req_type().as_u8(),
                    "action": action,
                    "timestamp": timestamp,
                })
            }
        };
        value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ReqPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let req_type = value
            .get("req_type")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| D::Error::missing_field("req_type"))?;

        fn string_field<E: serde::de::Error>(value: &serde_json::Value, key: &str) -> Result<String, E> {
            value.get(key).and_then(serde_json::Value::as_str).map(str::to_owned).ok_or_else(|| E::missing_field(key))
        }

        match req_type {
            1 => Ok(ReqPayload::RegClient),
            2 => Ok(ReqPayload::DeregClient),
            3 => Ok(ReqPayload::RegAction { action: string_field(&value, "action")? }),
            4 => Ok(ReqPayload::DeregAction { action: string_field(&value, "action")? }),
            5 => Ok(ReqPayload::RecvServerRequest),
            6 => {
                let resp: ActionResponseData = serde_json::from_value(value).map_err(D::Error::custom)?;
                Ok(ReqPayload::SendServerResponse(resp))
            }
            7 => {
                let action = string_field(&value, "action")?;
                let timestamp = value
                    .get("timestamp")
                    .and_then(serde_json::Value::as_u64)
                    .ok_or_else(|| D::Error::missing_field("timestamp"))?;
                Ok(ReqPayload::NotifyActionHeartbeat { action, timestamp })
            }
            other => Err(D::Error::custom(format!("unknown req_type {other}"))),
        }
    }
}

/// Client → server envelope. `session` identifies one client process's
/// transport session (stable across every request it sends) and is what
/// `RegisterClient` compares to decide whether a re-registration under the
/// same name is idempotent or a collision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LomRequest {
    pub client: String,
    pub session: Uuid,
    pub timeout_secs: u64,
    pub req_data: ReqPayload,
}

impl LomRequest {
    pub fn req_type(&self) -> ReqType {
        self.req_data.req_type()
    }
}

/// Response payload carried back on success; most request types carry
/// nothing, `RecvServerRequest` carries the dispatched [`ServerRequestData`].
/// `Empty` serializes as JSON `null` and `ServerRequest` serializes as the
/// inner [`ServerRequestData`] directly, with no Rust-variant wrapper key.
#[derive(Debug, Clone, PartialEq)]
pub enum RespPayload {
    Empty,
    ServerRequest(ServerRequestData),
}

impl Serialize for RespPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RespPayload::Empty => serializer.serialize_none(),
            RespPayload::ServerRequest(data) => data.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for RespPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(RespPayload::Empty);
        }
        let data: ServerRequestData = serde_json::from_value(value).map_err(D::Error::custom)?;
        Ok(RespPayload::ServerRequest(data))
    }
}

/// Server → client envelope. `result_code == 0` is success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LomResponse {
    pub result_code: i32,
    pub result_str: String,
    pub resp_data: RespPayload,
}

impl LomResponse {
    pub fn ok(resp_data: RespPayload) -> Self {
        Self { result_code: 0, result_str: String::new(), resp_data }
    }

    pub fn err(code: ErrorCode, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        let result_str = if msg.is_empty() { code.message().to_owned() } else { msg };
        Self { result_code: code.code(), result_str, resp_data: RespPayload::Empty }
    }

    pub fn is_ok(&self) -> bool {
        self.result_code == 0
    }
}

#[cfg(test)]
#[path = "messages_tests.rs"]
mod tests;
