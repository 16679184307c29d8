// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event publish sink: converts a recorded response plus its sequence
//! state into a JSON event. Mirrors the original's `PublishString`, which
//! logs the string and returns it unchanged — the real event-bus
//! integration is outside this engine's scope.

use serde::Serialize;

use crate::transport::messages::ActionResponseData;

#[derive(Debug, Clone, Serialize)]
struct PublishEvent<'a> {
    #[serde(rename = "LoM_Action")]
    lom_action: &'a ActionResponseData,
    #[serde(rename = "State")]
    state: &'a str,
}

/// Publishes a JSON event string, returning it unchanged — callers use the
/// return value only to confirm what was actually sent.
pub trait PublishSink: Send + Sync {
    fn publish(&self, json: String) -> String;
}

/// Default sink: logs at info level and hands the string back.
///
/// TODO: Call event publish
#[derive(Debug, Default)]
pub struct LoggingPublishSink;

impl PublishSink for LoggingPublishSink {
    fn publish(&self, json: String) -> String {
        tracing::info!(event = %json, "sequence event published");
        json
    }
}

pub(super) fn encode(resp: &ActionResponseData, state: &str) -> String {
    let event = PublishEvent { lom_action: resp, state };
    serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_owned())
}

#[cfg(test)]
#[path = "publish_tests.rs"]
mod tests;
