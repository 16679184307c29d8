// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios driven through the public surface (`EngineClient`
//! over the native transport into the request handler), exercising the
//! full C3→C6 stack rather than any one component in isolation.

use std::io::Write as _;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lom_engine::config::ConfigManager;
use lom_engine::handler::RequestHandler;
use lom_engine::orchestrator::{Orchestrator, PublishSink};
use lom_engine::registry::Registry;
use lom_engine::support::{RealUuidGen, TimerWheel, UuidGen};
use lom_engine::transport::{ActionResponseData, EngineClient, NativeServer, RespPayload, Transport};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn write_fixture(path: &std::path::Path, contents: &str) {
    let mut f = std::fs::File::create(path).expect("create fixture file");
    f.write_all(contents.as_bytes()).expect("write fixture file");
}

/// The literal binding from the end-to-end scenarios: anchor "Detect-0",
/// then "Safety-chk-0" (1s timeout), then "Mitigate-0" (6s timeout), with a
/// 2s sequence timeout.
fn scenario_config_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixture(&dir.path().join("globals.conf.json"), "{}");
    write_fixture(
        &dir.path().join("actions.conf.json"),
        r#"{
            "actions": [
                {"name": "Detect-0", "type": "detection", "timeout": 2},
                {"name": "Safety-chk-0", "type": "safety", "timeout": 1},
                {"name": "Mitigate-0", "type": "mitigation", "timeout": 6}
            ]
        }"#,
    );
    write_fixture(
        &dir.path().join("bindings.conf.json"),
        r#"{
            "bindings": [
                {
                    "name": "bind-0",
                    "Timeout": 2,
                    "actions": [
                        {"name": "Detect-0", "sequence": 0, "mandatory": true},
                        {"name": "Safety-chk-0", "sequence": 1, "mandatory": true},
                        {"name": "Mitigate-0", "sequence": 2, "mandatory": true}
                    ]
                }
            ]
        }"#,
    );
    dir
}

/// A second binding sharing "Safety-chk-0" with "bind-0", for the
/// contended-action scenario.
fn contention_config_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixture(&dir.path().join("globals.conf.json"), "{}");
    write_fixture(
        &dir.path().join("actions.conf.json"),
        r#"{
            "actions": [
                {"name": "Detect-0", "type": "detection", "timeout": 1},
                {"name": "Detect-1", "type": "detection", "timeout": 1},
                {"name": "Safety-chk-0", "type": "safety", "timeout": 1}
            ]
        }"#,
    );
    write_fixture(
        &dir.path().join("bindings.conf.json"),
        r#"{
            "bindings": [
                {
                    "name": "bind-0",
                    "Timeout": 2,
                    "actions": [
                        {"name": "Detect-0", "sequence": 0, "mandatory": true},
                        {"name": "Safety-chk-0", "sequence": 1, "mandatory": true}
                    ]
                },
                {
                    "name": "bind-1",
                    "Timeout": 2,
                    "actions": [
                        {"name": "Detect-1", "sequence": 0, "mandatory": true},
                        {"name": "Safety-chk-0", "sequence": 1, "mandatory": true}
                    ]
                }
            ]
        }"#,
    );
    dir
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<String>>,
}

impl PublishSink for RecordingSink {
    fn publish(&self, json: String) -> String {
        self.events.lock().expect("lock").push(json.clone());
        json
    }
}

struct Harness {
    client: EngineClient,
    events: Arc<RecordingSink>,
    handler_task: tokio::task::JoinHandle<()>,
}

impl Harness {
    fn build(config: Arc<ConfigManager>, client_name: &str) -> Self {
        let events = Arc::new(RecordingSink::default());
        let uuid_gen: Arc<dyn UuidGen> = Arc::new(RealUuidGen::default());
        let registry = Registry::new(config.clone());
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let orchestrator = Orchestrator::new(
            config,
            uuid_gen.clone(),
            events.clone() as Arc<dyn PublishSink>,
            TimerWheel::spawn(),
            timer_tx,
        );
        let handler = RequestHandler::new(registry, orchestrator, uuid_gen);
        let (inbox_tx, inbox_rx) = mpsc::channel(64);
        let shutdown = CancellationToken::new();
        let handler_task = tokio::spawn(handler.run(inbox_rx, timer_rx, shutdown));

        let native: Arc<dyn Transport> = Arc::new(NativeServer::new(inbox_tx));
        let client = EngineClient::new(client_name, native);
        Self { client, events, handler_task }
    }

    fn event_count(&self) -> usize {
        self.events.events.lock().expect("lock").len()
    }

    fn event(&self, i: usize) -> String {
        self.events.events.lock().expect("lock")[i].clone()
    }
}

async fn next_action_request(client: &EngineClient) -> lom_engine::transport::ActionRequestData {
    let resp = client.recv_server_request().await.expect("transport call should succeed");
    match resp.resp_data {
        RespPayload::ServerRequest(lom_engine::transport::ServerRequestData::Action(req)) => req,
        other => panic!("expected an action request, got {other:?}"),
    }
}

fn ok_response(req: &lom_engine::transport::ActionRequestData, key: &str) -> ActionResponseData {
    ActionResponseData {
        action: req.action.clone(),
        instance_id: req.instance_id.clone(),
        anomaly_instance_id: req.anomaly_instance_id.clone(),
        anomaly_key: key.to_owned(),
        response_string: String::new(),
        result_code: 0,
        result_string: String::new(),
    }
}

#[tokio::test]
async fn s1_happy_path_publishes_one_init_and_one_complete() {
    let dir = scenario_config_dir();
    let config = Arc::new(
        ConfigManager::load(
            &dir.path().join("globals.conf.json"),
            &dir.path().join("actions.conf.json"),
            &dir.path().join("bindings.conf.json"),
        )
        .expect("config should load"),
    );
    let harness = Harness::build(config, "client-0");
    let client = &harness.client;

    assert!(client.register_client().await.expect("transport call should succeed").is_ok());
    assert!(client.register_action("Detect-0").await.expect("transport call should succeed").is_ok());
    assert!(client.register_action("Safety-chk-0").await.expect("transport call should succeed").is_ok());
    assert!(client.register_action("Mitigate-0").await.expect("transport call should succeed").is_ok());

    let anchor_req = next_action_request(client).await;
    assert_eq!(anchor_req.action, "Detect-0");
    client.send_server_response(ok_response(&anchor_req, "K1")).await.expect("transport call should succeed");

    let safety_req = next_action_request(client).await;
    assert_eq!(safety_req.action, "Safety-chk-0");
    client.send_server_response(ok_response(&safety_req, "K1")).await.expect("transport call should succeed");

    let mitigate_req = next_action_request(client).await;
    assert_eq!(mitigate_req.action, "Mitigate-0");
    client.send_server_response(ok_response(&mitigate_req, "K1")).await.expect("transport call should succeed");

    // finish_sequence re-arms the anchor; drain that extra bootstrap so it
    // doesn't leave a dangling queued request behind.
    let _ = next_action_request(client).await;

    assert_eq!(harness.event_count(), 2);
    assert!(harness.event(0).contains("\"State\":\"init\""));
    assert!(harness.event(0).contains("Detect-0"));
    assert!(harness.event(1).contains("\"State\":\"complete\""));
    assert!(harness.event(1).contains("Detect-0"));

    harness.handler_task.abort();
}

#[tokio::test]
async fn s2_a_failing_step_publishes_the_failing_response_and_rearms_the_anchor() {
    let dir = scenario_config_dir();
    let config = Arc::new(
        ConfigManager::load(
            &dir.path().join("globals.conf.json"),
            &dir.path().join("actions.conf.json"),
            &dir.path().join("bindings.conf.json"),
        )
        .expect("config should load"),
    );
    let harness = Harness::build(config, "client-0");
    let client = &harness.client;

    client.register_client().await.expect("transport call should succeed");
    client.register_action("Detect-0").await.expect("transport call should succeed");
    client.register_action("Safety-chk-0").await.expect("transport call should succeed");
    client.register_action("Mitigate-0").await.expect("transport call should succeed");

    let anchor_req = next_action_request(client).await;
    client.send_server_response(ok_response(&anchor_req, "K1")).await.expect("transport call should succeed");
    let safety_req = next_action_request(client).await;
    client.send_server_response(ok_response(&safety_req, "K1")).await.expect("transport call should succeed");

    let mitigate_req = next_action_request(client).await;
    let mut failing = ok_response(&mitigate_req, "K1");
    failing.result_code = 2;
    client.send_server_response(failing).await.expect("transport call should succeed");

    assert_eq!(harness.event_count(), 2);
    assert!(harness.event(1).contains("\"State\":\"complete\""));
    assert!(harness.event(1).contains("Mitigate-0"));
    assert!(harness.event(1).contains("\"result_code\":2"));

    // Anchor re-armed: a fresh Detect-0 request should already be queued.
    let rearmed = next_action_request(client).await;
    assert_eq!(rearmed.action, "Detect-0");

    harness.handler_task.abort();
}

#[tokio::test]
async fn s5_contended_action_fails_the_second_sequence_and_the_winner_completes() {
    let dir = contention_config_dir();
    let config = Arc::new(
        ConfigManager::load(
            &dir.path().join("globals.conf.json"),
            &dir.path().join("actions.conf.json"),
            &dir.path().join("bindings.conf.json"),
        )
        .expect("config should load"),
    );
    let harness = Harness::build(config, "client-0");
    let client = &harness.client;

    client.register_client().await.expect("transport call should succeed");
    client.register_action("Detect-0").await.expect("transport call should succeed");
    client.register_action("Detect-1").await.expect("transport call should succeed");
    client.register_action("Safety-chk-0").await.expect("transport call should succeed");

    let detect0_req = next_action_request(client).await;
    assert_eq!(detect0_req.action, "Detect-0");
    let detect1_req = next_action_request(client).await;
    assert_eq!(detect1_req.action, "Detect-1");

    // bind-0's anchor fires first and claims Safety-chk-0.
    client.send_server_response(ok_response(&detect0_req, "K1")).await.expect("transport call should succeed");
    // bind-1's anchor contends for the same action and loses synchronously.
    client.send_server_response(ok_response(&detect1_req, "K2")).await.expect("transport call should succeed");

    // Exactly 3 publishes so far: bind-0 init, bind-1 init, bind-1 complete (ActionActive).
    assert_eq!(harness.event_count(), 3);
    assert!(harness.event(2).contains("\"State\":\"complete\""));
    let action_active_code = format!("\"result_code\":{}", lom_engine::error::ErrorCode::ActionActive.code());
    assert!(harness.event(2).contains(&action_active_code));

    // The winner's Safety-chk-0 step is still outstanding; completing it
    // finishes bind-0's sequence normally.
    let safety_req = next_action_request(client).await;
    assert_eq!(safety_req.action, "Safety-chk-0");
    client.send_server_response(ok_response(&safety_req, "K1")).await.expect("transport call should succeed");

    assert_eq!(harness.event_count(), 4);
    assert!(harness.event(3).contains("\"State\":\"complete\""));
    assert!(harness.event(3).contains("Detect-0"));

    harness.handler_task.abort();
}

#[tokio::test]
async fn s3_step_timeout_fails_the_sequence_and_rearms_the_anchor() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixture(&dir.path().join("globals.conf.json"), "{}");
    write_fixture(
        &dir.path().join("actions.conf.json"),
        r#"{
            "actions": [
                {"name": "Detect-0", "type": "detection", "timeout": 2},
                {"name": "Safety-chk-0", "type": "safety", "timeout": 1}
            ]
        }"#,
    );
    write_fixture(
        &dir.path().join("bindings.conf.json"),
        r#"{
            "bindings": [
                {
                    "name": "bind-0",
                    "Timeout": 5,
                    "actions": [
                        {"name": "Detect-0", "sequence": 0, "mandatory": true},
                        {"name": "Safety-chk-0", "sequence": 1, "mandatory": true}
                    ]
                }
            ]
        }"#,
    );
    let config = Arc::new(
        ConfigManager::load(
            &dir.path().join("globals.conf.json"),
            &dir.path().join("actions.conf.json"),
            &dir.path().join("bindings.conf.json"),
        )
        .expect("config should load"),
    );
    let harness = Harness::build(config, "client-0");
    let client = &harness.client;

    client.register_client().await.expect("transport call should succeed");
    client.register_action("Detect-0").await.expect("transport call should succeed");
    client.register_action("Safety-chk-0").await.expect("transport call should succeed");

    let anchor_req = next_action_request(client).await;
    client.send_server_response(ok_response(&anchor_req, "K1")).await.expect("transport call should succeed");

    // Never respond to Safety-chk-0 (1s timeout); wait past it.
    let _safety_req = next_action_request(client).await;
    tokio::time::sleep(Duration::from_millis(1200)).await;

    assert_eq!(harness.event_count(), 2);
    assert!(harness.event(1).contains("\"State\":\"complete\""));
    assert!(harness.event(1).contains("Safety-chk-0"));
    let timeout_code = format!("\"result_code\":{}", lom_engine::error::ErrorCode::ReqTimeout.code());
    assert!(harness.event(1).contains(&timeout_code));

    let rearmed = next_action_request(client).await;
    assert_eq!(rearmed.action, "Detect-0");

    harness.handler_task.abort();
}

#[tokio::test]
async fn s4_sequence_timeout_discards_a_later_real_response() {
    let dir = scenario_config_dir();
    let config = Arc::new(
        ConfigManager::load(
            &dir.path().join("globals.conf.json"),
            &dir.path().join("actions.conf.json"),
            &dir.path().join("bindings.conf.json"),
        )
        .expect("config should load"),
    );
    let harness = Harness::build(config, "client-0");
    let client = &harness.client;

    client.register_client().await.expect("transport call should succeed");
    client.register_action("Detect-0").await.expect("transport call should succeed");
    client.register_action("Safety-chk-0").await.expect("transport call should succeed");
    client.register_action("Mitigate-0").await.expect("transport call should succeed");

    let anchor_req = next_action_request(client).await;
    client.send_server_response(ok_response(&anchor_req, "K1")).await.expect("transport call should succeed");
    let safety_req = next_action_request(client).await;
    client.send_server_response(ok_response(&safety_req, "K1")).await.expect("transport call should succeed");

    // Mitigate-0's own timeout is 6s, but bind-0's sequence timeout is 2s —
    // it fires first.
    let mitigate_req = next_action_request(client).await;
    tokio::time::sleep(Duration::from_millis(2200)).await;

    assert_eq!(harness.event_count(), 2);
    assert!(harness.event(1).contains("\"State\":\"complete\""));
    let seq_timeout_code = format!("\"result_code\":{}", lom_engine::error::ErrorCode::SequenceTimeout.code());
    assert!(harness.event(1).contains(&seq_timeout_code));

    // Drain the anchor re-arm before the late, now-orphaned response arrives.
    let _ = next_action_request(client).await;

    // The client's real (late) response for the now-finished sequence must
    // not produce a second terminal publish.
    let _ = client.send_server_response(ok_response(&mitigate_req, "K1")).await;
    assert_eq!(harness.event_count(), 2);

    harness.handler_task.abort();
}

#[tokio::test]
async fn s6_client_drop_mid_sequence_synthesizes_a_deregistered_failure() {
    let dir = scenario_config_dir();
    let config = Arc::new(
        ConfigManager::load(
            &dir.path().join("globals.conf.json"),
            &dir.path().join("actions.conf.json"),
            &dir.path().join("bindings.conf.json"),
        )
        .expect("config should load"),
    );
    let harness = Harness::build(config, "client-0");
    let client = &harness.client;

    client.register_client().await.expect("transport call should succeed");
    client.register_action("Detect-0").await.expect("transport call should succeed");
    client.register_action("Safety-chk-0").await.expect("transport call should succeed");
    client.register_action("Mitigate-0").await.expect("transport call should succeed");

    let anchor_req = next_action_request(client).await;
    client.send_server_response(ok_response(&anchor_req, "K1")).await.expect("transport call should succeed");
    let safety_req = next_action_request(client).await;
    client.send_server_response(ok_response(&safety_req, "K1")).await.expect("transport call should succeed");

    // Mitigate-0 is now outstanding; the client disconnects without
    // responding.
    let _mitigate_req = next_action_request(client).await;
    let _ = client.deregister_client().await;

    assert_eq!(harness.event_count(), 2);
    assert!(harness.event(1).contains("\"State\":\"complete\""));
    assert!(harness.event(1).contains("Mitigate-0"));
    let dereg_code = format!("\"result_code\":{}", lom_engine::error::ErrorCode::ActionDeregistered.code());
    assert!(harness.event(1).contains(&dereg_code));

    harness.handler_task.abort();
}
