// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sequence orchestrator (C5): drives a `SequenceInstance` through its
//! binding from the anchor's first positive detection to a terminal state,
//! enforcing per-step and per-sequence timeouts and the contended-action
//! partial-failure boundary. Owned exclusively by the request-handler
//! worker (C6), same single-writer discipline as [`crate::registry::Registry`].

mod publish;
mod sequence;

pub use publish::{LoggingPublishSink, PublishSink};
pub use sequence::{SequenceInstance, SequenceState};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::ConfigManager;
use crate::error::ErrorCode;
use crate::registry::Registry;
use crate::support::{TimerWheel, UuidGen};
use crate::transport::messages::{ActionRequestData, ActionResponseData, ServerRequestData};

/// Events a timer callback posts back onto the C6 worker's channel instead
/// of touching orchestrator state directly from its own transient task.
#[derive(Debug, Clone)]
pub enum TimerEvent {
    StepTimeout { anomaly_instance_id: String, step_index: usize },
    SequenceTimeout { anomaly_instance_id: String },
}

pub struct Orchestrator {
    config: Arc<ConfigManager>,
    uuid_gen: Arc<dyn UuidGen>,
    publish_sink: Arc<dyn PublishSink>,
    timers: TimerWheel,
    timer_tx: mpsc::UnboundedSender<TimerEvent>,
    sequences: HashMap<String, SequenceInstance>,
    /// Non-anchor action name -> anomaly-instance-id of the sequence
    /// currently holding it.
    contended: HashMap<String, String>,
}

impl Orchestrator {
    pub fn new(
        config: Arc<ConfigManager>,
        uuid_gen: Arc<dyn UuidGen>,
        publish_sink: Arc<dyn PublishSink>,
        timers: TimerWheel,
        timer_tx: mpsc::UnboundedSender<TimerEvent>,
    ) -> Self {
        Self {
            config,
            uuid_gen,
            publish_sink,
            timers,
            timer_tx,
            sequences: HashMap::new(),
            contended: HashMap::new(),
        }
    }

    pub fn active_sequence_count(&self) -> usize {
        self.sequences.len()
    }

    fn publish_event(&self, resp: &ActionResponseData, state: &str) {
        self.publish_sink.publish(publish::encode(resp, state));
    }

    fn max_seq_timeout(&self) -> Duration {
        let secs = self.config.globals().get_int("MAX_SEQ_TIMEOUT_SECS").max(0) as u64;
        Duration::from_secs(secs)
    }

    /// Entry point, called by C6 after a successful `SendServerResponse`.
    pub fn process_response(&mut self, registry: &mut Registry, resp: ActionResponseData) {
        if resp.is_anchor() && !self.sequences.contains_key(&resp.anomaly_instance_id) {
            self.process_anchor_response(registry, resp);
            return;
        }

        let Some(instance) = self.sequences.get_mut(&resp.anomaly_instance_id) else {
            tracing::debug!(action = %resp.action, anomaly_instance_id = %resp.anomaly_instance_id, "late response for unknown sequence discarded");
            return;
        };
        if instance.state != SequenceState::Running {
            return;
        }
        let expected_index = instance.current_index;
        if instance.actions.get(expected_index).map(|a| a.name.as_str()) != Some(resp.action.as_str()) {
            tracing::debug!(action = %resp.action, "response for a non-current step discarded");
            return;
        }

        if let Some(handle) = instance.step_timer.take() {
            handle.disable();
        }
        instance.context.push(resp.clone());

        if resp.result_code != 0 {
            instance.state = SequenceState::Failed;
            self.publish_event(&resp, "complete");
            self.finish_sequence(registry, &resp.anomaly_instance_id);
            return;
        }

        if expected_index > 0 {
            self.release_contention(&resp.action, &resp.anomaly_instance_id);
        }
        instance.current_index += 1;

        if instance.current_index == instance.actions.len() {
            instance.state = SequenceState::Completed;
            let anchor_resp = instance.context[0].clone();
            self.publish_event(&anchor_resp, "complete");
            self.finish_sequence(registry, &resp.anomaly_instance_id);
        } else {
            self.dispatch_step(registry, &resp.anomaly_instance_id);
        }
    }

    fn process_anchor_response(&mut self, registry: &mut Registry, resp: ActionResponseData) {
        let binding = match self.config.get_sequence(&resp.action) {
            Ok(b) => b.clone(),
            Err(_) => {
                tracing::warn!(action = %resp.action, "anchor response has no configured binding");
                return;
            }
        };

        if resp.result_code != 0 {
            self.publish_event(&resp, "complete");
            return;
        }

        let mut instance =
            SequenceInstance::new(resp.anomaly_instance_id.clone(), &binding, resp.anomaly_key.clone());
        instance.context.push(resp.clone());
        // The anchor (index 0) has already run; the next step to dispatch is index 1.
        instance.current_index = 1;
        self.publish_event(&resp, "init");

        let seq_timeout = binding.timeout.min(self.max_seq_timeout());
        let id = instance.anomaly_instance_id.clone();
        let tx = self.timer_tx.clone();
        let handle = self.timers.add_one_shot(seq_timeout, move || {
            let _ = tx.send(TimerEvent::SequenceTimeout { anomaly_instance_id: id });
        });
        instance.sequence_timer = Some(handle);

        if instance.current_index == instance.actions.len() {
            instance.state = SequenceState::Completed;
            self.sequences.insert(instance.anomaly_instance_id.clone(), instance);
            self.publish_event(&resp, "complete");
            self.finish_sequence(registry, &resp.anomaly_instance_id);
            return;
        }

        self.sequences.insert(instance.anomaly_instance_id.clone(), instance);
        self.dispatch_step(registry, &resp.anomaly_instance_id);
    }

    fn dispatch_step(&mut self, registry: &mut Registry, anomaly_instance_id: &str) {
        let Some(instance) = self.sequences.get_mut(anomaly_instance_id) else { return };
        let index = instance.current_index;
        let Some(step) = instance.actions.get(index).cloned() else { return };

        if index > 0 && !self.acquire_contention(&step.name, anomaly_instance_id) {
            self.fail_step(registry, anomaly_instance_id, ErrorCode::ActionActive, &step.name);
            return;
        }
        if index > 0 {
            if let Some(instance) = self.sequences.get_mut(anomaly_instance_id) {
                instance.held_action = Some(step.name.clone());
            }
        }

        let Some(owner) = registry.owner_of(&step.name).map(str::to_owned) else {
            self.fail_step(registry, anomaly_instance_id, ErrorCode::ActionNotRegistered, &step.name);
            return;
        };

        let timeout = step
            .timeout_override
            .or_else(|| registry.action_timeout(&step.name))
            .unwrap_or(Duration::from_secs(0));

        let Some(instance) = self.sequences.get_mut(anomaly_instance_id) else { return };
        let request = ActionRequestData {
            action: step.name.clone(),
            instance_id: self.uuid_gen.new_uuid(),
            anomaly_instance_id: anomaly_instance_id.to_owned(),
            anomaly_key: instance.anchor_key.clone(),
            timeout,
            context: instance.context.clone(),
        };

        let id = anomaly_instance_id.to_owned();
        let tx = self.timer_tx.clone();
        let handle = self.timers.add_one_shot(timeout, move || {
            let _ = tx.send(TimerEvent::StepTimeout { anomaly_instance_id: id, step_index: index });
        });
        instance.step_timer = Some(handle);

        registry.dispatch(&owner, ServerRequestData::Action(request));
    }

    /// Synthesizes a failing response for the current step of `anomaly_instance_id`
    /// with `code`, records it, and finishes the sequence.
    fn fail_step(
        &mut self,
        registry: &mut Registry,
        anomaly_instance_id: &str,
        code: ErrorCode,
        action_name: &str,
    ) {
        let Some(instance) = self.sequences.get_mut(anomaly_instance_id) else { return };
        let synthesized = ActionResponseData {
            action: action_name.to_owned(),
            instance_id: self.uuid_gen.new_uuid(),
            anomaly_instance_id: anomaly_instance_id.to_owned(),
            anomaly_key: instance.anchor_key.clone(),
            response_string: String::new(),
            result_code: code.code(),
            result_string: code.message().to_owned(),
        };
        instance.context.push(synthesized.clone());
        instance.state = SequenceState::Failed;
        self.publish_event(&synthesized, "complete");
        self.finish_sequence(registry, anomaly_instance_id);
    }

    pub fn handle_step_timeout(&mut self, registry: &mut Registry, anomaly_instance_id: &str, step_index: usize) {
        let Some(instance) = self.sequences.get(anomaly_instance_id) else { return };
        if instance.state != SequenceState::Running || instance.current_index != step_index {
            return;
        }
        let action_name = instance.actions[step_index].name.clone();
        self.fail_step(registry, anomaly_instance_id, ErrorCode::ReqTimeout, &action_name);
    }

    pub fn handle_sequence_timeout(&mut self, registry: &mut Registry, anomaly_instance_id: &str) {
        let Some(instance) = self.sequences.get_mut(anomaly_instance_id) else { return };
        if instance.state != SequenceState::Running {
            return;
        }
        let index = instance.current_index;
        let action_name = instance.actions[index].name.clone();
        let synthesized = ActionResponseData {
            action: action_name,
            instance_id: self.uuid_gen.new_uuid(),
            anomaly_instance_id: anomaly_instance_id.to_owned(),
            anomaly_key: instance.anchor_key.clone(),
            response_string: String::new(),
            result_code: ErrorCode::SequenceTimeout.code(),
            result_string: ErrorCode::SequenceTimeout.message().to_owned(),
        };
        instance.context.push(synthesized.clone());
        instance.state = SequenceState::TimedOut;
        self.publish_event(&synthesized, "complete");
        self.finish_sequence(registry, anomaly_instance_id);
    }

    /// Called when C4 deregisters an action; fails the sequence for which
    /// it is the current pending step, if any.
    pub fn notify_action_deregistered(&mut self, registry: &mut Registry, action_name: &str) {
        let target = self.sequences.iter().find_map(|(id, instance)| {
            (instance.state == SequenceState::Running && instance.current_action() == Some(action_name))
                .then(|| id.clone())
        });
        if let Some(id) = target {
            self.fail_step(registry, &id, ErrorCode::ActionDeregistered, action_name);
        }
    }

    fn finish_sequence(&mut self, registry: &mut Registry, anomaly_instance_id: &str) {
        let Some(instance) = self.sequences.remove(anomaly_instance_id) else { return };
        if let Some(handle) = instance.step_timer {
            handle.disable();
        }
        if let Some(handle) = instance.sequence_timer {
            handle.disable();
        }
        if let Some(action) = instance.held_action {
            self.release_contention(&action, anomaly_instance_id);
        }

        if let Some(owner) = registry.owner_of(&instance.anchor_action).map(str::to_owned) {
            let timeout = registry.action_timeout(&instance.anchor_action).unwrap_or(Duration::from_secs(0));
            let fresh_id = self.uuid_gen.new_uuid();
            let bootstrap = ActionRequestData {
                action: instance.anchor_action,
                instance_id: fresh_id.clone(),
                anomaly_instance_id: fresh_id,
                anomaly_key: String::new(),
                timeout,
                context: Vec::new(),
            };
            registry.dispatch(&owner, ServerRequestData::Action(bootstrap));
        }
    }

    fn acquire_contention(&mut self, action_name: &str, anomaly_instance_id: &str) -> bool {
        match self.contended.get(action_name) {
            Some(holder) if holder != anomaly_instance_id => false,
            _ => {
                self.contended.insert(action_name.to_owned(), anomaly_instance_id.to_owned());
                true
            }
        }
    }

    fn release_contention(&mut self, action_name: &str, anomaly_instance_id: &str) {
        if self.contended.get(action_name).map(|h| h.as_str()) == Some(anomaly_instance_id) {
            self.contended.remove(action_name);
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
