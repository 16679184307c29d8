// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `SequenceInstance`: one in-flight run of a binding, keyed by the
//! anchor's anomaly-instance-id.

use crate::config::{BindingAction, BindingSequence};
use crate::support::TimerHandle;
use crate::transport::messages::ActionResponseData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    Running,
    Completed,
    Failed,
    TimedOut,
}

impl SequenceState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

pub struct SequenceInstance {
    pub anomaly_instance_id: String,
    pub anchor_action: String,
    pub anchor_key: String,
    pub binding_name: String,
    pub actions: Vec<BindingAction>,
    pub current_index: usize,
    pub context: Vec<ActionResponseData>,
    pub state: SequenceState,
    pub step_timer: Option<TimerHandle>,
    pub sequence_timer: Option<TimerHandle>,
    /// The non-anchor action this instance currently holds the contended
    /// lock for, if any.
    pub held_action: Option<String>,
}

impl SequenceInstance {
    pub fn new(anomaly_instance_id: String, binding: &BindingSequence, anchor_key: String) -> Self {
        Self {
            anomaly_instance_id,
            anchor_action: binding.actions.first().map(|a| a.name.clone()).unwrap_or_default(),
            anchor_key,
            binding_name: binding.name.clone(),
            actions: binding.actions.clone(),
            current_index: 0,
            context: Vec::new(),
            state: SequenceState::Running,
            step_timer: None,
            sequence_timer: None,
            held_action: None,
        }
    }

    pub fn current_action(&self) -> Option<&str> {
        self.actions.get(self.current_index).map(|a| a.name.as_str())
    }
}

#[cfg(test)]
#[path = "sequence_tests.rs"]
mod tests;
