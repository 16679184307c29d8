// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `bindings.conf.json` document and the validated [`BindingSequence`] it
//! loads into.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(super) struct BindingActionRaw {
    pub name: String,
    pub sequence: usize,
    #[serde(default)]
    pub mandatory: bool,
    /// Per-step timeout override in seconds; absent/zero means "use the
    /// action's configured timeout".
    #[serde(default)]
    pub timeout: u64,
}

#[derive(Debug, Deserialize)]
pub(super) struct BindingRaw {
    #[serde(alias = "SequenceName")]
    pub name: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(rename = "Timeout")]
    pub timeout: u64,
    pub actions: Vec<BindingActionRaw>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BindingsDoc {
    #[serde(default)]
    pub bindings: Vec<BindingRaw>,
}

/// One step of a [`BindingSequence`], positioned by `sequence_index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingAction {
    pub name: String,
    pub mandatory: bool,
    pub timeout_override: Option<Duration>,
    pub sequence_index: usize,
}

/// A validated, fully-resolved binding: sequence indices are a permutation
/// of `0..n`, index 0 is a detection action, every name resolves in the
/// actions document, and `actions` is pre-sorted by `sequence_index` so
/// callers can walk it positionally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingSequence {
    pub name: String,
    pub timeout: Duration,
    pub priority: i64,
    pub actions: Vec<BindingAction>,
}

impl BindingSequence {
    /// The detection action at index 0 — responses from it may create a
    /// sequence instance.
    pub fn anchor_action(&self) -> Option<&str> {
        self.actions.first().map(|a| a.name.as_str())
    }
}

#[cfg(test)]
#[path = "bindings_tests.rs"]
mod tests;
