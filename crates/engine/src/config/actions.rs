// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `actions.conf.json` document and the immutable [`ActionConfig`] it loads
//! into.

use std::time::Duration;

use serde::Deserialize;

/// Kind of action, as declared in the actions document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    Detection,
    Safety,
    Mitigation,
}

impl ActionType {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "detection" => Some(Self::Detection),
            "safety" => Some(Self::Safety),
            "mitigation" => Some(Self::Mitigation),
            _ => None,
        }
    }
}

/// One entry of the `actions` array in `actions.conf.json`.
#[derive(Debug, Deserialize)]
pub(super) struct ActionConfigRaw {
    pub name: String,
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub timeout: u64,
    #[serde(default, rename = "HeartbeatInt")]
    pub heartbeat_interval: u64,
    #[serde(default, rename = "Disable")]
    pub disable: bool,
    #[serde(default, rename = "Mimic")]
    pub mimic: bool,
    #[serde(default, rename = "ActionKnobs")]
    pub action_knobs: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ActionsDoc {
    #[serde(default)]
    pub actions: Vec<ActionConfigRaw>,
}

/// Immutable, validated action configuration — loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionConfig {
    pub name: String,
    pub action_type: ActionType,
    pub timeout: Duration,
    pub heartbeat_interval: Duration,
    pub disabled: bool,
    pub mimic: bool,
    pub action_knobs: String,
}

impl ActionConfig {
    pub(super) fn from_raw(raw: ActionConfigRaw) -> Result<Self, String> {
        let action_type = ActionType::parse(&raw.action_type)
            .ok_or_else(|| format!("action {:?} has unknown type {:?}", raw.name, raw.action_type))?;
        Ok(Self {
            name: raw.name,
            action_type,
            timeout: Duration::from_secs(raw.timeout),
            heartbeat_interval: Duration::from_secs(raw.heartbeat_interval),
            disabled: raw.disable,
            mimic: raw.mimic,
            action_knobs: raw.action_knobs,
        })
    }
}

#[cfg(test)]
#[path = "actions_tests.rs"]
mod tests;
