// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config manager (C2): loads the three JSON documents, validates
//! cross-references, and serves typed lookups with defaults. Initialized
//! once at startup and treated as immutable thereafter.

mod actions;
mod bindings;
mod error;
mod globals;

pub use actions::{ActionConfig, ActionType};
pub use bindings::{BindingAction, BindingSequence};
pub use error::ConfigError;
pub use globals::Globals;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use actions::ActionsDoc;
use bindings::{BindingRaw, BindingsDoc};

/// Loaded, validated configuration. Immutable after [`ConfigManager::load`].
#[derive(Debug)]
pub struct ConfigManager {
    globals: Globals,
    actions: HashMap<String, ActionConfig>,
    bindings: HashMap<String, BindingSequence>,
    /// Binding name anchored on each action name, for `is_start_sequence_action`
    /// and `get_sequence`.
    anchors: HashMap<String, String>,
}

impl ConfigManager {
    /// Load and validate the three config documents. Fails if any file is
    /// missing, isn't well-formed JSON, or cross-reference validation fails
    /// (unknown action ref, duplicate sequence index, zero-action binding,
    /// disabled-action ref, missing anchor).
    pub fn load(
        globals_path: &Path,
        actions_path: &Path,
        bindings_path: &Path,
    ) -> Result<Self, ConfigError> {
        let globals_doc: HashMap<String, serde_json::Value> = read_json(globals_path)?;
        let actions_doc: ActionsDoc = read_json(actions_path)?;
        let bindings_doc: BindingsDoc = read_json(bindings_path)?;

        let mut actions = HashMap::new();
        for raw in actions_doc.actions {
            let cfg = ActionConfig::from_raw(raw)
                .map_err(|msg| ConfigError::Malformed {
                    path: actions_path.to_owned(),
                    source: serde::de::Error::custom(msg),
                })?;
            actions.insert(cfg.name.clone(), cfg);
        }

        let mut bindings = HashMap::new();
        let mut anchors = HashMap::new();
        for raw in bindings_doc.bindings {
            let binding = Self::validate_binding(raw, &actions)?;
            if let Some(anchor) = binding.anchor_action() {
                anchors.insert(anchor.to_owned(), binding.name.clone());
            }
            bindings.insert(binding.name.clone(), binding);
        }

        Ok(Self { globals: Globals::from_map(globals_doc), actions, bindings, anchors })
    }

    fn validate_binding(
        raw: BindingRaw,
        actions: &HashMap<String, ActionConfig>,
    ) -> Result<BindingSequence, ConfigError> {
        if raw.actions.is_empty() {
            return Err(ConfigError::EmptyBinding { binding: raw.name });
        }

        let mut seen_indices = std::collections::HashSet::new();
        let mut parsed: Vec<BindingAction> = Vec::with_capacity(raw.actions.len());
        for a in &raw.actions {
            if !seen_indices.insert(a.sequence) {
                return Err(ConfigError::DuplicateSequenceIndex {
                    binding: raw.name.clone(),
                    index: a.sequence,
                });
            }
            let action_cfg = actions.get(&a.name).ok_or_else(|| ConfigError::UnknownActionRef {
                binding: raw.name.clone(),
                action: a.name.clone(),
            })?;
            if action_cfg.disabled {
                return Err(ConfigError::DisabledActionRef {
                    binding: raw.name.clone(),
                    action: a.name.clone(),
                });
            }
            parsed.push(BindingAction {
                name: a.name.clone(),
                mandatory: a.mandatory,
                timeout_override: if a.timeout > 0 {
                    Some(std::time::Duration::from_secs(a.timeout))
                } else {
                    None
                },
                sequence_index: a.sequence,
            });
        }

        let n = parsed.len();
        if !(0..n).all(|i| seen_indices.contains(&i)) {
            return Err(ConfigError::NonPermutationIndices { binding: raw.name });
        }

        parsed.sort_by_key(|a| a.sequence_index);

        let anchor_type = actions
            .get(&parsed[0].name)
            .map(|c| c.action_type)
            .unwrap_or(ActionType::Safety);
        if anchor_type != ActionType::Detection {
            return Err(ConfigError::MissingAnchor { binding: raw.name });
        }

        Ok(BindingSequence {
            name: raw.name,
            timeout: std::time::Duration::from_secs(raw.timeout),
            priority: raw.priority,
            actions: parsed,
        })
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    pub fn get_action_config(&self, name: &str) -> Result<&ActionConfig, ConfigError> {
        self.actions
            .get(name)
            .ok_or_else(|| ConfigError::UnknownAction { action: name.to_owned() })
    }

    /// The binding anchored on `anchor_action`'s index-0 detection step.
    pub fn get_sequence(&self, anchor_action: &str) -> Result<&BindingSequence, ConfigError> {
        let binding_name = self.anchors.get(anchor_action).ok_or_else(|| {
            ConfigError::NoBindingForAnchor { action: anchor_action.to_owned() }
        })?;
        // Always present: `anchors` and `bindings` are populated together.
        self.bindings.get(binding_name).ok_or_else(|| ConfigError::NoBindingForAnchor {
            action: anchor_action.to_owned(),
        })
    }

    /// True iff `name` is the anchor of some binding.
    pub fn is_start_sequence_action(&self, name: &str) -> bool {
        self.anchors.contains_key(name)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let bytes = fs::read(path).map_err(|_| ConfigError::Missing { path: path.to_owned() })?;
    serde_json::from_slice(&bytes)
        .map_err(|source| ConfigError::Malformed { path: path.to_owned(), source })
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
