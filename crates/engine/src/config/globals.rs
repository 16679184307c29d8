// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `globals.conf.json` document: a flat string/number object served through
//! three typed views (string, integer, raw), with built-in defaults for a
//! small set of well-known keys.

use std::collections::HashMap;

use serde_json::Value;

/// Well-known keys with built-in defaults, consulted only on a cache-miss
/// of the loaded document — a loaded value always wins.
const WELL_KNOWN_INT_DEFAULTS: &[(&str, i64)] = &[
    ("MIN_PERIODIC_LOG_PERIOD_SECS", 15),
    ("MAX_SEQ_TIMEOUT_SECS", 120),
    ("ENGINE_HB_INTERVAL_SECS", 10),
];

#[derive(Debug, Clone, Default)]
pub struct Globals {
    values: HashMap<String, Value>,
}

impl Globals {
    pub(super) fn from_map(values: HashMap<String, Value>) -> Self {
        Self { values }
    }

    /// String view. Missing keys return `""` (no well-known string
    /// defaults exist today).
    pub fn get_str(&self, key: &str) -> String {
        match self.values.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }

    /// Integer view. Tolerates a JSON number or a decimal string, since
    /// some of these documents are hand-edited. Falls back to the
    /// well-known-key default table, then to `0`.
    pub fn get_int(&self, key: &str) -> i64 {
        match self.values.get(key) {
            Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
            Some(Value::String(s)) => s.parse().unwrap_or_else(|_| Self::default_int(key)),
            Some(_) | None => Self::default_int(key),
        }
    }

    fn default_int(key: &str) -> i64 {
        WELL_KNOWN_INT_DEFAULTS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .unwrap_or(0)
    }

    /// Raw JSON value view, with no default substitution.
    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

#[cfg(test)]
#[path = "globals_tests.rs"]
mod tests;
