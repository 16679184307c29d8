// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;
use std::path::PathBuf;

/// Config-load/lookup failures. Load failures are fatal at startup per the
/// error-handling policy; lookup failures surface to the caller.
#[derive(Debug)]
pub enum ConfigError {
    Missing { path: PathBuf },
    Malformed { path: PathBuf, source: serde_json::Error },
    UnknownActionRef { binding: String, action: String },
    DuplicateSequenceIndex { binding: String, index: usize },
    NonPermutationIndices { binding: String },
    EmptyBinding { binding: String },
    DisabledActionRef { binding: String, action: String },
    MissingAnchor { binding: String },
    UnknownAction { action: String },
    NoBindingForAnchor { action: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { path } => write!(f, "config file missing: {}", path.display()),
            Self::Malformed { path, source } => {
                write!(f, "config file malformed: {}: {source}", path.display())
            }
            Self::UnknownActionRef { binding, action } => {
                write!(f, "binding {binding:?} references unknown action {action:?}")
            }
            Self::DuplicateSequenceIndex { binding, index } => {
                write!(f, "binding {binding:?} has duplicate sequence index {index}")
            }
            Self::NonPermutationIndices { binding } => {
                write!(f, "binding {binding:?} sequence indices aren't a permutation of 0..n")
            }
            Self::EmptyBinding { binding } => write!(f, "binding {binding:?} has zero actions"),
            Self::DisabledActionRef { binding, action } => {
                write!(f, "binding {binding:?} references disabled action {action:?}")
            }
            Self::MissingAnchor { binding } => {
                write!(f, "binding {binding:?} has no detection action at index 0")
            }
            Self::UnknownAction { action } => write!(f, "unknown action {action:?}"),
            Self::NoBindingForAnchor { action } => {
                write!(f, "no binding anchored on action {action:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Malformed { source, .. } => Some(source),
            _ => None,
        }
    }
}
