// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result codes returned to clients over the transport, mirroring the
//! `LoMResponseCode` enumeration from the original `serverReqHandler.go`.

use std::fmt;

/// Result codes start here so they never collide with OS-level error codes.
pub const RESP_CODE_START: i32 = 4096;

/// Result code carried on every [`crate::transport::messages::LomResponse`].
///
/// `0` (not a variant here — see [`ErrorCode::is_ok`] callers) means success;
/// every variant below is `>= RESP_CODE_START`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorCode {
    Unknown,
    UnknownReqType,
    IncorrectReqData,
    ReqFailed,
    ReqTimeout,
    FirstActionFailed,
    MissingSequence,
    ActionDeregistered,
    ActionNotRegistered,
    ActionActive,
    SequenceTimeout,
    SequenceIncorrect,
    Shutdown,
}

impl ErrorCode {
    /// Stable ordering matches `LOM_RESP_CODE_START + iota` in the original.
    const ALL: [ErrorCode; 13] = [
        Self::Unknown,
        Self::UnknownReqType,
        Self::IncorrectReqData,
        Self::ReqFailed,
        Self::ReqTimeout,
        Self::FirstActionFailed,
        Self::MissingSequence,
        Self::ActionDeregistered,
        Self::ActionNotRegistered,
        Self::ActionActive,
        Self::SequenceTimeout,
        Self::SequenceIncorrect,
        Self::Shutdown,
    ];

    pub fn code(&self) -> i32 {
        RESP_CODE_START + Self::ALL.iter().position(|c| c == self).unwrap_or(0) as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        let idx = code - RESP_CODE_START;
        if idx < 0 {
            return None;
        }
        Self::ALL.get(idx as usize).copied()
    }

    /// Human-readable text matching the original's `LoMResponseStr` table.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown error",
            Self::UnknownReqType => "Unknown request",
            Self::IncorrectReqData => "Incorrect Msg type",
            Self::ReqFailed => "Request failed",
            Self::ReqTimeout => "Request Timed out",
            Self::FirstActionFailed => "First Action failed",
            Self::MissingSequence => "First Action's sequence missing",
            Self::ActionDeregistered => "Action de-registered",
            Self::ActionNotRegistered => "Action not registered",
            Self::ActionActive => "Action already active",
            Self::SequenceTimeout => "Sequence timed out",
            Self::SequenceIncorrect => "Sequence state incorrect",
            Self::Shutdown => "LOM system shutdown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
