// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UUID generation, mirroring the original's `GetUUID`: a 36-character
//! canonical string from an external generator, falling back to
//! `<epoch-seconds>-<counter>` (deliberately shorter than 36, which is the
//! documented signal to callers that it's a fallback) if that generator is
//! unavailable.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Injectable source of UUID strings.
pub trait UuidGen: Send + Sync {
    fn new_uuid(&self) -> String;
}

/// Canonical 36-character UUIDv4 strings via the `uuid` crate.
#[derive(Debug, Default)]
pub struct RealUuidGen;

impl UuidGen for RealUuidGen {
    fn new_uuid(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Falls back to `<epoch-seconds>-<counter>` every time — used in tests to
/// exercise the fallback path the original reaches only when `uuidgen(1)`
/// is missing from `PATH`.
#[derive(Debug, Default)]
pub struct FallbackUuidGen {
    counter: AtomicU64,
}

impl UuidGen for FallbackUuidGen {
    fn new_uuid(&self) -> String {
        let epoch = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{epoch}-{n}")
    }
}

#[cfg(test)]
#[path = "uuidgen_tests.rs"]
mod tests;
