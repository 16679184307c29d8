// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Leveled logging gated by a process-wide threshold, mirroring the
//! `syslog.Priority` ladder in the original `lomcommon/helper.go`: messages
//! above the threshold are dropped before formatting, `Debug` additionally
//! mirrors to stdout, and `Emerg` terminates the process through an
//! injectable exit primitive so tests can observe a fatal log without
//! killing the test binary.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

/// Severity ladder, ordered most to least severe like `syslog.Priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Emerg = 0,
    Alert = 1,
    Crit = 2,
    Err = 3,
    Warning = 4,
    Notice = 5,
    Info = 6,
    Debug = 7,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Emerg => "EMERG",
            Self::Alert => "ALERT",
            Self::Crit => "CRIT",
            Self::Err => "ERR",
            Self::Warning => "WARNING",
            Self::Notice => "NOTICE",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        };
        f.write_str(s)
    }
}

static THRESHOLD: AtomicU8 = AtomicU8::new(Level::Debug as u8);
static EXIT: OnceLock<Arc<dyn Fn(i32) -> ! + Send + Sync>> = OnceLock::new();

/// Current process-wide log level threshold.
pub fn log_level() -> Level {
    match THRESHOLD.load(Ordering::Relaxed) {
        0 => Level::Emerg,
        1 => Level::Alert,
        2 => Level::Crit,
        3 => Level::Err,
        4 => Level::Warning,
        5 => Level::Notice,
        6 => Level::Info,
        _ => Level::Debug,
    }
}

/// Set the process-wide log level threshold.
pub fn set_log_level(lvl: Level) {
    THRESHOLD.store(lvl as u8, Ordering::Relaxed);
}

/// Install the primitive used by [`log_panic`] to terminate the process.
/// Only the first call takes effect — intended to be called once by test
/// setup before any fatal-path code runs.
pub fn set_exit_primitive(exit: Arc<dyn Fn(i32) -> ! + Send + Sync>) {
    let _ = EXIT.set(exit);
}

fn exit_primitive() -> Arc<dyn Fn(i32) -> ! + Send + Sync> {
    EXIT.get_or_init(|| Arc::new(|code| std::process::exit(code))).clone()
}

/// Log `msg` at `lvl` if `lvl <= current threshold` (lower variant = more
/// severe, so this reads as "at least as severe as the threshold allows").
pub fn log_message(lvl: Level, msg: &str) {
    if lvl > log_level() {
        return;
    }
    match lvl {
        Level::Emerg | Level::Alert | Level::Crit => tracing::error!(level = %lvl, "{msg}"),
        Level::Err => tracing::error!("{msg}"),
        Level::Warning => tracing::warn!("{msg}"),
        Level::Notice | Level::Info => tracing::info!("{msg}"),
        Level::Debug => tracing::debug!("{msg}"),
    }
    if log_level() >= Level::Debug {
        println!("{msg}");
    }
}

pub fn log_error(msg: impl Into<String>) -> String {
    let msg = msg.into();
    log_message(Level::Err, &msg);
    msg
}

pub fn log_warning(msg: &str) {
    log_message(Level::Warning, msg);
}

pub fn log_info(msg: &str) {
    log_message(Level::Info, msg);
}

pub fn log_debug(msg: &str) {
    log_message(Level::Debug, msg);
}

/// Log at `Crit`, then terminate the process via the injectable exit
/// primitive. Never returns in production; in tests the primitive may be a
/// no-op that just records the call.
pub fn log_panic(msg: &str) -> ! {
    log_message(Level::Crit, msg);
    log_message(Level::Crit, "LoM exiting ...");
    (exit_primitive())(-1)
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
