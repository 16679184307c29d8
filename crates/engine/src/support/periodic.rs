// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic log throttler, ported from `LogPeriodic_t` in the original
//! `lomcommon/helper.go`: a named entry is logged at most once per period
//! by a single cooperative worker that recomputes its next wake-up as the
//! minimum next-due time across all entries.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::logging::{self, Level};

/// Lower bound for a periodic log's period, unless overridden by config.
pub const DEFAULT_MIN_PERIOD_SECS: u64 = 15;

/// An entry submitted by a caller wanting a message logged at most once per
/// `period`.
#[derive(Debug, Clone)]
pub struct LogPeriodicEntry {
    pub id: String,
    pub message: String,
    pub level: Level,
    pub period: Duration,
}

enum Command {
    Upsert(LogPeriodicEntry),
    Drop(String),
}

struct Armed {
    entry: LogPeriodicEntry,
    due: Instant,
    index: u64,
}

/// Handle to the periodic-log worker. Cloning shares the same worker.
#[derive(Clone)]
pub struct PeriodicLogThrottler {
    tx: mpsc::UnboundedSender<Command>,
    min_period: Duration,
}

impl PeriodicLogThrottler {
    /// Spawn the worker task. `min_period` is the floor below which
    /// [`Self::add`] rejects an entry — normally the config manager's
    /// `MIN_PERIODIC_LOG_PERIOD_SECS`.
    pub fn spawn(min_period: Duration, abort: CancellationToken) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(Self::run(rx, abort));
        Self { tx, min_period }
    }

    /// Submit (or update) an entry. Rejects an empty id, empty message, or a
    /// period below the configured minimum.
    pub fn add(&self, entry: LogPeriodicEntry) -> Result<(), String> {
        if entry.id.is_empty() || entry.message.is_empty() {
            return Err(logging::log_error("LogPeriodicEntry ID or message is empty"));
        }
        if entry.period < self.min_period {
            return Err(logging::log_error(format!(
                "LogPeriodicEntry Period({:?}) < min({:?})",
                entry.period, self.min_period
            )));
        }
        let _ = self.tx.send(Command::Upsert(entry));
        Ok(())
    }

    /// Remove a previously-added entry. A no-op for an empty id.
    pub fn drop_entry(&self, id: &str) {
        if !id.is_empty() {
            let _ = self.tx.send(Command::Drop(id.to_owned()));
        }
    }

    async fn run(mut rx: mpsc::UnboundedReceiver<Command>, abort: CancellationToken) {
        let mut entries: HashMap<String, Armed> = HashMap::new();
        let a_day = Duration::from_secs(24 * 60 * 60);
        let mut sleep_for = a_day;

        loop {
            tokio::select! {
                _ = abort.cancelled() => {
                    logging::log_debug("Terminating LogPeriodic upon explicit abort");
                    return;
                }
                cmd = rx.recv() => {
                    match cmd {
                        Some(Command::Upsert(entry)) => {
                            entries.insert(
                                entry.id.clone(),
                                Armed { entry, due: Instant::now(), index: 0 },
                            );
                        }
                        Some(Command::Drop(id)) => {
                            entries.remove(&id);
                        }
                        None => return,
                    }
                }
                _ = tokio::time::sleep(sleep_for) => {
                    Self::fire_due(&mut entries);
                }
            }

            sleep_for = Self::next_wake(&entries, a_day);
        }
    }

    fn fire_due(entries: &mut HashMap<String, Armed>) {
        let now = Instant::now();
        for armed in entries.values_mut() {
            if armed.due <= now {
                logging::log_message(
                    armed.entry.level,
                    &format!("periodic:{} ({})", armed.index, armed.entry.message),
                );
                armed.due = now + armed.entry.period;
                armed.index += 1;
            }
        }
    }

    fn next_wake(entries: &HashMap<String, Armed>, idle: Duration) -> Duration {
        let now = Instant::now();
        entries
            .values()
            .map(|a| a.due.saturating_duration_since(now))
            .min()
            .unwrap_or(idle)
    }
}

#[cfg(test)]
#[path = "periodic_tests.rs"]
mod tests;
