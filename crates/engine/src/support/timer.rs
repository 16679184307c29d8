// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot timers driven by a single cooperative worker so that
//! [`TimerHandle::disable`] races against a firing callback resolve
//! deterministically: both the disable flag and the fire decision are only
//! ever touched from the wheel's own task.

use std::collections::BinaryHeap;
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

type Callback = Box<dyn FnOnce() + Send + 'static>;

struct Armed {
    due: Instant,
    seq: u64,
    state: Arc<State>,
    callback: Callback,
}

struct State {
    disabled: AtomicBool,
    done: AtomicBool,
}

/// Handle to an armed one-shot timer.
#[derive(Clone)]
pub struct TimerHandle {
    state: Arc<State>,
}

impl TimerHandle {
    pub fn is_done(&self) -> bool {
        self.state.done.load(Ordering::Acquire)
    }

    pub fn is_disabled(&self) -> bool {
        self.state.disabled.load(Ordering::Acquire)
    }

    /// Skip invocation if not yet fired. A no-op once the timer has fired.
    pub fn disable(&self) {
        self.state.disabled.store(true, Ordering::Release);
    }
}

enum Command {
    Arm(Armed),
}

// `BinaryHeap` is a max-heap; invert ordering so the earliest-due,
// lowest-seq entry sorts first (same-time timers fire in arrival order).
impl PartialEq for Armed {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}
impl Eq for Armed {}
impl PartialOrd for Armed {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}
impl Ord for Armed {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
    }
}

/// The single-worker timer wheel. Cloning shares the same worker.
#[derive(Clone)]
pub struct TimerWheel {
    tx: mpsc::UnboundedSender<Command>,
}

impl TimerWheel {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(Self::run(rx));
        Self { tx }
    }

    /// Arm a one-shot timer. A negative/zero delay fires on the worker's
    /// next tick rather than literally inline, preserving the documented
    /// "same-time timers fire in arrival order" guarantee.
    pub fn add_one_shot<F>(&self, delay: Duration, callback: F) -> TimerHandle
    where
        F: FnOnce() + Send + 'static,
    {
        static SEQ: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
        let seq = SEQ.fetch_add(1, Ordering::Relaxed);
        let state = Arc::new(State { disabled: AtomicBool::new(false), done: AtomicBool::new(false) });
        let handle = TimerHandle { state: state.clone() };
        let armed = Armed { due: Instant::now() + delay, seq, state, callback: Box::new(callback) };
        let _ = self.tx.send(Command::Arm(armed));
        handle
    }

    async fn run(mut rx: mpsc::UnboundedReceiver<Command>) {
        let mut heap: BinaryHeap<Armed> = BinaryHeap::new();
        let idle = Duration::from_secs(24 * 60 * 60);

        loop {
            let sleep_for = heap
                .peek()
                .map(|a| a.due.saturating_duration_since(Instant::now()))
                .unwrap_or(idle);

            tokio::select! {
                cmd = rx.recv() => {
                    match cmd {
                        Some(Command::Arm(armed)) => heap.push(armed),
                        None => return,
                    }
                }
                _ = tokio::time::sleep(sleep_for) => {
                    let now = Instant::now();
                    loop {
                        let due = matches!(heap.peek(), Some(top) if top.due <= now);
                        if !due {
                            break;
                        }
                        let Some(armed) = heap.pop() else { break };
                        if !armed.state.disabled.load(Ordering::Acquire) {
                            (armed.callback)();
                        }
                        armed.state.done.store(true, Ordering::Release);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
