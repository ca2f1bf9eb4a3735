// SPDX-License-Identifier: GPL-3.0-or-later
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

/// Lifecycle of a single wait. Every state other than `Pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Pending,
    Satisfied,
    TimedOut,
    Failed,
    Cancelled,
}

impl PollState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PollState::Pending)
    }
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PollState::Pending => "pending",
            PollState::Satisfied => "satisfied",
            PollState::TimedOut => "timed-out",
            PollState::Failed => "failed",
            PollState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
struct Inner {
    state: PollState,
    evaluations: u64,
}

/// Progress of a wait, shared between the polling loop and its handle.
///
/// The lock is held while the predicate is invoked, so a cancellation that
/// has returned can never be followed by another invocation. A `cancel()` on
/// another thread blocks until a running synchronous predicate returns, so
/// predicates must be short and must not touch their own `PollHandle`
/// (doing so deadlocks).
#[derive(Debug, Clone)]
pub(crate) struct Progress {
    inner: Arc<Mutex<Inner>>,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: PollState::Pending,
                evaluations: 0,
            })),
        }
    }
}

impl Progress {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!(target: "poller", "progress mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn state(&self) -> PollState {
        self.lock().state
    }

    pub fn evaluations(&self) -> u64 {
        self.lock().evaluations
    }

    /// Count and run one invocation while the wait is still pending.
    /// Returns `None` once the wait has settled.
    pub fn begin_evaluation<T>(&self, invoke: impl FnOnce() -> T) -> Option<(u64, T)> {
        let mut inner = self.lock();
        if inner.state.is_terminal() {
            return None;
        }
        inner.evaluations += 1;
        let evaluation = inner.evaluations;
        Some((evaluation, invoke()))
    }

    /// Move a pending wait to `state`.
    ///
    /// `Ok` carries the evaluation count when this call settled the wait,
    /// `Err` carries it when something else (a cancel) got there first.
    pub fn settle(&self, state: PollState) -> Result<u64, u64> {
        let mut inner = self.lock();
        if inner.state.is_terminal() {
            return Err(inner.evaluations);
        }
        inner.state = state;
        Ok(inner.evaluations)
    }

    /// Returns true if the wait was pending and is now cancelled.
    pub fn cancel(&self) -> bool {
        self.settle(PollState::Cancelled).is_ok()
    }
}
