// SPDX-License-Identifier: GPL-3.0-or-later
use std::fmt;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::{PollError, Result};
use crate::state::{PollState, Progress};

/// A wait running in the background.
///
/// Dropping the handle cancels the wait.
pub struct PollHandle {
    progress: Progress,
    task: JoinHandle<Result<()>>,
}

impl PollHandle {
    pub(crate) fn new(progress: Progress, task: JoinHandle<Result<()>>) -> Self {
        Self { progress, task }
    }

    /// Stop polling. Once this returns the predicate is not invoked again and
    /// the timer is released.
    ///
    /// Returns false (and does nothing) if the wait had already settled.
    pub fn cancel(&self) -> bool {
        let cancelled = self.progress.cancel();
        self.task.abort();
        if cancelled {
            warn!(
                target: "poller",
                evaluations = self.progress.evaluations(),
                "wait cancelled"
            );
        }
        cancelled
    }

    pub fn state(&self) -> PollState {
        self.progress.state()
    }

    pub fn evaluations(&self) -> u64 {
        self.progress.evaluations()
    }

    pub fn is_settled(&self) -> bool {
        self.state().is_terminal()
    }

    /// Wait for the terminal outcome. A panic raised by the predicate is
    /// resumed here.
    pub async fn wait(mut self) -> Result<()> {
        match (&mut self.task).await {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => Err(PollError::Cancelled {
                evaluations: self.progress.evaluations(),
            }),
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if self.progress.cancel() {
            warn!(target: "poller", "poll handle dropped, wait cancelled");
        }
        self.task.abort();
    }
}

impl fmt::Debug for PollHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollHandle")
            .field("state", &self.state())
            .field("evaluations", &self.evaluations())
            .finish()
    }
}
