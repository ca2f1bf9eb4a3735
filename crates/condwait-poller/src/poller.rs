// SPDX-License-Identifier: GPL-3.0-or-later
use std::convert::Infallible;
use std::future::{ready, Future};

use condwait_config::PollerConfig;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::error::{BoxError, PollError, Result};
use crate::handle::PollHandle;
use crate::options::{FirstEvaluation, PollOptions};
use crate::state::{PollState, Progress};

/// Waits for an externally driven condition by evaluating a predicate on a
/// fixed interval.
#[derive(Debug, Clone, Default)]
pub struct ConditionPoller {
    options: PollOptions,
}

impl ConditionPoller {
    pub fn new(options: PollOptions) -> Self {
        Self { options }
    }

    pub fn from_config(config: &PollerConfig) -> Self {
        Self::new(PollOptions::from(config))
    }

    pub fn options(&self) -> &PollOptions {
        &self.options
    }

    /// Resolve once `predicate` returns true.
    pub async fn await_condition<F>(&self, mut predicate: F) -> Result<()>
    where
        F: FnMut() -> bool,
    {
        self.await_condition_async(move || ready(Ok::<_, Infallible>(predicate())))
            .await
    }

    /// Like [`await_condition`](Self::await_condition), but an `Err` from the
    /// predicate aborts the wait with [`PollError::Predicate`].
    pub async fn try_await_condition<F, E>(&self, mut predicate: F) -> Result<()>
    where
        F: FnMut() -> std::result::Result<bool, E>,
        E: Into<BoxError>,
    {
        self.await_condition_async(move || ready(predicate())).await
    }

    /// Poll an asynchronous predicate. An evaluation still running when the
    /// timeout expires is dropped.
    pub async fn await_condition_async<F, Fut, E>(&self, predicate: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<bool, E>>,
        E: Into<BoxError>,
    {
        drive(predicate, self.options, Progress::default()).await
    }

    /// Run the wait on the tokio runtime and return a cancellable handle.
    ///
    /// [`PollHandle::cancel`] blocks until a running predicate returns, so
    /// keep predicates short and never call back into the handle from one.
    pub fn spawn<F, E>(&self, mut predicate: F) -> PollHandle
    where
        F: FnMut() -> std::result::Result<bool, E> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        self.spawn_async(move || ready(predicate()))
    }

    pub fn spawn_async<F, Fut, E>(&self, predicate: F) -> PollHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<bool, E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let progress = Progress::default();
        let task = tokio::spawn(drive(predicate, self.options, progress.clone()));
        PollHandle::new(progress, task)
    }
}

async fn drive<F, Fut, E>(mut predicate: F, options: PollOptions, progress: Progress) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<bool, E>>,
    E: Into<BoxError>,
{
    if let Err(err) = options.validate() {
        return settle(&progress, PollState::Failed, Err(err));
    }

    let start = Instant::now();
    // A timeout too large to represent never expires.
    let deadline = options
        .timeout
        .and_then(|timeout| start.checked_add(timeout));
    let first_tick = match options.first_evaluation {
        FirstEvaluation::AfterInterval => start
            .checked_add(options.interval)
            .ok_or(PollError::InvalidInterval),
        FirstEvaluation::Immediate => Ok(start),
    };
    let first_tick = match first_tick {
        Ok(first_tick) => first_tick,
        Err(err) => return settle(&progress, PollState::Failed, Err(err)),
    };
    let _settle_on_drop = SettleOnDrop(progress.clone());

    let mut ticker = interval_at(first_tick, options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Only polled when a deadline exists.
    let expiry = sleep_until(deadline.unwrap_or(start));
    tokio::pin!(expiry);

    debug!(
        target: "poller",
        interval = ?options.interval,
        timeout = ?options.timeout,
        first_evaluation = ?options.first_evaluation,
        "wait started"
    );

    loop {
        // A tick landing exactly on the deadline is still evaluated.
        tokio::select! {
            biased;
            _ = ticker.tick() => {}
            _ = &mut expiry, if deadline.is_some() => {
                return Err(timed_out(&progress, options, start));
            }
        }
        if deadline.is_some_and(|deadline| Instant::now() > deadline) {
            return Err(timed_out(&progress, options, start));
        }

        let Some((evaluation, pending)) = progress.begin_evaluation(|| predicate()) else {
            return Err(PollError::Cancelled {
                evaluations: progress.evaluations(),
            });
        };

        let outcome = tokio::select! {
            biased;
            outcome = pending => outcome,
            _ = &mut expiry, if deadline.is_some() => {
                return Err(timed_out(&progress, options, start));
            }
        };

        match outcome {
            Ok(true) => {
                debug!(
                    target: "poller",
                    evaluation,
                    elapsed = ?start.elapsed(),
                    "condition satisfied"
                );
                return settle(&progress, PollState::Satisfied, Ok(()));
            }
            Ok(false) => {
                trace!(target: "poller", evaluation, "condition not met yet");
            }
            Err(err) => {
                let source: BoxError = err.into();
                warn!(target: "poller", evaluation, error = %source, "predicate failed");
                return settle(
                    &progress,
                    PollState::Failed,
                    Err(PollError::Predicate { evaluation, source }),
                );
            }
        }
    }
}

/// Marks a wait whose future goes away while still pending (a panicking
/// predicate, an aborted task) as failed.
struct SettleOnDrop(Progress);

impl Drop for SettleOnDrop {
    fn drop(&mut self) {
        let _ = self.0.settle(PollState::Failed);
    }
}

fn settle(progress: &Progress, state: PollState, outcome: Result<()>) -> Result<()> {
    match progress.settle(state) {
        Ok(_) => outcome,
        Err(evaluations) => Err(PollError::Cancelled { evaluations }),
    }
}

fn timed_out(progress: &Progress, options: PollOptions, start: Instant) -> PollError {
    match progress.settle(PollState::TimedOut) {
        Ok(evaluations) => {
            warn!(
                target: "poller",
                evaluations,
                elapsed = ?start.elapsed(),
                "condition not met before timeout"
            );
            PollError::TimedOut {
                timeout: options.timeout.unwrap_or_default(),
                evaluations,
            }
        }
        Err(evaluations) => PollError::Cancelled { evaluations },
    }
}
