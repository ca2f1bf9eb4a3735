// SPDX-License-Identifier: GPL-3.0-or-later

//! Poll-until-condition waits for async code.
//!
//! A [`ConditionPoller`] evaluates a caller-supplied predicate on a fixed
//! interval until it returns true, the optional timeout expires, the
//! predicate fails, or the wait is cancelled. Exactly one of those outcomes is
//! reported per wait and the underlying timer is released on every path.
//!
//! ```no_run
//! # async fn example(items: std::sync::Mutex<Vec<&str>>) -> condwait_poller::Result<()> {
//! use std::time::Duration;
//!
//! condwait_poller::await_condition(
//!     || items.lock().unwrap().len() == 2,
//!     Duration::from_millis(100),
//!     Some(Duration::from_secs(2)),
//! )
//! .await
//! # }
//! ```

pub mod error;
pub mod handle;
pub mod options;
pub mod poller;
pub mod state;

use std::time::Duration;

pub use error::{BoxError, PollError, Result};
pub use handle::PollHandle;
pub use options::{FirstEvaluation, PollOptions};
pub use poller::ConditionPoller;
pub use state::PollState;

/// Evaluate `predicate` every `interval` until it returns true.
///
/// The first evaluation happens one interval after the call. With
/// `timeout = None` the wait only ends when the condition holds or the
/// returned future is dropped.
pub async fn await_condition<F>(
    predicate: F,
    interval: Duration,
    timeout: Option<Duration>,
) -> Result<()>
where
    F: FnMut() -> bool,
{
    let options = PollOptions {
        interval,
        timeout,
        first_evaluation: FirstEvaluation::AfterInterval,
    };
    ConditionPoller::new(options).await_condition(predicate).await
}
