// SPDX-License-Identifier: GPL-3.0-or-later

use std::time::Duration;

use thiserror::Error;

/// Error type a fallible predicate may report.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, PollError>;

#[derive(Debug, Error)]
pub enum PollError {
    #[error("condition not met within {timeout:?} ({evaluations} evaluations)")]
    TimedOut { timeout: Duration, evaluations: u64 },

    #[error("predicate failed on evaluation {evaluation}: {source}")]
    Predicate {
        evaluation: u64,
        #[source]
        source: BoxError,
    },

    #[error("wait cancelled after {evaluations} evaluations")]
    Cancelled { evaluations: u64 },

    #[error("poll interval must be greater than zero and at most thirty years")]
    InvalidInterval,
}

impl PollError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PollError::TimedOut { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PollError::Cancelled { .. })
    }
}
