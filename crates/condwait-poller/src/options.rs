// SPDX-License-Identifier: GPL-3.0-or-later
use std::time::Duration;

use condwait_config::PollerConfig;

use crate::error::{PollError, Result};

/// Longest accepted interval, roughly thirty years
pub const MAX_INTERVAL: Duration = Duration::from_secs(86_400 * 365 * 30);

/// When the first predicate evaluation happens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirstEvaluation {
    /// One full interval after the wait starts
    #[default]
    AfterInterval,
    /// As soon as the wait starts, then every interval
    Immediate,
}

/// Polling cadence and budget for a single wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    pub timeout: Option<Duration>,
    pub first_evaluation: FirstEvaluation,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            timeout: Some(Duration::from_secs(5)),
            first_evaluation: FirstEvaluation::AfterInterval,
        }
    }
}

impl PollOptions {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Poll until the condition holds or the wait is cancelled
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    pub fn immediate(mut self) -> Self {
        self.first_evaluation = FirstEvaluation::Immediate;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.interval.is_zero() || self.interval > MAX_INTERVAL {
            return Err(PollError::InvalidInterval);
        }
        Ok(())
    }
}

impl From<&PollerConfig> for PollOptions {
    fn from(config: &PollerConfig) -> Self {
        Self {
            interval: config.interval(),
            timeout: config.timeout(),
            first_evaluation: if config.immediate {
                FirstEvaluation::Immediate
            } else {
                FirstEvaluation::AfterInterval
            },
        }
    }
}
