// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::PathBuf;

use clap::Parser;
use condwait_config::AppConfig;

use crate::target::Target;

#[derive(Parser, Debug)]
#[command(name = "condwait")]
#[command(version, about = "Wait until a condition holds", long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Delay between checks, in milliseconds
    #[arg(long, global = true)]
    pub interval_ms: Option<u64>,

    /// Give up after this many milliseconds (0 waits forever)
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Check once right away instead of after the first interval
    #[arg(long, global = true)]
    pub immediate: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub target: Target,
}

impl Cli {
    /// Command-line flags win over file and environment configuration.
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(interval_ms) = self.interval_ms {
            config.poller.interval_ms = interval_ms;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.poller.timeout_ms = timeout_ms;
        }
        if self.immediate {
            config.poller.immediate = true;
        }
        if let Some(level) = &self.log_level {
            config.telemetry.log_level = level.clone();
        }
    }
}
