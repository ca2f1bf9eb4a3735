// SPDX-License-Identifier: GPL-3.0-or-later
mod cli;
mod target;

use anyhow::{bail, Context, Result};
use clap::Parser;
use condwait_config::{load as load_config, AppConfig, TelemetryConfig};
use condwait_poller::ConditionPoller;
use tokio::time::Instant;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = resolve_config(&cli)?;
    init_tracing(&config.telemetry);

    let poller = ConditionPoller::from_config(&config.poller);
    let target = &cli.target;
    info!(
        target: "cli",
        %target,
        interval = ?poller.options().interval,
        timeout = ?poller.options().timeout,
        "waiting"
    );

    let started = Instant::now();
    let handle = target.spawn(&poller)?;

    // Dropping the pending wait on shutdown cancels it.
    tokio::select! {
        outcome = handle.wait() => {
            outcome.with_context(|| format!("waiting for {target}"))?;
        }
        _ = shutdown_signal() => {
            bail!("interrupted while waiting for {target}");
        }
    }

    info!(target: "cli", %target, elapsed = ?started.elapsed(), "condition met");
    Ok(())
}

/// File and environment configuration with command-line flags applied on top.
fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = load_config(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    Ok(config)
}

fn init_tracing(telemetry: &TelemetryConfig) {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&telemetry.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let mut terminate =
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(err) => {
                tracing::warn!(target: "cli", error = %err, "cannot install SIGTERM handler");
                return std::future::pending().await;
            }
        };

    #[cfg(unix)]
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = terminate.recv() => {},
    }

    #[cfg(not(unix))]
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(target: "cli", error = %err, "cannot install ctrl-c handler");
        std::future::pending::<()>().await;
    }

    info!(target: "cli", "shutdown signal received");
}
