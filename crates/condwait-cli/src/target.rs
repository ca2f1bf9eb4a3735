// SPDX-License-Identifier: GPL-3.0-or-later
use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use condwait_poller::{ConditionPoller, PollHandle};
use tokio::net::TcpStream;
use tracing::debug;

/// What to wait for
#[derive(Subcommand, Debug, Clone)]
pub enum Target {
    /// Wait until a filesystem path exists
    Path { path: PathBuf },
    /// Wait until a TCP connection to ADDR succeeds
    Tcp { addr: String },
    /// Wait until GET URL answers with a 2xx status
    Http { url: String },
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Path { path } => write!(f, "path {}", path.display()),
            Target::Tcp { addr } => write!(f, "tcp {addr}"),
            Target::Http { url } => write!(f, "http {url}"),
        }
    }
}

impl Target {
    /// Start polling this target in the background.
    pub fn spawn(&self, poller: &ConditionPoller) -> Result<PollHandle> {
        let handle = match self {
            Target::Path { path } => {
                let path = path.clone();
                poller.spawn(move || path.try_exists())
            }
            Target::Tcp { addr } => {
                let addr = addr.clone();
                poller.spawn_async(move || {
                    let addr = addr.clone();
                    async move {
                        let connected = match TcpStream::connect(addr.as_str()).await {
                            Ok(_) => true,
                            Err(err) => {
                                debug!(target: "cli", %addr, error = %err, "connect failed");
                                false
                            }
                        };
                        Ok::<_, Infallible>(connected)
                    }
                })
            }
            Target::Http { url } => {
                let url = reqwest::Url::parse(url).with_context(|| format!("invalid url {url}"))?;
                // A single probe never outlives one polling interval.
                let client = reqwest::Client::builder()
                    .timeout(poller.options().interval)
                    .build()
                    .context("building http client")?;
                poller.spawn_async(move || probe_http(client.clone(), url.clone()))
            }
        };
        Ok(handle)
    }
}

async fn probe_http(client: reqwest::Client, url: reqwest::Url) -> Result<bool, reqwest::Error> {
    match client.get(url.clone()).send().await {
        Ok(response) => {
            debug!(target: "cli", %url, status = %response.status(), "probe answered");
            Ok(response.status().is_success())
        }
        Err(err) if err.is_connect() || err.is_timeout() || err.is_request() => {
            debug!(target: "cli", %url, error = %err, "probe not answered");
            Ok(false)
        }
        Err(err) => Err(err),
    }
}
