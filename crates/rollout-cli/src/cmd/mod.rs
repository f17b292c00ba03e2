pub mod collect;
pub mod config;
pub mod run;
pub mod wait;

use anyhow::Context;
use clap::Args;
use rollout_client::{Client, ClientConfig, PollConfig};
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_DIRECTORY: &str = "migrations";

// ---------------------------------------------------------------------------
// Shared arguments
// ---------------------------------------------------------------------------

/// Connection to the change-management service.
#[derive(Args, Debug)]
pub struct ServiceArgs {
    /// Service base URL
    #[arg(long, env = "INPUT_URL")]
    pub url: String,

    /// Bearer token for the service API
    #[arg(long, env = "INPUT_TOKEN", hide_env_values = true)]
    pub token: String,
}

#[derive(Args, Debug)]
pub struct PollArgs {
    /// Seconds between rollout status reads (at least 1)
    #[arg(
        long,
        env = "INPUT_POLL-INTERVAL",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval: u64,

    /// Give up waiting after this many seconds (default: wait indefinitely)
    #[arg(long, env = "INPUT_TIMEOUT")]
    pub timeout: Option<u64>,
}

impl PollArgs {
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.poll_interval),
            timeout: self.timeout.map(Duration::from_secs),
        }
    }
}

pub fn client(service: &ServiceArgs, project: &str) -> anyhow::Result<Client> {
    Client::new(ClientConfig {
        base_url: service.url.clone(),
        token: service.token.clone(),
        project: project.to_string(),
    })
    .context("failed to build service client")
}

/// Drive `fut` to completion on a fresh current-thread runtime.
pub fn block_on<F: Future>(fut: F) -> anyhow::Result<F::Output> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    Ok(rt.block_on(fut))
}
