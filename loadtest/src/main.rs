//! This is a load test binary which runs virtual users against the math service.
//!
//! Every virtual user repeatedly sends `POST /` with `{"a": 10, "b": 5}` and pauses for a random
//! think time between requests. Failures are logged to stderr, and a report is printed to stdout
//! once the run ends.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

use std::path::PathBuf;

use anyhow::Context;
use argh::FromArgs;
use tracing_subscriber::EnvFilter;

use loadtest::Scenario;
use loadtest::http::HttpRemote;

use crate::config::Config;

mod config;

/// Load generator for the math service
#[derive(Debug, FromArgs)]
pub struct Args {
    /// path to the yaml configuration file
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,

    /// base URL of the math service, e.g. `http://localhost:8000`
    #[argh(option)]
    pub host: Option<String>,

    /// number of concurrent virtual users
    #[argh(option, short = 'u')]
    pub users: Option<usize>,

    /// how long to run, e.g. `30s` or `5m`; runs until Ctrl-C if omitted
    #[argh(option, short = 't')]
    pub duration: Option<humantime::Duration>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("INFO")),
        )
        .init();

    let args: Args = argh::from_env();

    let mut config = match args.config {
        Some(path) => Config::from_file(&path)?,
        None => Config::default(),
    };
    if let Some(host) = args.host {
        config.remote = Some(host);
    }
    if let Some(users) = args.users {
        config.users = users;
    }
    if let Some(duration) = args.duration {
        config.duration = Some(duration.into());
    }

    let remote = config
        .remote
        .context("no target host: pass --host or set `remote` in the config file")?;
    let mut remote = HttpRemote::new(remote);
    if let Some(timeout) = config.request_timeout {
        remote = remote
            .with_timeout(timeout)
            .context("failed to create HTTP client")?;
    }

    let scenario = Scenario::builder("math-service")
        .users(config.users)
        .think_time(config.think_time.min, config.think_time.max)
        .spawn_interval(config.spawn_interval)
        .validate_response(config.validate_response)
        .build()?;

    loadtest::run(remote, scenario, config.duration).await?;

    Ok(())
}
