use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use anyhow::Result;

use crate::config::Config;

/// Checks that a math service is reachable on the configured port.
///
/// If the server binds to all interfaces, the check is sent to the loopback address instead.
pub async fn healthcheck(config: Config) -> Result<()> {
    let mut addr = config.http_addr();
    if addr.ip().is_unspecified() {
        match addr {
            SocketAddr::V4(_) => addr.set_ip(Ipv4Addr::LOCALHOST.into()),
            SocketAddr::V6(_) => addr.set_ip(Ipv6Addr::LOCALHOST.into()),
        }
    }

    let client = reqwest::Client::new();
    let url = format!("http://{addr}/health");

    tracing::debug!("sending healthcheck request to {}", url);
    let response = client.get(&url).send().await?;
    if !response.status().is_success() {
        anyhow::bail!("Bad Status: {}", response.status());
    }

    tracing::info!("OK");
    Ok(())
}
