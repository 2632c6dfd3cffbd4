use std::io;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::{TcpListener, TcpSocket};
use tokio::signal::unix::SignalKind;

use crate::config::Config;
use crate::endpoints::add::SIMULATED_DELAY;
use crate::web::app::App;

/// Pending connections the kernel queues before refusing new ones.
const TCP_LISTEN_BACKLOG: u32 = 1024;

/// Runs the math service on the configured address until the process is signalled.
///
/// On SIGTERM, SIGINT, SIGHUP or SIGQUIT the server stops accepting connections and finishes the
/// additions that are still waiting on their result before it returns.
pub async fn server(config: Config) -> Result<()> {
    let addr = config.http_addr();
    tracing::info!(
        %addr,
        version = env!("CARGO_PKG_VERSION"),
        "Starting math service"
    );

    let listener = bind(addr).with_context(|| format!("failed to listen on {addr}"))?;
    let server = tokio::spawn(App::new().graceful_shutdown(true).serve(listener));

    elegant_departure::tokio::depart()
        .on_termination()
        .on_sigint()
        .on_signal(SignalKind::hangup())
        .on_signal(SignalKind::quit())
        .await;

    tracing::info!(
        max_wait = ?SIMULATED_DELAY,
        "Stopped accepting connections, completing pending additions"
    );

    let result = match server.await {
        Ok(result) => result,
        Err(join_error) => Err(join_error.into()),
    };

    tracing::info!("Shutdown complete");
    result
}

/// Opens a TCP listener on the given address.
///
/// The socket is bound with `SO_REUSEADDR`, so a restarted server can take over the port while
/// connections of the previous process linger in `TIME_WAIT`. Pass port `0` to listen on a random
/// free port, and read it back with [`TcpListener::local_addr`].
///
/// Must be called from within a tokio runtime.
pub fn bind(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };

    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    let listener = socket.listen(TCP_LISTEN_BACKLOG)?;

    tracing::info!(addr = %listener.local_addr()?, "HTTP server listening");
    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_random_port() {
        let listener = bind(SocketAddr::from(([127, 0, 0, 1], 0))).unwrap();
        let addr = listener.local_addr().unwrap();

        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn bind_occupied_port() {
        let first = bind(SocketAddr::from(([127, 0, 0, 1], 0))).unwrap();
        let addr = first.local_addr().unwrap();

        // `SO_REUSEADDR` does not allow two active listeners on the same port.
        assert!(bind(addr).is_err());
    }
}
