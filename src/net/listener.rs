//! TCP listener binding with startup diagnostics.
//!
//! # Responsibilities
//! - Resolve the configured host and bind host:port
//! - Collapse every bind failure into one operator-facing diagnostic
//!
//! # Design Decisions
//! - IPv4 addresses are tried before IPv6 so `localhost` serves 127.0.0.1
//! - Never retried; restart policy belongs to the operator

use std::io;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::{lookup_host, TcpListener};

/// Message reported for any failure to bind the webserver.
pub const BIND_FAILURE_MESSAGE: &str = "Error while starting webserver. Possible reasons:\n\
- Another instance of authcore is already running on the same port. If you want to run \
another instance, please pass a new config file to it with a different port or specify the \
port via CLI options. \n\
- If you are running this on port 80 or 443, make sure to give the right permission to \
authcore.\n\
- The provided host is not available on this server";

/// Failure to bind the configured address.
///
/// Displays as [`BIND_FAILURE_MESSAGE`]; the underlying OS error is kept as
/// the source for logs.
#[derive(Debug, Error)]
#[error("{}", BIND_FAILURE_MESSAGE)]
pub struct BindError {
    pub host: String,
    pub port: u16,
    #[source]
    pub source: io::Error,
}

/// Bind to `host:port`.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener, BindError> {
    let fail = |source: io::Error| BindError {
        host: host.to_string(),
        port,
        source,
    };

    let mut addrs: Vec<SocketAddr> = lookup_host((host, port)).await.map_err(fail)?.collect();
    addrs.sort_by_key(SocketAddr::is_ipv6);

    let mut last_error = io::Error::new(
        io::ErrorKind::AddrNotAvailable,
        format!("host '{host}' resolved to no addresses"),
    );
    for addr in addrs {
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                tracing::info!(address = %addr, "Listener bound");
                return Ok(listener);
            }
            Err(e) => {
                tracing::debug!(address = %addr, error = %e, "Bind attempt failed");
                last_error = e;
            }
        }
    }

    let err = fail(last_error);
    tracing::error!(host = %err.host, port = err.port, error = %err.source, "Failed to bind");
    Err(err)
}
