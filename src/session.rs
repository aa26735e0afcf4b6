//! Session capability used by the aggregator.
//!
//! The RSD handshake lives outside this crate. Anything that can turn a
//! [`ConnectRequest`] into a live session implements [`RsdConnect`];
//! [`TcpConnector`] is a plain socket-level implementation.

use std::future::Future;

use tokio::net::TcpStream;
use tracing::trace;

use crate::endpoint::ResolvedEndpoint;
use crate::error::ConnectError;

/// Prefix of session names derived from device identifiers.
pub const SESSION_NAME_PREFIX: &str = "go_ios";

/// Deterministic session name for a device, e.g. `go_ios-00008101-...`.
pub fn session_name(udid: &str) -> String {
    format!("{SESSION_NAME_PREFIX}-{udid}")
}

/// Everything needed to open one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Session name, used in diagnostics.
    pub name: String,
    /// Where to dial.
    pub endpoint: ResolvedEndpoint,
}

/// Establishes sessions against resolved tunnel endpoints.
///
/// Implementations must be safe to call concurrently; the aggregator may
/// have several attempts in flight at once.
pub trait RsdConnect: Send + Sync {
    /// Connected session handed to the caller.
    type Session: Send;

    /// Open a session. Timeouts are imposed by the caller.
    fn connect(
        &self,
        request: ConnectRequest,
    ) -> impl Future<Output = Result<Self::Session, ConnectError>> + Send;
}

/// Connector that opens a TCP stream to each endpoint's dial target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector {
    nodelay: bool,
}

impl TcpConnector {
    /// Create a connector with default socket options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `TCP_NODELAY` on established streams.
    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }
}

/// Session produced by [`TcpConnector`].
#[derive(Debug)]
pub struct TcpSession {
    /// Session name.
    pub name: String,
    /// Endpoint the session was opened against.
    pub endpoint: ResolvedEndpoint,
    /// Connected stream.
    pub stream: TcpStream,
}

impl RsdConnect for TcpConnector {
    type Session = TcpSession;

    fn connect(
        &self,
        request: ConnectRequest,
    ) -> impl Future<Output = Result<Self::Session, ConnectError>> + Send {
        let nodelay = self.nodelay;
        async move {
            let target = request.endpoint.dial_target();
            trace!(name = %request.name, %target, "opening tcp stream");
            let stream = TcpStream::connect((target.host.as_str(), target.port)).await?;
            stream.set_nodelay(nodelay)?;
            Ok(TcpSession {
                name: request.name,
                endpoint: request.endpoint,
                stream,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;
    use crate::config::HostPort;

    #[test]
    fn session_name_is_derived_from_udid() {
        assert_eq!(session_name("00008101-001"), "go_ios-00008101-001");
    }

    #[tokio::test]
    async fn tcp_connector_dials_userspace_relay_when_present() {
        let relay = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let relay_port = relay.local_addr().unwrap().port();

        let request = ConnectRequest {
            name: session_name("B"),
            endpoint: ResolvedEndpoint {
                // Nothing listens here; only the relay must be dialed.
                primary: HostPort::new("192.0.2.1", 9),
                userspace: Some(HostPort::new("127.0.0.1", relay_port)),
            },
        };

        let session = TcpConnector::new().nodelay(true).connect(request).await.unwrap();
        assert_eq!(session.name, "go_ios-B");
        assert_eq!(session.stream.peer_addr().unwrap().port(), relay_port);
    }

    #[tokio::test]
    async fn tcp_connector_reports_refused_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let request = ConnectRequest {
            name: session_name("A"),
            endpoint: ResolvedEndpoint {
                primary: HostPort::new("127.0.0.1", port),
                userspace: None,
            },
        };

        let err = TcpConnector::new().connect(request).await.unwrap_err();
        assert!(matches!(err, ConnectError::Io(_)));
    }
}
