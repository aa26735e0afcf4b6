//! Turns a registry snapshot into live sessions.
//!
//! Each tunnel is resolved and dialed independently. A tunnel that fails to
//! connect is logged and left out; it never aborts the other attempts, and
//! the result keeps the registry's order.

use std::time::Duration;

use futures_util::{stream, StreamExt};
use tokio::time;
use tracing::{debug, info, warn};

use crate::endpoint::{resolve, ResolvedEndpoint};
use crate::error::ConnectError;
use crate::registry::TunnelDescriptor;
use crate::session::{session_name, ConnectRequest, RsdConnect};

/// Options controlling concurrent connect attempts.
#[derive(Clone, Debug)]
pub struct ConnectOptions {
    /// Maximum simultaneous connect attempts.
    pub max_inflight: usize,
    /// Timeout for each individual attempt.
    pub per_attempt_timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            max_inflight: 8,
            per_attempt_timeout: Duration::from_secs(5),
        }
    }
}

/// Outcome of dialing one tunnel.
#[derive(Debug)]
pub struct Attempt<S> {
    /// Device identifier of the tunnel.
    pub udid: String,
    /// Endpoint that was dialed.
    pub endpoint: ResolvedEndpoint,
    /// Session, or why there is none.
    pub result: Result<S, ConnectError>,
}

impl<S> Attempt<S> {
    /// Keep the session, logging and discarding a failure.
    pub fn into_session(self) -> Option<S> {
        match self.result {
            Ok(session) => {
                info!(udid = %self.udid, endpoint = %self.endpoint, "session established");
                Some(session)
            }
            Err(err) => {
                warn!(udid = %self.udid, endpoint = %self.endpoint, error = %err, "dropping unreachable tunnel");
                None
            }
        }
    }
}

/// Fold attempt outcomes into the sessions that succeeded, in order.
pub fn collect_sessions<S, I>(attempts: I) -> Vec<S>
where
    I: IntoIterator<Item = Attempt<S>>,
{
    attempts
        .into_iter()
        .fold(Vec::new(), |mut sessions, attempt| {
            if let Some(session) = attempt.into_session() {
                sessions.push(session);
            }
            sessions
        })
}

/// Resolve and dial a single tunnel, bounded by the per-attempt timeout.
pub async fn attempt<C: RsdConnect>(
    connector: &C,
    tunnel: &TunnelDescriptor,
    userspace_hostname: &str,
    per_attempt_timeout: Duration,
) -> Attempt<C::Session> {
    let endpoint = resolve(tunnel, userspace_hostname);
    let request = ConnectRequest {
        name: session_name(&tunnel.udid),
        endpoint: endpoint.clone(),
    };
    debug!(udid = %tunnel.udid, %endpoint, "connecting");

    let result = match time::timeout(per_attempt_timeout, connector.connect(request)).await {
        Ok(res) => res,
        Err(_) => Err(ConnectError::Timeout(per_attempt_timeout)),
    };

    Attempt {
        udid: tunnel.udid.clone(),
        endpoint,
        result,
    }
}

/// Dial every tunnel and return the sessions that connected.
pub async fn aggregate<C: RsdConnect>(
    connector: &C,
    tunnels: &[TunnelDescriptor],
    userspace_hostname: &str,
    opts: &ConnectOptions,
) -> Vec<C::Session> {
    // `buffered` yields in input order regardless of completion order.
    let attempts: Vec<_> = stream::iter(tunnels.iter().map(|tunnel| {
        attempt(connector, tunnel, userspace_hostname, opts.per_attempt_timeout)
    }))
    .buffered(opts.max_inflight.max(1))
    .collect()
    .await;

    let sessions = collect_sessions(attempts);
    info!(
        tunnels = tunnels.len(),
        sessions = sessions.len(),
        "aggregated tunnel sessions"
    );
    sessions
}

/// Dial the first tunnel whose identifier is `udid`.
///
/// Only that tunnel is attempted. Returns `None` if there is no match or the
/// match fails to connect.
pub async fn aggregate_one<C: RsdConnect>(
    connector: &C,
    tunnels: &[TunnelDescriptor],
    udid: &str,
    userspace_hostname: &str,
    opts: &ConnectOptions,
) -> Option<C::Session> {
    let Some(tunnel) = tunnels.iter().find(|t| t.udid == udid) else {
        debug!(%udid, "no tunnel for device");
        return None;
    };
    attempt(connector, tunnel, userspace_hostname, opts.per_attempt_timeout)
        .await
        .into_session()
}
