//! Query entry points: every reachable device, or one device by identifier.
//!
//! Each query takes a fresh registry snapshot and dials from scratch; nothing
//! is cached between calls. The async methods are the implementation, and the
//! `_blocking` variants drive them on a private runtime.

use std::future::Future;

use tokio::runtime;
use tracing::debug;

use crate::aggregate::{aggregate, aggregate_one, ConnectOptions};
use crate::config::DiscoveryOptions;
use crate::error::{Error, Result};
use crate::registry::{RegistryClient, TunnelDescriptor};
use crate::session::{RsdConnect, TcpConnector};

/// Discovers registry tunnels and turns them into sessions.
///
/// ```no_run
/// # async fn example() -> rsd_tunnels::Result<()> {
/// use rsd_tunnels::{DiscoveryOptions, HostPort, TunnelDiscovery};
///
/// let options = DiscoveryOptions::default().registry(HostPort::new("127.0.0.1", 60105));
/// let discovery = TunnelDiscovery::tcp(options)?;
/// for session in discovery.list_sessions().await? {
///     println!("{}", session.name);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TunnelDiscovery<C> {
    connector: C,
    options: DiscoveryOptions,
    registry: RegistryClient,
}

impl TunnelDiscovery<TcpConnector> {
    /// Discovery backed by plain TCP sessions.
    pub fn tcp(options: DiscoveryOptions) -> Result<Self> {
        Self::new(TcpConnector::new(), options)
    }
}

impl<C: RsdConnect> TunnelDiscovery<C> {
    /// Create a discovery handle using `connector` to open sessions.
    pub fn new(connector: C, options: DiscoveryOptions) -> Result<Self> {
        let registry = RegistryClient::new(options.registry.clone(), options.request_timeout)?;
        Ok(Self {
            connector,
            options,
            registry,
        })
    }

    /// Options this handle was built with.
    pub fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    /// Session connector.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Current registry snapshot, without dialing anything.
    pub async fn fetch_tunnels(&self) -> Result<Vec<TunnelDescriptor>> {
        self.registry.fetch_tunnels().await
    }

    /// Sessions for every tunnel that could be reached, in registry order.
    ///
    /// Fails only if the registry itself cannot be queried.
    pub async fn list_sessions(&self) -> Result<Vec<C::Session>> {
        let tunnels = self.registry.fetch_tunnels().await?;
        Ok(aggregate(
            &self.connector,
            &tunnels,
            self.options.effective_userspace_hostname(),
            &self.connect_options(),
        )
        .await)
    }

    /// Session for the device `udid`, or `None` if it is not listed or
    /// cannot be reached.
    pub async fn session_by_udid(&self, udid: &str) -> Result<Option<C::Session>> {
        let tunnels = self.registry.fetch_tunnels().await?;
        Ok(aggregate_one(
            &self.connector,
            &tunnels,
            udid,
            self.options.effective_userspace_hostname(),
            &self.connect_options(),
        )
        .await)
    }

    /// Blocking form of [`list_sessions`](Self::list_sessions).
    ///
    /// Runs on a dedicated runtime created for this call. Panics if called
    /// from within an async runtime.
    pub fn list_sessions_blocking(&self) -> Result<Vec<C::Session>> {
        block_on(self.list_sessions())?
    }

    /// Blocking form of [`session_by_udid`](Self::session_by_udid).
    ///
    /// Runs on a dedicated runtime created for this call. Panics if called
    /// from within an async runtime.
    pub fn session_by_udid_blocking(&self, udid: &str) -> Result<Option<C::Session>> {
        block_on(self.session_by_udid(udid))?
    }

    fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            max_inflight: self.options.max_inflight,
            per_attempt_timeout: self.options.per_attempt_timeout,
        }
    }
}

fn block_on<F: Future>(fut: F) -> Result<F::Output> {
    debug!("starting private runtime for blocking query");
    let rt = runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(Error::Runtime)?;
    Ok(rt.block_on(fut))
}
