//! Addresses and options for discovery queries.

use std::fmt;
use std::time::Duration;

/// Well-known loopback host of the tunnel registry agent.
pub const DEFAULT_REGISTRY_HOST: &str = "127.0.0.1";

/// Well-known port of the tunnel registry agent.
pub const DEFAULT_REGISTRY_PORT: u16 = 60105;

/// A `(host, port)` pair.
///
/// The host is kept as given (name or IP literal). IPv6 literals are
/// bracketed when displayed so the result can be used in URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostPort {
    /// Host name or IP literal, without brackets.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl HostPort {
    /// Create a new pair.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Default registry agent address, `127.0.0.1:60105`.
    pub fn default_registry() -> Self {
        Self::new(DEFAULT_REGISTRY_HOST, DEFAULT_REGISTRY_PORT)
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Options for a [`TunnelDiscovery`](crate::TunnelDiscovery).
#[derive(Clone, Debug)]
pub struct DiscoveryOptions {
    /// Address of the tunnel registry agent.
    pub registry: HostPort,
    /// Host used for userspace tunnels. Falls back to the registry host.
    pub userspace_hostname: Option<String>,
    /// Timeout for the registry request.
    pub request_timeout: Duration,
    /// Timeout for each individual device connect.
    pub per_attempt_timeout: Duration,
    /// Maximum simultaneous connect attempts.
    pub max_inflight: usize,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            registry: HostPort::default_registry(),
            userspace_hostname: None,
            request_timeout: Duration::from_secs(5),
            per_attempt_timeout: Duration::from_secs(5),
            max_inflight: 8,
        }
    }
}

impl DiscoveryOptions {
    /// Set the registry address.
    pub fn registry(mut self, address: HostPort) -> Self {
        self.registry = address;
        self
    }

    /// Override the host used to reach userspace tunnels. An empty host
    /// counts as no override.
    pub fn userspace_hostname(mut self, host: impl Into<String>) -> Self {
        self.userspace_hostname = Some(host.into());
        self
    }

    /// Set the registry request timeout.
    pub fn request_timeout(mut self, d: Duration) -> Self {
        self.request_timeout = d;
        self
    }

    /// Set the per-device connect timeout.
    pub fn per_attempt_timeout(mut self, d: Duration) -> Self {
        self.per_attempt_timeout = d;
        self
    }

    /// Set the maximum number of concurrent connect attempts (at least 1).
    pub fn max_inflight(mut self, n: usize) -> Self {
        self.max_inflight = n.max(1);
        self
    }

    /// Host that userspace tunnels are reached through.
    pub fn effective_userspace_hostname(&self) -> &str {
        self.userspace_hostname
            .as_deref()
            .filter(|host| !host.is_empty())
            .unwrap_or(&self.registry.host)
    }
}
