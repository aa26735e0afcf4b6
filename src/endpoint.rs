//! Dial-target resolution for registry tunnels.

use std::fmt;

use crate::config::HostPort;
use crate::registry::TunnelDescriptor;

/// Addresses used to establish a session for one tunnel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    /// Kernel tunnel address and RSD port.
    pub primary: HostPort,
    /// Userspace relay address, for tunnels that use one.
    pub userspace: Option<HostPort>,
}

impl ResolvedEndpoint {
    /// Address a socket should actually be opened to.
    ///
    /// Userspace tunnels are entered through the relay; everything else is
    /// dialed directly.
    pub fn dial_target(&self) -> &HostPort {
        self.userspace.as_ref().unwrap_or(&self.primary)
    }
}

impl fmt::Display for ResolvedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.userspace {
            Some(relay) => write!(f, "{} via {}", self.primary, relay),
            None => write!(f, "{}", self.primary),
        }
    }
}

/// Resolve the endpoint for `tunnel`.
///
/// `userspace_hostname` is the host userspace tunnels are reached through,
/// normally the registry's own host.
pub fn resolve(tunnel: &TunnelDescriptor, userspace_hostname: &str) -> ResolvedEndpoint {
    ResolvedEndpoint {
        primary: HostPort::new(tunnel.address.clone(), tunnel.rsd_port),
        userspace: tunnel
            .userspace_tunnel_port
            .map(|port| HostPort::new(userspace_hostname, port)),
    }
}
