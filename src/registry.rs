//! Client for the tunnel registry agent.
//!
//! The agent exposes `GET /tunnels`, returning a JSON array with one object
//! per device tunnel it currently tracks.

use serde::Deserialize;
use tracing::debug;

use crate::config::HostPort;
use crate::error::{Error, Result};

/// A tunnel as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "WireTunnel")]
pub struct TunnelDescriptor {
    /// Device identifier (UDID).
    pub udid: String,
    /// Host of the kernel-level tunnel endpoint.
    pub address: String,
    /// RSD port over the kernel tunnel.
    pub rsd_port: u16,
    /// Port of the userspace tunnel, if the device uses one.
    pub userspace_tunnel_port: Option<u16>,
}

impl TunnelDescriptor {
    /// Whether this tunnel is reached through a userspace relay.
    pub fn has_userspace_tunnel(&self) -> bool {
        self.userspace_tunnel_port.is_some()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTunnel {
    udid: String,
    address: String,
    rsd_port: u16,
    #[serde(default)]
    userspace_tun: bool,
    #[serde(default)]
    userspace_tun_port: Option<u16>,
}

impl TryFrom<WireTunnel> for TunnelDescriptor {
    type Error = String;

    fn try_from(wire: WireTunnel) -> std::result::Result<Self, Self::Error> {
        let userspace_tunnel_port = match (wire.userspace_tun, wire.userspace_tun_port) {
            (true, Some(port)) => Some(port),
            (true, None) => {
                return Err(format!(
                    "tunnel {} has userspaceTun set but no userspaceTunPort",
                    wire.udid
                ))
            }
            (false, _) => None,
        };
        Ok(Self {
            udid: wire.udid,
            address: wire.address,
            rsd_port: wire.rsd_port,
            userspace_tunnel_port,
        })
    }
}

/// Parse a registry response body.
pub fn parse_tunnels(body: &[u8]) -> serde_json::Result<Vec<TunnelDescriptor>> {
    serde_json::from_slice(body)
}

/// HTTP client for one registry agent.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    address: HostPort,
}

impl RegistryClient {
    /// Create a client for the agent at `address`.
    pub fn new(address: HostPort, request_timeout: std::time::Duration) -> Result<Self> {
        // Idle connections would outlive the private runtime of a blocking call.
        // The agent is local, so proxy environment variables must not apply.
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .pool_max_idle_per_host(0)
            .no_proxy()
            .build()
            .map_err(Error::HttpClient)?;
        Ok(Self { http, address })
    }

    /// Registry address this client talks to.
    pub fn address(&self) -> &HostPort {
        &self.address
    }

    /// URL of the tunnel listing.
    pub fn tunnels_url(&self) -> String {
        format!("http://{}/tunnels", self.address)
    }

    /// Fetch the current tunnel list.
    pub async fn fetch_tunnels(&self) -> Result<Vec<TunnelDescriptor>> {
        let url = self.tunnels_url();
        debug!(%url, "fetching tunnel list");

        let unreachable = |source: reqwest::Error| Error::RegistryUnreachable {
            address: self.address.clone(),
            source,
        };

        let resp = self.http.get(&url).send().await.map_err(unreachable)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::RegistryStatus {
                address: self.address.clone(),
                status,
            });
        }

        let body = resp.bytes().await.map_err(unreachable)?;
        let tunnels = parse_tunnels(&body).map_err(|source| Error::InvalidResponse {
            address: self.address.clone(),
            source,
        })?;

        debug!(count = tunnels.len(), registry = %self.address, "registry returned tunnels");
        Ok(tunnels)
    }
}
