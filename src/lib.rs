//! Turn the tunnels tracked by a local tunnel registry agent into live RSD sessions.

#![deny(missing_docs)]

pub mod aggregate;
pub mod config;
pub mod discovery;
pub mod endpoint;
pub mod error;
pub mod registry;
pub mod session;

// Re-export key types
pub use aggregate::{aggregate, aggregate_one, ConnectOptions};
pub use config::{DiscoveryOptions, HostPort, DEFAULT_REGISTRY_HOST, DEFAULT_REGISTRY_PORT};
pub use discovery::TunnelDiscovery;
pub use endpoint::{resolve, ResolvedEndpoint};
pub use error::{ConnectError, Error, Result};
pub use registry::{RegistryClient, TunnelDescriptor};
pub use session::{session_name, ConnectRequest, RsdConnect, TcpConnector, TcpSession};
