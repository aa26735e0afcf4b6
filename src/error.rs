//! Error types for rsd-tunnels.

use std::time::Duration;

use crate::config::HostPort;

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type.
///
/// Only registry-level failures (and the plumbing needed to reach the
/// registry) surface here. Per-device connect failures are absorbed by the
/// aggregator and never become an `Error`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The registry agent could not be reached (not running, wrong port, timed out).
    #[error("tunnel registry unreachable at {address}: {source}")]
    RegistryUnreachable {
        /// Registry address that was dialed.
        address: HostPort,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The registry answered with a non-success HTTP status.
    #[error("tunnel registry at {address} returned HTTP {status}")]
    RegistryStatus {
        /// Registry address that was dialed.
        address: HostPort,
        /// Status code returned by the agent.
        status: reqwest::StatusCode,
    },

    /// The registry body is not a valid list of tunnel descriptors.
    #[error("invalid tunnel list from registry at {address}: {source}")]
    InvalidResponse {
        /// Registry address that was dialed.
        address: HostPort,
        /// JSON decoding error.
        #[source]
        source: serde_json::Error,
    },

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// The private runtime backing a blocking call could not be started.
    #[error("runtime error: {0}")]
    Runtime(#[source] std::io::Error),
}

impl Error {
    /// True for failures of the registry fetch step.
    pub fn is_registry_failure(&self) -> bool {
        matches!(
            self,
            Self::RegistryUnreachable { .. } | Self::RegistryStatus { .. } | Self::InvalidResponse { .. }
        )
    }
}

/// Failure of a single device connect attempt.
///
/// These never escape a query; the aggregator logs them and drops the tunnel.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// The attempt did not finish within the per-attempt timeout.
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),

    /// Socket-level failure (refused, reset, unreachable).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The session handshake was rejected by the device.
    #[error("handshake failed: {0}")]
    Handshake(String),
}

impl ConnectError {
    /// Create a handshake error.
    pub fn handshake<S: Into<String>>(msg: S) -> Self {
        Self::Handshake(msg.into())
    }
}
