//! Transport Trait
//!
//! Platform-agnostic abstraction for the gateway connection.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::NetworkError;
use super::pinning::PinnedCertificate;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, NetworkError>;

/// Production notification gateway.
pub const PRODUCTION_GATEWAY: (&str, u16) = ("gateway.push.apple.com", 2195);
/// Sandbox notification gateway.
pub const SANDBOX_GATEWAY: (&str, u16) = ("gateway.sandbox.push.apple.com", 2195);
/// Production feedback service.
pub const PRODUCTION_FEEDBACK: (&str, u16) = ("feedback.push.apple.com", 2196);
/// Sandbox feedback service.
pub const SANDBOX_FEEDBACK: (&str, u16) = ("feedback.sandbox.push.apple.com", 2196);

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected to any gateway.
    Disconnected,
    /// Connection or TLS handshake in progress.
    Connecting,
    /// Connected and ready.
    Connected,
    /// A write failed. Unread bytes can still be drained until the
    /// socket is released with `disconnect`.
    Closing,
}

/// Gateway environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development gateway, accepts sandbox device tokens.
    #[default]
    Sandbox,
    /// Production gateway.
    Production,
}

impl Environment {
    /// Host and port of the notification gateway.
    pub fn gateway(self) -> (&'static str, u16) {
        match self {
            Environment::Sandbox => SANDBOX_GATEWAY,
            Environment::Production => PRODUCTION_GATEWAY,
        }
    }

    /// Host and port of the feedback service.
    pub fn feedback(self) -> (&'static str, u16) {
        match self {
            Environment::Sandbox => SANDBOX_FEEDBACK,
            Environment::Production => PRODUCTION_FEEDBACK,
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Environment::Sandbox),
            "production" => Ok(Environment::Production),
            other => Err(format!("Environment is invalid: {}", other)),
        }
    }
}

/// Configuration for a single transport connection.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Gateway host name (also used for TLS server name verification).
    pub host: String,
    /// Gateway port.
    pub port: u16,
    /// PEM file with the client certificate (and key, if bundled).
    pub certificate_path: PathBuf,
    /// PEM file with the private key. Defaults to `certificate_path`.
    pub private_key_path: Option<PathBuf>,
    /// PEM file with a root CA to trust for the gateway.
    pub root_ca_path: Option<PathBuf>,
    /// Accepted gateway certificate fingerprints. Empty disables pinning.
    pub pins: Vec<PinnedCertificate>,
    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Write timeout in milliseconds.
    pub io_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        let (host, port) = SANDBOX_GATEWAY;
        TransportConfig {
            host: host.to_string(),
            port,
            certificate_path: PathBuf::new(),
            private_key_path: None,
            root_ca_path: None,
            pins: Vec::new(),
            connect_timeout_ms: 10_000,
            io_timeout_ms: 30_000,
        }
    }
}

impl TransportConfig {
    /// Creates a config for the given endpoint.
    pub fn for_endpoint(host: &str, port: u16) -> Self {
        TransportConfig {
            host: host.to_string(),
            port,
            ..Default::default()
        }
    }

    /// Returns the `host:port` address string.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connection timeout as a duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Write timeout as a duration.
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    /// Path of the PEM file holding the private key.
    pub fn key_path(&self) -> &PathBuf {
        self.private_key_path
            .as_ref()
            .unwrap_or(&self.certificate_path)
    }
}

/// Transport trait for gateway communication.
///
/// Abstracts the underlying encrypted stream so the delivery engine can be
/// driven against a real TLS socket or a scripted mock.
///
/// # Synchronous Interface
///
/// Every method blocks, but none blocks indefinitely: `connect` is bounded
/// by the connect timeout and `read_available` by the caller's timeout.
/// Async callers should wrap the client (see `SharedPushClient`).
///
/// # Example
///
/// ```ignore
/// use pushwire_core::network::{Transport, MockTransport, TransportConfig};
///
/// let mut transport = MockTransport::new();
/// transport.connect(&TransportConfig::default())?;
/// transport.write(&frame)?;
/// let error_bytes = transport.read_available(Duration::from_millis(10))?;
/// transport.disconnect();
/// ```
pub trait Transport: Send {
    /// Connects to the gateway.
    ///
    /// No-op if already connected.
    fn connect(&mut self, config: &TransportConfig) -> TransportResult<()>;

    /// Releases the socket.
    ///
    /// Safe to call any number of times, including before `connect`.
    fn disconnect(&mut self);

    /// Returns the current connection state.
    fn state(&self) -> ConnectionState;

    /// Writes one complete frame, returning the number of bytes written.
    fn write(&mut self, frame: &[u8]) -> TransportResult<usize>;

    /// Waits up to `timeout` for bytes from the gateway.
    ///
    /// Returns `Ok(None)` if nothing arrived, which is the normal case.
    /// End of stream is reported as [`NetworkError::ConnectionClosed`].
    fn read_available(&mut self, timeout: Duration) -> TransportResult<Option<Vec<u8>>>;

    /// Returns true if the transport is connected.
    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}
