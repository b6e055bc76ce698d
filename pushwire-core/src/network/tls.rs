// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! TLS Transport
//!
//! Real transport implementation: one TLS stream over TCP, authenticated
//! with the provider's client certificate.
//! Supports both native-tls and rustls TLS backends.

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

#[cfg(all(feature = "network-native-tls", not(feature = "network-rustls")))]
use native_tls::{Certificate, Identity, Protocol, TlsConnector};

#[cfg(feature = "network-rustls")]
use rustls::pki_types::pem::PemObject;
#[cfg(feature = "network-rustls")]
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
#[cfg(feature = "network-rustls")]
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::error::NetworkError;
use super::pinning::verify_pin;
use super::transport::{ConnectionState, Transport, TransportConfig, TransportResult};

#[cfg(all(feature = "network-native-tls", not(feature = "network-rustls")))]
type TlsStream = native_tls::TlsStream<TcpStream>;

#[cfg(feature = "network-rustls")]
type TlsStream = rustls::StreamOwned<rustls::ClientConnection, TcpStream>;

/// Size of the receive buffer for a single `read_available` call.
const READ_BUFFER_SIZE: usize = 4096;

/// Smallest read timeout handed to the socket (zero is rejected by the OS API).
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// TLS transport for gateway communication.
///
/// # Example
///
/// ```ignore
/// use pushwire_core::network::{TlsTransport, TransportConfig};
///
/// let mut transport = TlsTransport::new();
/// let config = TransportConfig {
///     certificate_path: "/etc/push/provider.pem".into(),
///     ..TransportConfig::for_endpoint("gateway.sandbox.push.apple.com", 2195)
/// };
/// transport.connect(&config)?;
/// ```
pub struct TlsTransport {
    stream: Option<TlsStream>,
    state: ConnectionState,
}

impl TlsTransport {
    /// Creates a new, disconnected TLS transport.
    pub fn new() -> Self {
        TlsTransport {
            stream: None,
            state: ConnectionState::Disconnected,
        }
    }

    /// Opens the TCP connection with the configured timeouts.
    fn open_tcp(config: &TransportConfig) -> Result<TcpStream, NetworkError> {
        let addr = config
            .address()
            .to_socket_addrs()
            .map_err(|e| {
                NetworkError::ConnectionFailed(format!("Cannot resolve {}: {}", config.host, e))
            })?
            .next()
            .ok_or_else(|| {
                NetworkError::ConnectionFailed(format!("No address for {}", config.host))
            })?;

        let tcp_stream = TcpStream::connect_timeout(&addr, config.connect_timeout())
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        // The handshake is bounded by the connect timeout; reads are re-armed per poll.
        tcp_stream
            .set_read_timeout(Some(config.connect_timeout()))
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;
        tcp_stream
            .set_write_timeout(Some(config.io_timeout()))
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;
        tcp_stream
            .set_nodelay(true)
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        Ok(tcp_stream)
    }

    /// Create a TLS stream using native-tls
    #[cfg(all(feature = "network-native-tls", not(feature = "network-rustls")))]
    fn create_tls_stream(
        config: &TransportConfig,
        tcp_stream: TcpStream,
    ) -> Result<TlsStream, NetworkError> {
        let cert_pem = std::fs::read(&config.certificate_path).map_err(|e| {
            NetworkError::Certificate(format!("{}: {}", config.certificate_path.display(), e))
        })?;
        let key_pem = std::fs::read(config.key_path()).map_err(|e| {
            NetworkError::Certificate(format!("{}: {}", config.key_path().display(), e))
        })?;
        let identity = Identity::from_pkcs8(&cert_pem, &key_pem)
            .map_err(|e| NetworkError::Certificate(format!("Invalid client identity: {}", e)))?;

        let mut builder = TlsConnector::builder();
        builder.identity(identity);
        builder.min_protocol_version(Some(Protocol::Tlsv12));

        if let Some(root_ca_path) = &config.root_ca_path {
            let ca_pem = std::fs::read(root_ca_path).map_err(|e| {
                NetworkError::Certificate(format!("{}: {}", root_ca_path.display(), e))
            })?;
            let ca = Certificate::from_pem(&ca_pem)
                .map_err(|e| NetworkError::Certificate(format!("Invalid root CA: {}", e)))?;
            builder.add_root_certificate(ca);
        }

        let connector = builder
            .build()
            .map_err(|e| NetworkError::ConnectionFailed(format!("TLS error: {}", e)))?;
        let tls_stream = connector
            .connect(&config.host, tcp_stream)
            .map_err(|e| NetworkError::ConnectionFailed(format!("TLS handshake failed: {}", e)))?;

        if !config.pins.is_empty() {
            let peer = tls_stream
                .peer_certificate()
                .ok()
                .flatten()
                .and_then(|cert| cert.to_der().ok())
                .ok_or_else(|| NetworkError::PinMismatch(config.host.clone()))?;
            if !verify_pin(&peer, &config.pins) {
                return Err(NetworkError::PinMismatch(config.host.clone()));
            }
        }

        Ok(tls_stream)
    }

    /// Create a TLS stream using rustls
    #[cfg(feature = "network-rustls")]
    fn create_tls_stream(
        config: &TransportConfig,
        tcp_stream: TcpStream,
    ) -> Result<TlsStream, NetworkError> {
        let certs = CertificateDer::pem_file_iter(&config.certificate_path)
            .and_then(|iter| iter.collect::<Result<Vec<_>, _>>())
            .map_err(|e| {
                NetworkError::Certificate(format!("{}: {}", config.certificate_path.display(), e))
            })?;
        let key = PrivateKeyDer::from_pem_file(config.key_path()).map_err(|e| {
            NetworkError::Certificate(format!("{}: {}", config.key_path().display(), e))
        })?;

        let mut root_store = rustls::RootCertStore::empty();
        match &config.root_ca_path {
            Some(root_ca_path) => {
                let roots = CertificateDer::pem_file_iter(root_ca_path)
                    .and_then(|iter| iter.collect::<Result<Vec<_>, _>>())
                    .map_err(|e| {
                        NetworkError::Certificate(format!("{}: {}", root_ca_path.display(), e))
                    })?;
                for root in roots {
                    root_store.add(root).map_err(|e| {
                        NetworkError::Certificate(format!("Invalid root CA: {}", e))
                    })?;
                }
            }
            None => root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned()),
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_client_auth_cert(certs, key)
            .map_err(|e| NetworkError::Certificate(format!("Invalid client identity: {}", e)))?;

        let server_name: ServerName<'static> = ServerName::try_from(config.host.clone())
            .map_err(|_| {
                NetworkError::ConnectionFailed(format!("Invalid server name: {}", config.host))
            })?;

        let tls_conn = rustls::ClientConnection::new(Arc::new(tls_config), server_name)
            .map_err(|e| NetworkError::ConnectionFailed(format!("TLS setup failed: {}", e)))?;

        let mut tls_stream = rustls::StreamOwned::new(tls_conn, tcp_stream);
        while tls_stream.conn.is_handshaking() {
            tls_stream
                .conn
                .complete_io(&mut tls_stream.sock)
                .map_err(|e| {
                    NetworkError::ConnectionFailed(format!("TLS handshake failed: {}", e))
                })?;
        }

        if !config.pins.is_empty() {
            let leaf = tls_stream
                .conn
                .peer_certificates()
                .and_then(|chain| chain.first())
                .ok_or_else(|| NetworkError::PinMismatch(config.host.clone()))?;
            if !verify_pin(leaf.as_ref(), &config.pins) {
                return Err(NetworkError::PinMismatch(config.host.clone()));
            }
        }

        Ok(tls_stream)
    }

    /// Keeps the stream so an error frame the gateway sent before hanging
    /// up can still be read. `disconnect` releases it.
    fn mark_write_failed(&mut self) {
        self.state = ConnectionState::Closing;
    }

    fn mark_lost(&mut self) {
        self.stream = None;
        self.state = ConnectionState::Disconnected;
    }
}

impl Default for TlsTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for TlsTransport {
    fn connect(&mut self, config: &TransportConfig) -> TransportResult<()> {
        if matches!(self.state, ConnectionState::Connected) {
            return Ok(());
        }
        if self.stream.is_some() {
            self.disconnect();
        }

        self.state = ConnectionState::Connecting;
        debug!(target: "pushwire", address = %config.address(), "opening gateway connection");

        let stream = Self::open_tcp(config)
            .and_then(|tcp_stream| Self::create_tls_stream(config, tcp_stream))
            .inspect_err(|e| {
                self.state = ConnectionState::Disconnected;
                warn!(target: "pushwire", address = %config.address(), error = %e, "gateway connection failed");
            })?;

        self.stream = Some(stream);
        self.state = ConnectionState::Connected;
        info!(target: "pushwire", address = %config.address(), "connected to gateway");

        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            self.state = ConnectionState::Closing;
            #[cfg(all(feature = "network-native-tls", not(feature = "network-rustls")))]
            {
                let _ = stream.shutdown(); // Ignore errors on close
            }
            #[cfg(feature = "network-rustls")]
            {
                stream.conn.send_close_notify();
                let _ = stream.conn.complete_io(&mut stream.sock); // Ignore errors on close
            }
            info!(target: "pushwire", "disconnected from gateway");
        }
        self.state = ConnectionState::Disconnected;
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn write(&mut self, frame: &[u8]) -> TransportResult<usize> {
        if self.state != ConnectionState::Connected {
            return Err(NetworkError::NotConnected);
        }
        let stream = self.stream.as_mut().ok_or(NetworkError::NotConnected)?;

        let result = stream.write_all(frame).and_then(|()| stream.flush());
        match result {
            Ok(()) => Ok(frame.len()),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::BrokenPipe
                        | ErrorKind::ConnectionReset
                        | ErrorKind::ConnectionAborted
                        | ErrorKind::UnexpectedEof
                ) =>
            {
                self.mark_write_failed();
                Err(NetworkError::ConnectionClosed)
            }
            Err(e) => {
                // Partial writes leave the stream in an unknown state.
                self.mark_write_failed();
                Err(NetworkError::SendFailed(e.to_string()))
            }
        }
    }

    fn read_available(&mut self, timeout: Duration) -> TransportResult<Option<Vec<u8>>> {
        let stream = self.stream.as_mut().ok_or(NetworkError::NotConnected)?;

        stream
            .get_ref()
            .set_read_timeout(Some(timeout.max(MIN_READ_TIMEOUT)))
            .map_err(|e| NetworkError::ReceiveFailed(e.to_string()))?;

        let mut buffer = [0u8; READ_BUFFER_SIZE];
        match stream.read(&mut buffer) {
            Ok(0) => {
                self.mark_lost();
                Err(NetworkError::ConnectionClosed)
            }
            Ok(n) => Ok(Some(buffer[..n].to_vec())),
            Err(ref e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                // Nothing pending within the timeout
                Ok(None)
            }
            Err(ref e)
                if matches!(
                    e.kind(),
                    ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::UnexpectedEof
                ) =>
            {
                self.mark_lost();
                Err(NetworkError::ConnectionClosed)
            }
            Err(e) => Err(NetworkError::ReceiveFailed(e.to_string())),
        }
    }
}

// INLINE_TEST_REQUIRED: Tests failure paths that never reach a gateway
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transport_disconnected() {
        let transport = TlsTransport::new();
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_write_without_connect_fails() {
        let mut transport = TlsTransport::new();
        let result = transport.write(&[1, 2, 3]);
        assert!(matches!(result, Err(NetworkError::NotConnected)));
    }

    #[test]
    fn test_read_without_connect_fails() {
        let mut transport = TlsTransport::new();
        let result = transport.read_available(Duration::from_millis(1));
        assert!(matches!(result, Err(NetworkError::NotConnected)));
    }

    #[test]
    fn test_disconnect_when_not_connected_ok() {
        let mut transport = TlsTransport::new();
        transport.disconnect();
        transport.disconnect();
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_connect_refused_resets_state() {
        // Bind then drop a listener so the port is very likely closed.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = TransportConfig {
            connect_timeout_ms: 500,
            ..TransportConfig::for_endpoint("127.0.0.1", port)
        };

        let mut transport = TlsTransport::new();
        let result = transport.connect(&config);

        assert!(matches!(result, Err(NetworkError::ConnectionFailed(_))));
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_missing_certificate_is_reported() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let dir = tempfile::tempdir().unwrap();
        let config = TransportConfig {
            certificate_path: dir.path().join("missing.pem"),
            connect_timeout_ms: 500,
            ..TransportConfig::for_endpoint("127.0.0.1", port)
        };

        let mut transport = TlsTransport::new();
        let result = transport.connect(&config);

        assert!(matches!(result, Err(NetworkError::Certificate(_))));
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }
}
