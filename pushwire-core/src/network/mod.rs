// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Network + Transport Layer
//!
//! Encrypted byte stream to the push gateway and the feedback service.
//!
//! # Architecture
//!
//! - **Transport trait**: connect, write whole frames, read with a timeout
//! - **TLS transport**: mutually authenticated TLS over TCP (native-tls or rustls)
//! - **Certificate pinning**: optional SHA-256 fingerprint check of the gateway
//! - **Connection manager**: lazy connect with a bounded number of retries
//! - **Mock transport**: scripted gateway for tests

pub mod connection;
pub mod error;
pub mod mock;
pub mod pinning;
#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
pub mod tls;
pub mod transport;

pub use connection::{
    ConnectPolicy, ConnectionManager, DEFAULT_CONNECT_RETRY_INTERVAL_MS,
    DEFAULT_CONNECT_RETRY_LIMIT,
};
pub use error::NetworkError;
pub use mock::MockTransport;
pub use pinning::{verify_pin, PinnedCertificate};
#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
pub use tls::TlsTransport;
pub use transport::{
    ConnectionState, Environment, Transport, TransportConfig, TransportResult,
    PRODUCTION_FEEDBACK, PRODUCTION_GATEWAY, SANDBOX_FEEDBACK, SANDBOX_GATEWAY,
};
