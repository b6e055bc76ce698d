// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Connection Manager
//!
//! Owns a transport and opens it lazily, retrying failed connects a fixed
//! number of times with a fixed interval in between.

use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::error::NetworkError;
use super::transport::{ConnectionState, Transport, TransportConfig, TransportResult};

/// Default number of connect retries after the first attempt.
pub const DEFAULT_CONNECT_RETRY_LIMIT: u32 = 3;

/// Default pause between connect attempts.
pub const DEFAULT_CONNECT_RETRY_INTERVAL_MS: u64 = 1_000;

/// Connect retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectPolicy {
    /// Retries after the first failed attempt.
    pub retry_limit: u32,
    /// Pause between attempts in milliseconds.
    pub retry_interval_ms: u64,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        ConnectPolicy {
            retry_limit: DEFAULT_CONNECT_RETRY_LIMIT,
            retry_interval_ms: DEFAULT_CONNECT_RETRY_INTERVAL_MS,
        }
    }
}

impl ConnectPolicy {
    /// Sets the retry limit.
    pub fn with_retry_limit(mut self, limit: u32) -> Self {
        self.retry_limit = limit;
        self
    }

    /// Sets the retry interval.
    pub fn with_retry_interval_ms(mut self, ms: u64) -> Self {
        self.retry_interval_ms = ms;
        self
    }

    /// Pause between attempts.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

/// Connection manager with lazy, retrying connects.
///
/// # Example
///
/// ```ignore
/// use pushwire_core::network::{ConnectionManager, ConnectPolicy, MockTransport, TransportConfig};
///
/// let config = TransportConfig::for_endpoint("gateway.sandbox.push.apple.com", 2195);
/// let mut conn = ConnectionManager::new(MockTransport::new(), config, ConnectPolicy::default());
/// conn.ensure_connected()?;
/// ```
pub struct ConnectionManager<T: Transport> {
    transport: T,
    config: TransportConfig,
    policy: ConnectPolicy,
    /// Failed attempts in the current connect cycle.
    failed_attempts: u32,
    /// Successful connects over the manager's lifetime.
    connects: u64,
}

impl<T: Transport> ConnectionManager<T> {
    /// Creates a new connection manager. Nothing is opened yet.
    pub fn new(transport: T, config: TransportConfig, policy: ConnectPolicy) -> Self {
        ConnectionManager {
            transport,
            config,
            policy,
            failed_attempts: 0,
            connects: 0,
        }
    }

    /// Opens the connection unless it is already open.
    ///
    /// Makes up to `1 + retry_limit` attempts, sleeping the retry interval
    /// between them. Fails with [`NetworkError::MaxRetriesExceeded`] once
    /// every attempt failed, or immediately on a certificate loading error.
    pub fn ensure_connected(&mut self) -> TransportResult<()> {
        if self.transport.state() == ConnectionState::Connected {
            return Ok(());
        }

        self.failed_attempts = 0;
        loop {
            match self.transport.connect(&self.config) {
                Ok(()) => {
                    self.failed_attempts = 0;
                    self.connects += 1;
                    info!(
                        target: "pushwire",
                        "Connected to {} (connection #{})",
                        self.config.address(),
                        self.connects
                    );
                    return Ok(());
                }
                Err(e @ NetworkError::Certificate(_)) => {
                    // Local files do not fix themselves between attempts.
                    self.failed_attempts += 1;
                    return Err(e);
                }
                Err(e) => {
                    self.failed_attempts += 1;
                    warn!(
                        target: "pushwire",
                        "Unable to connect to {} (attempt {}/{}): {}",
                        self.config.address(),
                        self.failed_attempts,
                        self.policy.retry_limit + 1,
                        e
                    );
                    if self.failed_attempts > self.policy.retry_limit {
                        return Err(NetworkError::MaxRetriesExceeded);
                    }
                    thread::sleep(self.policy.retry_interval());
                }
            }
        }
    }

    /// Closes the connection. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        if self.transport.state() != ConnectionState::Disconnected {
            debug!(target: "pushwire", "Disconnecting from {}", self.config.address());
        }
        self.transport.disconnect();
    }

    /// Returns the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.transport.state()
    }

    /// Returns true if connected.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Writes a complete frame on the open connection.
    pub fn write(&mut self, frame: &[u8]) -> TransportResult<usize> {
        self.transport.write(frame)
    }

    /// Reads whatever arrives within `timeout`.
    pub fn read_available(&mut self, timeout: Duration) -> TransportResult<Option<Vec<u8>>> {
        self.transport.read_available(timeout)
    }

    /// Successful connects so far.
    pub fn connect_count(&self) -> u64 {
        self.connects
    }

    /// Endpoint configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Retry policy.
    pub fn policy(&self) -> ConnectPolicy {
        self.policy
    }

    /// Returns a reference to the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns a mutable reference to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

// INLINE_TEST_REQUIRED: Tests private failed_attempts counter across connect cycles
#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::mock::MockTransport;

    fn create_test_config() -> TransportConfig {
        TransportConfig::for_endpoint("localhost", 2195)
    }

    fn fast_policy(limit: u32) -> ConnectPolicy {
        ConnectPolicy::default()
            .with_retry_limit(limit)
            .with_retry_interval_ms(0)
    }

    #[test]
    fn test_connection_manager_connect_disconnect() {
        let mut conn = ConnectionManager::new(MockTransport::new(), create_test_config(), fast_policy(3));

        assert_eq!(conn.state(), ConnectionState::Disconnected);

        conn.ensure_connected().unwrap();
        assert!(conn.is_connected());
        assert_eq!(conn.connect_count(), 1);

        // Already open: no second connect.
        conn.ensure_connected().unwrap();
        assert_eq!(conn.transport().connect_count(), 1);

        conn.disconnect();
        conn.disconnect();
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(conn.transport().disconnect_count(), 1);
    }

    #[test]
    fn test_connection_manager_retries_until_success() {
        let mut transport = MockTransport::new();
        transport.inject_connect_error(NetworkError::ConnectionFailed("refused".into()));
        transport.inject_connect_error(NetworkError::Timeout);

        let mut conn = ConnectionManager::new(transport, create_test_config(), fast_policy(3));
        conn.ensure_connected().unwrap();

        assert!(conn.is_connected());
        assert_eq!(conn.failed_attempts, 0);
    }

    #[test]
    fn test_connection_manager_max_retries() {
        let mut transport = MockTransport::new();
        for _ in 0..3 {
            transport.inject_connect_error(NetworkError::ConnectionFailed("refused".into()));
        }

        let mut conn = ConnectionManager::new(transport, create_test_config(), fast_policy(2));
        let result = conn.ensure_connected();

        assert!(matches!(result, Err(NetworkError::MaxRetriesExceeded)));
        assert_eq!(conn.failed_attempts, 3);
        assert!(!conn.is_connected());
    }

    #[test]
    fn test_connection_manager_certificate_error_not_retried() {
        let mut transport = MockTransport::new();
        transport.inject_connect_error(NetworkError::Certificate("missing".into()));

        let mut conn = ConnectionManager::new(transport, create_test_config(), fast_policy(3));
        let result = conn.ensure_connected();

        assert!(matches!(result, Err(NetworkError::Certificate(_))));
        assert_eq!(conn.failed_attempts, 1);
    }

    #[test]
    fn test_connection_manager_new_cycle_resets_counter() {
        let mut transport = MockTransport::new();
        transport.inject_connect_error(NetworkError::Timeout);

        let mut conn = ConnectionManager::new(transport, create_test_config(), fast_policy(0));
        assert!(conn.ensure_connected().is_err());
        assert_eq!(conn.failed_attempts, 1);

        // The next cycle starts from zero and the mock now accepts.
        conn.ensure_connected().unwrap();
        assert_eq!(conn.failed_attempts, 0);
    }

    #[test]
    fn test_connection_manager_reconnects_after_drop() {
        let mut conn = ConnectionManager::new(MockTransport::new(), create_test_config(), fast_policy(1));
        conn.ensure_connected().unwrap();

        conn.transport_mut().set_state(ConnectionState::Disconnected);
        conn.ensure_connected().unwrap();

        assert_eq!(conn.connect_count(), 2);
    }
}
