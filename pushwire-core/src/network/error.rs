// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Network Error Types

use thiserror::Error;

/// Errors raised by the transport layer.
///
/// Every variant is retryable after a reconnect; the delivery engine
/// decides how many times.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// TCP connect, DNS resolution or TLS handshake failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The gateway closed the connection.
    #[error("Connection closed")]
    ConnectionClosed,

    /// An operation did not complete in time.
    #[error("Connection timeout")]
    Timeout,

    /// Operation requires an established connection.
    #[error("Transport not connected")]
    NotConnected,

    /// Writing a frame failed.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Reading from the socket failed.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// Client certificate, key or root CA could not be loaded.
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// The gateway certificate did not match any pinned fingerprint.
    #[error("Certificate pin mismatch for {0}")]
    PinMismatch(String),

    /// Connect retries exhausted.
    #[error("Max retries exceeded")]
    MaxRetriesExceeded,
}

impl NetworkError {
    /// Returns true if the connection is known to be unusable after this error.
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            NetworkError::ConnectionClosed
                | NetworkError::SendFailed(_)
                | NetworkError::ReceiveFailed(_)
                | NetworkError::NotConnected
        )
    }
}
