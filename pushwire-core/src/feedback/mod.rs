// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Feedback Service
//!
//! The gateway's side channel listing device tokens that no longer accept
//! notifications. On connect the service writes every pending tuple and
//! closes the connection:
//!
//! ```text
//! [timestamp: u32][token length: u16][token]
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::api::{PushConfig, PushResult};
use crate::codec::CodecError;
use crate::network::{ConnectionManager, NetworkError, Transport};
use crate::notification::{DeviceToken, DEVICE_TOKEN_SIZE};

#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
use crate::network::TlsTransport;

/// Size of a tuple carrying a standard 32-byte token.
pub const FEEDBACK_TUPLE_SIZE: usize = 4 + 2 + DEVICE_TOKEN_SIZE;

/// A device token the gateway reported as unreachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackTuple {
    /// Seconds since the Unix epoch when the gateway determined the app
    /// was no longer installed.
    pub timestamp: u32,
    /// The token to stop sending to.
    pub device_token: DeviceToken,
}

impl FeedbackTuple {
    /// Timestamp as a system time.
    pub fn time(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(u64::from(self.timestamp))
    }

    /// Encodes the tuple as the service sends it.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(FEEDBACK_TUPLE_SIZE);
        bytes.extend_from_slice(&self.timestamp.to_be_bytes());
        bytes.extend_from_slice(&(DEVICE_TOKEN_SIZE as u16).to_be_bytes());
        bytes.extend_from_slice(self.device_token.as_bytes());
        bytes
    }
}

/// Decodes a complete feedback stream.
///
/// Fails on a truncated trailing tuple or a token of the wrong size.
pub fn decode_feedback(bytes: &[u8]) -> Result<Vec<FeedbackTuple>, CodecError> {
    let mut tuples = Vec::with_capacity(bytes.len() / FEEDBACK_TUPLE_SIZE);
    let mut rest = bytes;

    while !rest.is_empty() {
        if rest.len() < 6 {
            return Err(CodecError::MalformedFrame(format!(
                "truncated feedback tuple header ({} bytes)",
                rest.len()
            )));
        }
        let timestamp = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]);
        let token_len = u16::from_be_bytes([rest[4], rest[5]]) as usize;
        let Some(token) = rest.get(6..6 + token_len) else {
            return Err(CodecError::MalformedFrame(format!(
                "truncated feedback token: need {} bytes, have {}",
                token_len,
                rest.len() - 6
            )));
        };
        tuples.push(FeedbackTuple {
            timestamp,
            device_token: DeviceToken::from_slice(token)?,
        });
        rest = &rest[6 + token_len..];
    }

    Ok(tuples)
}

/// Client for the feedback service.
pub struct FeedbackService<T: Transport> {
    connection: ConnectionManager<T>,
    read_timeout: Duration,
}

#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
impl FeedbackService<TlsTransport> {
    /// Creates a service client that talks TLS to the configured endpoint.
    pub fn from_config(config: &PushConfig) -> PushResult<Self> {
        Self::new(TlsTransport::new(), config)
    }
}

impl<T: Transport> FeedbackService<T> {
    /// Creates a service client over `transport`.
    ///
    /// Reading stops at end of stream or once nothing arrives for the
    /// configured quiet period.
    pub fn new(transport: T, config: &PushConfig) -> PushResult<Self> {
        config.validate()?;
        Ok(FeedbackService {
            connection: ConnectionManager::new(
                transport,
                config.feedback_transport()?,
                config.connect_policy(),
            ),
            read_timeout: Duration::from_millis(config.quiet_period_ms),
        })
    }

    /// Connects, reads every pending tuple and disconnects.
    pub fn fetch(&mut self) -> PushResult<Vec<FeedbackTuple>> {
        self.connection.ensure_connected()?;

        let mut stream = Vec::new();
        let read = loop {
            match self.connection.read_available(self.read_timeout) {
                Ok(Some(bytes)) => stream.extend_from_slice(&bytes),
                Ok(None) | Err(NetworkError::ConnectionClosed) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        self.connection.disconnect();
        read?;

        debug!(target: "pushwire", "Read {} feedback bytes", stream.len());
        let tuples = decode_feedback(&stream)?;
        info!(
            target: "pushwire",
            "Feedback service reported {} device(s)",
            tuples.len()
        );
        Ok(tuples)
    }

    /// Returns a reference to the underlying transport.
    pub fn transport(&self) -> &T {
        self.connection.transport()
    }

    /// Returns a mutable reference to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        self.connection.transport_mut()
    }
}
