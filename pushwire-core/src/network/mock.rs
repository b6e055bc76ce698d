// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Mock Transport
//!
//! In-memory gateway for tests. Behaves like the real gateway where it
//! matters to the delivery engine: a rejected notification produces an
//! error frame, and every frame written after it on the same connection is
//! silently dropped.

use std::collections::VecDeque;
use std::time::Duration;

use super::error::NetworkError;
use super::transport::{ConnectionState, Transport, TransportConfig, TransportResult};
use crate::codec::{decode_notification, encode_error_frame, ErrorFrame, StatusCode};

/// Scripted gateway reaction to a written identifier.
#[derive(Debug, Clone)]
enum Rule {
    /// Respond with an error frame and stop processing the connection.
    Reject {
        identifier: u32,
        status: StatusCode,
        remaining: Option<u32>,
    },
    /// Queue raw bytes for reading; the connection keeps working.
    Emit {
        after_identifier: u32,
        bytes: Vec<u8>,
    },
}

/// Mock transport for testing.
#[derive(Debug)]
pub struct MockTransport {
    state: ConnectionState,
    connect_errors: VecDeque<NetworkError>,
    write_errors: VecDeque<(usize, NetworkError)>,
    rules: Vec<Rule>,
    incoming: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    accepted: Vec<Vec<u8>>,
    discarded: Vec<Vec<u8>>,
    /// Set once an error frame was produced on the current connection.
    failed: bool,
    writes: usize,
    connect_count: usize,
    disconnect_count: usize,
    last_config: Option<TransportConfig>,
}

impl MockTransport {
    /// Creates a mock gateway that accepts everything.
    pub fn new() -> Self {
        MockTransport {
            state: ConnectionState::Disconnected,
            connect_errors: VecDeque::new(),
            write_errors: VecDeque::new(),
            rules: Vec::new(),
            incoming: VecDeque::new(),
            written: Vec::new(),
            accepted: Vec::new(),
            discarded: Vec::new(),
            failed: false,
            writes: 0,
            connect_count: 0,
            disconnect_count: 0,
            last_config: None,
        }
    }

    /// Makes the next `connect` fail with `error`. Errors queue up.
    pub fn inject_connect_error(&mut self, error: NetworkError) {
        self.connect_errors.push_back(error);
    }

    /// Makes the write with the given zero-based index (counted over the
    /// transport's lifetime) fail with `error` and drop the connection.
    pub fn inject_write_error(&mut self, write_index: usize, error: NetworkError) {
        self.write_errors.push_back((write_index, error));
    }

    /// Rejects the first write of `identifier` with `status`.
    pub fn reject_once(&mut self, identifier: u32, status: StatusCode) {
        self.rules.push(Rule::Reject {
            identifier,
            status,
            remaining: Some(1),
        });
    }

    /// Rejects every write of `identifier` with `status`.
    pub fn reject_always(&mut self, identifier: u32, status: StatusCode) {
        self.rules.push(Rule::Reject {
            identifier,
            status,
            remaining: None,
        });
    }

    /// Announces a gateway shutdown right after `identifier` was processed.
    pub fn shutdown_after(&mut self, identifier: u32) {
        self.reject_once(identifier, StatusCode::Shutdown);
    }

    /// Queues raw bytes once `after_identifier` is written, without
    /// failing the connection.
    pub fn emit_after(&mut self, after_identifier: u32, bytes: Vec<u8>) {
        self.rules.push(Rule::Emit {
            after_identifier,
            bytes,
        });
    }

    /// Queues raw bytes for the next read on the current connection.
    pub fn queue_read(&mut self, bytes: Vec<u8>) {
        self.incoming.push_back(bytes);
    }

    /// Overrides the connection state.
    pub fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
    }

    /// Frames the gateway processed, in order.
    pub fn accepted_frames(&self) -> &[Vec<u8>] {
        &self.accepted
    }

    /// Identifiers of processed notifications, in order.
    pub fn accepted_identifiers(&self) -> Vec<u32> {
        self.accepted
            .iter()
            .filter_map(|frame| decode_notification(frame).ok())
            .map(|n| n.identifier)
            .collect()
    }

    /// Frames written after a rejection and dropped by the gateway.
    pub fn discarded_frames(&self) -> &[Vec<u8>] {
        &self.discarded
    }

    /// Identifiers of every frame written, including dropped ones.
    pub fn written_identifiers(&self) -> Vec<u32> {
        self.writes_log()
    }

    /// Number of successful connects.
    pub fn connect_count(&self) -> usize {
        self.connect_count
    }

    /// Number of disconnects that released an open connection.
    pub fn disconnect_count(&self) -> usize {
        self.disconnect_count
    }

    /// Configuration passed to the last connect attempt.
    pub fn last_config(&self) -> Option<&TransportConfig> {
        self.last_config.as_ref()
    }

    fn writes_log(&self) -> Vec<u32> {
        self.written
            .iter()
            .filter_map(|frame| decode_notification(frame).ok())
            .map(|n| n.identifier)
            .collect()
    }

    /// Applies matching rules and returns the rejection status, if any.
    fn apply_rules(&mut self, identifier: u32) -> Option<StatusCode> {
        let mut rejected = None;
        for rule in &mut self.rules {
            match rule {
                Rule::Reject {
                    identifier: id,
                    status,
                    remaining,
                } if *id == identifier && rejected.is_none() => {
                    if *remaining == Some(0) {
                        continue;
                    }
                    if let Some(left) = remaining {
                        *left -= 1;
                    }
                    let frame = encode_error_frame(&ErrorFrame::new(identifier, *status));
                    self.incoming.push_back(frame.to_vec());
                    rejected = Some(*status);
                }
                Rule::Emit {
                    after_identifier,
                    bytes,
                } if *after_identifier == identifier => {
                    self.incoming.push_back(std::mem::take(bytes));
                }
                _ => {}
            }
        }
        self.rules.retain(|rule| match rule {
            Rule::Reject { remaining, .. } => *remaining != Some(0),
            Rule::Emit { bytes, .. } => !bytes.is_empty(),
        });
        rejected
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn connect(&mut self, config: &TransportConfig) -> TransportResult<()> {
        if self.state == ConnectionState::Connected {
            return Ok(());
        }
        if self.state == ConnectionState::Closing {
            self.disconnect();
        }
        self.last_config = Some(config.clone());

        if let Some(error) = self.connect_errors.pop_front() {
            self.state = ConnectionState::Disconnected;
            return Err(error);
        }

        self.state = ConnectionState::Connected;
        self.failed = false;
        self.connect_count += 1;
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            self.disconnect_count += 1;
        }
        // Unread bytes die with the socket.
        self.incoming.clear();
        self.state = ConnectionState::Disconnected;
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn write(&mut self, frame: &[u8]) -> TransportResult<usize> {
        if self.state != ConnectionState::Connected {
            return Err(NetworkError::NotConnected);
        }

        let index = self.writes;
        self.writes += 1;
        if let Some(pos) = self.write_errors.iter().position(|(i, _)| *i == index) {
            if let Some((_, error)) = self.write_errors.remove(pos) {
                self.state = ConnectionState::Closing;
                return Err(error);
            }
        }

        self.written.push(frame.to_vec());
        if self.failed {
            self.discarded.push(frame.to_vec());
            return Ok(frame.len());
        }

        let rejection = decode_notification(frame)
            .ok()
            .and_then(|n| self.apply_rules(n.identifier));
        match rejection {
            // A shutdown notice still means the frame was processed.
            Some(StatusCode::Shutdown) | None => self.accepted.push(frame.to_vec()),
            Some(_) => self.discarded.push(frame.to_vec()),
        }
        if rejection.is_some() {
            self.failed = true;
        }

        Ok(frame.len())
    }

    fn read_available(&mut self, _timeout: Duration) -> TransportResult<Option<Vec<u8>>> {
        if self.state == ConnectionState::Disconnected {
            return Err(NetworkError::NotConnected);
        }
        if let Some(bytes) = self.incoming.pop_front() {
            return Ok(Some(bytes));
        }
        if self.failed || self.state == ConnectionState::Closing {
            // The gateway hangs up after reporting an error.
            self.state = ConnectionState::Disconnected;
            return Err(NetworkError::ConnectionClosed);
        }
        Ok(None)
    }
}
