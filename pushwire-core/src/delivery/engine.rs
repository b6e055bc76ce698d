// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Retry Engine
//!
//! Drains a [`DeliveryQueue`] through a connection and turns gateway error
//! frames into outcomes.
//!
//! The gateway acknowledges nothing. It only reports the first failing
//! notification of a connection, then closes it and drops everything
//! written after. So when an error frame names identifier *i*:
//!
//! - everything written before *i* is delivered,
//! - *i* is rejected (or delivered, for a shutdown notice),
//! - everything written after *i* is rewound and written again on a new
//!   connection.
//!
//! Notifications still unconfirmed when the batch is written are delivered
//! once a quiet period passes without an error frame.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::outcome::{BatchReport, Outcome};
use super::queue::DeliveryQueue;
use crate::codec::{decode_error_frame, ErrorFrame, StatusCode, ERROR_FRAME_SIZE};
use crate::network::{ConnectionManager, ConnectionState, NetworkError, Transport};

/// Default read timeout of the poll after each write group.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 10;
/// Default quiet period after the last write.
pub const DEFAULT_QUIET_PERIOD_MS: u64 = 1_000;
/// Default number of resubmissions per notification.
pub const DEFAULT_RETRY_LIMIT: u32 = 3;
/// Default number of writes between polls.
pub const DEFAULT_WRITES_PER_POLL: usize = 1;

/// Errors that abort a delivery run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The connection could not be (re)established.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// A notification used up its write budget. Every notification still
    /// queued was resolved as undetermined.
    #[error("Retry limit exceeded, {} notification(s) undetermined", undetermined.len())]
    RetryLimitExceeded { undetermined: Vec<u32> },
}

/// Timing and retry settings of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliverySettings {
    /// Poll timeout after each group of writes, in milliseconds.
    pub read_timeout_ms: u64,
    /// Final poll timeout after the last write, in milliseconds.
    pub quiet_period_ms: u64,
    /// Writes allowed per notification beyond the first.
    pub retry_limit: u32,
    /// Writes between two polls.
    pub writes_per_poll: usize,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        DeliverySettings {
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            quiet_period_ms: DEFAULT_QUIET_PERIOD_MS,
            retry_limit: DEFAULT_RETRY_LIMIT,
            writes_per_poll: DEFAULT_WRITES_PER_POLL,
        }
    }
}

impl DeliverySettings {
    /// Poll timeout after each group of writes.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Final poll timeout.
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }
}

/// Receives outcomes and progress while the engine runs.
pub trait DeliveryObserver {
    /// A notification reached its outcome.
    fn resolved(&mut self, identifier: u32, outcome: Outcome);

    /// Unconfirmed notifications were moved back for resubmission.
    fn rewound(&mut self, _first_identifier: u32, _count: usize) {}

    /// The connection changed state.
    fn connection_changed(&mut self, _state: ConnectionState) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl DeliveryObserver for NoopObserver {
    fn resolved(&mut self, _identifier: u32, _outcome: Outcome) {}
}

/// What a poll found.
enum PollResult {
    /// Nothing arrived in time.
    Quiet,
    /// An error frame or a lost connection rewound the queue.
    Interrupted,
}

/// Writes queued notifications and resolves their outcomes.
#[derive(Debug, Default)]
pub struct RetryEngine {
    settings: DeliverySettings,
    /// Bytes of an incomplete error frame.
    buffer: Vec<u8>,
}

impl RetryEngine {
    /// Creates an engine with the given settings.
    pub fn new(settings: DeliverySettings) -> Self {
        RetryEngine {
            settings,
            buffer: Vec::with_capacity(ERROR_FRAME_SIZE),
        }
    }

    /// Current settings.
    pub fn settings(&self) -> &DeliverySettings {
        &self.settings
    }

    /// Delivers everything in `queue`.
    ///
    /// Returns once the queue is empty. Rejections are reported through
    /// the observer and the report, not as errors. Fails if the connection
    /// cannot be opened (the queue keeps its notifications) or a
    /// notification exceeds its write budget (the queue is emptied).
    pub fn run<T: Transport>(
        &mut self,
        conn: &mut ConnectionManager<T>,
        queue: &mut DeliveryQueue,
        observer: &mut dyn DeliveryObserver,
    ) -> Result<BatchReport, DeliveryError> {
        let mut report = BatchReport::default();
        let mut writes_since_poll = 0usize;
        self.buffer.clear();

        loop {
            if queue.unsent_count() == 0 {
                if queue.unconfirmed_count() == 0 {
                    break;
                }
                let quiet_period = self.settings.quiet_period();
                match self.poll(conn, queue, observer, &mut report, quiet_period) {
                    PollResult::Quiet => {
                        let count = queue.unconfirmed_count();
                        self.resolve_prefix(queue, observer, &mut report, count);
                        break;
                    }
                    PollResult::Interrupted => {
                        writes_since_poll = 0;
                        continue;
                    }
                }
            }

            if !conn.is_connected() {
                queue.rewind();
                self.buffer.clear();
                conn.ensure_connected()?;
                report.connections += 1;
                observer.connection_changed(ConnectionState::Connected);
            }

            let Some(entry) = queue.next_unsent() else {
                continue;
            };
            let identifier = entry.notification.identifier();
            if entry.notification.attempts() > self.settings.retry_limit {
                return Err(self.abort(conn, queue, observer, identifier));
            }
            if entry.notification.attempts() > 0 {
                report.resubmitted += 1;
            }
            entry.notification.record_attempt();
            let attempt = entry.notification.attempts();
            let written = conn.write(&entry.frame);
            queue.advance();

            match written {
                Ok(_) => {
                    debug!(
                        target: "pushwire",
                        "Wrote notification {} (attempt {})",
                        identifier,
                        attempt
                    );
                    report.frames_written += 1;
                    writes_since_poll += 1;
                    if writes_since_poll >= self.settings.writes_per_poll.max(1) {
                        writes_since_poll = 0;
                        let read_timeout = self.settings.read_timeout();
                        self.poll(conn, queue, observer, &mut report, read_timeout);
                    }
                }
                Err(e) => {
                    warn!(
                        target: "pushwire",
                        "Writing notification {} failed: {}",
                        identifier,
                        e
                    );
                    writes_since_poll = 0;
                    // The gateway may have explained itself before hanging up.
                    let read_timeout = self.settings.read_timeout();
                    if let PollResult::Quiet =
                        self.poll(conn, queue, observer, &mut report, read_timeout)
                    {
                        self.connection_lost(conn, queue, observer);
                    }
                }
            }
        }

        info!(
            target: "pushwire",
            "Batch finished: {} delivered, {} rejected, {} frames written",
            report.delivered.len(),
            report.rejected.len(),
            report.frames_written
        );
        Ok(report)
    }

    /// Reads from the connection for up to `timeout` and applies any error
    /// frame found. Ignored frames do not end the wait early.
    fn poll<T: Transport>(
        &mut self,
        conn: &mut ConnectionManager<T>,
        queue: &mut DeliveryQueue,
        observer: &mut dyn DeliveryObserver,
        report: &mut BatchReport,
        timeout: Duration,
    ) -> PollResult {
        // A failed write leaves the socket closing with its read side intact.
        if conn.state() == ConnectionState::Disconnected {
            self.connection_lost(conn, queue, observer);
            return PollResult::Interrupted;
        }

        let deadline = Instant::now().checked_add(timeout);
        let mut wait = timeout;
        loop {
            match conn.read_available(wait) {
                Ok(None) => return PollResult::Quiet,
                Ok(Some(bytes)) => {
                    self.buffer.extend_from_slice(&bytes);
                    while self.buffer.len() >= ERROR_FRAME_SIZE {
                        let frame: Vec<u8> = self.buffer.drain(..ERROR_FRAME_SIZE).collect();
                        let error = match decode_error_frame(&frame) {
                            Ok(error) => error,
                            Err(e) => {
                                // Framing is lost, nothing after this can be trusted.
                                warn!(target: "pushwire", "Unreadable gateway response: {}", e);
                                self.connection_lost(conn, queue, observer);
                                return PollResult::Interrupted;
                            }
                        };
                        if self.apply_error(conn, queue, observer, report, error) {
                            return PollResult::Interrupted;
                        }
                    }

                    let remaining = deadline
                        .map_or(timeout, |d| d.saturating_duration_since(Instant::now()));
                    if self.buffer.is_empty() {
                        if remaining.is_zero() {
                            return PollResult::Quiet;
                        }
                        wait = remaining;
                    } else {
                        // Partial frame: wait for the rest.
                        wait = remaining.max(self.settings.read_timeout());
                    }
                }
                Err(e) => {
                    warn!(target: "pushwire", "Connection lost while reading: {}", e);
                    self.connection_lost(conn, queue, observer);
                    return PollResult::Interrupted;
                }
            }
        }
    }

    /// Applies an error frame. Returns true if it named an unconfirmed
    /// notification and the queue was rewound.
    fn apply_error<T: Transport>(
        &mut self,
        conn: &mut ConnectionManager<T>,
        queue: &mut DeliveryQueue,
        observer: &mut dyn DeliveryObserver,
        report: &mut BatchReport,
        error: ErrorFrame,
    ) -> bool {
        if error.is_no_error() {
            debug!(
                target: "pushwire",
                "Ignoring status {} for identifier {}",
                error.status,
                error.identifier
            );
            return false;
        }
        let Some(position) = queue.unconfirmed_position(error.identifier) else {
            debug!(
                target: "pushwire",
                "Ignoring stale error frame for identifier {} ({})",
                error.identifier,
                error.status
            );
            return false;
        };

        if error.status == StatusCode::Shutdown {
            info!(
                target: "pushwire",
                "Gateway shutting down after notification {}",
                error.identifier
            );
            self.resolve_prefix(queue, observer, report, position + 1);
        } else {
            info!(
                target: "pushwire",
                "Notification {} rejected: {}",
                error.identifier,
                error.status
            );
            self.resolve_prefix(queue, observer, report, position);
            for notification in queue.pop_confirmed(1) {
                observer.resolved(notification.identifier(), Outcome::Rejected(error.status));
                report.rejected.push((notification.identifier(), error.status));
            }
        }

        self.rewind(queue, observer);
        self.buffer.clear();
        conn.disconnect();
        observer.connection_changed(ConnectionState::Disconnected);
        true
    }

    /// Rewinds everything unconfirmed after the connection died without an
    /// error frame.
    fn connection_lost<T: Transport>(
        &mut self,
        conn: &mut ConnectionManager<T>,
        queue: &mut DeliveryQueue,
        observer: &mut dyn DeliveryObserver,
    ) {
        self.rewind(queue, observer);
        self.buffer.clear();
        conn.disconnect();
        observer.connection_changed(ConnectionState::Disconnected);
    }

    fn rewind(&mut self, queue: &mut DeliveryQueue, observer: &mut dyn DeliveryObserver) {
        let first = queue.identifiers().first().copied();
        let count = queue.rewind();
        if let (Some(first), true) = (first, count > 0) {
            debug!(
                target: "pushwire",
                "Resubmitting {} notification(s) from {}",
                count,
                first
            );
            observer.rewound(first, count);
        }
    }

    fn resolve_prefix(
        &mut self,
        queue: &mut DeliveryQueue,
        observer: &mut dyn DeliveryObserver,
        report: &mut BatchReport,
        count: usize,
    ) {
        for notification in queue.pop_confirmed(count) {
            observer.resolved(notification.identifier(), Outcome::Delivered);
            report.delivered.push(notification.identifier());
        }
    }

    fn abort<T: Transport>(
        &mut self,
        conn: &mut ConnectionManager<T>,
        queue: &mut DeliveryQueue,
        observer: &mut dyn DeliveryObserver,
        identifier: u32,
    ) -> DeliveryError {
        warn!(
            target: "pushwire",
            "Notification {} exceeded {} retries, giving up on {} queued notification(s)",
            identifier,
            self.settings.retry_limit,
            queue.len()
        );
        let undetermined: Vec<u32> = queue
            .drain()
            .iter()
            .map(|notification| notification.identifier())
            .collect();
        for id in &undetermined {
            observer.resolved(*id, Outcome::Undetermined);
        }
        self.buffer.clear();
        conn.disconnect();
        observer.connection_changed(ConnectionState::Disconnected);
        DeliveryError::RetryLimitExceeded { undetermined }
    }
}
