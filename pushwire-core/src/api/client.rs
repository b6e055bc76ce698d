// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Push Client
//!
//! Public entry point: queue notifications with [`PushClient::add`], deliver
//! them with [`PushClient::send`], read their outcomes afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::config::PushConfig;
use super::error::{PushError, PushResult};
use super::events::{EventDispatcher, EventHandler, PushEvent};
use crate::codec::{self, FrameFormat, StatusCode};
use crate::delivery::{
    BatchReport, DeliveryObserver, DeliveryQueue, IdentifierSequence, Outcome, RetryEngine,
};
use crate::network::{ConnectionManager, ConnectionState, Transport};
use crate::notification::Notification;

#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
use crate::network::TlsTransport;

/// Records outcomes and forwards engine progress as events.
struct Recorder<'a> {
    outcomes: &'a mut BTreeMap<u32, Outcome>,
    events: &'a EventDispatcher,
}

impl DeliveryObserver for Recorder<'_> {
    fn resolved(&mut self, identifier: u32, outcome: Outcome) {
        self.outcomes.insert(identifier, outcome);
        let event = match outcome {
            Outcome::Delivered => PushEvent::Delivered { identifier },
            Outcome::Rejected(status) => PushEvent::Rejected { identifier, status },
            Outcome::Undetermined => PushEvent::Undetermined { identifier },
        };
        self.events.dispatch(event);
    }

    fn rewound(&mut self, first_identifier: u32, count: usize) {
        self.events.dispatch(PushEvent::Resubmitting {
            first_identifier,
            count,
        });
    }

    fn connection_changed(&mut self, state: ConnectionState) {
        self.events
            .dispatch(PushEvent::ConnectionStateChanged { state });
    }
}

/// Reliable push notification client.
///
/// Owns one gateway connection, opened on the first `send` and kept open
/// across batches. Dropping the client disconnects it.
///
/// # Example
///
/// ```ignore
/// use pushwire_core::{DeviceToken, Environment, Notification, Payload, PushClient, PushConfig};
///
/// let config = PushConfig::new(Environment::Sandbox, "push-cert.pem");
/// let mut client = PushClient::from_config(config)?;
///
/// let token: DeviceToken = "a1b2...".parse()?;
/// let id = client.add(Notification::new(token, Payload::new().alert("Hello")))?;
/// client.send()?;
/// println!("{}: {:?}", id, client.outcome(id));
/// client.disconnect();
/// ```
pub struct PushClient<T: Transport> {
    connection: ConnectionManager<T>,
    engine: RetryEngine,
    queue: DeliveryQueue,
    identifiers: IdentifierSequence,
    outcomes: BTreeMap<u32, Outcome>,
    events: EventDispatcher,
    frame_format: FrameFormat,
    max_payload_size: usize,
}

#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
impl PushClient<TlsTransport> {
    /// Creates a client that talks TLS to the configured gateway.
    pub fn from_config(config: PushConfig) -> PushResult<Self> {
        Self::new(TlsTransport::new(), &config)
    }
}

impl<T: Transport> PushClient<T> {
    /// Creates a client over `transport`. Nothing connects yet.
    pub fn new(transport: T, config: &PushConfig) -> PushResult<Self> {
        config.validate()?;
        let connection =
            ConnectionManager::new(transport, config.gateway_transport()?, config.connect_policy());

        Ok(PushClient {
            connection,
            engine: RetryEngine::new(config.delivery_settings()),
            queue: DeliveryQueue::new(),
            identifiers: IdentifierSequence::new(),
            outcomes: BTreeMap::new(),
            events: EventDispatcher::new(),
            frame_format: config.frame_format,
            max_payload_size: config.max_payload_size,
        })
    }

    /// Queues a notification and returns its identifier.
    ///
    /// The notification is encoded right away. If that fails it is
    /// recorded as rejected with [`StatusCode::InvalidPayloadSize`] and
    /// never written.
    pub fn add(&mut self, mut notification: Notification) -> PushResult<u32> {
        let identifier = self
            .identifiers
            .allocate()
            .ok_or(PushError::IdentifiersExhausted)?;
        notification.assign_identifier(identifier);

        match codec::encode(&notification, self.frame_format, self.max_payload_size) {
            Ok(frame) => {
                debug!(
                    target: "pushwire",
                    "Queued notification {} for {}",
                    identifier,
                    notification.device_token()
                );
                self.queue.push(notification, frame);
                Ok(identifier)
            }
            Err(source) => {
                warn!(
                    target: "pushwire",
                    "Notification {} cannot be encoded: {}",
                    identifier,
                    source
                );
                let status = StatusCode::InvalidPayloadSize;
                self.outcomes.insert(identifier, Outcome::Rejected(status));
                self.events
                    .dispatch(PushEvent::Rejected { identifier, status });
                Err(PushError::InvalidNotification { identifier, source })
            }
        }
    }

    /// Delivers every queued notification.
    ///
    /// Connects if needed. Gateway rejections are recorded as outcomes and
    /// listed in the report; they do not fail the call.
    pub fn send(&mut self) -> PushResult<BatchReport> {
        if self.queue.is_empty() {
            return Ok(BatchReport::default());
        }
        info!(
            target: "pushwire",
            "Sending {} notification(s)",
            self.queue.len()
        );

        let mut recorder = Recorder {
            outcomes: &mut self.outcomes,
            events: &self.events,
        };
        let report = self
            .engine
            .run(&mut self.connection, &mut self.queue, &mut recorder)?;
        Ok(report)
    }

    /// Like [`send`](Self::send), but fails with
    /// [`PushError::GatewayRejection`] naming the first rejected
    /// notification of the batch.
    pub fn send_strict(&mut self) -> PushResult<BatchReport> {
        let report = self.send()?;
        match report.rejected.first() {
            Some(&(identifier, status)) => Err(PushError::GatewayRejection { identifier, status }),
            None => Ok(report),
        }
    }

    /// Opens the gateway connection now instead of on the first send.
    pub fn connect(&mut self) -> PushResult<()> {
        if self.connection.is_connected() {
            return Ok(());
        }
        self.connection.ensure_connected()?;
        self.events.dispatch(PushEvent::ConnectionStateChanged {
            state: ConnectionState::Connected,
        });
        Ok(())
    }

    /// Closes the connection.
    ///
    /// Notifications still queued are resolved as undetermined. Safe to
    /// call any number of times.
    pub fn disconnect(&mut self) {
        let abandoned = self.abandon_pending();
        if !abandoned.is_empty() {
            info!(
                target: "pushwire",
                "Disconnecting with {} undelivered notification(s)",
                abandoned.len()
            );
        }
        if self.connection.state() != ConnectionState::Disconnected {
            self.connection.disconnect();
            self.events.dispatch(PushEvent::ConnectionStateChanged {
                state: ConnectionState::Disconnected,
            });
        }
    }

    /// Resolves every queued notification as undetermined and returns
    /// their identifiers. The connection stays open.
    pub fn abandon_pending(&mut self) -> Vec<u32> {
        let abandoned: Vec<u32> = self
            .queue
            .drain()
            .iter()
            .map(|notification| notification.identifier())
            .collect();
        for &identifier in &abandoned {
            self.outcomes.insert(identifier, Outcome::Undetermined);
            self.events
                .dispatch(PushEvent::Undetermined { identifier });
        }
        abandoned
    }

    /// Outcomes of every resolved notification, by identifier.
    pub fn outcomes(&self) -> &BTreeMap<u32, Outcome> {
        &self.outcomes
    }

    /// Outcome of one notification, `None` while it is still queued.
    pub fn outcome(&self, identifier: u32) -> Option<Outcome> {
        self.outcomes.get(&identifier).copied()
    }

    /// Forgets recorded outcomes.
    pub fn clear_outcomes(&mut self) {
        self.outcomes.clear();
    }

    /// Number of queued notifications without an outcome.
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Identifiers of queued notifications, in submission order.
    pub fn pending_identifiers(&self) -> Vec<u32> {
        self.queue.identifiers()
    }

    /// Looks up a queued notification.
    pub fn pending(&self, identifier: u32) -> Option<&Notification> {
        self.queue.get(identifier)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Returns true if connected.
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Registers an event handler.
    pub fn add_event_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.events.add_handler(handler);
    }

    /// Returns the event dispatcher.
    pub fn events_mut(&mut self) -> &mut EventDispatcher {
        &mut self.events
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

impl<T: Transport> Drop for PushClient<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
