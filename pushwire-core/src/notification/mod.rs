// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Notifications
//!
//! A notification targets one device token and carries a JSON payload,
//! an optional expiry and a delivery priority.

mod payload;
mod token;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub use payload::{Alert, Payload, APS_KEY};
pub use token::{DeviceToken, DEVICE_TOKEN_SIZE};

/// Delivery priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    /// Deliver immediately (wire value 10).
    #[default]
    Immediate,
    /// Deliver at a time that conserves device power (wire value 5).
    ConservePower,
}

impl Priority {
    /// Wire value.
    pub fn as_u8(self) -> u8 {
        match self {
            Priority::Immediate => 10,
            Priority::ConservePower => 5,
        }
    }

    /// Parses a wire value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            10 => Some(Priority::Immediate),
            5 => Some(Priority::ConservePower),
            _ => None,
        }
    }
}

/// A single device notification.
///
/// Immutable once queued, except for the attempt counter maintained by the
/// delivery engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    identifier: u32,
    device_token: DeviceToken,
    payload: Payload,
    expiry: Option<SystemTime>,
    priority: Priority,
    attempts: u32,
}

impl Notification {
    /// Creates a notification with immediate priority and no expiry.
    pub fn new(device_token: DeviceToken, payload: Payload) -> Self {
        Notification {
            identifier: 0,
            device_token,
            payload,
            expiry: None,
            priority: Priority::Immediate,
            attempts: 0,
        }
    }

    /// Sets the absolute expiry time.
    pub fn with_expiry(mut self, expiry: SystemTime) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Sets the expiry relative to now. Lifetimes past the last encodable
    /// second saturate to it.
    pub fn expires_in(self, lifetime: Duration) -> Self {
        let latest = UNIX_EPOCH + Duration::from_secs(u64::from(u32::MAX));
        let expiry = SystemTime::now()
            .checked_add(lifetime)
            .map_or(latest, |t| t.min(latest));
        self.with_expiry(expiry)
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the identifier used when encoding outside a client.
    ///
    /// A client overwrites it with its own sequence number on submission.
    pub fn with_identifier(mut self, identifier: u32) -> Self {
        self.identifier = identifier;
        self
    }

    /// Identifier assigned on submission (0 before submission).
    pub fn identifier(&self) -> u32 {
        self.identifier
    }

    /// Target device.
    pub fn device_token(&self) -> &DeviceToken {
        &self.device_token
    }

    /// Message body.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Absolute expiry time, if any.
    pub fn expiry(&self) -> Option<SystemTime> {
        self.expiry
    }

    /// Expiry as seconds since the Unix epoch, 0 if absent.
    ///
    /// Times before the epoch encode as 0 and times past 2106 saturate.
    pub fn expiry_timestamp(&self) -> u32 {
        self.expiry
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
            .unwrap_or(0)
    }

    /// Delivery priority.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Number of times the notification has been written to a gateway.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub(crate) fn assign_identifier(&mut self, identifier: u32) {
        self.identifier = identifier;
    }

    pub(crate) fn record_attempt(&mut self) {
        self.attempts += 1;
    }
}
