// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Event System
//!
//! Callbacks for delivery progress.

use std::sync::Arc;

use crate::codec::StatusCode;
use crate::network::ConnectionState;

/// Events emitted by a push client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// Gateway connection state changed.
    ConnectionStateChanged {
        /// The new connection state.
        state: ConnectionState,
    },

    /// The gateway accepted a notification.
    Delivered {
        /// Notification identifier.
        identifier: u32,
    },

    /// The gateway refused a notification, or it could not be encoded.
    Rejected {
        /// Notification identifier.
        identifier: u32,
        /// Reported status.
        status: StatusCode,
    },

    /// Delivery was abandoned before the gateway confirmed either way.
    Undetermined {
        /// Notification identifier.
        identifier: u32,
    },

    /// Notifications the gateway dropped are being written again.
    Resubmitting {
        /// First identifier of the resubmitted range.
        first_identifier: u32,
        /// Number of notifications in the range.
        count: usize,
    },
}

/// Event handler trait.
///
/// Implement this trait to receive push events.
pub trait EventHandler: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: PushEvent);
}

/// Simple callback-based event handler.
pub struct CallbackHandler<F>
where
    F: Fn(PushEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackHandler<F>
where
    F: Fn(PushEvent) + Send + Sync,
{
    /// Creates a new callback handler.
    pub fn new(callback: F) -> Self {
        CallbackHandler { callback }
    }
}

impl<F> EventHandler for CallbackHandler<F>
where
    F: Fn(PushEvent) + Send + Sync,
{
    fn on_event(&self, event: PushEvent) {
        (self.callback)(event);
    }
}

/// Event dispatcher for managing multiple handlers.
#[derive(Default, Clone)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    /// Creates a new event dispatcher.
    pub fn new() -> Self {
        EventDispatcher {
            handlers: Vec::new(),
        }
    }

    /// Adds an event handler.
    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    /// Removes all handlers.
    pub fn clear_handlers(&mut self) {
        self.handlers.clear();
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Dispatches an event to all handlers.
    pub fn dispatch(&self, event: PushEvent) {
        for handler in &self.handlers {
            handler.on_event(event.clone());
        }
    }
}
