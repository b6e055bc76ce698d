// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Delivery Queue
//!
//! Notifications awaiting an outcome, in submission order. The front part
//! has been written but not confirmed, the rest has not been written on the
//! current connection. Outcomes are always resolved from the front, so the
//! queue only ever pops a prefix.

use std::collections::{HashMap, VecDeque};

use crate::notification::Notification;

/// Hands out notification identifiers: 1, 2, 3, ...
///
/// Identifier 0 is reserved for "no notification" in gateway error frames.
#[derive(Debug, Clone)]
pub struct IdentifierSequence {
    next: u32,
}

impl Default for IdentifierSequence {
    fn default() -> Self {
        IdentifierSequence { next: 1 }
    }
}

impl IdentifierSequence {
    /// Creates a sequence starting at 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next identifier, or `None` once the space is used up.
    pub fn allocate(&mut self) -> Option<u32> {
        if self.next == 0 {
            return None;
        }
        let id = self.next;
        // Wraps to the reserved 0, which marks exhaustion.
        self.next = self.next.wrapping_add(1);
        Some(id)
    }

    /// Identifier the next call to `allocate` returns.
    pub fn peek(&self) -> Option<u32> {
        (self.next != 0).then_some(self.next)
    }
}

/// A queued notification with its pre-encoded frame.
#[derive(Debug, Clone)]
pub struct QueuedNotification {
    pub notification: Notification,
    pub frame: Vec<u8>,
}

/// Ordered queue of notifications awaiting an outcome.
#[derive(Debug, Default)]
pub struct DeliveryQueue {
    entries: VecDeque<QueuedNotification>,
    /// identifier -> absolute position
    index: HashMap<u32, u64>,
    /// Absolute position of `entries[0]`.
    base: u64,
    /// Number of written, unconfirmed entries at the front.
    cursor: usize,
}

impl DeliveryQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an encoded notification.
    pub fn push(&mut self, notification: Notification, frame: Vec<u8>) {
        let position = self.base + self.entries.len() as u64;
        self.index.insert(notification.identifier(), position);
        self.entries.push_back(QueuedNotification {
            notification,
            frame,
        });
    }

    /// Notifications awaiting an outcome.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing awaits an outcome.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Written on the current connection but not confirmed.
    pub fn unconfirmed_count(&self) -> usize {
        self.cursor
    }

    /// Not yet written on the current connection.
    pub fn unsent_count(&self) -> usize {
        self.entries.len() - self.cursor
    }

    /// Returns true if `identifier` is queued.
    pub fn contains(&self, identifier: u32) -> bool {
        self.index.contains_key(&identifier)
    }

    /// Position of `identifier` from the front of the queue.
    pub fn position(&self, identifier: u32) -> Option<usize> {
        self.index
            .get(&identifier)
            .map(|absolute| (absolute - self.base) as usize)
    }

    /// Position of `identifier` if it lies in the unconfirmed range.
    pub fn unconfirmed_position(&self, identifier: u32) -> Option<usize> {
        self.position(identifier).filter(|&pos| pos < self.cursor)
    }

    /// Looks up a queued notification.
    pub fn get(&self, identifier: u32) -> Option<&Notification> {
        self.position(identifier)
            .and_then(|pos| self.entries.get(pos))
            .map(|entry| &entry.notification)
    }

    /// The first unsent entry.
    pub fn next_unsent(&mut self) -> Option<&mut QueuedNotification> {
        self.entries.get_mut(self.cursor)
    }

    /// Moves the first unsent entry into the unconfirmed range.
    pub fn advance(&mut self) {
        if self.cursor < self.entries.len() {
            self.cursor += 1;
        }
    }

    /// Moves every unconfirmed entry back to unsent.
    ///
    /// Returns how many entries were rewound.
    pub fn rewind(&mut self) -> usize {
        std::mem::take(&mut self.cursor)
    }

    /// Removes the first `count` entries, which must all be unconfirmed.
    pub fn pop_confirmed(&mut self, count: usize) -> Vec<Notification> {
        let count = count.min(self.cursor);
        self.cursor -= count;
        self.pop_front(count)
    }

    /// Removes every entry, written or not.
    pub fn drain(&mut self) -> Vec<Notification> {
        self.cursor = 0;
        self.pop_front(self.entries.len())
    }

    /// Identifiers of queued notifications, in order.
    pub fn identifiers(&self) -> Vec<u32> {
        self.entries
            .iter()
            .map(|entry| entry.notification.identifier())
            .collect()
    }

    fn pop_front(&mut self, count: usize) -> Vec<Notification> {
        let mut popped = Vec::with_capacity(count);
        for _ in 0..count {
            let Some(entry) = self.entries.pop_front() else {
                break;
            };
            self.index.remove(&entry.notification.identifier());
            self.base += 1;
            popped.push(entry.notification);
        }
        popped
    }
}
