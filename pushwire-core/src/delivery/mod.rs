// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Delivery Queue & Retry Engine
//!
//! Keeps submitted notifications in order until each has an outcome, and
//! replays the part of a batch the gateway dropped after an error.

mod engine;
mod outcome;
mod queue;

pub use engine::{
    DeliveryError, DeliveryObserver, DeliverySettings, NoopObserver, RetryEngine,
    DEFAULT_QUIET_PERIOD_MS, DEFAULT_READ_TIMEOUT_MS, DEFAULT_RETRY_LIMIT,
    DEFAULT_WRITES_PER_POLL,
};
pub use outcome::{BatchReport, Outcome};
pub use queue::{DeliveryQueue, IdentifierSequence, QueuedNotification};
