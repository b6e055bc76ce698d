// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Pushwire Core Library
//!
//! Reliable delivery of device notifications over the binary push gateway
//! protocol: one persistent TLS connection, a queue that tracks every
//! notification to an outcome, and resubmission of the notifications the
//! gateway drops after reporting an error.
//! Certificate fingerprints use the audited `ring` crate.

pub mod api;
pub mod codec;
pub mod delivery;
pub mod feedback;
pub mod network;
pub mod notification;

pub use api::{PushClient, PushConfig, PushError, PushEvent, PushResult};
#[cfg(feature = "tokio")]
pub use api::SharedPushClient;
pub use codec::{CodecError, ErrorFrame, FrameFormat, StatusCode};
pub use delivery::{BatchReport, Outcome};
pub use feedback::{FeedbackService, FeedbackTuple};
pub use network::{ConnectionState, Environment, MockTransport, NetworkError, Transport};
#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
pub use network::TlsTransport;
pub use notification::{Alert, DeviceToken, Notification, Payload, Priority};
