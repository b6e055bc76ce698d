// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! API Error Types
//!
//! Unified error type for the push client.

use thiserror::Error;

use crate::codec::{CodecError, StatusCode};
use crate::delivery::DeliveryError;
use crate::network::NetworkError;

/// Unified error type for push operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PushError {
    /// Transport failed and retries did not help.
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// Encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A submitted notification could not be encoded. It was recorded as
    /// rejected and never reached the gateway.
    #[error("invalid notification {identifier}: {source}")]
    InvalidNotification {
        identifier: u32,
        source: CodecError,
    },

    /// The gateway refused a notification.
    #[error("notification {identifier} rejected: {status}")]
    GatewayRejection { identifier: u32, status: StatusCode },

    /// A notification used up its retries; the listed ones are undetermined.
    #[error("retry limit exceeded, {} notification(s) undetermined", undetermined.len())]
    RetryLimitExceeded { undetermined: Vec<u32> },

    /// Every notification identifier of this client has been used.
    #[error("notification identifiers exhausted")]
    IdentifiersExhausted,

    /// Configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A background task running a client call did not complete.
    #[error("task failed: {0}")]
    TaskFailed(String),
}

impl From<DeliveryError> for PushError {
    fn from(error: DeliveryError) -> Self {
        match error {
            DeliveryError::Network(e) => PushError::Network(e),
            DeliveryError::RetryLimitExceeded { undetermined } => {
                PushError::RetryLimitExceeded { undetermined }
            }
        }
    }
}

/// Result type for push operations.
pub type PushResult<T> = Result<T, PushError>;
