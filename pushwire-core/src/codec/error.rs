// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Codec error types.

use thiserror::Error;

/// Errors raised while encoding notifications or decoding gateway frames.
///
/// These are caller-input errors and are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Payload too large: {size} bytes (limit {limit})")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Invalid device token: {0}")]
    InvalidDeviceToken(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
