// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Gateway status codes carried by error frames.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Status reported by the gateway for a notification.
///
/// Statuses compare and hash by their wire byte, so `Other(8)` equals
/// `InvalidToken`.
#[derive(Debug, Clone, Copy)]
pub enum StatusCode {
    /// 0: no error.
    NoErrors,
    /// 1: gateway-side processing error.
    ProcessingError,
    /// 2
    MissingDeviceToken,
    /// 3
    MissingTopic,
    /// 4
    MissingPayload,
    /// 5
    InvalidTokenSize,
    /// 6
    InvalidTopicSize,
    /// 7
    InvalidPayloadSize,
    /// 8
    InvalidToken,
    /// 10: the gateway is closing the connection; the identifier names the
    /// last notification it processed.
    Shutdown,
    /// 255: unknown error.
    Unknown,
    /// Any value outside the documented table. [`StatusCode::from_u8`]
    /// only produces it for such values.
    Other(u8),
}

impl StatusCode {
    /// Decodes a status byte.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => StatusCode::NoErrors,
            1 => StatusCode::ProcessingError,
            2 => StatusCode::MissingDeviceToken,
            3 => StatusCode::MissingTopic,
            4 => StatusCode::MissingPayload,
            5 => StatusCode::InvalidTokenSize,
            6 => StatusCode::InvalidTopicSize,
            7 => StatusCode::InvalidPayloadSize,
            8 => StatusCode::InvalidToken,
            10 => StatusCode::Shutdown,
            255 => StatusCode::Unknown,
            other => StatusCode::Other(other),
        }
    }

    /// Encodes the status byte.
    pub fn as_u8(self) -> u8 {
        match self {
            StatusCode::NoErrors => 0,
            StatusCode::ProcessingError => 1,
            StatusCode::MissingDeviceToken => 2,
            StatusCode::MissingTopic => 3,
            StatusCode::MissingPayload => 4,
            StatusCode::InvalidTokenSize => 5,
            StatusCode::InvalidTopicSize => 6,
            StatusCode::InvalidPayloadSize => 7,
            StatusCode::InvalidToken => 8,
            StatusCode::Shutdown => 10,
            StatusCode::Unknown => 255,
            StatusCode::Other(value) => value,
        }
    }

    /// Human readable description.
    pub fn description(self) -> &'static str {
        match self.normalized() {
            StatusCode::NoErrors => "No errors encountered",
            StatusCode::ProcessingError => "Processing error",
            StatusCode::MissingDeviceToken => "Missing device token",
            StatusCode::MissingTopic => "Missing topic",
            StatusCode::MissingPayload => "Missing payload",
            StatusCode::InvalidTokenSize => "Invalid token size",
            StatusCode::InvalidTopicSize => "Invalid topic size",
            StatusCode::InvalidPayloadSize => "Invalid payload size",
            StatusCode::InvalidToken => "Invalid token",
            StatusCode::Shutdown => "Shutdown",
            StatusCode::Unknown | StatusCode::Other(_) => "None (unknown)",
        }
    }

    /// True for codes that do not name a real rejection.
    pub fn is_unknown(self) -> bool {
        matches!(self.normalized(), StatusCode::Unknown | StatusCode::Other(_))
    }

    /// Named variant for table values wrapped in `Other`.
    fn normalized(self) -> Self {
        StatusCode::from_u8(self.as_u8())
    }
}

impl PartialEq for StatusCode {
    fn eq(&self, other: &Self) -> bool {
        self.as_u8() == other.as_u8()
    }
}

impl Eq for StatusCode {}

impl Hash for StatusCode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_u8().hash(state);
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_u8())
    }
}
