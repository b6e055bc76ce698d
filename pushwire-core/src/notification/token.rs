// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Device Tokens

use std::fmt;
use std::str::FromStr;

use crate::codec::CodecError;

/// Length of a device token on the wire.
pub const DEVICE_TOKEN_SIZE: usize = 32;

/// Binary identifier of a device registered for notifications.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceToken([u8; DEVICE_TOKEN_SIZE]);

impl DeviceToken {
    /// Creates a token from raw bytes.
    pub fn new(bytes: [u8; DEVICE_TOKEN_SIZE]) -> Self {
        DeviceToken(bytes)
    }

    /// Creates a token from a byte slice, which must be exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CodecError> {
        let bytes: [u8; DEVICE_TOKEN_SIZE] = bytes.try_into().map_err(|_| {
            CodecError::InvalidDeviceToken(format!(
                "expected {} bytes, got {}",
                DEVICE_TOKEN_SIZE,
                bytes.len()
            ))
        })?;
        Ok(DeviceToken(bytes))
    }

    /// Parses the hex form handed out by devices.
    ///
    /// Spaces and angle brackets (as in `<abcd ef01 ...>`) are ignored.
    pub fn from_hex(token: &str) -> Result<Self, CodecError> {
        let cleaned: String = token
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '<' && *c != '>')
            .collect();
        let bytes = hex::decode(&cleaned)
            .map_err(|e| CodecError::InvalidDeviceToken(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; DEVICE_TOKEN_SIZE] {
        &self.0
    }

    /// Lowercase hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for DeviceToken {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Tokens identify devices, keep them short in logs.
        write!(f, "DeviceToken({}…)", &self.to_hex()[..8])
    }
}
