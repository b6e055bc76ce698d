// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Wire Codec
//!
//! Stateless conversion between notifications and the gateway's binary
//! frames. All integers are big-endian.
//!
//! # Notification frames
//!
//! Itemized (command 2, default):
//!
//! ```text
//! [2][frame length: u32]{ [item id: u8][item length: u16][item data] }*
//!   item 1: device token (32)    item 2: payload (JSON)
//!   item 3: identifier (4)       item 4: expiry (4, 0 = none)
//!   item 5: priority (1)
//! ```
//!
//! Enhanced (command 1, no priority):
//!
//! ```text
//! [1][identifier: u32][expiry: u32][token length: u16][token][payload length: u16][payload]
//! ```
//!
//! # Error frames
//!
//! ```text
//! [8][status: u8][identifier: u32]
//! ```
//!
//! Callers hand over exactly one frame per call; buffering partial reads is
//! the delivery engine's job.

mod error;
mod status;

use serde::{Deserialize, Serialize};

pub use error::CodecError;
pub use status::StatusCode;

use crate::notification::Notification;

/// Command byte of the enhanced notification format.
pub const COMMAND_ENHANCED: u8 = 1;
/// Command byte of the itemized notification format.
pub const COMMAND_ITEMIZED: u8 = 2;
/// Command byte of gateway error responses.
pub const COMMAND_ERROR_RESPONSE: u8 = 8;

/// Size of an error response frame.
pub const ERROR_FRAME_SIZE: usize = 6;

/// Default payload limit in bytes.
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 2048;

/// Largest payload the 16-bit length fields can describe.
pub const MAX_ENCODABLE_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// Item identifiers of the itemized format.
pub mod items {
    pub const DEVICE_TOKEN: u8 = 1;
    pub const PAYLOAD: u8 = 2;
    pub const IDENTIFIER: u8 = 3;
    pub const EXPIRY: u8 = 4;
    pub const PRIORITY: u8 = 5;
}

/// Notification frame layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    /// Command 1: fixed layout, cannot carry a priority.
    Enhanced,
    /// Command 2: item list, carries the priority.
    #[default]
    Itemized,
}

/// Error response sent by the gateway before it closes the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorFrame {
    /// Identifier of the notification the status refers to.
    pub identifier: u32,
    /// Reported status.
    pub status: StatusCode,
}

impl ErrorFrame {
    /// Creates an error frame.
    pub fn new(identifier: u32, status: StatusCode) -> Self {
        ErrorFrame { identifier, status }
    }

    /// True if the frame reports nothing: a `NoErrors` status, or an
    /// unknown status with identifier 0.
    pub fn is_no_error(&self) -> bool {
        self.status == StatusCode::NoErrors || (self.identifier == 0 && self.status.is_unknown())
    }
}

/// A notification frame parsed back from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedNotification {
    pub format: FrameFormat,
    pub identifier: u32,
    pub expiry: u32,
    pub device_token: Vec<u8>,
    pub payload: Vec<u8>,
    pub priority: Option<u8>,
}

/// Encodes a notification.
///
/// Fails with [`CodecError::PayloadTooLarge`] if the serialized payload
/// exceeds `max_payload_size`.
pub fn encode(
    notification: &Notification,
    format: FrameFormat,
    max_payload_size: usize,
) -> Result<Vec<u8>, CodecError> {
    let limit = max_payload_size.min(MAX_ENCODABLE_PAYLOAD_SIZE);
    let payload = notification.payload().to_bytes(limit)?;
    let token = notification.device_token().as_bytes();
    let payload_len = payload.len() as u16;

    match format {
        FrameFormat::Enhanced => {
            let mut frame = Vec::with_capacity(1 + 4 + 4 + 2 + token.len() + 2 + payload.len());
            frame.push(COMMAND_ENHANCED);
            frame.extend_from_slice(&notification.identifier().to_be_bytes());
            frame.extend_from_slice(&notification.expiry_timestamp().to_be_bytes());
            frame.extend_from_slice(&(token.len() as u16).to_be_bytes());
            frame.extend_from_slice(token);
            frame.extend_from_slice(&payload_len.to_be_bytes());
            frame.extend_from_slice(&payload);
            Ok(frame)
        }
        FrameFormat::Itemized => {
            let mut body = Vec::with_capacity(5 * 3 + token.len() + payload.len() + 9);
            push_item(&mut body, items::DEVICE_TOKEN, token);
            push_item(&mut body, items::PAYLOAD, &payload);
            push_item(
                &mut body,
                items::IDENTIFIER,
                &notification.identifier().to_be_bytes(),
            );
            push_item(
                &mut body,
                items::EXPIRY,
                &notification.expiry_timestamp().to_be_bytes(),
            );
            push_item(&mut body, items::PRIORITY, &[notification.priority().as_u8()]);

            let mut frame = Vec::with_capacity(5 + body.len());
            frame.push(COMMAND_ITEMIZED);
            frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
            frame.extend_from_slice(&body);
            Ok(frame)
        }
    }
}

fn push_item(body: &mut Vec<u8>, id: u8, data: &[u8]) {
    body.push(id);
    body.extend_from_slice(&(data.len() as u16).to_be_bytes());
    body.extend_from_slice(data);
}

/// Decodes an error response frame.
///
/// Requires exactly [`ERROR_FRAME_SIZE`] bytes starting with the error
/// command byte.
pub fn decode_error_frame(bytes: &[u8]) -> Result<ErrorFrame, CodecError> {
    if bytes.len() != ERROR_FRAME_SIZE {
        return Err(CodecError::MalformedFrame(format!(
            "error frame must be {} bytes, got {}",
            ERROR_FRAME_SIZE,
            bytes.len()
        )));
    }
    if bytes[0] != COMMAND_ERROR_RESPONSE {
        return Err(CodecError::MalformedFrame(format!(
            "unexpected command {} in error frame",
            bytes[0]
        )));
    }

    let identifier = u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
    Ok(ErrorFrame {
        identifier,
        status: StatusCode::from_u8(bytes[1]),
    })
}

/// Encodes an error response frame.
pub fn encode_error_frame(frame: &ErrorFrame) -> [u8; ERROR_FRAME_SIZE] {
    let id = frame.identifier.to_be_bytes();
    [
        COMMAND_ERROR_RESPONSE,
        frame.status.as_u8(),
        id[0],
        id[1],
        id[2],
        id[3],
    ]
}

/// Decodes a notification frame of either format.
///
/// The input must contain exactly one frame.
pub fn decode_notification(bytes: &[u8]) -> Result<DecodedNotification, CodecError> {
    let mut reader = Reader::new(bytes);
    let decoded = match reader.u8()? {
        COMMAND_ENHANCED => {
            let identifier = reader.u32()?;
            let expiry = reader.u32()?;
            let token_len = reader.u16()? as usize;
            let device_token = reader.take(token_len)?.to_vec();
            let payload_len = reader.u16()? as usize;
            let payload = reader.take(payload_len)?.to_vec();
            DecodedNotification {
                format: FrameFormat::Enhanced,
                identifier,
                expiry,
                device_token,
                payload,
                priority: None,
            }
        }
        COMMAND_ITEMIZED => {
            let frame_len = reader.u32()? as usize;
            if reader.remaining() != frame_len {
                return Err(CodecError::MalformedFrame(format!(
                    "frame length {} does not match {} bytes of items",
                    frame_len,
                    reader.remaining()
                )));
            }
            let mut decoded = DecodedNotification {
                format: FrameFormat::Itemized,
                identifier: 0,
                expiry: 0,
                device_token: Vec::new(),
                payload: Vec::new(),
                priority: None,
            };
            while reader.remaining() > 0 {
                let id = reader.u8()?;
                let len = reader.u16()? as usize;
                let data = reader.take(len)?;
                match id {
                    items::DEVICE_TOKEN => decoded.device_token = data.to_vec(),
                    items::PAYLOAD => decoded.payload = data.to_vec(),
                    items::IDENTIFIER => decoded.identifier = be_u32(data)?,
                    items::EXPIRY => decoded.expiry = be_u32(data)?,
                    items::PRIORITY => {
                        decoded.priority = Some(*data.first().ok_or_else(|| {
                            CodecError::MalformedFrame("empty priority item".into())
                        })?)
                    }
                    other => {
                        return Err(CodecError::MalformedFrame(format!(
                            "unknown item id {}",
                            other
                        )))
                    }
                }
            }
            decoded
        }
        other => {
            return Err(CodecError::MalformedFrame(format!(
                "unknown notification command {}",
                other
            )))
        }
    };

    if reader.remaining() != 0 {
        return Err(CodecError::MalformedFrame(format!(
            "{} trailing bytes",
            reader.remaining()
        )));
    }
    Ok(decoded)
}

fn be_u32(data: &[u8]) -> Result<u32, CodecError> {
    let bytes: [u8; 4] = data
        .try_into()
        .map_err(|_| CodecError::MalformedFrame(format!("expected 4 bytes, got {}", data.len())))?;
    Ok(u32::from_be_bytes(bytes))
}

/// Bounds-checked cursor over a frame.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < len {
            return Err(CodecError::MalformedFrame(format!(
                "truncated frame: need {} bytes at offset {}, have {}",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, CodecError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, CodecError> {
        be_u32(self.take(4)?)
    }
}
