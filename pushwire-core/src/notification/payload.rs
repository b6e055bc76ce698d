// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Notification Payload
//!
//! Builds the JSON body delivered to the device: the reserved `aps`
//! dictionary plus any custom top-level properties.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::codec::CodecError;

/// Reserved top-level key holding the system dictionary.
pub const APS_KEY: &str = "aps";

/// Alert shown to the user.
///
/// Serialized as a plain string when only the body is set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: String,
    #[serde(rename = "action-loc-key", skip_serializing_if = "Option::is_none")]
    pub action_loc_key: Option<String>,
    #[serde(rename = "loc-key", skip_serializing_if = "Option::is_none")]
    pub loc_key: Option<String>,
    #[serde(rename = "loc-args", default, skip_serializing_if = "Vec::is_empty")]
    pub loc_args: Vec<String>,
    #[serde(rename = "launch-image", skip_serializing_if = "Option::is_none")]
    pub launch_image: Option<String>,
}

impl Alert {
    /// Creates a body-only alert.
    pub fn text(body: &str) -> Self {
        Alert {
            body: body.to_string(),
            ..Default::default()
        }
    }

    fn is_plain(&self) -> bool {
        self.title.is_none()
            && self.action_loc_key.is_none()
            && self.loc_key.is_none()
            && self.loc_args.is_empty()
            && self.launch_image.is_none()
    }

    fn to_json(&self) -> Result<Value, CodecError> {
        if self.is_plain() {
            return Ok(Value::String(self.body.clone()));
        }
        serde_json::to_value(self).map_err(|e| CodecError::Serialization(e.to_string()))
    }
}

/// Structured notification body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Payload {
    alert: Option<Alert>,
    badge: Option<u32>,
    sound: Option<String>,
    category: Option<String>,
    content_available: bool,
    custom: Map<String, Value>,
    auto_truncate: bool,
}

impl Payload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a payload from a JSON object.
    ///
    /// The `aps` dictionary is read back into typed fields, every other key
    /// is kept as a custom property.
    pub fn from_json(value: Value) -> Result<Self, CodecError> {
        let Value::Object(mut object) = value else {
            return Err(CodecError::Serialization(
                "payload must be a JSON object".into(),
            ));
        };

        let mut payload = Payload::new();
        if let Some(aps) = object.remove(APS_KEY) {
            let Value::Object(aps) = aps else {
                return Err(CodecError::Serialization("aps must be a JSON object".into()));
            };
            for (key, value) in aps {
                match (key.as_str(), value) {
                    ("alert", Value::String(body)) => payload.alert = Some(Alert::text(&body)),
                    ("alert", value @ Value::Object(_)) => {
                        let alert = serde_json::from_value(value)
                            .map_err(|e| CodecError::Serialization(e.to_string()))?;
                        payload.alert = Some(alert);
                    }
                    ("badge", Value::Number(n)) => {
                        payload.badge = n.as_u64().and_then(|n| u32::try_from(n).ok());
                    }
                    ("sound", Value::String(sound)) => payload.sound = Some(sound),
                    ("category", Value::String(category)) => payload.category = Some(category),
                    ("content-available", Value::Number(n)) => {
                        payload.content_available = n.as_u64() == Some(1);
                    }
                    (other, _) => {
                        return Err(CodecError::Serialization(format!(
                            "unsupported aps key: {}",
                            other
                        )))
                    }
                }
            }
        }
        payload.custom = object;
        Ok(payload)
    }

    /// Sets a body-only alert.
    pub fn alert(mut self, body: &str) -> Self {
        self.alert = Some(Alert::text(body));
        self
    }

    /// Sets a full alert dictionary.
    pub fn with_alert(mut self, alert: Alert) -> Self {
        self.alert = Some(alert);
        self
    }

    /// Sets the application badge number.
    pub fn badge(mut self, badge: u32) -> Self {
        self.badge = Some(badge);
        self
    }

    /// Sets the sound file name (`"default"` for the system sound).
    pub fn sound(mut self, sound: &str) -> Self {
        self.sound = Some(sound.to_string());
        self
    }

    /// Sets the notification category.
    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    /// Marks the notification as a background content update.
    pub fn content_available(mut self, available: bool) -> Self {
        self.content_available = available;
        self
    }

    /// Adds a custom top-level property.
    ///
    /// Fails if `key` is the reserved `aps` key.
    pub fn custom(mut self, key: &str, value: Value) -> Result<Self, CodecError> {
        if key == APS_KEY {
            return Err(CodecError::Serialization(format!(
                "custom property cannot use the reserved key '{}'",
                APS_KEY
            )));
        }
        self.custom.insert(key.to_string(), value);
        Ok(self)
    }

    /// Shortens the alert body instead of failing when the payload is too large.
    pub fn auto_truncate(mut self, enabled: bool) -> Self {
        self.auto_truncate = enabled;
        self
    }

    /// Returns the alert, if any.
    pub fn get_alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    /// Returns the badge, if any.
    pub fn get_badge(&self) -> Option<u32> {
        self.badge
    }

    /// Returns the custom properties.
    pub fn custom_properties(&self) -> &Map<String, Value> {
        &self.custom
    }

    /// Builds the JSON document.
    pub fn to_json(&self) -> Result<Value, CodecError> {
        let mut aps = Map::new();
        if let Some(alert) = &self.alert {
            aps.insert("alert".into(), alert.to_json()?);
        }
        if let Some(badge) = self.badge {
            aps.insert("badge".into(), Value::from(badge));
        }
        if let Some(sound) = &self.sound {
            aps.insert("sound".into(), Value::from(sound.as_str()));
        }
        if let Some(category) = &self.category {
            aps.insert("category".into(), Value::from(category.as_str()));
        }
        if self.content_available {
            aps.insert("content-available".into(), Value::from(1));
        }

        let mut root = self.custom.clone();
        root.insert(APS_KEY.into(), Value::Object(aps));
        Ok(Value::Object(root))
    }

    /// Serializes the payload, enforcing `limit` bytes.
    ///
    /// With auto-truncation enabled the alert body is shortened (on a
    /// character boundary) until the document fits.
    pub fn to_bytes(&self, limit: usize) -> Result<Vec<u8>, CodecError> {
        let bytes = self.serialize()?;
        if bytes.len() <= limit {
            return Ok(bytes);
        }

        let too_large = CodecError::PayloadTooLarge {
            size: bytes.len(),
            limit,
        };
        if !self.auto_truncate {
            return Err(too_large);
        }

        let mut shortened = self.clone();
        let mut size = bytes.len();
        loop {
            let Some(alert) = shortened.alert.as_mut() else {
                return Err(too_large);
            };
            if alert.body.is_empty() {
                return Err(too_large);
            }
            // JSON escapes make the serialized size at least the raw excess.
            let excess = size - limit;
            let target = alert.body.len().saturating_sub(excess);
            truncate_at_char_boundary(&mut alert.body, target);

            let bytes = shortened.serialize()?;
            if bytes.len() <= limit {
                return Ok(bytes);
            }
            size = bytes.len();
        }
    }

    fn serialize(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(&self.to_json()?).map_err(|e| CodecError::Serialization(e.to_string()))
    }
}

fn truncate_at_char_boundary(text: &mut String, max_len: usize) {
    if text.len() <= max_len {
        return;
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}
