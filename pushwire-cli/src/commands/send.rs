// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Send Command
//!
//! Delivers one payload to a list of devices and prints every outcome.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use pushwire_core::network::Transport;
use pushwire_core::{
    DeviceToken, Notification, Outcome, Payload, Priority, PushClient, PushConfig, PushError,
};
use serde::Serialize;
use tabled::Tabled;
use tracing::warn;

use crate::display;

/// What to send, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Message {
    pub alert: Option<String>,
    pub badge: Option<u32>,
    pub sound: Option<String>,
    pub payload: Option<String>,
    pub expires_in: Option<u64>,
    pub priority: Option<u8>,
    pub truncate: bool,
}

impl Message {
    fn payload(&self) -> Result<Payload> {
        let payload = match &self.payload {
            Some(json) => {
                let value = serde_json::from_str(json).context("--payload is not valid JSON")?;
                Payload::from_json(value)?
            }
            None => {
                let mut payload = Payload::new();
                if let Some(alert) = &self.alert {
                    payload = payload.alert(alert);
                }
                if let Some(badge) = self.badge {
                    payload = payload.badge(badge);
                }
                if let Some(sound) = &self.sound {
                    payload = payload.sound(sound);
                }
                payload
            }
        };
        Ok(payload.auto_truncate(self.truncate))
    }

    /// Builds one notification per token.
    pub fn notifications(&self, tokens: &[String]) -> Result<Vec<Notification>> {
        let payload = self.payload()?;
        let priority = match self.priority {
            Some(value) => Priority::from_u8(value)
                .ok_or_else(|| anyhow!("Priority must be 10 or 5, got {}", value))?,
            None => Priority::default(),
        };

        tokens
            .iter()
            .map(|token| {
                let device_token: DeviceToken = token
                    .parse()
                    .with_context(|| format!("Bad device token '{}'", token))?;
                let mut notification = Notification::new(device_token, payload.clone())
                    .with_priority(priority);
                if let Some(seconds) = self.expires_in {
                    notification = notification.expires_in(Duration::from_secs(seconds));
                }
                Ok(notification)
            })
            .collect()
    }
}

/// Outcome of one notification, as printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct DeliveryRow {
    #[tabled(rename = "ID")]
    pub identifier: u32,
    #[tabled(rename = "Device")]
    pub device: String,
    #[tabled(rename = "Outcome")]
    pub outcome: String,
}

/// Queues and sends `notifications`, then disconnects.
///
/// Rows come back in identifier order. Fails only when the client cannot
/// deliver at all; individual rejections are rows.
pub fn deliver<T: Transport>(
    client: &mut PushClient<T>,
    notifications: Vec<Notification>,
) -> Result<Vec<DeliveryRow>> {
    let mut devices = HashMap::new();
    for notification in notifications {
        let device = notification.device_token().to_string();
        match client.add(notification) {
            Ok(identifier) => {
                devices.insert(identifier, device);
            }
            Err(PushError::InvalidNotification { identifier, source }) => {
                warn!("Not sending to {}: {}", device, source);
                devices.insert(identifier, device);
            }
            Err(e) => return Err(e.into()),
        }
    }

    let sent = client.send();
    client.disconnect();
    match sent {
        Ok(_) | Err(PushError::RetryLimitExceeded { .. }) => {}
        Err(e) => return Err(e.into()),
    }

    Ok(client
        .outcomes()
        .iter()
        .filter_map(|(identifier, outcome)| {
            devices.get(identifier).map(|device| DeliveryRow {
                identifier: *identifier,
                device: device.clone(),
                outcome: outcome.to_string(),
            })
        })
        .collect())
}

/// Sends the message to every token over TLS.
pub fn run(config: &PushConfig, tokens: &[String], message: &Message, json: bool) -> Result<()> {
    let notifications = message.notifications(tokens)?;
    let mut client = PushClient::from_config(config.clone())?;
    let rows = deliver(&mut client, notifications)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("{}", display::table(&rows));
    }

    let failed = client
        .outcomes()
        .values()
        .filter(|outcome| !matches!(outcome, Outcome::Delivered))
        .count();
    if failed > 0 {
        bail!("{} of {} notification(s) not delivered", failed, rows.len());
    }
    if !json {
        display::success(&format!("Delivered {} notification(s)", rows.len()));
    }
    Ok(())
}

// INLINE_TEST_REQUIRED: Binary crate without lib.rs - tests cannot be external
#[cfg(test)]
mod tests {
    use super::*;
    use pushwire_core::network::MockTransport;
    use pushwire_core::{Environment, StatusCode};

    fn token(byte: u8) -> String {
        format!("{:02x}", byte).repeat(32)
    }

    fn mock_client(transport: MockTransport) -> PushClient<MockTransport> {
        let config = PushConfig::new(Environment::Sandbox, "cert.pem")
            .with_connect_retries(0, 0)
            .with_read_timeout_ms(1)
            .with_quiet_period_ms(1);
        PushClient::new(transport, &config).unwrap()
    }

    #[test]
    fn test_message_builds_payload_from_flags() {
        let message = Message {
            alert: Some("Hi".into()),
            badge: Some(2),
            ..Default::default()
        };

        let notifications = message.notifications(&[token(1), token(2)]).unwrap();

        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[0].payload().get_badge(), Some(2));
        assert_eq!(notifications[1].device_token(), &DeviceToken::new([2; 32]));
    }

    #[test]
    fn test_message_accepts_json_payload() {
        let message = Message {
            payload: Some(r#"{"aps":{"alert":"Hi"},"order":7}"#.into()),
            ..Default::default()
        };

        let notifications = message.notifications(&[token(1)]).unwrap();

        assert_eq!(
            notifications[0].payload().custom_properties()["order"],
            serde_json::json!(7)
        );
    }

    #[test]
    fn test_message_rejects_bad_input() {
        let bad_priority = Message {
            priority: Some(7),
            ..Default::default()
        };
        assert!(bad_priority.notifications(&[token(1)]).is_err());

        let bad_token = Message::default().notifications(&["abc".into()]);
        assert!(bad_token.unwrap_err().to_string().contains("abc"));
    }

    #[test]
    fn test_deliver_reports_every_outcome() {
        let mut transport = MockTransport::new();
        transport.reject_once(2, StatusCode::InvalidToken);
        let mut client = mock_client(transport);
        let message = Message {
            alert: Some("Hi".into()),
            ..Default::default()
        };

        let rows = deliver(
            &mut client,
            message.notifications(&[token(1), token(2), token(3)]).unwrap(),
        )
        .unwrap();

        let outcomes: Vec<&str> = rows.iter().map(|row| row.outcome.as_str()).collect();
        assert_eq!(
            outcomes,
            vec!["delivered", "rejected: Invalid token (8)", "delivered"]
        );
        assert_eq!(rows[1].device, token(2));
        assert!(!client.is_connected());
    }

    #[test]
    fn test_deliver_lists_unencodable_notifications() {
        let mut client = mock_client(MockTransport::new());
        let message = Message {
            alert: Some("x".repeat(3000)),
            ..Default::default()
        };

        let rows = deliver(&mut client, message.notifications(&[token(1)]).unwrap()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].outcome, "rejected: Invalid payload size (7)");
        assert!(client.transport().written_identifiers().is_empty());
    }
}
