// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Client Configuration

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{PushError, PushResult};
use crate::codec::{FrameFormat, DEFAULT_MAX_PAYLOAD_SIZE, MAX_ENCODABLE_PAYLOAD_SIZE};
use crate::delivery::{
    DeliverySettings, DEFAULT_QUIET_PERIOD_MS, DEFAULT_READ_TIMEOUT_MS, DEFAULT_RETRY_LIMIT,
    DEFAULT_WRITES_PER_POLL,
};
use crate::network::{
    ConnectPolicy, Environment, PinnedCertificate, TransportConfig,
    DEFAULT_CONNECT_RETRY_INTERVAL_MS, DEFAULT_CONNECT_RETRY_LIMIT,
};

/// Default TCP + TLS connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Push client configuration.
///
/// Deserializable from JSON; every field except `certificate_path` has a
/// default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PushConfig {
    /// Gateway environment.
    pub environment: Environment,
    /// PEM file with the client certificate (and key, if bundled).
    pub certificate_path: PathBuf,
    /// PEM file with the private key, if not bundled with the certificate.
    pub private_key_path: Option<PathBuf>,
    /// PEM file with the root CA that signed the gateway certificate.
    pub root_ca_path: Option<PathBuf>,
    /// Hex SHA-256 fingerprints of accepted gateway certificates.
    pub pinned_fingerprints: Vec<String>,
    /// `host:port` replacing the environment's gateway.
    pub gateway_override: Option<String>,
    /// `host:port` replacing the environment's feedback service.
    pub feedback_override: Option<String>,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub quiet_period_ms: u64,
    /// Writes allowed per notification beyond the first.
    pub retry_limit: u32,
    pub connect_retry_limit: u32,
    pub connect_retry_interval_ms: u64,
    pub writes_per_poll: usize,
    pub max_payload_size: usize,
    pub frame_format: FrameFormat,
}

impl Default for PushConfig {
    fn default() -> Self {
        PushConfig {
            environment: Environment::Sandbox,
            certificate_path: PathBuf::new(),
            private_key_path: None,
            root_ca_path: None,
            pinned_fingerprints: Vec::new(),
            gateway_override: None,
            feedback_override: None,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            quiet_period_ms: DEFAULT_QUIET_PERIOD_MS,
            retry_limit: DEFAULT_RETRY_LIMIT,
            connect_retry_limit: DEFAULT_CONNECT_RETRY_LIMIT,
            connect_retry_interval_ms: DEFAULT_CONNECT_RETRY_INTERVAL_MS,
            writes_per_poll: DEFAULT_WRITES_PER_POLL,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            frame_format: FrameFormat::Itemized,
        }
    }
}

impl PushConfig {
    /// Creates a configuration for `environment` with the given certificate.
    pub fn new(environment: Environment, certificate_path: impl Into<PathBuf>) -> Self {
        PushConfig {
            environment,
            certificate_path: certificate_path.into(),
            ..Default::default()
        }
    }

    /// Loads a configuration from a JSON file and validates it.
    pub fn from_json_file(path: &Path) -> PushResult<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            PushError::Configuration(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Parses a JSON configuration and validates it.
    pub fn from_json_str(json: &str) -> PushResult<Self> {
        let config: PushConfig = serde_json::from_str(json)
            .map_err(|e| PushError::Configuration(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the private key file.
    pub fn with_private_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.private_key_path = Some(path.into());
        self
    }

    /// Sets the root CA file.
    pub fn with_root_ca(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_ca_path = Some(path.into());
        self
    }

    /// Adds a pinned gateway certificate fingerprint.
    pub fn with_pinned_fingerprint(mut self, fingerprint: &str) -> Self {
        self.pinned_fingerprints.push(fingerprint.to_string());
        self
    }

    /// Replaces the gateway endpoint.
    pub fn with_gateway(mut self, address: &str) -> Self {
        self.gateway_override = Some(address.to_string());
        self
    }

    /// Replaces the feedback endpoint.
    pub fn with_feedback(mut self, address: &str) -> Self {
        self.feedback_override = Some(address.to_string());
        self
    }

    /// Sets the retry limit.
    pub fn with_retry_limit(mut self, limit: u32) -> Self {
        self.retry_limit = limit;
        self
    }

    /// Sets the poll timeout after each write group.
    pub fn with_read_timeout_ms(mut self, ms: u64) -> Self {
        self.read_timeout_ms = ms;
        self
    }

    /// Sets the quiet period after the last write.
    pub fn with_quiet_period_ms(mut self, ms: u64) -> Self {
        self.quiet_period_ms = ms;
        self
    }

    /// Sets the connect retry policy.
    pub fn with_connect_retries(mut self, limit: u32, interval_ms: u64) -> Self {
        self.connect_retry_limit = limit;
        self.connect_retry_interval_ms = interval_ms;
        self
    }

    /// Sets how many writes happen between two polls.
    pub fn with_writes_per_poll(mut self, writes: usize) -> Self {
        self.writes_per_poll = writes;
        self
    }

    /// Sets the payload size limit.
    pub fn with_max_payload_size(mut self, size: usize) -> Self {
        self.max_payload_size = size;
        self
    }

    /// Sets the frame format.
    pub fn with_frame_format(mut self, format: FrameFormat) -> Self {
        self.frame_format = format;
        self
    }

    /// Checks the configuration before anything connects.
    pub fn validate(&self) -> PushResult<()> {
        if self.certificate_path.as_os_str().is_empty() {
            return Err(PushError::Configuration(
                "Push SSL certificate is required".into(),
            ));
        }

        for (name, value) in [
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("read_timeout_ms", self.read_timeout_ms),
            ("quiet_period_ms", self.quiet_period_ms),
        ] {
            if value == 0 {
                return Err(PushError::Configuration(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        if self.writes_per_poll == 0 {
            return Err(PushError::Configuration(
                "writes_per_poll must be greater than zero".into(),
            ));
        }
        if self.max_payload_size == 0 || self.max_payload_size > MAX_ENCODABLE_PAYLOAD_SIZE {
            return Err(PushError::Configuration(format!(
                "max_payload_size must be between 1 and {}",
                MAX_ENCODABLE_PAYLOAD_SIZE
            )));
        }

        self.pins()?;
        self.gateway_endpoint()?;
        self.feedback_endpoint()?;
        Ok(())
    }

    /// Host and port of the notification gateway.
    pub fn gateway_endpoint(&self) -> PushResult<(String, u16)> {
        match &self.gateway_override {
            Some(address) => parse_address(address),
            None => {
                let (host, port) = self.environment.gateway();
                Ok((host.to_string(), port))
            }
        }
    }

    /// Host and port of the feedback service.
    pub fn feedback_endpoint(&self) -> PushResult<(String, u16)> {
        match &self.feedback_override {
            Some(address) => parse_address(address),
            None => {
                let (host, port) = self.environment.feedback();
                Ok((host.to_string(), port))
            }
        }
    }

    /// Transport settings for the notification gateway.
    pub fn gateway_transport(&self) -> PushResult<TransportConfig> {
        let (host, port) = self.gateway_endpoint()?;
        self.transport_for(host, port)
    }

    /// Transport settings for the feedback service.
    pub fn feedback_transport(&self) -> PushResult<TransportConfig> {
        let (host, port) = self.feedback_endpoint()?;
        self.transport_for(host, port)
    }

    /// Engine timing and retry settings.
    pub fn delivery_settings(&self) -> DeliverySettings {
        DeliverySettings {
            read_timeout_ms: self.read_timeout_ms,
            quiet_period_ms: self.quiet_period_ms,
            retry_limit: self.retry_limit,
            writes_per_poll: self.writes_per_poll,
        }
    }

    /// Connect retry policy.
    pub fn connect_policy(&self) -> ConnectPolicy {
        ConnectPolicy::default()
            .with_retry_limit(self.connect_retry_limit)
            .with_retry_interval_ms(self.connect_retry_interval_ms)
    }

    fn pins(&self) -> PushResult<Vec<PinnedCertificate>> {
        self.pinned_fingerprints
            .iter()
            .map(|hex| PinnedCertificate::from_hex(hex).map_err(PushError::from))
            .collect()
    }

    fn transport_for(&self, host: String, port: u16) -> PushResult<TransportConfig> {
        Ok(TransportConfig {
            host,
            port,
            certificate_path: self.certificate_path.clone(),
            private_key_path: self.private_key_path.clone(),
            root_ca_path: self.root_ca_path.clone(),
            pins: self.pins()?,
            connect_timeout_ms: self.connect_timeout_ms,
            ..Default::default()
        })
    }
}

fn parse_address(address: &str) -> PushResult<(String, u16)> {
    let (host, port) = address.rsplit_once(':').ok_or_else(|| {
        PushError::Configuration(format!("Address must be host:port, got '{}'", address))
    })?;
    if host.is_empty() {
        return Err(PushError::Configuration(format!(
            "Address has no host: '{}'",
            address
        )));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| PushError::Configuration(format!("Invalid port in '{}'", address)))?;
    Ok((host.to_string(), port))
}
