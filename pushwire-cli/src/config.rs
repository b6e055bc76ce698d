// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! CLI Configuration
//!
//! Merges the JSON configuration file with command-line flags. Flags win.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use pushwire_core::{Environment, PushConfig};

/// Settings gathered from the command line.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// JSON configuration file.
    pub config_file: Option<PathBuf>,
    /// Gateway environment name.
    pub environment: Option<String>,
    /// Client certificate.
    pub certificate: Option<PathBuf>,
    /// Private key.
    pub private_key: Option<PathBuf>,
    /// Gateway address override.
    pub gateway: Option<String>,
    /// Feedback address override.
    pub feedback: Option<String>,
}

/// Returns the per-user configuration file, if one exists.
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("pushwire").join("config.json"))
        .filter(|path| path.exists())
}

impl CliConfig {
    /// Builds and validates the client configuration.
    pub fn resolve(self) -> Result<PushConfig> {
        let mut config = match &self.config_file {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Cannot read configuration {}", path.display()))?;
                serde_json::from_str::<PushConfig>(&json)
                    .with_context(|| format!("Invalid configuration {}", path.display()))?
            }
            None => PushConfig::default(),
        };

        if let Some(name) = &self.environment {
            config.environment = name.parse::<Environment>().map_err(|e| anyhow!(e))?;
        }
        if let Some(certificate) = self.certificate {
            config.certificate_path = certificate;
        }
        if let Some(key) = self.private_key {
            config.private_key_path = Some(key);
        }
        if let Some(gateway) = self.gateway {
            config.gateway_override = Some(gateway);
        }
        if let Some(feedback) = self.feedback {
            config.feedback_override = Some(feedback);
        }

        config.validate()?;
        Ok(config)
    }
}

// INLINE_TEST_REQUIRED: Binary crate without lib.rs - tests cannot be external
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_flags_only() {
        let config = CliConfig {
            environment: Some("production".into()),
            certificate: Some("cert.pem".into()),
            ..Default::default()
        }
        .resolve()
        .unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.certificate_path, PathBuf::from("cert.pem"));
    }

    #[test]
    fn test_missing_certificate_fails() {
        let err = CliConfig::default().resolve().unwrap_err();

        assert!(err.to_string().contains("Push SSL certificate is required"));
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "environment": "production", "certificate_path": "file.pem", "retry_limit": 9 }"#,
        )
        .unwrap();

        let config = CliConfig {
            config_file: Some(path),
            certificate: Some("flag.pem".into()),
            gateway: Some("localhost:2195".into()),
            ..Default::default()
        }
        .resolve()
        .unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.certificate_path, PathBuf::from("flag.pem"));
        assert_eq!(config.retry_limit, 9);
        assert_eq!(config.gateway_override.as_deref(), Some("localhost:2195"));
    }

    #[test]
    fn test_unknown_environment_fails() {
        let err = CliConfig {
            environment: Some("staging".into()),
            certificate: Some("cert.pem".into()),
            ..Default::default()
        }
        .resolve()
        .unwrap_err();

        assert!(err.to_string().contains("staging"));
    }

    #[test]
    fn test_missing_file_fails() {
        let dir = tempdir().unwrap();
        let err = CliConfig {
            config_file: Some(dir.path().join("absent.json")),
            ..Default::default()
        }
        .resolve()
        .unwrap_err();

        assert!(err.to_string().starts_with("Cannot read configuration"));
    }
}
