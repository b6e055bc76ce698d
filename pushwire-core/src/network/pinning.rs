// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Certificate Pinning
//!
//! Optional pinning of the gateway's leaf certificate on top of regular
//! chain validation. Pins are SHA-256 fingerprints of DER-encoded
//! certificates.

use ring::digest;

use super::error::NetworkError;

/// A pinned certificate fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedCertificate {
    /// SHA-256 fingerprint of the DER-encoded certificate.
    pub sha256_fingerprint: [u8; 32],
}

impl PinnedCertificate {
    /// Creates a new pinned certificate from a known SHA-256 fingerprint.
    pub fn new(sha256_fingerprint: [u8; 32]) -> Self {
        PinnedCertificate { sha256_fingerprint }
    }

    /// Computes the SHA-256 fingerprint of DER-encoded certificate bytes.
    pub fn from_der(cert_der: &[u8]) -> Self {
        let hash = digest::digest(&digest::SHA256, cert_der);
        let mut fingerprint = [0u8; 32];
        fingerprint.copy_from_slice(hash.as_ref());
        PinnedCertificate {
            sha256_fingerprint: fingerprint,
        }
    }

    /// Parses a hex fingerprint as printed by `openssl x509 -fingerprint -sha256`.
    ///
    /// Colons and whitespace are ignored, case is not significant.
    pub fn from_hex(fingerprint: &str) -> Result<Self, NetworkError> {
        let cleaned: String = fingerprint
            .chars()
            .filter(|c| *c != ':' && !c.is_whitespace())
            .collect();
        let bytes = hex::decode(&cleaned)
            .map_err(|e| NetworkError::Certificate(format!("Invalid fingerprint: {}", e)))?;
        let fingerprint: [u8; 32] = bytes.try_into().map_err(|_| {
            NetworkError::Certificate("Fingerprint must be 32 bytes (SHA-256)".into())
        })?;
        Ok(PinnedCertificate::new(fingerprint))
    }

    /// Lowercase hex form of the fingerprint.
    pub fn to_hex(&self) -> String {
        hex::encode(self.sha256_fingerprint)
    }
}

/// Verifies that a certificate matches one of the pinned fingerprints.
///
/// Returns `false` if the pin list is empty.
pub fn verify_pin(cert_der: &[u8], pins: &[PinnedCertificate]) -> bool {
    if pins.is_empty() {
        return false;
    }

    let cert_pin = PinnedCertificate::from_der(cert_der);
    pins.iter().any(|pin| pin == &cert_pin)
}
