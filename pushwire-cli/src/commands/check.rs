// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Check Command

use anyhow::Result;
use pushwire_core::PushConfig;

use crate::display;

/// Prints the resolved configuration. Never connects.
pub fn run(config: &PushConfig) -> Result<()> {
    let (gateway_host, gateway_port) = config.gateway_endpoint()?;
    let (feedback_host, feedback_port) = config.feedback_endpoint()?;

    display::success("Configuration is valid");
    println!();
    println!("  Environment: {:?}", config.environment);
    println!("  Gateway:     {}:{}", gateway_host, gateway_port);
    println!("  Feedback:    {}:{}", feedback_host, feedback_port);
    println!("  Certificate: {}", config.certificate_path.display());
    println!("  Format:      {:?}", config.frame_format);
    println!("  Retry limit: {}", config.retry_limit);

    if !config.certificate_path.exists() {
        display::warning(&format!(
            "Certificate file {} does not exist",
            config.certificate_path.display()
        ));
    }
    Ok(())
}
