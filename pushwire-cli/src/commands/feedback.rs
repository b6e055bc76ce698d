// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Feedback Command
//!
//! Lists devices that stopped accepting notifications.

use anyhow::Result;
use pushwire_core::{FeedbackService, FeedbackTuple, PushConfig};
use serde::Serialize;
use tabled::Tabled;

use crate::display;

/// One unreachable device, as printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct FeedbackRow {
    #[tabled(rename = "Timestamp")]
    pub timestamp: u32,
    #[tabled(rename = "Device")]
    pub device: String,
}

impl From<&FeedbackTuple> for FeedbackRow {
    fn from(tuple: &FeedbackTuple) -> Self {
        FeedbackRow {
            timestamp: tuple.timestamp,
            device: tuple.device_token.to_string(),
        }
    }
}

/// Fetches and prints the feedback list.
pub fn run(config: &PushConfig, json: bool) -> Result<()> {
    let tuples = FeedbackService::from_config(config)?.fetch()?;
    let rows: Vec<FeedbackRow> = tuples.iter().map(FeedbackRow::from).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else if rows.is_empty() {
        display::info("No unreachable devices reported");
    } else {
        println!("{}", display::table(&rows));
    }
    Ok(())
}
