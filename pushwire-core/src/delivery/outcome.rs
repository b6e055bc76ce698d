// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Delivery outcomes and per-batch reports.

use std::fmt;

use crate::codec::StatusCode;

/// Final state of a notification.
///
/// Produced once per notification and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The gateway accepted the notification.
    Delivered,
    /// The gateway refused the notification with the given status.
    Rejected(StatusCode),
    /// Delivery was given up before the gateway confirmed either way.
    Undetermined,
}

impl Outcome {
    /// Returns true for [`Outcome::Delivered`].
    pub fn is_delivered(&self) -> bool {
        matches!(self, Outcome::Delivered)
    }

    /// Returns the rejection status, if rejected.
    pub fn rejection(&self) -> Option<StatusCode> {
        match self {
            Outcome::Rejected(status) => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Delivered => write!(f, "delivered"),
            Outcome::Rejected(status) => write!(f, "rejected: {}", status),
            Outcome::Undetermined => write!(f, "undetermined"),
        }
    }
}

/// Result of a single `send` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Identifiers confirmed delivered during this run, in order.
    pub delivered: Vec<u32>,
    /// Identifiers rejected by the gateway during this run.
    pub rejected: Vec<(u32, StatusCode)>,
    /// Frames written, including resubmissions.
    pub frames_written: usize,
    /// Notifications written again after an error or a lost connection.
    pub resubmitted: usize,
    /// Connections opened during this run.
    pub connections: usize,
}

impl BatchReport {
    /// Returns true if nothing was rejected.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    /// Number of notifications resolved during this run.
    pub fn resolved(&self) -> usize {
        self.delivered.len() + self.rejected.len()
    }
}
