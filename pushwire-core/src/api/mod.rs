// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Pushwire API Layer
//!
//! High-level client coordinating the queue, the retry engine and the
//! gateway connection.
//!
//! # Module Structure
//!
//! - [`error`] - Error types for the API layer
//! - [`config`] - Configuration types
//! - [`events`] - Event system for callbacks
//! - [`client`] - The push client
//! - `shared` - Async handle (feature `tokio`)

pub mod client;
pub mod config;
pub mod error;
pub mod events;
#[cfg(feature = "tokio")]
pub mod shared;

// Error types
pub use error::{PushError, PushResult};

// Configuration
pub use config::{PushConfig, DEFAULT_CONNECT_TIMEOUT_MS};

// Events
pub use events::{CallbackHandler, EventDispatcher, EventHandler, PushEvent};

// Client
pub use client::PushClient;
#[cfg(feature = "tokio")]
pub use shared::SharedPushClient;
